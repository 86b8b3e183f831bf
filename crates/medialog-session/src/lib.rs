//! The four-operation surface the rest of the application calls:
//! `load_state`, `save_state`, `append_log`, `update_calendar_index`,
//! plus the read-modify-write helpers built on them.
//!
//! Each document path has its own async lock, held across a whole
//! read-modify-write cycle, so two commands on the same document never
//! interleave within one session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use medialog_core::{CommandError, ScheduleState};
use medialog_journal::{Annotation, CalendarIndex, DayKey, JournalError, ListeningEntry, LogAppender, PeriodKey};
use medialog_store::{
    CredentialStore, DocumentBackend, GitHubBackend, StateRepository, StoreConfig, StoreError,
    WriteCoordinator,
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Journal(#[from] JournalError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

impl SessionError {
    /// The credential was missing or rejected and has been discarded.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            SessionError::Store(e) => e.is_unauthorized(),
            SessionError::Journal(e) => e.is_unauthorized(),
            SessionError::Command(_) => false,
        }
    }
}

/// Result of the index half of [`Session::record_listening`].
#[derive(Debug)]
pub enum IndexOutcome {
    Updated(Annotation),
    /// The log entry was written but the index update failed; the index is stale.
    Failed(SessionError),
}

#[derive(Debug)]
pub struct ListeningOutcome {
    pub period: PeriodKey,
    pub day: DayKey,
    pub index: IndexOutcome,
}

pub struct Session {
    config: StoreConfig,
    coordinator: Arc<WriteCoordinator>,
    state: StateRepository,
    logs: LogAppender,
    calendar: CalendarIndex,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Session {
    pub fn new(backend: Arc<dyn DocumentBackend>, config: StoreConfig) -> Self {
        let coordinator = Arc::new(WriteCoordinator::new(backend));
        Self {
            state: StateRepository::new(coordinator.clone(), config.state_path.clone()),
            logs: LogAppender::new(coordinator.clone(), config.logs_dir.clone()),
            calendar: CalendarIndex::new(coordinator.clone(), config.index_path.clone()),
            coordinator,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Session over the GitHub contents API.
    pub fn github(config: StoreConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self, SessionError> {
        let backend = GitHubBackend::new(config.clone(), credentials)?;
        Ok(Self::new(Arc::new(backend), config))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &Arc<WriteCoordinator> {
        &self.coordinator
    }

    fn lock_for(&self, path: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(path.to_string())
            .or_default()
            .clone()
    }

    // ── Surface ──

    pub async fn load_state(&self) -> Result<ScheduleState, SessionError> {
        Ok(self.state.load().await?)
    }

    pub async fn save_state(&self, state: &ScheduleState) -> Result<(), SessionError> {
        let lock = self.lock_for(self.state.path());
        let _guard = lock.lock().await;
        self.state.save(state).await?;
        Ok(())
    }

    pub async fn append_log(&self, period: PeriodKey, day: DayKey, entry: &str) -> Result<(), SessionError> {
        let lock = self.lock_for(&self.logs.path(period));
        let _guard = lock.lock().await;
        self.logs.append_entry(period, day, entry).await?;
        Ok(())
    }

    pub async fn update_calendar_index(
        &self,
        period: PeriodKey,
        day: u8,
        source_id: &str,
    ) -> Result<Annotation, SessionError> {
        let lock = self.lock_for(self.calendar.path());
        let _guard = lock.lock().await;
        Ok(self.calendar.update(period, day, source_id).await?)
    }

    // ── Composite operations ──

    /// Load, mutate and save the state under its path lock. The mutation's
    /// error aborts the cycle before anything is written.
    pub async fn apply<T, E>(
        &self,
        mutate: impl FnOnce(&mut ScheduleState) -> Result<T, E>,
    ) -> Result<T, SessionError>
    where
        SessionError: From<E>,
    {
        let lock = self.lock_for(self.state.path());
        let _guard = lock.lock().await;
        let mut state = self.state.load().await?;
        let out = mutate(&mut state)?;
        self.state.save(&state).await?;
        Ok(out)
    }

    /// Write a listening entry to its period log, then mark the day in the
    /// calendar index. The log write is authoritative; an index failure is
    /// reported in the outcome, not as an error.
    pub async fn record_listening(&self, entry: &ListeningEntry) -> Result<ListeningOutcome, SessionError> {
        let period = entry.period()?;
        let day = entry.day()?;
        let text = entry.render()?;
        let message = entry.commit_message()?;

        {
            let lock = self.lock_for(&self.logs.path(period));
            let _guard = lock.lock().await;
            self.logs
                .append_entry_with_message(period, day, &text, &message)
                .await?;
        }
        info!(station = %entry.station_id, period = %period, day = %day, "listening logged");

        let index = match self
            .update_calendar_index(period, day.day(), &entry.station_id)
            .await
        {
            Ok(annotation) => IndexOutcome::Updated(annotation),
            Err(e) => {
                warn!(error = %e, period = %period, day = %day, "calendar index update failed, index is stale");
                IndexOutcome::Failed(e)
            }
        };
        Ok(ListeningOutcome { period, day, index })
    }
}
