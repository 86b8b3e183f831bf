use std::sync::Arc;

use tracing::debug;

use medialog_core::ScheduleState;

use crate::coordinator::WriteCoordinator;
use crate::error::StoreError;

pub const STATE_COMMIT_MESSAGE: &str = "📊 Update media log";

/// Loads and saves the single JSON state document.
pub struct StateRepository {
    coordinator: Arc<WriteCoordinator>,
    path: String,
}

impl StateRepository {
    pub fn new(coordinator: Arc<WriteCoordinator>, path: impl Into<String>) -> Self {
        Self {
            coordinator,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// A missing document is an empty state; malformed JSON is a `Parse` error.
    pub async fn load(&self) -> Result<ScheduleState, StoreError> {
        let Some(doc) = self.coordinator.read(&self.path).await? else {
            debug!(path = %self.path, "state document absent, starting empty");
            return Ok(ScheduleState::default());
        };
        serde_json::from_str(&doc.content).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    pub async fn save(&self, state: &ScheduleState) -> Result<String, StoreError> {
        let json = serde_json::to_string_pretty(state).map_err(StoreError::Serialize)?;
        self.coordinator
            .save(&self.path, &json, STATE_COMMIT_MESSAGE)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DocumentBackend, GetOutcome, MemoryBackend, PutOutcome, PutRequest};
    use medialog_core::{MediaItem, MediaType, Status};

    fn setup() -> (Arc<MemoryBackend>, StateRepository) {
        let backend = Arc::new(MemoryBackend::new());
        let coordinator = Arc::new(WriteCoordinator::new(backend.clone()));
        (backend, StateRepository::new(coordinator, "schedule.json"))
    }

    #[tokio::test]
    async fn missing_document_loads_empty() {
        let (_, repo) = setup();
        let state = repo.load().await.unwrap();
        assert!(state.watchlist.is_empty());
        assert!(state.weekly.mon.is_empty());
    }

    #[tokio::test]
    async fn load_is_idempotent_in_shape() {
        let (backend, repo) = setup();
        backend.external_write("schedule.json", r#"{"watchlist":[{"title":"A"}]}"#);
        let first = repo.load().await.unwrap();
        repo.save(&first).await.unwrap();
        let second = repo.load().await.unwrap();
        assert_eq!(first, second);
        let json: serde_json::Value =
            serde_json::from_str(&backend.content("schedule.json").unwrap()).unwrap();
        assert!(json["weekly"]["sun"].is_array());
    }

    #[tokio::test]
    async fn save_is_pretty_printed_with_two_spaces() {
        let (backend, repo) = setup();
        let mut state = ScheduleState::default();
        let mut item = MediaItem::new("Dune", MediaType::Movie);
        item.status = Status::Watching;
        state.watchlist.push(item);
        repo.save(&state).await.unwrap();
        let raw = backend.content("schedule.json").unwrap();
        assert!(raw.starts_with("{\n  \"watchlist\": [\n    {"));
    }

    #[tokio::test]
    async fn malformed_json_is_parse_error() {
        let (backend, repo) = setup();
        backend.external_write("schedule.json", "{not json");
        let err = repo.load().await.unwrap_err();
        assert!(matches!(err, StoreError::Parse { ref path, .. } if path == "schedule.json"));
    }

    /// Serves a fixed contents-API response body for every path.
    struct WireBackend(&'static str);

    #[async_trait::async_trait]
    impl DocumentBackend for WireBackend {
        async fn get(&self, path: &str) -> Result<GetOutcome, StoreError> {
            let body = serde_json::from_str(self.0).map_err(|source| StoreError::Parse {
                path: path.to_string(),
                source,
            })?;
            Ok(GetOutcome::Found(crate::github::document_from(path, body)?))
        }

        async fn put(&self, _request: PutRequest<'_>) -> Result<PutOutcome, StoreError> {
            Ok(PutOutcome::NotFound)
        }

        fn discard_credential(&self) {}
    }

    #[tokio::test]
    async fn undecodable_payload_is_decode_error() {
        let backend = Arc::new(WireBackend(r#"{"sha":"v1","content":"%%%"}"#));
        let coordinator = Arc::new(WriteCoordinator::new(backend));
        let repo = StateRepository::new(coordinator.clone(), "schedule.json");
        let err = repo.load().await.unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
        assert_eq!(coordinator.cached_version("schedule.json"), None);
    }

    #[tokio::test]
    async fn unknown_keys_survive_round_trip() {
        let (backend, repo) = setup();
        backend.external_write(
            "schedule.json",
            r#"{"watchlist":[],"weekly":{},"challenges":[{"id":1}],"theme":"dark"}"#,
        );
        let state = repo.load().await.unwrap();
        repo.save(&state).await.unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&backend.content("schedule.json").unwrap()).unwrap();
        assert_eq!(json["theme"], "dark");
        assert_eq!(json["challenges"][0]["id"], 1);
    }
}
