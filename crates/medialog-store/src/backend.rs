use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::StoreError;

/// A document as held by the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocument {
    pub path: String,
    pub content: String,
    /// Opaque revision token assigned by the store; the sole CAS input.
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetOutcome {
    Found(RemoteDocument),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    Ok { version: String },
    /// The store's current version differs from the expected one.
    Conflict,
    NotFound,
    Unauthorized,
}

impl PutOutcome {
    /// Turn a terminal outcome into the new version or a typed error.
    pub fn into_version(self, path: &str) -> Result<String, StoreError> {
        match self {
            PutOutcome::Ok { version } => Ok(version),
            PutOutcome::Conflict => Err(StoreError::Conflict(path.to_string())),
            PutOutcome::NotFound => Err(StoreError::NotFound(path.to_string())),
            PutOutcome::Unauthorized => Err(StoreError::Unauthorized),
        }
    }
}

/// One compare-and-swap write. `expected_version: None` means "create".
#[derive(Debug, Clone, Copy)]
pub struct PutRequest<'a> {
    pub path: &'a str,
    pub content: &'a str,
    pub expected_version: Option<&'a str>,
    pub message: &'a str,
}

/// Versioned document client. Implemented by `GitHubBackend` (real)
/// and `MemoryBackend` (in-process, for tests and dry runs).
#[async_trait::async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Fetch a document. A rejected credential is `Err(StoreError::Unauthorized)`.
    async fn get(&self, path: &str) -> Result<GetOutcome, StoreError>;

    async fn put(&self, request: PutRequest<'_>) -> Result<PutOutcome, StoreError>;

    /// Drop the stored credential so the collaborator prompts for a new one.
    fn discard_credential(&self);
}

/// In-memory store with real CAS semantics, call counters and scripted outcomes.
pub struct MemoryBackend {
    docs: Mutex<HashMap<String, (String, u64)>>,
    scripted_puts: Mutex<VecDeque<PutOutcome>>,
    next_rev: AtomicUsize,
    authorized: AtomicBool,
    offline: AtomicBool,
    gets: AtomicUsize,
    puts: AtomicUsize,
    discards: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            docs: Mutex::new(HashMap::new()),
            scripted_puts: Mutex::new(VecDeque::new()),
            next_rev: AtomicUsize::new(1),
            authorized: AtomicBool::new(true),
            offline: AtomicBool::new(false),
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            discards: AtomicUsize::new(0),
        }
    }

    fn docs(&self) -> std::sync::MutexGuard<'_, HashMap<String, (String, u64)>> {
        self.docs.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn bump(&self) -> u64 {
        self.next_rev.fetch_add(1, Ordering::SeqCst) as u64
    }

    /// Seed or overwrite a document as a third-party writer would.
    /// Returns the new version.
    pub fn external_write(&self, path: &str, content: &str) -> String {
        let rev = self.bump();
        self.docs()
            .insert(path.to_string(), (content.to_string(), rev));
        version_token(rev)
    }

    pub fn content(&self, path: &str) -> Option<String> {
        self.docs().get(path).map(|(c, _)| c.clone())
    }

    pub fn version(&self, path: &str) -> Option<String> {
        self.docs().get(path).map(|(_, rev)| version_token(*rev))
    }

    /// Queue outcomes returned by the next puts, in order. A scripted
    /// `PutOutcome::Ok` performs the real write; an empty queue does too.
    pub fn script_puts(&self, outcomes: Vec<PutOutcome>) {
        self.scripted_puts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(outcomes);
    }

    pub fn set_authorized(&self, authorized: bool) {
        self.authorized.store(authorized, Ordering::SeqCst);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn discarded_credentials(&self) -> usize {
        self.discards.load(Ordering::SeqCst)
    }

    fn apply(&self, request: PutRequest<'_>) -> PutOutcome {
        let mut docs = self.docs();
        let current = docs.get(request.path).map(|(_, rev)| version_token(*rev));
        if current.as_deref() != request.expected_version {
            return PutOutcome::Conflict;
        }
        let rev = self.bump();
        docs.insert(
            request.path.to_string(),
            (request.content.to_string(), rev),
        );
        PutOutcome::Ok {
            version: version_token(rev),
        }
    }
}

fn version_token(rev: u64) -> String {
    format!("rev-{rev}")
}

#[async_trait::async_trait]
impl DocumentBackend for MemoryBackend {
    async fn get(&self, path: &str) -> Result<GetOutcome, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Network("store unreachable".into()));
        }
        if !self.authorized.load(Ordering::SeqCst) {
            return Err(StoreError::Unauthorized);
        }
        Ok(match self.docs().get(path) {
            Some((content, rev)) => GetOutcome::Found(RemoteDocument {
                path: path.to_string(),
                content: content.clone(),
                version: version_token(*rev),
            }),
            None => GetOutcome::NotFound,
        })
    }

    async fn put(&self, request: PutRequest<'_>) -> Result<PutOutcome, StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Network("store unreachable".into()));
        }
        if !self.authorized.load(Ordering::SeqCst) {
            return Ok(PutOutcome::Unauthorized);
        }
        let scripted = self
            .scripted_puts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match scripted {
            Some(PutOutcome::Ok { .. }) | None => Ok(self.apply(request)),
            Some(other) => Ok(other),
        }
    }

    fn discard_credential(&self) {
        self.discards.fetch_add(1, Ordering::SeqCst);
    }
}
