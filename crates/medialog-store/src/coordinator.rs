use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::backend::{DocumentBackend, GetOutcome, PutOutcome, PutRequest, RemoteDocument};
use crate::error::StoreError;

/// Optimistic write policy over a `DocumentBackend`.
///
/// Keeps the last known version per path. `None` in the cache means the
/// document is known to be absent, so the next save creates it.
pub struct WriteCoordinator {
    backend: Arc<dyn DocumentBackend>,
    versions: Mutex<HashMap<String, Option<String>>>,
}

impl WriteCoordinator {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            backend,
            versions: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &Arc<dyn DocumentBackend> {
        &self.backend
    }

    fn versions(&self) -> std::sync::MutexGuard<'_, HashMap<String, Option<String>>> {
        self.versions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cached version for `path`: outer `None` = unknown, inner `None` = absent.
    pub fn cached_version(&self, path: &str) -> Option<Option<String>> {
        self.versions().get(path).cloned()
    }

    pub fn forget(&self, path: &str) {
        self.versions().remove(path);
    }

    /// Fetch a document and remember its version.
    pub async fn read(&self, path: &str) -> Result<Option<RemoteDocument>, StoreError> {
        match self.guard(self.backend.get(path).await)? {
            GetOutcome::Found(doc) => {
                debug!(path, version = %doc.version, "read");
                self.versions()
                    .insert(path.to_string(), Some(doc.version.clone()));
                Ok(Some(doc))
            }
            GetOutcome::NotFound => {
                debug!(path, "read: not found");
                self.versions().insert(path.to_string(), None);
                Ok(None)
            }
        }
    }

    /// Write `content` with compare-and-swap, retrying exactly once on conflict.
    /// Returns the new version.
    pub async fn save(&self, path: &str, content: &str, message: &str) -> Result<String, StoreError> {
        let expected = match self.cached_version(path) {
            Some(v) => v,
            None => self.read(path).await?.map(|doc| doc.version),
        };

        let first = self.put(path, content, expected.as_deref(), message).await?;
        let outcome = match first {
            PutOutcome::Conflict => {
                warn!(path, "version conflict, refreshing and retrying once");
                self.forget(path);
                let fresh = self.read(path).await?.map(|doc| doc.version);
                match self.put(path, content, fresh.as_deref(), message).await? {
                    PutOutcome::Conflict => {
                        warn!(path, "conflict persisted after retry");
                        self.forget(path);
                        return Err(StoreError::WriteConflict(path.to_string()));
                    }
                    other => other,
                }
            }
            other => other,
        };

        let version = outcome.into_version(path)?;
        info!(path, version = %version, "saved");
        self.versions()
            .insert(path.to_string(), Some(version.clone()));
        Ok(version)
    }

    async fn put(
        &self,
        path: &str,
        content: &str,
        expected_version: Option<&str>,
        message: &str,
    ) -> Result<PutOutcome, StoreError> {
        let outcome = self
            .backend
            .put(PutRequest {
                path,
                content,
                expected_version,
                message,
            })
            .await;
        match self.guard(outcome)? {
            PutOutcome::Unauthorized => {
                self.invalidate();
                Err(StoreError::Unauthorized)
            }
            other => Ok(other),
        }
    }

    /// Passes results through, invalidating on `Unauthorized`.
    fn guard<T>(&self, result: Result<T, StoreError>) -> Result<T, StoreError> {
        if let Err(StoreError::Unauthorized) = &result {
            self.invalidate();
        }
        result
    }

    fn invalidate(&self) {
        warn!("credential rejected, clearing cached versions");
        self.versions().clear();
        self.backend.discard_credential();
    }
}
