use medialog_core::DecodeError;

/// Failures surfaced by the document store layers.
///
/// Only the write coordinator retries, and only on a version conflict.
/// Everything else propagates unchanged.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("malformed payload: {0}")]
    Decode(#[from] DecodeError),
    #[error("{path} is not a valid state document: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot serialize state: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("version conflict on {0}")]
    Conflict(String),
    #[error("credential missing or rejected by the store")]
    Unauthorized,
    #[error("write to {0} still conflicted after one retry")]
    WriteConflict(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("store returned {status} for {path}: {message}")]
    Status {
        status: u16,
        path: String,
        message: String,
    },
}

impl StoreError {
    /// The caller should prompt for a new credential.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, StoreError::Unauthorized)
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Network(e.to_string())
    }
}
