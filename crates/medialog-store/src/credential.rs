use std::sync::Mutex;

/// Holder of the opaque bearer token. The collaborator supplies and persists
/// it; the store reads it per call and discards it when the store rejects it.
pub trait CredentialStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn discard(&self);
}

/// Process-local credential, e.g. taken from an environment variable.
#[derive(Debug, Default)]
pub struct StaticCredential {
    token: Mutex<Option<String>>,
}

impl StaticCredential {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Mutex::new(token.filter(|t| !t.trim().is_empty())),
        }
    }
}

impl CredentialStore for StaticCredential {
    fn token(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn discard(&self) {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_token_counts_as_missing() {
        assert_eq!(StaticCredential::new(Some("  ".into())).token(), None);
    }

    #[test]
    fn discard_clears() {
        let cred = StaticCredential::new(Some("ghp_abc".into()));
        assert_eq!(cred.token().as_deref(), Some("ghp_abc"));
        cred.discard();
        assert_eq!(cred.token(), None);
    }
}
