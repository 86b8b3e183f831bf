use std::path::PathBuf;

use tracing::warn;

use medialog_store::CredentialStore;

use crate::cmd_config::{read_config, write_config, TOKEN_KEY};

pub const TOKEN_ENV: &str = "MEDIALOG_TOKEN";

/// Non-empty `MEDIALOG_TOKEN`, if set.
pub fn env_token() -> Option<String> {
    std::env::var(TOKEN_ENV)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Token from `MEDIALOG_TOKEN`, else the `token` key of the config file.
/// Discarding removes the key from the file so the next run asks for a new
/// one. An environment token is never written anywhere, so discarding it
/// leaves the file alone.
pub struct FileCredential {
    path: PathBuf,
    env_override: Option<String>,
}

impl FileCredential {
    pub fn new(path: PathBuf) -> Self {
        Self::with_override(path, env_token())
    }

    pub fn with_override(path: PathBuf, env_override: Option<String>) -> Self {
        Self { path, env_override }
    }

    fn stored_token(&self) -> Option<String> {
        let config = read_config(&self.path).ok()?;
        config
            .get(TOKEN_KEY)
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

impl CredentialStore for FileCredential {
    fn token(&self) -> Option<String> {
        self.env_override.clone().or_else(|| self.stored_token())
    }

    fn discard(&self) {
        if self.env_override.is_some() {
            warn!("{TOKEN_ENV} was rejected; the stored token is kept");
            return;
        }
        let mut config = match read_config(&self.path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read config to discard token");
                return;
            }
        };
        if config.remove(TOKEN_KEY).is_none() {
            return;
        }
        if let Err(e) = write_config(&self.path, &config) {
            warn!(path = %self.path.display(), error = %e, "cannot discard stored token");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_token(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("config.json");
        let mut map = serde_json::Map::new();
        map.insert("repo".into(), "a/b".into());
        map.insert(TOKEN_KEY.into(), "ghp_abc".into());
        write_config(&path, &map).unwrap();
        path
    }

    #[test]
    fn discard_removes_token_and_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_with_token(&dir);

        let cred = FileCredential::with_override(path.clone(), None);
        assert_eq!(cred.token().as_deref(), Some("ghp_abc"));
        cred.discard();

        let after = read_config(&path).unwrap();
        assert!(after.get(TOKEN_KEY).is_none());
        assert_eq!(after["repo"], "a/b");
        assert_eq!(cred.token(), None);
    }

    #[test]
    fn rejected_env_token_keeps_stored_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_with_token(&dir);

        let cred = FileCredential::with_override(path.clone(), Some("ghp_env".into()));
        assert_eq!(cred.token().as_deref(), Some("ghp_env"));
        cred.discard();

        let after = read_config(&path).unwrap();
        assert_eq!(after[TOKEN_KEY], "ghp_abc");
        let without_env = FileCredential::with_override(path, None);
        assert_eq!(without_env.token().as_deref(), Some("ghp_abc"));
    }

    #[test]
    fn missing_file_means_no_stored_token() {
        let dir = tempfile::tempdir().unwrap();
        let cred = FileCredential::with_override(dir.path().join("absent.json"), None);
        assert_eq!(cred.token(), None);
        cred.discard();
        assert!(!dir.path().join("absent.json").exists());
    }
}
