use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Where the documents live. Loaded from the `config.json` the CLI manages;
/// unknown keys (such as the persisted token) are ignored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `owner/name` of the repository holding the documents.
    #[serde(default)]
    pub repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_state_path")]
    pub state_path: String,
    #[serde(default = "default_logs_dir")]
    pub logs_dir: String,
    #[serde(default = "default_index_path")]
    pub index_path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_state_path() -> String {
    "schedule.json".to_string()
}

fn default_logs_dir() -> String {
    "logs".to_string()
}

fn default_index_path() -> String {
    "logs/README.md".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            repo: String::new(),
            branch: None,
            api_base: default_api_base(),
            state_path: default_state_path(),
            logs_dir: default_logs_dir(),
            index_path: default_index_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl StoreConfig {
    pub fn for_repo(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            ..Self::default()
        }
    }

    /// Parse from a config JSON object. Missing keys take their defaults.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    /// Path of the log document for a `YYYY-MM` period.
    pub fn log_path(&self, period: &str) -> String {
        format!("{}/{period}.md", self.logs_dir.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_keys() {
        let cfg = StoreConfig::from_json(&serde_json::json!({
            "repo": "aztkp/media-log",
            "token": "ignored here"
        }))
        .unwrap();
        assert_eq!(cfg.repo, "aztkp/media-log");
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
        assert_eq!(cfg.state_path, "schedule.json");
        assert_eq!(cfg.index_path, "logs/README.md");
        assert_eq!(cfg.timeout_secs, 30);
        assert!(cfg.branch.is_none());
    }

    #[test]
    fn log_path_joins_dir() {
        let mut cfg = StoreConfig::for_repo("a/b");
        assert_eq!(cfg.log_path("2024-02"), "logs/2024-02.md");
        cfg.logs_dir = "radio/".into();
        assert_eq!(cfg.log_path("2024-02"), "radio/2024-02.md");
    }
}
