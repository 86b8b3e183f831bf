use clap::Subcommand;
use std::io::Write;
use std::path::{Path, PathBuf};

use medialog_store::StoreConfig;

/// Keys whose values are always stored as strings, even when they look numeric.
const STRING_KEYS: &[&str] = &[
    "repo",
    "branch",
    "api_base",
    "state_path",
    "logs_dir",
    "index_path",
    "token",
];

pub const TOKEN_KEY: &str = "token";

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Set a config value
    Set {
        /// Config key (repo, branch, api_base, state_path, logs_dir, index_path, timeout_secs, token)
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Remove a config value
    Unset {
        /// Config key
        key: String,
    },
}

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, config_path: &Path) -> anyhow::Result<()> {
    match cmd {
        ConfigCmd::Set { key, value } => set(config_path, &key, &value),
        ConfigCmd::Get { key } => get(config_path, &key),
        ConfigCmd::List => list(config_path),
        ConfigCmd::Unset { key } => unset(config_path, &key),
    }
}

// ── Config file ──

/// `{config_dir}/medialog/config.json`
pub fn default_path() -> anyhow::Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("cannot determine the user config directory; pass --config"))?;
    Ok(dir.join("medialog").join("config.json"))
}

/// Read the config map. Returns an empty map if the file doesn't exist.
pub fn read_config(path: &Path) -> anyhow::Result<serde_json::Map<String, serde_json::Value>> {
    if !path.exists() {
        return Ok(serde_json::Map::new());
    }
    let content = std::fs::read_to_string(path)?;
    let val: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("{} is not valid JSON: {e}", path.display()))?;
    match val {
        serde_json::Value::Object(map) => Ok(map),
        _ => Ok(serde_json::Map::new()),
    }
}

pub fn write_config(
    path: &Path,
    config: &serde_json::Map<String, serde_json::Value>,
) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&config)?;
    write_atomic(path, json.as_bytes())
}

/// Write via a temp file in the same directory, then rename over `path`.
fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    std::fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

/// Typed store settings from the config file. Missing keys take defaults.
pub fn load_store_config(path: &Path) -> anyhow::Result<StoreConfig> {
    let map = read_config(path)?;
    let config = StoreConfig::from_json(&serde_json::Value::Object(map))
        .map_err(|e| anyhow::anyhow!("invalid config in {}: {e}", path.display()))?;
    if config.repo.trim().is_empty() {
        anyhow::bail!("No repository configured. Run `medialog config set repo <owner/name>` first.");
    }
    Ok(config)
}

/// Parse a string value into an appropriate JSON value (bool/number/string).
fn parse_value(key: &str, s: &str) -> serde_json::Value {
    if STRING_KEYS.contains(&key) {
        return serde_json::Value::String(s.to_string());
    }
    match s {
        "true" => serde_json::Value::Bool(true),
        "false" => serde_json::Value::Bool(false),
        _ => {
            if let Ok(n) = s.parse::<i64>() {
                serde_json::Value::Number(n.into())
            } else if let Ok(f) = s.parse::<f64>() {
                serde_json::json!(f)
            } else {
                serde_json::Value::String(s.to_string())
            }
        }
    }
}

fn display_value(key: &str, value: &serde_json::Value) -> String {
    if key == TOKEN_KEY {
        return "(hidden)".to_string();
    }
    value.to_string()
}

// ── Command Implementations ──

/// `medialog config set <key> <value>`
pub fn set(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let mut config = read_config(path)?;
    config.insert(key.to_string(), parse_value(key, value));
    StoreConfig::from_json(&serde_json::Value::Object(config.clone()))
        .map_err(|e| anyhow::anyhow!("invalid value for {key}: {e}"))?;
    write_config(path, &config)?;
    println!("{key} = {}", display_value(key, &parse_value(key, value)));
    Ok(())
}

/// `medialog config get <key>`
pub fn get(path: &Path, key: &str) -> anyhow::Result<()> {
    let config = read_config(path)?;
    match config.get(key) {
        Some(val) => println!("{}", display_value(key, val)),
        None => println!("(not set)"),
    }
    Ok(())
}

/// `medialog config list`
pub fn list(path: &Path) -> anyhow::Result<()> {
    let config = read_config(path)?;
    if config.is_empty() {
        println!("(no config set)");
    } else {
        for (k, v) in &config {
            println!("{k} = {}", display_value(k, v));
        }
    }
    Ok(())
}

/// `medialog config unset <key>`
pub fn unset(path: &Path, key: &str) -> anyhow::Result<()> {
    let mut config = read_config(path)?;
    if config.remove(key).is_none() {
        println!("(not set)");
        return Ok(());
    }
    write_config(path, &config)?;
    println!("{key} removed");
    Ok(())
}
