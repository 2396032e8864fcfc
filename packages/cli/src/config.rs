use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "contentdesk.config.json";

/// Contentdesk configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Address the API listens on
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Store snapshot file, relative to the config directory
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// How long status messages stay visible
    #[serde(default = "default_status_ttl_ms")]
    pub status_ttl_ms: u64,
}

fn default_bind() -> String {
    "127.0.0.1:3030".to_string()
}

fn default_store_path() -> String {
    "contentdesk.store.json".to_string()
}

fn default_status_ttl_ms() -> u64 {
    3000
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Get absolute path to the store file
    pub fn get_store_path(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.store_path)
    }

    pub fn status_ttl(&self) -> Duration {
        Duration::from_millis(self.status_ttl_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            store_path: default_store_path(),
            status_ttl_ms: default_status_ttl_ms(),
        }
    }
}
