//! Configuration parsing for the depthvault system.
//!
//! The runner reads its settings from a single JSON config file. The
//! top-level structure carries process metadata, the `store` block that
//! drives the persistence pipeline, and an optional list of replay files.
//!
//! # Example config
//!
//! ```json
//! {
//!   "name": "depthvault",
//!   "log_path": "/tmp/log",
//!   "store": {
//!     "backend": "mongo",
//!     "address": "127.0.0.1:27017",
//!     "database": "OrderBooks",
//!     "collection": "orderbooks",
//!     "queue_capacity": 1024,
//!     "max_retries": 3,
//!     "retry_delay_ms": 1000
//!   },
//!   "replay": ["/data/books-2024-01-01.jsonl"]
//! }
//! ```
//!
//! Every field except `store.address` has a default, so `{"store": {"address": "..."}}`
//! is a complete config.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DvError;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Instance name, used in log lines.
    #[serde(default = "default_name")]
    pub name: String,

    /// Directory for rolling log files (overridden by `--log-dir`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<String>,

    /// Persistence pipeline settings.
    pub store: StoreConfig,

    /// JSON-lines snapshot files fed through the pipeline at startup.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replay: Vec<PathBuf>,
}

/// Which backend the store client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Mongo,
    Memory,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mongo => write!(f, "mongo"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = DvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(Self::Mongo),
            "memory" => Ok(Self::Memory),
            other => Err(DvError::Config(format!("unknown store backend: {other}"))),
        }
    }
}

/// Persistence pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// Backend address as `host:port`.
    pub address: String,

    /// Logical database name (default: `"OrderBooks"`).
    #[serde(default = "default_database")]
    pub database: String,

    /// Collection receiving snapshot documents (default: `"orderbooks"`).
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Maximum buffered write requests before producers block (default: 1024).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Retries after the first failed write (default: 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay before each retry in milliseconds (default: 1000).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Log a statistics summary every N persisted documents (default: 1000).
    #[serde(default = "default_stats_interval")]
    pub stats_interval: u64,

    /// CPU core for the writer thread.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_affinity: Option<i32>,
}

impl StoreConfig {
    /// Config with every default applied for the given address.
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            backend: BackendKind::default(),
            address: address.into(),
            database: default_database(),
            collection: default_collection(),
            queue_capacity: default_queue_capacity(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            stats_interval: default_stats_interval(),
            cpu_affinity: None,
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// `database.collection`, the namespace string used in logs.
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.database, self.collection)
    }
}

fn default_name() -> String {
    "depthvault".to_string()
}

fn default_database() -> String {
    "OrderBooks".to_string()
}

fn default_collection() -> String {
    "orderbooks".to_string()
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_stats_interval() -> u64 {
    1000
}

impl AppConfig {
    /// Reject configs the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), DvError> {
        let store = &self.store;
        if store.backend == BackendKind::Mongo && store.address.trim().is_empty() {
            return Err(DvError::Config("store.address must not be empty".into()));
        }
        if store.database.is_empty() || store.collection.is_empty() {
            return Err(DvError::Config("store.database and store.collection must not be empty".into()));
        }
        if store.queue_capacity == 0 {
            return Err(DvError::Config("store.queue_capacity must be at least 1".into()));
        }
        Ok(())
    }
}

/// Load, parse and validate a JSON config file.
pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Write the config back to disk as pretty-printed JSON.
pub fn save_config(config: &AppConfig, path: &Path) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Resolve the default config path: `config.json` in the working directory.
pub fn default_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("/"))
        .join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg: AppConfig = serde_json::from_str(r#"{"store": {"address": "127.0.0.1:27017"}}"#).unwrap();
        assert_eq!(cfg.name, "depthvault");
        assert_eq!(cfg.store.backend, BackendKind::Mongo);
        assert_eq!(cfg.store.database, "OrderBooks");
        assert_eq!(cfg.store.collection, "orderbooks");
        assert_eq!(cfg.store.queue_capacity, 1024);
        assert_eq!(cfg.store.max_retries, 3);
        assert_eq!(cfg.store.retry_delay(), Duration::from_secs(1));
        assert_eq!(cfg.store.namespace(), "OrderBooks.orderbooks");
        assert!(cfg.replay.is_empty());
        cfg.validate().unwrap();
    }

    #[test]
    fn zero_capacity_rejected() {
        let mut cfg: AppConfig = serde_json::from_str(r#"{"store": {"address": "db:27017"}}"#).unwrap();
        cfg.store.queue_capacity = 0;
        assert!(matches!(cfg.validate(), Err(DvError::Config(_))));
    }

    #[test]
    fn memory_backend_needs_no_address() {
        let cfg: AppConfig = serde_json::from_str(r#"{"store": {"backend": "memory", "address": ""}}"#).unwrap();
        assert_eq!(cfg.store.backend, BackendKind::Memory);
        cfg.validate().unwrap();
    }

    #[test]
    fn backend_from_str() {
        assert_eq!("MongoDB".parse::<BackendKind>().unwrap(), BackendKind::Mongo);
        assert_eq!("memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert!("redis".parse::<BackendKind>().is_err());
    }

    #[test]
    fn save_then_load_preserves_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut cfg = AppConfig {
            name: "vault-a".into(),
            log_path: None,
            store: StoreConfig::with_address("10.0.0.5:27017"),
            replay: vec![PathBuf::from("/data/a.jsonl")],
        };
        cfg.store.cpu_affinity = Some(3);

        save_config(&cfg, &path).unwrap();
        assert_eq!(load_config(&path).unwrap(), cfg);
    }
}
