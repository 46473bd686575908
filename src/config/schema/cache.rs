use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry bound; the oldest insert is evicted first (default: 100)
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
    /// Directory for file-backed durable storage. In-memory only when unset.
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Cached requests slower than this are logged as warnings
    #[serde(default = "default_slow_request_ms")]
    pub slow_request_ms: u64,
}

fn default_max_entries() -> usize {
    100
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_key_prefix() -> String {
    "memoria:".into()
}

fn default_slow_request_ms() -> u64 {
    1_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            default_ttl_secs: default_ttl_secs(),
            storage_dir: None,
            key_prefix: default_key_prefix(),
            slow_request_ms: default_slow_request_ms(),
        }
    }
}
