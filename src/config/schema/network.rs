use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Cheap side-effect-free endpoint used for latency probes.
    /// Probing is disabled when unset.
    #[serde(default)]
    pub probe_url: Option<String>,
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Round-trip time above which the connection counts as slow (default: 2000)
    #[serde(default = "default_slow_threshold_ms")]
    pub slow_threshold_ms: u64,
    /// Consecutive failed probes before the monitor reports offline (default: 2)
    #[serde(default = "default_offline_after_failures")]
    pub offline_after_failures: u32,
}

fn default_probe_interval_secs() -> u64 {
    30
}

fn default_probe_timeout_ms() -> u64 {
    5_000
}

fn default_slow_threshold_ms() -> u64 {
    2_000
}

fn default_offline_after_failures() -> u32 {
    2
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            probe_url: None,
            probe_interval_secs: default_probe_interval_secs(),
            probe_timeout_ms: default_probe_timeout_ms(),
            slow_threshold_ms: default_slow_threshold_ms(),
            offline_after_failures: default_offline_after_failures(),
        }
    }
}
