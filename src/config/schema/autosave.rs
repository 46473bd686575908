use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// When the scheduler evaluates whether a save is due.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AutosaveMode {
    /// Poll on a fixed wall-clock interval.
    Interval,
    /// Save once edits go quiet for the debounce window.
    #[default]
    Debounce,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutosaveConfig {
    #[serde(default)]
    pub mode: AutosaveMode,
    /// Interval-mode tick period (default: 30)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Debounce-mode quiet window (default: 3000)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Snapshot cache key the latest draft is mirrored under
    #[serde(default = "default_entity_key")]
    pub entity_key: String,
    /// How long a mirrored draft stays recoverable (default: one week)
    #[serde(default = "default_fallback_ttl_secs")]
    pub fallback_ttl_secs: u64,
}

fn default_interval_secs() -> u64 {
    30
}

fn default_debounce_ms() -> u64 {
    3_000
}

fn default_entity_key() -> String {
    "draft".into()
}

fn default_fallback_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            mode: AutosaveMode::default(),
            interval_secs: default_interval_secs(),
            debounce_ms: default_debounce_ms(),
            entity_key: default_entity_key(),
            fallback_ttl_secs: default_fallback_ttl_secs(),
        }
    }
}
