use super::super::{
    AutosaveConfig, CacheConfig, HistoryConfig, NetworkConfig, ObservabilityConfig, RetryConfig,
};
use crate::error::ConfigError;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub autosave: AutosaveConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());

        Self {
            config_path: home.join(".memoria").join("config.toml"),
            autosave: AutosaveConfig::default(),
            retry: RetryConfig::default(),
            history: HistoryConfig::default(),
            network: NetworkConfig::default(),
            cache: CacheConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(ConfigError::Validation(format!(
                "retry.max_delay_ms ({}) is below retry.base_delay_ms ({})",
                self.retry.max_delay_ms, self.retry.base_delay_ms
            )));
        }
        if !self.retry.jitter_ratio.is_finite() || self.retry.jitter_ratio < 0.0 {
            return Err(ConfigError::Validation(
                "retry.jitter_ratio must be a non-negative number".into(),
            ));
        }
        if self.autosave.debounce_ms == 0 || self.autosave.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "autosave.debounce_ms and autosave.interval_secs must be positive".into(),
            ));
        }
        if self.autosave.entity_key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "autosave.entity_key must not be empty".into(),
            ));
        }
        if self.history.limit == 0 {
            return Err(ConfigError::Validation(
                "history.limit must be at least 1".into(),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(ConfigError::Validation(
                "cache.max_entries must be at least 1".into(),
            ));
        }
        if self.network.probe_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "network.probe_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}
