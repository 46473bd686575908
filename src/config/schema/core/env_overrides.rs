use super::Config;
use crate::config::AutosaveMode;
use std::path::PathBuf;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(mode) = std::env::var("MEMORIA_AUTOSAVE_MODE")
            && let Ok(mode) = mode.parse::<AutosaveMode>()
        {
            self.autosave.mode = mode;
        }

        if let Ok(ms) = std::env::var("MEMORIA_DEBOUNCE_MS")
            && let Ok(ms) = ms.parse::<u64>()
            && ms > 0
        {
            self.autosave.debounce_ms = ms;
        }

        if let Ok(secs) = std::env::var("MEMORIA_INTERVAL_SECS")
            && let Ok(secs) = secs.parse::<u64>()
            && secs > 0
        {
            self.autosave.interval_secs = secs;
        }

        if let Ok(attempts) = std::env::var("MEMORIA_MAX_ATTEMPTS")
            && let Ok(attempts) = attempts.parse::<u32>()
            && attempts > 0
        {
            self.retry.max_attempts = attempts;
        }

        if let Ok(url) = std::env::var("MEMORIA_PROBE_URL")
            && !url.is_empty()
        {
            self.network.probe_url = Some(url);
        }

        if let Ok(dir) = std::env::var("MEMORIA_STORAGE_DIR")
            && !dir.is_empty()
        {
            self.cache.storage_dir = Some(PathBuf::from(dir));
        }

        if let Ok(level) = std::env::var("MEMORIA_LOG_LEVEL")
            && !level.is_empty()
        {
            self.observability.log_level = level;
        }
    }
}
