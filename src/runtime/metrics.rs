use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestStats {
    pub calls: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub failures: u64,
    pub total_ms: u64,
    pub max_ms: u64,
}

impl RequestStats {
    pub fn average_ms(&self) -> u64 {
        let fetched = self.cache_misses;
        if fetched == 0 {
            0
        } else {
            self.total_ms / fetched
        }
    }
}

/// Lightweight per-key call-duration metrics for cached requests.
pub struct RequestMetrics {
    slow_threshold: Duration,
    stats: Mutex<BTreeMap<String, RequestStats>>,
}

impl RequestMetrics {
    pub fn new(slow_threshold: Duration) -> Self {
        Self {
            slow_threshold,
            stats: Mutex::new(BTreeMap::new()),
        }
    }

    fn update<F>(&self, key: &str, update: F)
    where
        F: FnOnce(&mut RequestStats),
    {
        if let Ok(mut map) = self.stats.lock() {
            let entry = map.entry(key.to_string()).or_default();
            entry.calls = entry.calls.saturating_add(1);
            update(entry);
        }
    }

    pub fn record_hit(&self, key: &str) {
        self.update(key, |entry| {
            entry.cache_hits = entry.cache_hits.saturating_add(1);
        });
    }

    pub fn record_fetch(&self, key: &str, duration: Duration, success: bool) {
        let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        if duration > self.slow_threshold {
            tracing::warn!(key, duration_ms = ms, "slow request");
        } else {
            tracing::debug!(key, duration_ms = ms, success, "request finished");
        }
        self.update(key, |entry| {
            entry.cache_misses = entry.cache_misses.saturating_add(1);
            entry.total_ms = entry.total_ms.saturating_add(ms);
            entry.max_ms = entry.max_ms.max(ms);
            if !success {
                entry.failures = entry.failures.saturating_add(1);
            }
        });
    }

    pub fn get(&self, key: &str) -> Option<RequestStats> {
        self.stats.lock().ok()?.get(key).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, RequestStats> {
        self.stats
            .lock()
            .map_or_else(|_| BTreeMap::new(), |map| map.clone())
    }

    pub fn snapshot_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or_else(|_| {
            serde_json::json!({
                "status": "error",
                "message": "failed to serialize request metrics"
            })
        })
    }

    pub fn reset(&self) {
        if let Ok(mut map) = self.stats.lock() {
            map.clear();
        }
    }
}
