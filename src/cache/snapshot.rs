use super::storage::{DurableStorage, FileStorage};
use crate::config::CacheConfig;
use crate::error::{Result, StorageError};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// A cached value plus the wall-clock data needed to expire it after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    /// Unix milliseconds at insertion
    pub timestamp: i64,
    /// Time-to-live in milliseconds
    pub ttl: u64,
}

impl CacheEntry {
    fn new(value: serde_json::Value, ttl: Duration) -> Self {
        Self {
            value,
            timestamp: now_ms(),
            ttl: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn is_expired(&self) -> bool {
        let age = now_ms().saturating_sub(self.timestamp);
        u64::try_from(age).is_ok_and(|age| age >= self.ttl)
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Default)]
struct Entries {
    map: HashMap<String, CacheEntry>,
    /// Insertion order, oldest first
    order: VecDeque<String>,
}

impl Entries {
    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.map.remove(key)?;
        self.order.retain(|k| k != key);
        Some(entry)
    }

    /// Insert `entry`, returning the key evicted to stay within `max`.
    fn insert(&mut self, key: &str, entry: CacheEntry, max: usize) -> Option<String> {
        let mut evicted = None;
        if self.remove(key).is_none() && self.map.len() >= max {
            if let Some(oldest) = self.order.pop_front() {
                self.map.remove(&oldest);
                evicted = Some(oldest);
            }
        }
        self.map.insert(key.to_string(), entry);
        self.order.push_back(key.to_string());
        evicted
    }
}

/// Bounded TTL cache mirrored to durable storage.
///
/// Memory is the source of truth while the process lives; durable storage
/// is written through on every change and read through on a memory miss, so
/// a draft written before a crash is still there after the restart.
pub struct SnapshotCache {
    entries: Mutex<Entries>,
    max_entries: usize,
    default_ttl: Duration,
    key_prefix: String,
    storage: Option<Arc<dyn DurableStorage>>,
    durable: AtomicBool,
}

impl SnapshotCache {
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            max_entries: max_entries.max(1),
            default_ttl,
            key_prefix: "memoria:".into(),
            storage: None,
            durable: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            config.max_entries,
            Duration::from_secs(config.default_ttl_secs),
        )
        .with_key_prefix(config.key_prefix.clone())
    }

    /// [`from_config`](Self::from_config) plus a [`FileStorage`] mirror when
    /// `storage_dir` is set.
    pub fn open(config: &CacheConfig) -> Result<Self> {
        let cache = Self::from_config(config);
        match &config.storage_dir {
            Some(dir) => Ok(cache.with_storage(Arc::new(FileStorage::new(dir.clone())?))),
            None => Ok(cache),
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn DurableStorage>) -> Self {
        self.storage = Some(storage);
        self.durable.store(true, Ordering::Relaxed);
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// `false` once durable storage failed hard and the cache went memory-only.
    pub fn is_durable(&self) -> bool {
        self.durable.load(Ordering::Relaxed)
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{key}", self.key_prefix)
    }

    fn durable_storage(&self) -> Option<&Arc<dyn DurableStorage>> {
        if self.is_durable() {
            self.storage.as_ref()
        } else {
            None
        }
    }

    fn storage_failed(&self, op: &str, key: &str, err: &StorageError) {
        match err {
            StorageError::QuotaExceeded { .. } | StorageError::Unavailable(_) => {
                self.durable.store(false, Ordering::Relaxed);
                tracing::warn!(op, key, "durable storage failed, caching in memory only: {err}");
            }
            _ => tracing::warn!(op, key, "durable storage error: {err}"),
        }
    }

    fn write_through(&self, key: &str, entry: &CacheEntry) {
        let Some(storage) = self.durable_storage() else {
            return;
        };
        let result = serde_json::to_string(entry)
            .map_err(|e| StorageError::Encoding(e.to_string()))
            .and_then(|raw| storage.set_item(&self.storage_key(key), &raw));
        if let Err(err) = result {
            self.storage_failed("set", key, &err);
        }
    }

    fn remove_durable(&self, key: &str) {
        let Some(storage) = self.durable_storage() else {
            return;
        };
        if let Err(err) = storage.remove_item(&self.storage_key(key)) {
            self.storage_failed("remove", key, &err);
        }
    }

    fn read_durable(&self, key: &str) -> Option<CacheEntry> {
        let storage = self.durable_storage()?;
        let raw = match storage.get_item(&self.storage_key(key)) {
            Ok(raw) => raw?,
            Err(err) => {
                self.storage_failed("get", key, &err);
                return None;
            }
        };
        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(key, "discarding unreadable durable entry: {err}");
                self.remove_durable(key);
                None
            }
        }
    }

    /// Store `value` under `key` for `ttl`.
    ///
    /// A value that cannot be serialized is a caller bug and is returned as
    /// an error; durable storage failures are only logged.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(serde_json::to_value(value)?, ttl);
        let evicted = self.lock().insert(key, entry.clone(), self.max_entries);
        if let Some(evicted) = evicted {
            tracing::debug!(key = evicted.as_str(), "evicted oldest cache entry");
            self.remove_durable(&evicted);
        }
        self.write_through(key, &entry);
        Ok(())
    }

    pub fn set_default<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.set(key, value, self.default_ttl)
    }

    /// Raw JSON for `key` if present and fresh. Expired entries are deleted.
    pub fn get_value(&self, key: &str) -> Option<serde_json::Value> {
        let cached = self.lock().map.get(key).cloned();
        let entry = match cached {
            Some(entry) => entry,
            None => {
                let entry = self.read_durable(key)?;
                if !entry.is_expired() {
                    let evicted = self.lock().insert(key, entry.clone(), self.max_entries);
                    if let Some(evicted) = evicted {
                        self.remove_durable(&evicted);
                    }
                }
                entry
            }
        };

        if entry.is_expired() {
            self.remove(key);
            return None;
        }
        Some(entry.value)
    }

    /// Typed lookup. A stored value of a different shape reads as a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(err) => {
                tracing::warn!(key, "cached value has unexpected shape: {err}");
                None
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get_value(key).is_some()
    }

    pub fn remove(&self, key: &str) {
        self.lock().remove(key);
        self.remove_durable(key);
    }

    /// Drop every entry held in memory, and its durable mirror.
    pub fn clear(&self) {
        let keys: Vec<String> = {
            let mut entries = self.lock();
            entries.map.clear();
            entries.order.drain(..).collect()
        };
        for key in keys {
            self.remove_durable(&key);
        }
    }

    /// Sweep expired entries; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let expired: Vec<String> = {
            let mut entries = self.lock();
            let keys: Vec<String> = entries
                .map
                .iter()
                .filter(|(_, e)| e.is_expired())
                .map(|(k, _)| k.clone())
                .collect();
            for key in &keys {
                entries.remove(key);
            }
            keys
        };
        for key in &expired {
            self.remove_durable(key);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
