use super::SnapshotCache;
use crate::error::NetworkError;
use crate::runtime::metrics::RequestMetrics;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const REQUEST_KEY_PREFIX: &str = "request:";

/// Short-TTL read cache for idempotent requests, with call-duration metrics.
pub struct CachedRequests {
    cache: Arc<SnapshotCache>,
    metrics: Arc<RequestMetrics>,
    ttl: Duration,
}

impl CachedRequests {
    pub fn new(cache: Arc<SnapshotCache>, metrics: Arc<RequestMetrics>, ttl: Duration) -> Self {
        Self {
            cache,
            metrics,
            ttl,
        }
    }

    pub fn metrics(&self) -> &RequestMetrics {
        &self.metrics
    }

    fn cache_key(key: &str) -> String {
        format!("{REQUEST_KEY_PREFIX}{key}")
    }

    /// Return the cached response for `key`, or run `fetch` and cache its
    /// success for the configured TTL. Failures are never cached.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: &str, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_fetch_with_ttl(key, self.ttl, fetch).await
    }

    pub async fn get_or_fetch_with_ttl<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let cache_key = Self::cache_key(key);
        if let Some(hit) = self.cache.get::<T>(&cache_key) {
            self.metrics.record_hit(key);
            return Ok(hit);
        }

        let started = Instant::now();
        let result = fetch().await;
        self.metrics
            .record_fetch(key, started.elapsed(), result.is_ok());

        if let Ok(value) = &result
            && let Err(err) = self.cache.set(&cache_key, value, ttl)
        {
            tracing::warn!(key, "response not cacheable: {err}");
        }
        result
    }

    /// GET `url` and decode JSON, going through the cache.
    pub async fn get_json<T>(&self, client: &reqwest::Client, url: &str) -> Result<T, NetworkError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.get_or_fetch(url, || async move {
            let response = client
                .get(url)
                .send()
                .await
                .map_err(|e| NetworkError::Request(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(NetworkError::Status(status.as_u16()));
            }
            response
                .json::<T>()
                .await
                .map_err(|e| NetworkError::Decode(e.to_string()))
        })
        .await
    }

    /// Forget the cached response for `key`, e.g. after a write to it.
    pub fn invalidate(&self, key: &str) {
        self.cache.remove(&Self::cache_key(key));
    }
}
