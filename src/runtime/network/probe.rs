use crate::error::NetworkError;
use crate::runtime::http_client::build_client_with_timeout;
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::Instant;

/// Measures one round trip to a cheap endpoint.
pub trait LatencyProbe: Send + Sync {
    fn probe(&self) -> Pin<Box<dyn Future<Output = Result<Duration, NetworkError>> + Send + '_>>;

    fn name(&self) -> &str;
}

/// `HEAD` request against a side-effect-free URL. Any HTTP response counts
/// as reachable; only transport failures and timeouts are errors.
pub struct HttpProbe {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: build_client_with_timeout(timeout),
            url: url.into(),
            timeout,
        }
    }

    async fn round_trip(&self) -> Result<Duration, NetworkError> {
        let started = Instant::now();
        match self.client.head(&self.url).send().await {
            Ok(_) => Ok(started.elapsed()),
            Err(e) if e.is_timeout() => Err(NetworkError::Timeout(
                u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            )),
            Err(e) => Err(NetworkError::Probe(e.to_string())),
        }
    }
}

impl LatencyProbe for HttpProbe {
    fn probe(&self) -> Pin<Box<dyn Future<Output = Result<Duration, NetworkError>> + Send + '_>> {
        Box::pin(self.round_trip())
    }

    fn name(&self) -> &str {
        "http"
    }
}
