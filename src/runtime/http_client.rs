//! Shared `reqwest` client for the save endpoint and the latency check.

use reqwest::Client;
use std::time::Duration;

const USER_AGENT: &str = concat!("memoria/", env!("CARGO_PKG_VERSION"));

/// Client for save round-trips. A memorial body can be large, so the
/// request budget is generous while connecting stays short.
pub fn build_client() -> Client {
    build_client_with_timeout(Duration::from_secs(30))
}

/// Client bounded by `timeout`. The connect phase never outlasts the request.
///
/// Falls back to a default client if TLS setup fails, so saving degrades to
/// per-request errors instead of refusing to start.
pub fn build_client_with_timeout(timeout: Duration) -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5).min(timeout))
        .pool_max_idle_per_host(2)
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!("Falling back to a default HTTP client: {err}");
            Client::new()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_names_the_crate() {
        assert!(USER_AGENT.starts_with("memoria/"));
    }

    #[tokio::test]
    async fn short_timeouts_still_build_a_client() {
        // Only checks construction; no request leaves the process.
        let _client = build_client_with_timeout(Duration::from_millis(250));
    }
}
