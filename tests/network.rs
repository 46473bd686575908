use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use memoria::cache::{CachedRequests, SnapshotCache};
use memoria::config::NetworkConfig;
use memoria::error::NetworkError;
use memoria::runtime::RequestMetrics;
use memoria::runtime::http_client::build_client;
use memoria::runtime::network::{HttpProbe, LatencyProbe, NetworkMonitor};
use memoria::runtime::notify::{ChannelNotifier, Notifier};

#[tokio::test]
async fn http_probe_measures_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let probe = HttpProbe::new(format!("{}/ping", server.uri()), Duration::from_secs(2));
    let rtt = probe.probe().await.unwrap();

    assert!(rtt < Duration::from_secs(2));
    server.verify().await;
}

#[tokio::test]
async fn http_probe_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let probe = HttpProbe::new(server.uri(), Duration::from_millis(50));
    let err = probe.probe().await.unwrap_err();

    assert!(matches!(err, NetworkError::Timeout(50)));
}

#[tokio::test]
async fn slow_probe_marks_connection_slow_but_online() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(150)))
        .mount(&server)
        .await;

    let config = NetworkConfig {
        probe_url: Some(server.uri()),
        slow_threshold_ms: 100,
        ..NetworkConfig::default()
    };
    let channel = Arc::new(ChannelNotifier::new(8));
    let monitor = NetworkMonitor::from_config(&config, Arc::clone(&channel) as Arc<dyn Notifier>);

    monitor.probe_now().await.unwrap();
    let status = monitor.status();
    assert!(status.is_online);
    assert!(status.is_slow_connection);
    assert!(status.last_rtt_ms.unwrap() >= 150);
}

#[tokio::test]
async fn unreachable_probe_flips_offline_and_notifies() {
    let config = NetworkConfig {
        probe_url: Some("http://127.0.0.1:9/ping".into()),
        probe_timeout_ms: 500,
        offline_after_failures: 2,
        ..NetworkConfig::default()
    };
    let channel = Arc::new(ChannelNotifier::new(8));
    let mut notifications = channel.subscribe();
    let monitor = NetworkMonitor::from_config(&config, Arc::clone(&channel) as Arc<dyn Notifier>);

    assert!(monitor.probe_now().await.is_err());
    assert!(monitor.is_online());
    assert!(monitor.probe_now().await.is_err());
    assert!(!monitor.is_online());

    let lost = notifications.recv().await.unwrap();
    assert_eq!(lost.name(), "connection-lost");
    assert!(lost.kind.is_persistent());
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Template {
    id: u32,
    title: String,
}

#[tokio::test]
async fn cached_get_hits_the_network_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/templates/3"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 3, "title": "Classic"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let requests = CachedRequests::new(
        Arc::new(SnapshotCache::new(20, Duration::from_secs(60))),
        Arc::new(RequestMetrics::new(Duration::from_secs(1))),
        Duration::from_secs(30),
    );
    let client = build_client();
    let url = format!("{}/api/templates/3", server.uri());

    let first: Template = requests.get_json(&client, &url).await.unwrap();
    let second: Template = requests.get_json(&client, &url).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.title, "Classic");

    let stats = requests.metrics().get(&url).unwrap();
    assert_eq!(stats.calls, 2);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.cache_misses, 1);
    assert_eq!(stats.failures, 0);
    server.verify().await;
}

#[tokio::test]
async fn failed_get_is_not_cached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let requests = CachedRequests::new(
        Arc::new(SnapshotCache::new(20, Duration::from_secs(60))),
        Arc::new(RequestMetrics::new(Duration::from_secs(1))),
        Duration::from_secs(30),
    );
    let client = build_client();
    let url = server.uri();

    for _ in 0..2 {
        let err = requests
            .get_json::<Template>(&client, &url)
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::Status(500)));
    }
    assert_eq!(requests.metrics().get(&url).unwrap().failures, 2);
    server.verify().await;
}
