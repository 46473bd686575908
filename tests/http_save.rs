use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use memoria::error::{AutosaveError, SaveError};
use memoria::persistence::{
    AutosaveOptions, AutosaveScheduler, HttpSaver, RetryPolicy, SaveOperation, SaveOutcome,
    SaveStatus,
};

#[derive(Debug, Clone, Serialize)]
struct Obituary {
    name: String,
    born: String,
    died: String,
}

fn obituary() -> Obituary {
    Obituary {
        name: "Grace Hopper".into(),
        born: "1906-12-09".into(),
        died: "1992-01-01".into(),
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(50)).without_jitter()
}

fn scheduler(saver: HttpSaver) -> AutosaveScheduler<Obituary> {
    let options = AutosaveOptions::debounce(Duration::from_millis(50)).with_retry(fast_retry());
    AutosaveScheduler::<Obituary>::builder(options, Arc::new(saver)).spawn()
}

#[tokio::test]
async fn successful_put_returns_server_ack() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/obituaries/7"))
        .and(header("authorization", "Bearer session-token"))
        .and(header(
            "user-agent",
            concat!("memoria/", env!("CARGO_PKG_VERSION")),
        ))
        .and(body_json(json!({
            "name": "Grace Hopper",
            "born": "1906-12-09",
            "died": "1992-01-01",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "revision": 4,
            "saved_at": "2026-03-01T12:00:00Z",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let saver = HttpSaver::new(format!("{}/api/obituaries/7", server.uri()))
        .with_bearer_token("session-token");
    let ack = saver.save(&obituary()).await.unwrap();

    assert_eq!(ack.revision, Some(4));
    assert!(ack.saved_at.is_some());
    server.verify().await;
}

#[tokio::test]
async fn empty_success_body_is_an_empty_ack() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let saver = HttpSaver::new(server.uri());
    let ack = saver.save(&obituary()).await.unwrap();
    assert_eq!(ack.revision, None);
}

#[tokio::test]
async fn validation_error_is_rejected_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(422).set_body_string("died precedes born"))
        .expect(1)
        .mount(&server)
        .await;

    let scheduler = scheduler(HttpSaver::new(server.uri()));
    let err = scheduler.save_now(obituary()).await.unwrap_err();

    match err {
        AutosaveError::Rejected(SaveError::Rejected { status, message }) => {
            assert_eq!(status, 422);
            assert_eq!(message, "died precedes born");
        }
        other => panic!("expected a rejection, got {other:?}"),
    }
    assert_eq!(scheduler.status(), SaveStatus::Error);
    server.verify().await;
}

#[tokio::test]
async fn server_errors_consume_the_whole_retry_budget() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let scheduler = scheduler(HttpSaver::new(server.uri()));
    let err = scheduler.save_now(obituary()).await.unwrap_err();

    assert!(matches!(
        err,
        AutosaveError::Exhausted {
            attempts: 3,
            source: SaveError::Server { status: 503, .. }
        }
    ));
    server.verify().await;
}

#[tokio::test]
async fn rate_limit_is_retried_until_accepted() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"revision": 2})))
        .expect(1)
        .mount(&server)
        .await;

    let scheduler = scheduler(HttpSaver::new(server.uri()));
    let outcome = scheduler.save_now(obituary()).await.unwrap();

    assert!(matches!(outcome, SaveOutcome::Saved(ack) if ack.revision == Some(2)));
    assert_eq!(scheduler.status(), SaveStatus::Saved);
    server.verify().await;
}

#[tokio::test]
async fn unreachable_endpoint_is_transient() {
    // Nothing listens on the discard port in the test environment.
    let saver = HttpSaver::new("http://127.0.0.1:9/save");
    let err = saver.save(&obituary()).await.unwrap_err();

    assert!(matches!(err, SaveError::Transient(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn post_method_is_honoured() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/drafts"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let saver =
        HttpSaver::new(format!("{}/drafts", server.uri())).with_method(reqwest::Method::POST);
    saver.save(&obituary()).await.unwrap();
    server.verify().await;
}
