use std::time::Duration;

use llmeter_collector::{CollectorClient, CollectorConfig};
use llmeter_core::{SinkError, TelemetryRecord, TelemetrySink, TokenUsage};
use regex::Regex;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record() -> TelemetryRecord {
    TelemetryRecord::new("openai.chat.completions", Duration::from_millis(250))
        .with_model("gpt-4o-mini")
        .with_prompt("user: my password is hunter2")
        .with_response("noted")
        .with_usage(TokenUsage::reported(8, 1, 9))
}

fn client(uri: String) -> CollectorClient {
    CollectorClient::new(CollectorConfig::new(
        uri,
        SecretString::new("test-token".to_string()),
    ))
    .unwrap()
}

#[tokio::test]
async fn push_posts_json_with_auth_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/push"))
        .and(header("Authorization", "test-token"))
        .and(header("Content-Type", "application/json"))
        .and(body_partial_json(json!({
            "endpoint": "openai.chat.completions",
            "model": "gpt-4o-mini",
            "sourceLanguage": "rust",
            "requestDuration": 0.25,
            "promptTokens": 8,
            "totalTokens": 9
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    client(server.uri()).push(&record()).await.unwrap();
}

#[tokio::test]
async fn trailing_slash_in_base_url_is_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/push"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(format!("{}/", server.uri()));
    assert_eq!(client.push_url(), format!("{}/api/push", server.uri()));
    client.push(&record()).await.unwrap();
}

#[tokio::test]
async fn non_success_status_is_a_sink_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/push"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .mount(&server)
        .await;

    let err = client(server.uri()).submit(&record()).await.unwrap_err();
    match err {
        SinkError::Http { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid token");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_collector_is_a_transport_error() {
    let err = client("http://127.0.0.1:1".to_string())
        .submit(&record())
        .await
        .unwrap_err();
    assert!(matches!(err, SinkError::Transport(_)));
}

#[tokio::test]
async fn slow_collector_hits_the_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/push"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let mut config = CollectorConfig::new(server.uri(), SecretString::new("t".to_string()));
    config.timeout = Duration::from_millis(100);
    let err = CollectorClient::new(config)
        .unwrap()
        .submit(&record())
        .await
        .unwrap_err();
    assert!(matches!(err, SinkError::Transport(_)));
}

#[tokio::test]
async fn redaction_applies_to_bodies_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/push"))
        .and(body_partial_json(json!({
            "prompt": "user: my password is [REDACTED]",
            "model": "gpt-4o-mini"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = CollectorConfig::new(server.uri(), SecretString::new("t".to_string()));
    config.redact_regex = Some(Regex::new("hunter2").unwrap());
    CollectorClient::new(config)
        .unwrap()
        .push(&record())
        .await
        .unwrap();
}
