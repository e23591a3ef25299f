use std::time::Duration;

use futures::StreamExt;
use llmeter::providers::cohere::{ChatRequest, ChatResponse};
use llmeter::providers::openai::{
    ChatCompletion, ChatCompletionChunk, ChatCompletionRequest, Choice, ChunkChoice, Delta,
    ResponseMessage,
};
use llmeter::{
    init, ChatMessage, CohereClient, Endpoint, LlmeterError, LlmeterOptions, OpenAiClient,
    ProviderClient, StreamEndpoint,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn openai_client() -> OpenAiClient {
    OpenAiClient {
        chat_completions: Some(Endpoint::new(|_request: ChatCompletionRequest| async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(ChatCompletion {
                id: "chatcmpl-e2e".to_string(),
                object: "chat.completion".to_string(),
                created: 0,
                model: "gpt-4o-mini".to_string(),
                choices: vec![Choice {
                    index: 0,
                    message: ResponseMessage {
                        role: "assistant".to_string(),
                        content: Some("Hello there".to_string()),
                        tool_calls: None,
                    },
                    finish_reason: Some("stop".to_string()),
                }],
                usage: None,
            })
        })),
        chat_completions_stream: Some(StreamEndpoint::from_iter(
            |_request: ChatCompletionRequest| {
                Ok(["Hel", "lo"].map(|text| {
                    Ok(ChatCompletionChunk {
                        id: "chatcmpl-e2e-stream".to_string(),
                        object: "chat.completion.chunk".to_string(),
                        created: 0,
                        model: "gpt-4o-mini".to_string(),
                        choices: vec![ChunkChoice {
                            index: 0,
                            delta: Delta {
                                role: None,
                                content: Some(text.to_string()),
                            },
                            finish_reason: None,
                        }],
                        usage: None,
                    })
                }))
            },
        )),
        ..OpenAiClient::default()
    }
}

fn request() -> ChatCompletionRequest {
    ChatCompletionRequest::new("gpt-4o-mini", vec![ChatMessage::user("Hi")])
}

fn options() -> LlmeterOptions {
    LlmeterOptions::new()
        .environment("staging")
        .application_name("checkout")
        .skip_response(true)
}

#[tokio::test]
async fn instrumented_call_is_pushed_to_the_collector() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/push"))
        .and(header("Authorization", "collector-key"))
        .and(body_partial_json(json!({
            "endpoint": "openai.chat.completions",
            "environment": "staging",
            "applicationName": "checkout",
            "skipResp": true,
            "sourceLanguage": "rust",
            "llmReqId": "chatcmpl-e2e",
            "model": "gpt-4o-mini",
            "prompt": "user: Hi",
            "response": "Hello there",
            "finishReason": "stop"
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = openai_client();
    let report = init(&mut client, &server.uri(), "collector-key", options()).unwrap();
    assert!(report.contains("openai.chat.completions"));

    let response = client.create_chat_completion(request()).await.unwrap();
    assert_eq!(response.id, "chatcmpl-e2e");

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert!(body["requestDuration"].as_f64().unwrap() >= 0.01);
}

#[tokio::test]
async fn stream_is_pushed_once_after_the_last_chunk() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/push"))
        .and(body_partial_json(json!({
            "llmReqId": "chatcmpl-e2e-stream",
            "response": "Hello"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = openai_client();
    init(&mut client, &server.uri(), "collector-key", options()).unwrap();

    let mut stream = client.create_chat_completion_stream(request()).await.unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap().id, "chatcmpl-e2e-stream");
    assert!(server.received_requests().await.unwrap().is_empty());

    assert!(stream.next().await.unwrap().is_ok());
    assert!(stream.next().await.is_none());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn collector_failure_surfaces_as_a_telemetry_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/push"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let mut client = openai_client();
    init(&mut client, &server.uri(), "collector-key", options()).unwrap();

    let err = client.create_chat_completion(request()).await.unwrap_err();
    match err {
        LlmeterError::Telemetry(llmeter::SinkError::Http { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn coexisting_clients_report_independently() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/push"))
        .and(body_partial_json(json!({
            "endpoint": "openai.chat.completions",
            "applicationName": "web"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/push"))
        .and(body_partial_json(json!({
            "endpoint": "cohere.chat",
            "applicationName": "batch"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut openai = ProviderClient::from(openai_client());
    let mut cohere = ProviderClient::from(CohereClient {
        chat: Some(Endpoint::from_sync(|_request: ChatRequest| {
            Ok(ChatResponse {
                response_id: "resp-e2e".to_string(),
                generation_id: None,
                text: "Hi".to_string(),
                finish_reason: None,
                meta: None,
                token_count: None,
            })
        })),
        ..CohereClient::new()
    });
    init(
        &mut openai,
        &server.uri(),
        "key",
        LlmeterOptions::new().application_name("web"),
    )
    .unwrap();
    init(
        &mut cohere,
        &server.uri(),
        "key",
        LlmeterOptions::new().application_name("batch"),
    )
    .unwrap();

    let (ProviderClient::OpenAi(openai), ProviderClient::Cohere(cohere)) = (openai, cohere) else {
        panic!("unexpected client kinds");
    };
    let (first, second) = tokio::join!(
        openai.create_chat_completion(request()),
        cohere.chat(ChatRequest::new("Hello"))
    );
    first.unwrap();
    second.unwrap();
}

#[test]
fn empty_collector_url_is_rejected() {
    let mut client = openai_client();
    let err = init(&mut client, "  ", "key", LlmeterOptions::new()).unwrap_err();
    assert!(matches!(err, LlmeterError::InvalidConfig(_)));
    // nothing was wrapped
    assert!(client.chat_completions.is_some());
}

#[test]
fn options_read_labels_from_named_env_vars() {
    std::env::set_var("LLMETER_TEST_ENVIRONMENT_E2E", "qa");
    let labels = LlmeterOptions::new()
        .environment_from_env("LLMETER_TEST_ENVIRONMENT_E2E")
        .application_name_from_env("LLMETER_TEST_UNSET_APP_E2E")
        .labels();
    assert_eq!(labels.environment, "qa");
    assert_eq!(labels.application_name, "default");
    assert!(!labels.skip_response);
}
