mod common;

use common::RecordingSink;
use llmeter_core::Endpoint;
use llmeter_providers::anthropic::{Completion, CompletionRequest};
use llmeter_providers::{AnthropicClient, ProviderAdapter};

fn backend() -> Endpoint<CompletionRequest, Completion, llmeter_core::LlmeterError> {
    Endpoint::from_sync(|request: CompletionRequest| {
        Ok(Completion {
            id: "compl_01".to_string(),
            completion: " Paris is the capital".to_string(),
            stop_reason: Some("stop_sequence".to_string()),
            model: request.model,
        })
    })
}

fn request() -> CompletionRequest {
    CompletionRequest::new(
        "claude-2.1",
        "\n\nHuman: What is the capital of France?\n\nAssistant:",
        64,
    )
}

#[tokio::test]
async fn tokens_come_from_the_client_counter() {
    let sink = RecordingSink::default();
    let mut client = AnthropicClient {
        completions: Some(backend()),
        ..AnthropicClient::new()
    }
    .with_token_counter(|text| text.len() as u32);
    client.install(&sink.recorder());

    client.create_completion(request()).await.unwrap();

    let records = sink.records();
    let record = &records[0];
    let prompt_len = request().prompt.len() as u32;
    assert_eq!(record.endpoint, "anthropic.completions");
    assert_eq!(record.model.as_deref(), Some("claude-2.1"));
    assert_eq!(record.prompt_tokens, Some(prompt_len));
    assert_eq!(record.completion_tokens, Some(21));
    assert_eq!(record.total_tokens, Some(prompt_len + 21));
    assert_eq!(record.finish_reason.as_deref(), Some("stop_sequence"));
    assert_eq!(record.response.as_deref(), Some(" Paris is the capital"));
}

#[tokio::test]
async fn tokens_are_estimated_without_a_counter() {
    let sink = RecordingSink::default();
    let mut client = AnthropicClient {
        completions: Some(backend()),
        ..AnthropicClient::new()
    };
    client.install(&sink.recorder());

    client.create_completion(request()).await.unwrap();

    let records = sink.records();
    // 8 prompt words and 4 completion words at 1.5 tokens each
    assert_eq!(records[0].prompt_tokens, Some(12));
    assert_eq!(records[0].completion_tokens, Some(6));
    assert_eq!(records[0].total_tokens, Some(18));
}
