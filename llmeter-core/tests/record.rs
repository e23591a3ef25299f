use std::time::Duration;

use llmeter_core::{fan_out, Labels, TelemetryRecord, TokenUsage};
use serde_json::json;

#[test]
fn record_serializes_with_collector_keys() {
    let record = TelemetryRecord::new("openai.chat.completions", Duration::from_millis(1500))
        .with_model("gpt-4o")
        .with_request_id("chatcmpl-1")
        .with_prompt("user: Hi")
        .with_response("Hello")
        .with_usage(TokenUsage::reported(3, 2, 5))
        .with_finish_reason("stop");

    let value = record.to_json().unwrap();
    assert_eq!(
        value,
        json!({
            "endpoint": "openai.chat.completions",
            "model": "gpt-4o",
            "environment": "default",
            "applicationName": "default",
            "sourceLanguage": "rust",
            "llmReqId": "chatcmpl-1",
            "requestDuration": 1.5,
            "prompt": "user: Hi",
            "response": "Hello",
            "promptTokens": 3,
            "completionTokens": 2,
            "totalTokens": 5,
            "finishReason": "stop",
            "skipResp": false
        })
    );
}

#[test]
fn absent_fields_are_omitted() {
    let value = TelemetryRecord::new("openai.fine_tuning", Duration::ZERO)
        .to_json()
        .unwrap();
    let object = value.as_object().unwrap();
    for key in ["model", "llmReqId", "prompt", "response", "promptTokens", "finishReason"] {
        assert!(!object.contains_key(key), "{key} should be omitted");
    }
}

#[test]
fn extension_fields_are_flattened_and_nulls_dropped() {
    let record = TelemetryRecord::new("openai.images.create", Duration::ZERO)
        .with_extra("imageSize", "1024x1024")
        .with_extra("revisedPrompt", serde_json::Value::Null);

    let value = record.to_json().unwrap();
    assert_eq!(value["imageSize"], "1024x1024");
    assert!(value.get("revisedPrompt").is_none());
}

#[test]
fn labels_are_stamped() {
    let labels = Labels::new("production", "chatbot").with_skip_response(true);
    let record = TelemetryRecord::new("cohere.chat", Duration::ZERO).labelled(&labels);
    assert_eq!(record.environment, "production");
    assert_eq!(record.application_name, "chatbot");
    assert!(record.skip_resp);
}

#[test]
fn derived_total_is_the_sum() {
    let usage = TokenUsage::new(7, 11);
    assert_eq!(usage.total_tokens, usage.prompt_tokens + usage.completion_tokens);
}

#[test]
fn estimated_usage_counts_words() {
    let usage = TokenUsage::estimated("", "one two three four");
    assert_eq!(usage.prompt_tokens, 0);
    assert_eq!(usage.completion_tokens, 6);
    assert_eq!(usage.total_tokens, 6);
}

#[test]
fn fan_out_keeps_shared_fields() {
    let template = TelemetryRecord::new("openai.completions", Duration::from_millis(20))
        .with_model("gpt-3.5-turbo-instruct")
        .with_prompt("Say hi");
    let records = fan_out(template, ["a", "b", "c"]);

    assert_eq!(records.len(), 3);
    let responses: Vec<_> = records
        .iter()
        .map(|record| record.response.as_deref().unwrap())
        .collect();
    assert_eq!(responses, vec!["a", "b", "c"]);
    assert!(records
        .iter()
        .all(|record| record.prompt.as_deref() == Some("Say hi")
            && record.request_duration == records[0].request_duration));
}
