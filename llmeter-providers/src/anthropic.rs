//! Anthropic text completions.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use llmeter_core::{
    estimate_tokens, instrument, LlmeterError, Recorder, TelemetryRecord, TokenUsage,
    WrappedEndpoints,
};
use serde::{Deserialize, Serialize};

use crate::types::{call, ProviderEndpoint};
use crate::{ClientKind, ProviderAdapter};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens_to_sample: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            max_tokens_to_sample: max_tokens,
            temperature: None,
            stop_sequences: Vec::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Completion {
    pub id: String,
    pub completion: String,
    #[serde(default)]
    pub stop_reason: Option<String>,
    pub model: String,
}

/// The client's own tokenizer.
pub type TokenCounter = Arc<dyn Fn(&str) -> u32 + Send + Sync>;

#[derive(Clone, Default)]
pub struct AnthropicClient {
    pub completions: Option<ProviderEndpoint<CompletionRequest, Completion>>,
    /// Used for token counts when set; otherwise tokens are estimated.
    pub token_counter: Option<TokenCounter>,
}

impl fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("completions", &self.completions)
            .field("token_counter", &self.token_counter.is_some())
            .finish()
    }
}

impl AnthropicClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token_counter<F>(mut self, counter: F) -> Self
    where
        F: Fn(&str) -> u32 + Send + Sync + 'static,
    {
        self.token_counter = Some(Arc::new(counter));
        self
    }

    pub async fn create_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<Completion, LlmeterError> {
        call(&self.completions, "completions", request).await
    }
}

fn completion_records(
    request: &CompletionRequest,
    counter: Option<TokenCounter>,
) -> impl FnOnce(&Completion, Duration) -> Vec<TelemetryRecord> + Send + 'static {
    let prompt = request.prompt.clone();
    let model = request.model.clone();

    move |response: &Completion, elapsed: Duration| {
        let count = |text: &str| match &counter {
            Some(counter) => counter(text),
            None => estimate_tokens(text),
        };
        let usage = TokenUsage::new(count(&prompt), count(&response.completion));
        let mut record = TelemetryRecord::new("anthropic.completions", elapsed)
            .with_request_id(response.id.as_str())
            .with_model(model)
            .with_usage(usage)
            .with_response(response.completion.as_str());
        if let Some(reason) = &response.stop_reason {
            record = record.with_finish_reason(reason.as_str());
        }
        vec![record.with_prompt(prompt)]
    }
}

impl ProviderAdapter for AnthropicClient {
    fn kind(&self) -> ClientKind {
        ClientKind::Anthropic
    }

    fn install(&mut self, recorder: &Recorder) -> WrappedEndpoints {
        let counter = self.token_counter.clone();
        let mut report = WrappedEndpoints::new();
        report.wrap(&mut self.completions, "anthropic.completions", |original| {
            instrument(original, recorder.clone(), move |request: &CompletionRequest| {
                completion_records(request, counter.clone())
            })
        });
        report
    }
}
