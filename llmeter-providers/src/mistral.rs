//! Mistral chat and embeddings.

use std::time::Duration;

use llmeter_core::{
    instrument, instrument_stream, normalize_messages, ChatMessage, ChunkStream, LlmeterError,
    Recorder, ResponseExtractor, StreamAccumulator, TelemetryRecord, TokenUsage, WrappedEndpoints,
};
use serde::{Deserialize, Serialize};

use crate::types::{call, open, EmbeddingInput, ProviderEndpoint, ProviderStream, Usage};
use crate::{ClientKind, ProviderAdapter};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub id: String,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Usage,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatChoice {
    pub index: u32,
    pub message: AssistantMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AssistantMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatChunk {
    pub id: String,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
    /// Set on the final chunk only.
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: DeltaMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DeltaMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl ResponseExtractor for ChatChunk {
    fn extract_delta(&self) -> Option<&str> {
        self.choices.first()?.delta.content.as_deref()
    }

    fn extract_usage(&self) -> Option<TokenUsage> {
        self.usage.map(Into::into)
    }

    /// Only the usage-bearing chunk's finish reason counts.
    fn extract_finish_reason(&self) -> Option<&str> {
        self.usage?;
        self.choices.first()?.finish_reason.as_deref()
    }

    fn extract_request_id(&self) -> Option<&str> {
        Some(self.id.as_str())
    }

    fn extract_model(&self) -> Option<&str> {
        Some(self.model.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EmbeddingRequest {
    pub model: String,
    pub input: EmbeddingInput,
}

impl EmbeddingRequest {
    pub fn new(model: impl Into<String>, input: impl Into<EmbeddingInput>) -> Self {
        Self {
            model: model.into(),
            input: input.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EmbeddingResponse {
    pub id: String,
    pub model: String,
    pub data: Vec<EmbeddingData>,
    pub usage: Usage,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EmbeddingData {
    pub index: u32,
    pub embedding: Vec<f32>,
}

#[derive(Clone, Debug, Default)]
pub struct MistralClient {
    pub chat: Option<ProviderEndpoint<ChatRequest, ChatResponse>>,
    pub chat_stream: Option<ProviderStream<ChatRequest, ChatChunk>>,
    pub embeddings: Option<ProviderEndpoint<EmbeddingRequest, EmbeddingResponse>>,
}

impl MistralClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmeterError> {
        call(&self.chat, "chat", request).await
    }

    pub async fn chat_stream(
        &self,
        request: ChatRequest,
    ) -> Result<ChunkStream<ChatChunk, LlmeterError>, LlmeterError> {
        open(&self.chat_stream, "chat_stream", request).await
    }

    pub async fn embeddings(
        &self,
        request: EmbeddingRequest,
    ) -> Result<EmbeddingResponse, LlmeterError> {
        call(&self.embeddings, "embeddings", request).await
    }
}

fn chat_records(
    request: &ChatRequest,
) -> impl FnOnce(&ChatResponse, Duration) -> Vec<TelemetryRecord> + Send + 'static {
    let prompt = normalize_messages(&request.messages, " ");
    let model = request.model.clone();

    move |response: &ChatResponse, elapsed: Duration| {
        let mut record = TelemetryRecord::new("mistral.chat", elapsed)
            .with_request_id(response.id.as_str())
            .with_model(model)
            .with_prompt(prompt)
            .with_usage(response.usage.into());
        if let Some(choice) = response.choices.first() {
            record = record.with_response(choice.message.content.as_str());
            if let Some(reason) = &choice.finish_reason {
                record = record.with_finish_reason(reason.as_str());
            }
        }
        vec![record]
    }
}

fn chat_stream_record(
    request: &ChatRequest,
) -> impl FnOnce(StreamAccumulator, Duration) -> TelemetryRecord + Send + 'static {
    let prompt = normalize_messages(&request.messages, " ");
    let model = request.model.clone();

    move |accumulated: StreamAccumulator, elapsed: Duration| {
        accumulated
            .into_record("mistral.chat", elapsed)
            .with_model(model)
            .with_prompt(prompt)
    }
}

fn embedding_records(
    request: &EmbeddingRequest,
) -> impl FnOnce(&EmbeddingResponse, Duration) -> Vec<TelemetryRecord> + Send + 'static {
    let prompt = request.input.render(", ");
    let model = request.model.clone();

    move |response: &EmbeddingResponse, elapsed: Duration| {
        let record = TelemetryRecord::new("mistral.embeddings", elapsed)
            .with_request_id(response.id.as_str())
            .with_model(model)
            .with_prompt(prompt)
            .with_usage(response.usage.into());
        vec![record]
    }
}

impl ProviderAdapter for MistralClient {
    fn kind(&self) -> ClientKind {
        ClientKind::Mistral
    }

    fn install(&mut self, recorder: &Recorder) -> WrappedEndpoints {
        let mut report = WrappedEndpoints::new();
        report
            .wrap(&mut self.chat, "mistral.chat", |original| {
                instrument(original, recorder.clone(), chat_records)
            })
            .wrap(&mut self.chat_stream, "mistral.chat:stream", |original| {
                instrument_stream(original, recorder.clone(), chat_stream_record)
            })
            .wrap(&mut self.embeddings, "mistral.embeddings", |original| {
                instrument(original, recorder.clone(), embedding_records)
            });
        report
    }
}
