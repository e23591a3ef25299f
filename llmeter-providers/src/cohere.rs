//! Cohere generate, chat, embed and summarize.
//!
//! Generate responses carry no usage block, so generate and both stream kinds
//! fall back to the word-count estimator. Chat, embed and summarize report
//! billed units.

use std::time::Duration;

use llmeter_core::{
    instrument, instrument_stream, ChunkStream, LlmeterError, Recorder, ResponseExtractor,
    StreamAccumulator, TelemetryRecord, TokenUsage, WrappedEndpoints,
};
use serde::{Deserialize, Serialize};

use crate::types::{call, open, ProviderEndpoint, ProviderStream};
use crate::{ClientKind, ProviderAdapter};

pub const DEFAULT_MODEL: &str = "command";
pub const DEFAULT_EMBED_MODEL: &str = "embed-english-v2.0";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_generations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            num_generations: None,
            max_tokens: None,
            temperature: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Generations {
    pub id: String,
    pub generations: Vec<Generation>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Generation {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct GenerateStreamEvent {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub is_finished: bool,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl ResponseExtractor for GenerateStreamEvent {
    fn extract_delta(&self) -> Option<&str> {
        Some(self.text.as_str())
    }

    fn extract_finish_reason(&self) -> Option<&str> {
        self.finish_reason.as_deref()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preamble: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            model: None,
            preamble: None,
            temperature: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub response_id: String,
    #[serde(default)]
    pub generation_id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub meta: Option<ApiMeta>,
    #[serde(default)]
    pub token_count: Option<TokenCount>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenCount {
    #[serde(default)]
    pub prompt_tokens: Option<u32>,
    #[serde(default)]
    pub response_tokens: Option<u32>,
    #[serde(default)]
    pub total_tokens: Option<u32>,
    #[serde(default)]
    pub billed_tokens: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApiMeta {
    #[serde(default)]
    pub billed_units: Option<BilledUnits>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BilledUnits {
    #[serde(default)]
    pub input_tokens: Option<u32>,
    #[serde(default)]
    pub output_tokens: Option<u32>,
}

fn billed_units(meta: Option<ApiMeta>) -> BilledUnits {
    meta.and_then(|meta| meta.billed_units).unwrap_or_default()
}

/// Chat stream events, tagged by `event_type`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event_type", rename_all = "kebab-case")]
pub enum ChatStreamEvent {
    StreamStart {
        generation_id: String,
    },
    TextGeneration {
        text: String,
    },
    StreamEnd {
        #[serde(default)]
        finish_reason: Option<String>,
    },
    #[serde(other)]
    Other,
}

impl ResponseExtractor for ChatStreamEvent {
    fn extract_delta(&self) -> Option<&str> {
        match self {
            ChatStreamEvent::TextGeneration { text } => Some(text.as_str()),
            _ => None,
        }
    }

    fn extract_finish_reason(&self) -> Option<&str> {
        match self {
            ChatStreamEvent::StreamEnd { finish_reason } => finish_reason.as_deref(),
            _ => None,
        }
    }

    fn extract_request_id(&self) -> Option<&str> {
        match self {
            ChatStreamEvent::StreamStart { generation_id } => Some(generation_id.as_str()),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EmbedRequest {
    pub texts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
}

impl EmbedRequest {
    pub fn new(texts: Vec<String>) -> Self {
        Self {
            texts,
            model: None,
            input_type: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EmbedResponse {
    pub id: String,
    pub embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    pub meta: Option<ApiMeta>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SummarizeRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl SummarizeRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
            length: None,
            format: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SummarizeResponse {
    pub id: String,
    pub summary: String,
    #[serde(default)]
    pub meta: Option<ApiMeta>,
}

#[derive(Clone, Debug, Default)]
pub struct CohereClient {
    pub generate: Option<ProviderEndpoint<GenerateRequest, Generations>>,
    pub generate_stream: Option<ProviderStream<GenerateRequest, GenerateStreamEvent>>,
    pub chat: Option<ProviderEndpoint<ChatRequest, ChatResponse>>,
    pub chat_stream: Option<ProviderStream<ChatRequest, ChatStreamEvent>>,
    pub embed: Option<ProviderEndpoint<EmbedRequest, EmbedResponse>>,
    pub summarize: Option<ProviderEndpoint<SummarizeRequest, SummarizeResponse>>,
}

impl CohereClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn generate(&self, request: GenerateRequest) -> Result<Generations, LlmeterError> {
        call(&self.generate, "generate", request).await
    }

    pub async fn generate_stream(
        &self,
        request: GenerateRequest,
    ) -> Result<ChunkStream<GenerateStreamEvent, LlmeterError>, LlmeterError> {
        open(&self.generate_stream, "generate", request).await
    }

    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmeterError> {
        call(&self.chat, "chat", request).await
    }

    pub async fn chat_stream(
        &self,
        request: ChatRequest,
    ) -> Result<ChunkStream<ChatStreamEvent, LlmeterError>, LlmeterError> {
        open(&self.chat_stream, "chat", request).await
    }

    pub async fn embed(&self, request: EmbedRequest) -> Result<EmbedResponse, LlmeterError> {
        call(&self.embed, "embed", request).await
    }

    pub async fn summarize(
        &self,
        request: SummarizeRequest,
    ) -> Result<SummarizeResponse, LlmeterError> {
        call(&self.summarize, "summarize", request).await
    }
}

fn model_or_default(model: Option<&str>, default: &str) -> String {
    model.unwrap_or(default).to_string()
}

fn generate_records(
    request: &GenerateRequest,
) -> impl FnOnce(&Generations, Duration) -> Vec<TelemetryRecord> + Send + 'static {
    let prompt = request.prompt.clone();
    let model = model_or_default(request.model.as_deref(), DEFAULT_MODEL);

    move |response: &Generations, elapsed: Duration| {
        response
            .generations
            .iter()
            .map(|generation| {
                let mut record = TelemetryRecord::new("cohere.generate", elapsed)
                    .with_request_id(generation.id.as_str())
                    .with_model(model.as_str())
                    .with_prompt(prompt.as_str())
                    .with_usage(TokenUsage::estimated(&prompt, &generation.text))
                    .with_response(generation.text.as_str());
                if let Some(reason) = &generation.finish_reason {
                    record = record.with_finish_reason(reason.as_str());
                }
                record
            })
            .collect()
    }
}

/// Stream record with estimated usage; Cohere streams report none.
fn estimated_stream_record(
    endpoint: &'static str,
    prompt: String,
    model: String,
) -> impl FnOnce(StreamAccumulator, Duration) -> TelemetryRecord + Send + 'static {
    move |accumulated: StreamAccumulator, elapsed: Duration| {
        let usage = TokenUsage::estimated(&prompt, accumulated.text());
        accumulated
            .into_record(endpoint, elapsed)
            .with_model(model)
            .with_prompt(prompt)
            .with_usage(usage)
    }
}

fn chat_records(
    request: &ChatRequest,
) -> impl FnOnce(&ChatResponse, Duration) -> Vec<TelemetryRecord> + Send + 'static {
    let prompt = request.message.clone();
    let model = model_or_default(request.model.as_deref(), DEFAULT_MODEL);

    move |response: &ChatResponse, elapsed: Duration| {
        let billed = billed_units(response.meta);
        let mut record = TelemetryRecord::new("cohere.chat", elapsed)
            .with_request_id(response.response_id.as_str())
            .with_model(model)
            .with_prompt(prompt)
            .with_response(response.text.as_str());
        record.prompt_tokens = billed.input_tokens;
        record.completion_tokens = billed.output_tokens;
        record.total_tokens = response.token_count.and_then(|count| count.billed_tokens);
        if let Some(reason) = &response.finish_reason {
            record = record.with_finish_reason(reason.as_str());
        }
        vec![record]
    }
}

fn embed_records(
    request: &EmbedRequest,
) -> impl FnOnce(&EmbedResponse, Duration) -> Vec<TelemetryRecord> + Send + 'static {
    let prompt = request.texts.join(" ");
    let model = model_or_default(request.model.as_deref(), DEFAULT_EMBED_MODEL);

    move |response: &EmbedResponse, elapsed: Duration| {
        let mut record = TelemetryRecord::new("cohere.embed", elapsed)
            .with_request_id(response.id.as_str())
            .with_model(model)
            .with_prompt(prompt);
        record.prompt_tokens = billed_units(response.meta).input_tokens;
        vec![record]
    }
}

fn summarize_records(
    request: &SummarizeRequest,
) -> impl FnOnce(&SummarizeResponse, Duration) -> Vec<TelemetryRecord> + Send + 'static {
    let prompt = request.text.clone();
    let model = model_or_default(request.model.as_deref(), DEFAULT_MODEL);

    move |response: &SummarizeResponse, elapsed: Duration| {
        let billed = billed_units(response.meta);
        let mut record = TelemetryRecord::new("cohere.summarize", elapsed)
            .with_request_id(response.id.as_str())
            .with_model(model)
            .with_prompt(prompt)
            .with_response(response.summary.as_str());
        if let (Some(input), Some(output)) = (billed.input_tokens, billed.output_tokens) {
            record = record.with_usage(TokenUsage::new(input, output));
        }
        vec![record]
    }
}

impl ProviderAdapter for CohereClient {
    fn kind(&self) -> ClientKind {
        ClientKind::Cohere
    }

    fn install(&mut self, recorder: &Recorder) -> WrappedEndpoints {
        let mut report = WrappedEndpoints::new();
        report
            .wrap(&mut self.generate, "cohere.generate", |original| {
                instrument(original, recorder.clone(), generate_records)
            })
            .wrap(&mut self.generate_stream, "cohere.generate:stream", |original| {
                instrument_stream(original, recorder.clone(), |request: &GenerateRequest| {
                    estimated_stream_record(
                        "cohere.generate",
                        request.prompt.clone(),
                        model_or_default(request.model.as_deref(), DEFAULT_MODEL),
                    )
                })
            })
            .wrap(&mut self.chat, "cohere.chat", |original| {
                instrument(original, recorder.clone(), chat_records)
            })
            .wrap(&mut self.chat_stream, "cohere.chat:stream", |original| {
                instrument_stream(original, recorder.clone(), |request: &ChatRequest| {
                    estimated_stream_record(
                        "cohere.chat",
                        request.message.clone(),
                        model_or_default(request.model.as_deref(), DEFAULT_MODEL),
                    )
                })
            })
            .wrap(&mut self.embed, "cohere.embed", |original| {
                instrument(original, recorder.clone(), embed_records)
            })
            .wrap(&mut self.summarize, "cohere.summarize", |original| {
                instrument(original, recorder.clone(), summarize_records)
            });
        report
    }
}
