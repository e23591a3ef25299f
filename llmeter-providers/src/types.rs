//! Wire types and helpers shared across providers.

use futures::future;
use llmeter_core::{CallFuture, ChunkStream, Endpoint, LlmeterError, StreamEndpoint, TokenUsage};
use serde::{Deserialize, Serialize};

/// OpenAI-style usage block, also returned by Mistral.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl From<Usage> for TokenUsage {
    fn from(usage: Usage) -> Self {
        TokenUsage::reported(
            usage.prompt_tokens,
            usage.completion_tokens,
            usage.total_tokens,
        )
    }
}

/// Embedding input: a single string or a batch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

impl EmbeddingInput {
    pub fn render(&self, separator: &str) -> String {
        match self {
            EmbeddingInput::Single(text) => text.clone(),
            EmbeddingInput::Batch(texts) => texts.join(separator),
        }
    }
}

impl From<&str> for EmbeddingInput {
    fn from(text: &str) -> Self {
        EmbeddingInput::Single(text.to_string())
    }
}

impl From<String> for EmbeddingInput {
    fn from(text: String) -> Self {
        EmbeddingInput::Single(text)
    }
}

impl From<Vec<String>> for EmbeddingInput {
    fn from(texts: Vec<String>) -> Self {
        EmbeddingInput::Batch(texts)
    }
}

pub type ProviderEndpoint<Req, Resp> = Endpoint<Req, Resp, LlmeterError>;
pub type ProviderStream<Req, C> = StreamEndpoint<Req, C, LlmeterError>;

pub(crate) fn missing_endpoint(path: &str) -> LlmeterError {
    LlmeterError::InvalidConfig(format!("{path} is not available on this client"))
}

/// Calls the method in `slot`, or fails with `InvalidConfig` when it is absent.
pub(crate) fn call<Req, Resp>(
    slot: &Option<ProviderEndpoint<Req, Resp>>,
    path: &str,
    request: Req,
) -> CallFuture<Resp, LlmeterError>
where
    Req: 'static,
    Resp: Send + 'static,
{
    match slot {
        Some(endpoint) => endpoint.call(request),
        None => Box::pin(future::ready(Err(missing_endpoint(path)))),
    }
}

pub(crate) fn open<Req, C>(
    slot: &Option<ProviderStream<Req, C>>,
    path: &str,
    request: Req,
) -> CallFuture<ChunkStream<C, LlmeterError>, LlmeterError>
where
    Req: 'static,
    C: Send + 'static,
{
    match slot {
        Some(endpoint) => endpoint.call(request),
        None => Box::pin(future::ready(Err(missing_endpoint(path)))),
    }
}
