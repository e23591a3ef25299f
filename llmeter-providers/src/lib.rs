//! Provider adapters: wire types for each supported LLM SDK surface and the
//! mapping from each call to telemetry records.
//!
//! A client is a table of optional method slots. [`ProviderAdapter::install`]
//! replaces every present slot with an instrumented wrapper; absent slots are
//! left alone and reported as skipped.

mod client;
pub mod types;

// Provider-specific clients (feature-gated)
#[cfg(feature = "anthropic")]
pub mod anthropic;
#[cfg(feature = "cohere")]
pub mod cohere;
#[cfg(feature = "mistral")]
pub mod mistral;
#[cfg(feature = "openai")]
pub mod openai;

pub use client::{ClientKind, ProviderAdapter, ProviderClient};
pub use types::{EmbeddingInput, ProviderEndpoint, ProviderStream, Usage};

#[cfg(feature = "anthropic")]
pub use anthropic::AnthropicClient;
#[cfg(feature = "cohere")]
pub use cohere::CohereClient;
#[cfg(feature = "mistral")]
pub use mistral::MistralClient;
#[cfg(feature = "openai")]
pub use openai::{Deployment, OpenAiClient};

pub use llmeter_core::{ChatMessage, Role};
