//! LLM call telemetry.
//!
//! `llmeter` instruments an LLM SDK client in place: every supported method
//! keeps its signature and return value, and each completed call produces a
//! telemetry record (prompt, response, token usage, duration, model) that is
//! pushed to a collector before the call returns.
//!
//! ```rust,no_run
//! use llmeter::providers::openai::{ChatCompletion, ChatCompletionRequest};
//! use llmeter::{init, ChatMessage, Endpoint, LlmeterError, LlmeterOptions, OpenAiClient};
//!
//! fn send(request: ChatCompletionRequest) -> Result<ChatCompletion, LlmeterError> {
//!     // forward to the real API
//! #   let _ = request;
//!     unimplemented!()
//! }
//!
//! # async fn run() -> Result<(), LlmeterError> {
//! let mut client = OpenAiClient {
//!     chat_completions: Some(Endpoint::from_sync(send)),
//!     ..OpenAiClient::default()
//! };
//!
//! init(
//!     &mut client,
//!     "https://collector.example.com",
//!     "collector-token",
//!     LlmeterOptions::new()
//!         .environment("production")
//!         .application_name("support-bot"),
//! )?;
//!
//! let request = ChatCompletionRequest::new("gpt-4o-mini", vec![ChatMessage::user("Hi")]);
//! let _response = client.create_chat_completion(request).await?;
//! # Ok(())
//! # }
//! ```

mod options;

use std::sync::Arc;

use llmeter_collector::{CollectorClient, CollectorConfig};
use secrecy::SecretString;

pub use llmeter_collector as collector;
pub use llmeter_providers as providers;

pub use llmeter_core::{
    ChatMessage, Endpoint, Labels, LlmeterError, Recorder, Role, SinkError, StreamEndpoint,
    TelemetryRecord, TelemetrySink, WrappedEndpoints,
};
pub use llmeter_providers::{ClientKind, ProviderAdapter, ProviderClient};
pub use options::{LlmeterOptions, ENV_API_KEY, ENV_APPLICATION_NAME, ENV_ENVIRONMENT, ENV_URL};

#[cfg(feature = "anthropic")]
pub use llmeter_providers::AnthropicClient;
#[cfg(feature = "cohere")]
pub use llmeter_providers::CohereClient;
#[cfg(feature = "mistral")]
pub use llmeter_providers::MistralClient;
#[cfg(feature = "openai")]
pub use llmeter_providers::OpenAiClient;

/// Builds the collector-backed recorder shared by every client instrumented
/// with the same settings.
pub fn recorder(
    collector_url: &str,
    api_key: &str,
    options: &LlmeterOptions,
) -> Result<Recorder, LlmeterError> {
    if collector_url.trim().is_empty() {
        return Err(LlmeterError::InvalidConfig(
            "collector url is required".to_string(),
        ));
    }

    let mut config = CollectorConfig::new(collector_url, SecretString::new(api_key.to_string()));
    config.timeout = options.timeout;
    config.redact_regex = options.redact_regex.clone();
    config.max_field_bytes = options.max_field_bytes;

    let sink = CollectorClient::new(config).map_err(|err| {
        LlmeterError::InvalidConfig(format!("failed to build collector client: {err}"))
    })?;
    Ok(Recorder::new(options.labels(), Arc::new(sink)))
}

/// Instruments `client` so that every call it makes is reported to the
/// collector at `collector_url`.
///
/// Methods the client does not expose are skipped; the returned report lists
/// both sets.
pub fn init<C>(
    client: &mut C,
    collector_url: &str,
    api_key: &str,
    options: LlmeterOptions,
) -> Result<WrappedEndpoints, LlmeterError>
where
    C: ProviderAdapter + ?Sized,
{
    let recorder = recorder(collector_url, api_key, &options)?;
    Ok(instrument(client, &recorder))
}

/// [`init`] from `LLMETER_*` environment variables.
pub fn init_from_env<C>(client: &mut C) -> Result<WrappedEndpoints, LlmeterError>
where
    C: ProviderAdapter + ?Sized,
{
    let url = std::env::var(ENV_URL)
        .map_err(|_| LlmeterError::InvalidConfig(format!("{ENV_URL} is not set")))?;
    let api_key = std::env::var(ENV_API_KEY)
        .map_err(|_| LlmeterError::InvalidConfig(format!("{ENV_API_KEY} is not set")))?;
    init(client, &url, &api_key, LlmeterOptions::from_env())
}

/// Installs an existing recorder on `client`.
pub fn instrument<C>(client: &mut C, recorder: &Recorder) -> WrappedEndpoints
where
    C: ProviderAdapter + ?Sized,
{
    let report = client.install(recorder);
    tracing::info!(
        client = %client.kind(),
        environment = %recorder.labels().environment,
        application = %recorder.labels().application_name,
        wrapped = report.wrapped().len(),
        skipped = report.skipped().len(),
        "llm client instrumented"
    );
    report
}
