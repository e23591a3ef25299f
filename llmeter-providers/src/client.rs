//! The closed set of supported clients and per-client installation.

use llmeter_core::{Recorder, WrappedEndpoints};

#[cfg(feature = "anthropic")]
use crate::anthropic::AnthropicClient;
#[cfg(feature = "cohere")]
use crate::cohere::CohereClient;
#[cfg(feature = "mistral")]
use crate::mistral::MistralClient;
#[cfg(feature = "openai")]
use crate::openai::{Deployment, OpenAiClient};

/// A client whose methods can be instrumented in place.
pub trait ProviderAdapter {
    fn kind(&self) -> ClientKind;

    /// Wraps every method present on the client. Absent methods are skipped.
    fn install(&mut self, recorder: &Recorder) -> WrappedEndpoints;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientKind {
    OpenAi,
    AzureOpenAi,
    Anthropic,
    Cohere,
    Mistral,
}

impl ClientKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientKind::OpenAi => "openai",
            ClientKind::AzureOpenAi => "azure",
            ClientKind::Anthropic => "anthropic",
            ClientKind::Cohere => "cohere",
            ClientKind::Mistral => "mistral",
        }
    }
}

impl std::fmt::Display for ClientKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any supported client, classified once at construction.
#[derive(Clone, Debug)]
pub enum ProviderClient {
    #[cfg(feature = "openai")]
    OpenAi(OpenAiClient),
    /// An OpenAI client whose base URL points at an Azure deployment.
    #[cfg(feature = "openai")]
    AzureOpenAi(OpenAiClient),
    #[cfg(feature = "anthropic")]
    Anthropic(AnthropicClient),
    #[cfg(feature = "cohere")]
    Cohere(CohereClient),
    #[cfg(feature = "mistral")]
    Mistral(MistralClient),
}

impl ProviderClient {
    pub fn kind(&self) -> ClientKind {
        match self {
            #[cfg(feature = "openai")]
            ProviderClient::OpenAi(_) => ClientKind::OpenAi,
            #[cfg(feature = "openai")]
            ProviderClient::AzureOpenAi(_) => ClientKind::AzureOpenAi,
            #[cfg(feature = "anthropic")]
            ProviderClient::Anthropic(_) => ClientKind::Anthropic,
            #[cfg(feature = "cohere")]
            ProviderClient::Cohere(_) => ClientKind::Cohere,
            #[cfg(feature = "mistral")]
            ProviderClient::Mistral(_) => ClientKind::Mistral,
        }
    }

    /// Installs instrumentation on the wrapped client.
    pub fn instrument(&mut self, recorder: &Recorder) -> WrappedEndpoints {
        match self {
            #[cfg(feature = "openai")]
            ProviderClient::OpenAi(client) => client.install_as(Deployment::OpenAi, recorder),
            #[cfg(feature = "openai")]
            ProviderClient::AzureOpenAi(client) => client.install_as(Deployment::Azure, recorder),
            #[cfg(feature = "anthropic")]
            ProviderClient::Anthropic(client) => client.install(recorder),
            #[cfg(feature = "cohere")]
            ProviderClient::Cohere(client) => client.install(recorder),
            #[cfg(feature = "mistral")]
            ProviderClient::Mistral(client) => client.install(recorder),
        }
    }
}

impl ProviderAdapter for ProviderClient {
    fn kind(&self) -> ClientKind {
        ProviderClient::kind(self)
    }

    fn install(&mut self, recorder: &Recorder) -> WrappedEndpoints {
        self.instrument(recorder)
    }
}

#[cfg(feature = "openai")]
impl From<OpenAiClient> for ProviderClient {
    fn from(client: OpenAiClient) -> Self {
        match client.kind() {
            ClientKind::AzureOpenAi => ProviderClient::AzureOpenAi(client),
            _ => ProviderClient::OpenAi(client),
        }
    }
}

#[cfg(feature = "anthropic")]
impl From<AnthropicClient> for ProviderClient {
    fn from(client: AnthropicClient) -> Self {
        ProviderClient::Anthropic(client)
    }
}

#[cfg(feature = "cohere")]
impl From<CohereClient> for ProviderClient {
    fn from(client: CohereClient) -> Self {
        ProviderClient::Cohere(client)
    }
}

#[cfg(feature = "mistral")]
impl From<MistralClient> for ProviderClient {
    fn from(client: MistralClient) -> Self {
        ProviderClient::Mistral(client)
    }
}
