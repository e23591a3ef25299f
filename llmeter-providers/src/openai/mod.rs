//! OpenAI client table, also used for Azure OpenAI deployments.
//!
//! The base URL decides which flavour of records the endpoints produce; see
//! [`Deployment::detect`].

mod records;
mod types;

pub use records::Deployment;
pub use types::{
    ChatCompletion, ChatCompletionChunk, ChatCompletionRequest, Choice, ChunkChoice, Completion,
    CompletionChoice, CompletionRequest, Delta, Embedding, EmbeddingRequest, EmbeddingResponse,
    FineTuningJob, FineTuningJobRequest, ImageData, ImageGenerationRequest, ImageResponseFormat,
    ImageVariationRequest, ImagesResponse, ResponseMessage, SpeechRequest,
};

use llmeter_core::{
    instrument, instrument_stream, ChunkStream, LlmeterError, Recorder, WrappedEndpoints,
};

use crate::types::{call, open, ProviderEndpoint, ProviderStream};
use crate::{ClientKind, ProviderAdapter};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Methods of an OpenAI (or Azure OpenAI) SDK client.
#[derive(Clone, Debug)]
pub struct OpenAiClient {
    pub base_url: String,
    pub chat_completions: Option<ProviderEndpoint<ChatCompletionRequest, ChatCompletion>>,
    pub chat_completions_stream: Option<ProviderStream<ChatCompletionRequest, ChatCompletionChunk>>,
    pub completions: Option<ProviderEndpoint<CompletionRequest, Completion>>,
    pub completions_stream: Option<ProviderStream<CompletionRequest, Completion>>,
    pub embeddings: Option<ProviderEndpoint<EmbeddingRequest, EmbeddingResponse>>,
    pub fine_tuning_jobs: Option<ProviderEndpoint<FineTuningJobRequest, FineTuningJob>>,
    pub images_generate: Option<ProviderEndpoint<ImageGenerationRequest, ImagesResponse>>,
    pub images_variation: Option<ProviderEndpoint<ImageVariationRequest, ImagesResponse>>,
    pub audio_speech: Option<ProviderEndpoint<SpeechRequest, Vec<u8>>>,
}

impl Default for OpenAiClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl OpenAiClient {
    /// A client with no methods attached.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            chat_completions: None,
            chat_completions_stream: None,
            completions: None,
            completions_stream: None,
            embeddings: None,
            fine_tuning_jobs: None,
            images_generate: None,
            images_variation: None,
            audio_speech: None,
        }
    }

    pub fn deployment(&self) -> Deployment {
        Deployment::detect(&self.base_url)
    }

    pub async fn create_chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletion, LlmeterError> {
        call(&self.chat_completions, "chat.completions", request).await
    }

    pub async fn create_chat_completion_stream(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChunkStream<ChatCompletionChunk, LlmeterError>, LlmeterError> {
        open(&self.chat_completions_stream, "chat.completions", request).await
    }

    pub async fn create_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<Completion, LlmeterError> {
        call(&self.completions, "completions", request).await
    }

    pub async fn create_completion_stream(
        &self,
        request: CompletionRequest,
    ) -> Result<ChunkStream<Completion, LlmeterError>, LlmeterError> {
        open(&self.completions_stream, "completions", request).await
    }

    pub async fn create_embedding(
        &self,
        request: EmbeddingRequest,
    ) -> Result<EmbeddingResponse, LlmeterError> {
        call(&self.embeddings, "embeddings", request).await
    }

    pub async fn create_fine_tuning_job(
        &self,
        request: FineTuningJobRequest,
    ) -> Result<FineTuningJob, LlmeterError> {
        call(&self.fine_tuning_jobs, "fine_tuning.jobs", request).await
    }

    pub async fn create_image(
        &self,
        request: ImageGenerationRequest,
    ) -> Result<ImagesResponse, LlmeterError> {
        call(&self.images_generate, "images.generate", request).await
    }

    pub async fn create_image_variation(
        &self,
        request: ImageVariationRequest,
    ) -> Result<ImagesResponse, LlmeterError> {
        call(&self.images_variation, "images.variation", request).await
    }

    pub async fn create_speech(&self, request: SpeechRequest) -> Result<Vec<u8>, LlmeterError> {
        call(&self.audio_speech, "audio.speech", request).await
    }

    pub(crate) fn install_as(
        &mut self,
        deployment: Deployment,
        recorder: &Recorder,
    ) -> WrappedEndpoints {
        let mut report = WrappedEndpoints::new();
        report
            .wrap(
                &mut self.chat_completions,
                deployment.endpoint("chat.completions"),
                |original| {
                    instrument(original, recorder.clone(), move |request: &ChatCompletionRequest| {
                        records::chat_completion(request, deployment)
                    })
                },
            )
            .wrap(
                &mut self.chat_completions_stream,
                stream_path(deployment, "chat.completions"),
                |original| {
                    instrument_stream(
                        original,
                        recorder.clone(),
                        move |request: &ChatCompletionRequest| {
                            records::chat_completion_stream(request, deployment)
                        },
                    )
                },
            )
            .wrap(
                &mut self.completions,
                deployment.endpoint("completions"),
                |original| {
                    instrument(original, recorder.clone(), move |request: &CompletionRequest| {
                        records::completion(request, deployment)
                    })
                },
            )
            .wrap(
                &mut self.completions_stream,
                stream_path(deployment, "completions"),
                |original| {
                    instrument_stream(original, recorder.clone(), move |request: &CompletionRequest| {
                        records::completion_stream(request, deployment)
                    })
                },
            )
            .wrap(
                &mut self.embeddings,
                deployment.endpoint("embeddings"),
                |original| {
                    instrument(original, recorder.clone(), move |request: &EmbeddingRequest| {
                        records::embedding(request, deployment)
                    })
                },
            )
            .wrap(
                &mut self.images_generate,
                deployment.endpoint("images.create"),
                |original| {
                    instrument(
                        original,
                        recorder.clone(),
                        move |request: &ImageGenerationRequest| {
                            records::image_generation(request, deployment)
                        },
                    )
                },
            );

        // Azure deployments are only instrumented for the methods above.
        if deployment == Deployment::Azure {
            return report;
        }

        report
            .wrap(
                &mut self.fine_tuning_jobs,
                deployment.endpoint("fine_tuning"),
                |original| {
                    instrument(original, recorder.clone(), move |request: &FineTuningJobRequest| {
                        records::fine_tuning(request, deployment)
                    })
                },
            )
            .wrap(
                &mut self.images_variation,
                deployment.endpoint("images.create.variations"),
                |original| {
                    instrument(
                        original,
                        recorder.clone(),
                        move |request: &ImageVariationRequest| {
                            records::image_variation(request, deployment)
                        },
                    )
                },
            )
            .wrap(
                &mut self.audio_speech,
                deployment.endpoint("audio.speech.create"),
                |original| {
                    instrument(original, recorder.clone(), move |request: &SpeechRequest| {
                        records::speech(request, deployment)
                    })
                },
            );
        report
    }
}

fn stream_path(deployment: Deployment, api: &str) -> String {
    format!("{}:stream", deployment.endpoint(api))
}

impl ProviderAdapter for OpenAiClient {
    fn kind(&self) -> ClientKind {
        match self.deployment() {
            Deployment::OpenAi => ClientKind::OpenAi,
            Deployment::Azure => ClientKind::AzureOpenAi,
        }
    }

    fn install(&mut self, recorder: &Recorder) -> WrappedEndpoints {
        let deployment = self.deployment();
        self.install_as(deployment, recorder)
    }
}
