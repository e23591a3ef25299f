//! Response-to-record mapping for OpenAI and Azure OpenAI.

use std::time::Duration;

use llmeter_core::{
    fan_out, normalize_messages, StreamAccumulator, TelemetryRecord, TOOL_CALL_RESPONSE,
};
use url::Url;

use super::types::{
    ChatCompletion, ChatCompletionRequest, Completion, CompletionRequest, EmbeddingRequest,
    EmbeddingResponse, FineTuningJob, FineTuningJobRequest, ImageData, ImageGenerationRequest,
    ImageResponseFormat, ImageVariationRequest, ImagesResponse, SpeechRequest,
};

const AZURE_HOST_SUFFIX: &str = ".openai.azure.com";
const DEFAULT_IMAGE_MODEL: &str = "dall-e-2";
const AZURE_IMAGE_MODEL: &str = "azure_dall-e-3";
const DEFAULT_IMAGE_SIZE: &str = "1024x1024";
const DEFAULT_IMAGE_QUALITY: &str = "standard";

/// Where an OpenAI-shaped client sends its requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deployment {
    OpenAi,
    Azure,
}

impl Deployment {
    /// Azure when the base URL host ends in `.openai.azure.com`.
    pub fn detect(base_url: &str) -> Self {
        let host = Url::parse(base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase));
        match host {
            Some(host) if host.ends_with(AZURE_HOST_SUFFIX) => Deployment::Azure,
            _ => Deployment::OpenAi,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Deployment::OpenAi => "openai",
            Deployment::Azure => "azure",
        }
    }

    pub fn endpoint(self, api: &str) -> String {
        format!("{}.{api}", self.prefix())
    }

    /// OpenAI records the requested model; Azure records the deployment's
    /// reported model behind an `azure_` prefix.
    fn model(self, requested: &str, reported: Option<&str>) -> String {
        match self {
            Deployment::OpenAi => requested.to_string(),
            Deployment::Azure => format!("azure_{}", reported.unwrap_or(requested)),
        }
    }

    fn image_model(self, requested: Option<&str>) -> String {
        match self {
            Deployment::OpenAi => requested.unwrap_or(DEFAULT_IMAGE_MODEL).to_string(),
            Deployment::Azure => AZURE_IMAGE_MODEL.to_string(),
        }
    }
}

pub(crate) fn chat_completion(
    request: &ChatCompletionRequest,
    deployment: Deployment,
) -> impl FnOnce(&ChatCompletion, Duration) -> Vec<TelemetryRecord> + Send + 'static {
    let prompt = normalize_messages(&request.messages, "\n");
    let requested = request.model.clone();
    let uses_tools = request.uses_tools();
    let candidates = request.n.unwrap_or(1);

    move |response: &ChatCompletion, elapsed: Duration| {
        let mut record = TelemetryRecord::new(deployment.endpoint("chat.completions"), elapsed)
            .with_request_id(response.id.as_str())
            .with_model(deployment.model(&requested, Some(response.model.as_str())))
            .with_prompt(prompt);
        if let Some(usage) = response.usage {
            record = record.with_usage(usage.into());
        }
        if uses_tools {
            return vec![record.with_response(TOOL_CALL_RESPONSE)];
        }
        if let Some(reason) = response
            .choices
            .first()
            .and_then(|choice| choice.finish_reason.as_deref())
        {
            record = record.with_finish_reason(reason);
        }
        let texts = response
            .choices
            .iter()
            .map(|choice| choice.message.content.clone().unwrap_or_default());
        candidates_or_single(record, candidates, texts)
    }
}

pub(crate) fn chat_completion_stream(
    request: &ChatCompletionRequest,
    deployment: Deployment,
) -> impl FnOnce(StreamAccumulator, Duration) -> TelemetryRecord + Send + 'static {
    let prompt = normalize_messages(&request.messages, "\n");
    let requested = request.model.clone();

    move |accumulated: StreamAccumulator, elapsed: Duration| {
        let model = deployment.model(&requested, accumulated.model());
        accumulated
            .into_record(deployment.endpoint("chat.completions"), elapsed)
            .with_model(model)
            .with_prompt(prompt)
    }
}

pub(crate) fn completion(
    request: &CompletionRequest,
    deployment: Deployment,
) -> impl FnOnce(&Completion, Duration) -> Vec<TelemetryRecord> + Send + 'static {
    let prompt = request.prompt.clone();
    let requested = request.model.clone();
    let uses_tools = request.uses_tools();
    let candidates = request.n.unwrap_or(1);

    move |response: &Completion, elapsed: Duration| {
        let mut record = TelemetryRecord::new(deployment.endpoint("completions"), elapsed)
            .with_request_id(response.id.as_str())
            .with_model(deployment.model(&requested, Some(response.model.as_str())))
            .with_prompt(prompt);
        if let Some(usage) = response.usage {
            record = record.with_usage(usage.into());
        }
        if uses_tools {
            return vec![record.with_response(TOOL_CALL_RESPONSE)];
        }
        if let Some(reason) = response
            .choices
            .first()
            .and_then(|choice| choice.finish_reason.as_deref())
        {
            record = record.with_finish_reason(reason);
        }
        let texts = response.choices.iter().map(|choice| choice.text.clone());
        candidates_or_single(record, candidates, texts)
    }
}

pub(crate) fn completion_stream(
    request: &CompletionRequest,
    deployment: Deployment,
) -> impl FnOnce(StreamAccumulator, Duration) -> TelemetryRecord + Send + 'static {
    let prompt = request.prompt.clone();
    let requested = request.model.clone();

    move |accumulated: StreamAccumulator, elapsed: Duration| {
        let model = deployment.model(&requested, accumulated.model());
        accumulated
            .into_record(deployment.endpoint("completions"), elapsed)
            .with_model(model)
            .with_prompt(prompt)
    }
}

pub(crate) fn embedding(
    request: &EmbeddingRequest,
    deployment: Deployment,
) -> impl FnOnce(&EmbeddingResponse, Duration) -> Vec<TelemetryRecord> + Send + 'static {
    let prompt = request.input.render(", ");
    let requested = request.model.clone();

    move |response: &EmbeddingResponse, elapsed: Duration| {
        let record = TelemetryRecord::new(deployment.endpoint("embeddings"), elapsed)
            .with_model(deployment.model(&requested, Some(response.model.as_str())))
            .with_prompt(prompt)
            .with_prompt_tokens(response.usage.prompt_tokens)
            .with_total_tokens(response.usage.total_tokens);
        vec![record]
    }
}

pub(crate) fn fine_tuning(
    request: &FineTuningJobRequest,
    deployment: Deployment,
) -> impl FnOnce(&FineTuningJob, Duration) -> Vec<TelemetryRecord> + Send + 'static {
    let requested = request.model.clone();

    move |job: &FineTuningJob, elapsed: Duration| {
        let record = TelemetryRecord::new(deployment.endpoint("fine_tuning"), elapsed)
            .with_request_id(job.id.as_str())
            .with_model(deployment.model(&requested, Some(job.model.as_str())))
            .with_extra("finetuneJobStatus", job.status.as_str());
        vec![record]
    }
}

pub(crate) fn image_generation(
    request: &ImageGenerationRequest,
    deployment: Deployment,
) -> impl FnOnce(&ImagesResponse, Duration) -> Vec<TelemetryRecord> + Send + 'static {
    let prompt = request.prompt.clone();
    let model = deployment.image_model(request.model.as_deref());
    let size = request.size.clone();
    let quality = request.quality.clone();
    let format = request.response_format.unwrap_or_default();

    move |response: &ImagesResponse, elapsed: Duration| {
        let template = TelemetryRecord::new(deployment.endpoint("images.create"), elapsed)
            .with_model(model)
            .with_prompt(prompt);
        per_image(
            template,
            response,
            size.as_deref(),
            quality.as_deref(),
            format,
        )
    }
}

pub(crate) fn image_variation(
    request: &ImageVariationRequest,
    deployment: Deployment,
) -> impl FnOnce(&ImagesResponse, Duration) -> Vec<TelemetryRecord> + Send + 'static {
    let model = deployment.image_model(request.model.as_deref());
    let size = request.size.clone();
    let format = request.response_format.unwrap_or_default();

    move |response: &ImagesResponse, elapsed: Duration| {
        let template =
            TelemetryRecord::new(deployment.endpoint("images.create.variations"), elapsed)
                .with_model(model);
        per_image(template, response, size.as_deref(), None, format)
    }
}

pub(crate) fn speech(
    request: &SpeechRequest,
    deployment: Deployment,
) -> impl FnOnce(&Vec<u8>, Duration) -> Vec<TelemetryRecord> + Send + 'static {
    let prompt = request.input.clone();
    let model = deployment.model(&request.model, None);
    let voice = request.voice.clone();

    move |_audio: &Vec<u8>, elapsed: Duration| {
        let record = TelemetryRecord::new(deployment.endpoint("audio.speech.create"), elapsed)
            .with_model(model)
            .with_prompt(prompt)
            .with_extra("audioVoice", voice);
        vec![record]
    }
}

/// One record per candidate when several were requested, otherwise the first.
/// A response without choices still yields a single record without `response`.
fn candidates_or_single<I>(
    record: TelemetryRecord,
    candidates: u32,
    mut texts: I,
) -> Vec<TelemetryRecord>
where
    I: Iterator<Item = String>,
{
    if candidates > 1 {
        let records = fan_out(record.clone(), texts);
        if records.is_empty() {
            return vec![record];
        }
        return records;
    }
    match texts.next() {
        Some(text) => vec![record.with_response(text)],
        None => vec![record],
    }
}

fn per_image(
    template: TelemetryRecord,
    response: &ImagesResponse,
    size: Option<&str>,
    quality: Option<&str>,
    format: ImageResponseFormat,
) -> Vec<TelemetryRecord> {
    let template = template
        .with_request_id(response.created.to_string())
        .with_extra("imageSize", size.unwrap_or(DEFAULT_IMAGE_SIZE))
        .with_extra("imageQuality", quality.unwrap_or(DEFAULT_IMAGE_QUALITY));
    response
        .data
        .iter()
        .map(|image: &ImageData| {
            template
                .clone()
                .with_extra("revisedPrompt", image.revised_prompt.clone())
                .with_extra("image", image.payload(format).map(str::to_string))
        })
        .collect()
}
