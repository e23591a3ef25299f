//! The canonical unit submitted to the telemetry collector.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Labels, TokenUsage};

pub const SOURCE_LANGUAGE: &str = "rust";

/// Sentinel used as the response body when the call resolved to tool calls.
pub const TOOL_CALL_RESPONSE: &str = "Function called with tools";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub environment: String,
    pub application_name: String,
    pub source_language: String,
    #[serde(
        rename = "llmReqId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub request_id: Option<String>,
    pub request_duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    pub skip_resp: bool,
    /// Endpoint-specific fields (image size, audio voice, job status, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TelemetryRecord {
    pub fn new(endpoint: impl Into<String>, duration: Duration) -> Self {
        let labels = Labels::default();
        Self {
            endpoint: endpoint.into(),
            model: None,
            environment: labels.environment,
            application_name: labels.application_name,
            source_language: SOURCE_LANGUAGE.to_string(),
            request_id: None,
            request_duration: duration.as_secs_f64(),
            prompt: None,
            response: None,
            prompt_tokens: None,
            completion_tokens: None,
            total_tokens: None,
            finish_reason: None,
            skip_resp: labels.skip_response,
            extra: Map::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    pub fn with_finish_reason(mut self, reason: impl Into<String>) -> Self {
        self.finish_reason = Some(reason.into());
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.prompt_tokens = Some(usage.prompt_tokens);
        self.completion_tokens = Some(usage.completion_tokens);
        self.total_tokens = Some(usage.total_tokens);
        self
    }

    pub fn with_prompt_tokens(mut self, tokens: u32) -> Self {
        self.prompt_tokens = Some(tokens);
        self
    }

    pub fn with_completion_tokens(mut self, tokens: u32) -> Self {
        self.completion_tokens = Some(tokens);
        self
    }

    pub fn with_total_tokens(mut self, tokens: u32) -> Self {
        self.total_tokens = Some(tokens);
        self
    }

    /// Appends an endpoint-specific field. `null` values are dropped.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        if !value.is_null() {
            self.extra.insert(key.into(), value);
        }
        self
    }

    /// Stamps the process-wide labels captured at init time.
    pub fn labelled(mut self, labels: &Labels) -> Self {
        self.environment = labels.environment.clone();
        self.application_name = labels.application_name.clone();
        self.skip_resp = labels.skip_response;
        self
    }

    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// One record per candidate: the template is cloned and only `response` differs.
pub fn fan_out<I, S>(template: TelemetryRecord, responses: I) -> Vec<TelemetryRecord>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    responses
        .into_iter()
        .map(|response| template.clone().with_response(response))
        .collect()
}
