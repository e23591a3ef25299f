use std::time::Duration;

use llmeter_collector::DEFAULT_TIMEOUT;
use llmeter_core::Labels;
use regex::Regex;

pub const ENV_URL: &str = "LLMETER_URL";
pub const ENV_API_KEY: &str = "LLMETER_API_KEY";
pub const ENV_ENVIRONMENT: &str = "LLMETER_ENVIRONMENT";
pub const ENV_APPLICATION_NAME: &str = "LLMETER_APPLICATION_NAME";

/// Labels and collector settings for [`crate::init`].
#[derive(Clone, Debug)]
pub struct LlmeterOptions {
    pub(crate) environment: String,
    pub(crate) application_name: String,
    pub(crate) skip_response: bool,
    pub(crate) timeout: Duration,
    pub(crate) redact_regex: Option<Regex>,
    pub(crate) max_field_bytes: Option<usize>,
}

impl Default for LlmeterOptions {
    fn default() -> Self {
        let labels = Labels::default();
        Self {
            environment: labels.environment,
            application_name: labels.application_name,
            skip_response: labels.skip_response,
            timeout: DEFAULT_TIMEOUT,
            redact_regex: None,
            max_field_bytes: None,
        }
    }
}

impl LlmeterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `LLMETER_ENVIRONMENT` and
    /// `LLMETER_APPLICATION_NAME` when set.
    pub fn from_env() -> Self {
        Self::new()
            .environment_from_env(ENV_ENVIRONMENT)
            .application_name_from_env(ENV_APPLICATION_NAME)
    }

    pub fn environment(mut self, value: impl Into<String>) -> Self {
        self.environment = value.into();
        self
    }

    pub fn application_name(mut self, value: impl Into<String>) -> Self {
        self.application_name = value.into();
        self
    }

    pub fn skip_response(mut self, value: bool) -> Self {
        self.skip_response = value;
        self
    }

    pub fn timeout(mut self, value: Duration) -> Self {
        self.timeout = value;
        self
    }

    /// Matches in prompts and responses are replaced before submission.
    pub fn redact_regex(mut self, value: Regex) -> Self {
        self.redact_regex = Some(value);
        self
    }

    pub fn max_field_bytes(mut self, value: usize) -> Self {
        self.max_field_bytes = Some(value);
        self
    }

    pub fn environment_from_env(mut self, var_name: &str) -> Self {
        if let Ok(value) = std::env::var(var_name) {
            self.environment = value;
        }
        self
    }

    pub fn application_name_from_env(mut self, var_name: &str) -> Self {
        if let Ok(value) = std::env::var(var_name) {
            self.application_name = value;
        }
        self
    }

    pub fn labels(&self) -> Labels {
        Labels::new(self.environment.clone(), self.application_name.clone())
            .with_skip_response(self.skip_response)
    }
}
