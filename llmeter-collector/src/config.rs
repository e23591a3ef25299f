use std::time::Duration;

use regex::Regex;
use secrecy::SecretString;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct CollectorConfig {
    /// Base URL of the collector; records are pushed to `{api_url}/api/push`.
    pub api_url: String,
    /// Sent verbatim as the `Authorization` header.
    pub api_key: SecretString,
    pub timeout: Duration,
    /// Matches are replaced with `[REDACTED]` in prompts and responses.
    pub redact_regex: Option<Regex>,
    pub max_field_bytes: Option<usize>,
}

impl CollectorConfig {
    pub fn new(api_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            api_url: api_url.into(),
            api_key,
            timeout: DEFAULT_TIMEOUT,
            redact_regex: None,
            max_field_bytes: None,
        }
    }

    pub fn push_url(&self) -> String {
        format!("{}/api/push", self.api_url.trim_end_matches('/'))
    }
}
