use async_trait::async_trait;
use llmeter_core::{SinkError, TelemetryRecord, TelemetrySink};
use reqwest::{header::AUTHORIZATION, Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::{CollectorConfig, Sanitizer};

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http error: {status}")]
    Http { status: StatusCode, body: String },
    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<CollectorError> for SinkError {
    fn from(err: CollectorError) -> Self {
        match err {
            CollectorError::Request(err) => SinkError::transport(err),
            CollectorError::Http { status, body } => SinkError::Http {
                status: status.as_u16(),
                body,
            },
            CollectorError::Encode(err) => SinkError::Serialize(err),
        }
    }
}

/// HTTP sink that pushes one JSON record per request.
#[derive(Clone)]
pub struct CollectorClient {
    client: Client,
    push_url: String,
    api_key: SecretString,
    sanitizer: Sanitizer,
}

impl std::fmt::Debug for CollectorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorClient")
            .field("push_url", &self.push_url)
            .finish_non_exhaustive()
    }
}

impl CollectorClient {
    pub fn new(config: CollectorConfig) -> Result<Self, CollectorError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            push_url: config.push_url(),
            api_key: config.api_key,
            sanitizer: Sanitizer::new(config.redact_regex, config.max_field_bytes),
        })
    }

    pub fn push_url(&self) -> &str {
        &self.push_url
    }

    pub async fn push(&self, record: &TelemetryRecord) -> Result<(), CollectorError> {
        let mut payload = record.to_json()?;
        if !self.sanitizer.is_noop() {
            self.sanitizer.apply(&mut payload);
        }

        tracing::debug!(url = %self.push_url, endpoint = %record.endpoint, "pushing telemetry record");
        let response = self
            .client
            .post(&self.push_url)
            .header(AUTHORIZATION, self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(CollectorError::Http { status, body })
    }
}

#[async_trait]
impl TelemetrySink for CollectorClient {
    async fn submit(&self, record: &TelemetryRecord) -> Result<(), SinkError> {
        self.push(record).await.map_err(SinkError::from)
    }
}
