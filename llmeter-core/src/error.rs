use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmeterError {
    #[error("LLM provider failed: {0}")]
    Provider(String),
    #[error("Telemetry submission failed: {0}")]
    Telemetry(#[from] SinkError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failure reported by a [`crate::TelemetrySink`] while submitting a record.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("collector responded with status {status}: {body}")]
    Http { status: u16, body: String },
    #[error("collector transport failed: {0}")]
    Transport(#[source] Box<dyn StdError + Send + Sync>),
    #[error("record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

impl SinkError {
    pub fn transport<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        SinkError::Transport(Box::new(error))
    }
}
