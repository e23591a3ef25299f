//! HTTP telemetry sink for llmeter.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use llmeter_collector::{CollectorClient, CollectorConfig};
//! use llmeter_core::{Labels, Recorder};
//! use secrecy::SecretString;
//!
//! # fn main() -> Result<(), llmeter_collector::CollectorError> {
//! let config = CollectorConfig::new(
//!     "https://collector.example.com",
//!     SecretString::new("token".to_string()),
//! );
//! let sink = CollectorClient::new(config)?;
//! let recorder = Recorder::new(Labels::new("production", "support-bot"), Arc::new(sink));
//! # let _ = recorder;
//! # Ok(())
//! # }
//! ```
mod client;
mod config;
mod sanitize;

pub use client::{CollectorClient, CollectorError};
pub use config::{CollectorConfig, DEFAULT_TIMEOUT};
pub use sanitize::{redact_text, truncate_text, Sanitizer};
