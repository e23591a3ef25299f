//! Per-call state for streamed responses.

use std::time::Duration;

use crate::{TelemetryRecord, TokenUsage};

/// Field access on one upstream stream item.
///
/// Providers disagree on where usage and finish reasons show up (last
/// content chunk, a trailing chunk, a dedicated end event), so each chunk type
/// reports what it carries and [`StreamAccumulator`] stays provider-agnostic.
pub trait ResponseExtractor {
    /// Text fragment carried by this item, if any.
    fn extract_delta(&self) -> Option<&str>;

    fn extract_usage(&self) -> Option<TokenUsage> {
        None
    }

    fn extract_finish_reason(&self) -> Option<&str> {
        None
    }

    fn extract_request_id(&self) -> Option<&str> {
        None
    }

    fn extract_model(&self) -> Option<&str> {
        None
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StreamAccumulator {
    text: String,
    request_id: Option<String>,
    model: Option<String>,
    usage: Option<TokenUsage>,
    finish_reason: Option<String>,
    chunks: usize,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one upstream item into the accumulated state.
    ///
    /// Request id and model are kept from the first item that carries them;
    /// usage and finish reason from the last one.
    pub fn observe<C: ResponseExtractor + ?Sized>(&mut self, chunk: &C) {
        if let Some(delta) = chunk.extract_delta() {
            self.text.push_str(delta);
        }
        if self.request_id.is_none() {
            self.request_id = chunk.extract_request_id().map(str::to_string);
        }
        if self.model.is_none() {
            self.model = chunk.extract_model().map(str::to_string);
        }
        if let Some(usage) = chunk.extract_usage() {
            self.usage = Some(usage);
        }
        if let Some(reason) = chunk.extract_finish_reason() {
            self.finish_reason = Some(reason.to_string());
        }
        self.chunks += 1;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn usage(&self) -> Option<TokenUsage> {
        self.usage
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.finish_reason.as_deref()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Record carrying everything observed on the stream: request id,
    /// finish reason, provider usage when one was seen, and the full text.
    pub fn into_record(self, endpoint: impl Into<String>, elapsed: Duration) -> TelemetryRecord {
        let mut record = TelemetryRecord::new(endpoint, elapsed);
        record.request_id = self.request_id;
        record.finish_reason = self.finish_reason;
        if let Some(usage) = self.usage {
            record = record.with_usage(usage);
        }
        record.with_response(self.text)
    }
}
