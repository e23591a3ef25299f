//! Core of llmeter: telemetry records, the streaming accumulator, and the
//! capture pipeline that wraps provider endpoints.
mod accumulator;
mod endpoint;
mod error;
mod instrument;
mod message;
mod record;
mod sink;
mod usage;

pub mod prelude;

pub use accumulator::{ResponseExtractor, StreamAccumulator};
pub use endpoint::{wrap, CallFuture, ChunkStream, Endpoint, StreamEndpoint, WrappedEndpoints};
pub use error::{LlmeterError, SinkError};
pub use instrument::{accumulate, instrument, instrument_stream};
pub use message::{normalize_messages, ChatMessage, ContentPart, MessageContent, Role};
pub use record::{fan_out, TelemetryRecord, SOURCE_LANGUAGE, TOOL_CALL_RESPONSE};
pub use sink::{Labels, Recorder, TelemetrySink};
pub use usage::{estimate_tokens, TokenUsage};
