// Prelude module for llmeter-core
//
// Import commonly used types with: `use llmeter_core::prelude::*;`

pub use crate::{
    // Pipeline
    instrument,
    instrument_stream,
    Endpoint,
    StreamEndpoint,
    WrappedEndpoints,
    // Records
    Labels,
    Recorder,
    TelemetryRecord,
    TelemetrySink,
    TokenUsage,
    // Streaming
    ResponseExtractor,
    StreamAccumulator,
    // Messages
    ChatMessage,
    MessageContent,
    Role,
    // Errors
    LlmeterError,
    SinkError,
};
