use std::sync::Arc;

use async_trait::async_trait;

use crate::{SinkError, TelemetryRecord};

/// Destination for finished telemetry records.
///
/// Implementations must bound their own latency; the pipeline awaits
/// `submit` inline with the instrumented call.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn submit(&self, record: &TelemetryRecord) -> Result<(), SinkError>;
}

#[async_trait]
impl<T> TelemetrySink for Arc<T>
where
    T: TelemetrySink + ?Sized,
{
    async fn submit(&self, record: &TelemetryRecord) -> Result<(), SinkError> {
        (**self).submit(record).await
    }
}

/// Caller-supplied labels, fixed for the lifetime of an instrumented client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Labels {
    pub environment: String,
    pub application_name: String,
    /// Hint for the collector that bodies may be dropped. Not enforced here.
    pub skip_response: bool,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            environment: "default".to_string(),
            application_name: "default".to_string(),
            skip_response: false,
        }
    }
}

impl Labels {
    pub fn new(environment: impl Into<String>, application_name: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            application_name: application_name.into(),
            skip_response: false,
        }
    }

    pub fn with_skip_response(mut self, skip_response: bool) -> Self {
        self.skip_response = skip_response;
        self
    }
}

/// Labels plus sink, closed over by every wrapped endpoint of one client.
#[derive(Clone)]
pub struct Recorder {
    labels: Arc<Labels>,
    sink: Arc<dyn TelemetrySink>,
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

impl Recorder {
    pub fn new(labels: Labels, sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            labels: Arc::new(labels),
            sink,
        }
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Labels and submits each record in order, stopping at the first failure.
    ///
    /// Failures are logged and returned; the caller decides how to surface them.
    pub async fn emit(&self, records: Vec<TelemetryRecord>) -> Result<(), SinkError> {
        for record in records {
            let record = record.labelled(&self.labels);
            match self.sink.submit(&record).await {
                Ok(()) => {
                    tracing::debug!(
                        endpoint = %record.endpoint,
                        duration_s = record.request_duration,
                        "telemetry record submitted"
                    );
                }
                Err(err) => {
                    tracing::error!(
                        endpoint = %record.endpoint,
                        error = %err,
                        "failed to submit telemetry record"
                    );
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}
