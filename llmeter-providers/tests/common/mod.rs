#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use llmeter_core::{Labels, Recorder, SinkError, TelemetryRecord, TelemetrySink};

#[derive(Clone, Default)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<TelemetryRecord>>>,
}

impl RecordingSink {
    pub fn records(&self) -> Vec<TelemetryRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn recorder(&self) -> Recorder {
        Recorder::new(Labels::new("test", "suite"), Arc::new(self.clone()))
    }
}

#[async_trait::async_trait]
impl TelemetrySink for RecordingSink {
    async fn submit(&self, record: &TelemetryRecord) -> Result<(), SinkError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
