use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use llmeter_core::estimate_tokens;
use llmeter_core::prelude::*;

#[derive(Clone, Default)]
struct RecordingSink {
    records: Arc<Mutex<Vec<TelemetryRecord>>>,
    fail: bool,
}

impl RecordingSink {
    fn records(&self) -> Vec<TelemetryRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TelemetrySink for RecordingSink {
    async fn submit(&self, record: &TelemetryRecord) -> Result<(), SinkError> {
        if self.fail {
            return Err(SinkError::Other("collector unreachable".to_string()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Chunk {
    id: String,
    text: Option<String>,
    usage: Option<TokenUsage>,
    finish: Option<String>,
}

impl Chunk {
    fn text(text: &str) -> Self {
        Self {
            id: "stream-1".to_string(),
            text: Some(text.to_string()),
            usage: None,
            finish: None,
        }
    }
}

impl ResponseExtractor for Chunk {
    fn extract_delta(&self) -> Option<&str> {
        self.text.as_deref()
    }

    fn extract_usage(&self) -> Option<TokenUsage> {
        self.usage
    }

    fn extract_finish_reason(&self) -> Option<&str> {
        self.finish.as_deref()
    }

    fn extract_request_id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

fn upstream_chunks() -> Vec<Chunk> {
    let mut last = Chunk::text(" four");
    last.finish = Some("stop".to_string());
    vec![
        Chunk::text("one"),
        Chunk::text(" two"),
        Chunk::text(" three"),
        last,
    ]
}

fn backend(chunks: Vec<Chunk>) -> StreamEndpoint<String, Chunk, LlmeterError> {
    StreamEndpoint::from_iter(move |_prompt: String| {
        Ok::<_, LlmeterError>(chunks.clone().into_iter().map(Ok).collect::<Vec<_>>())
    })
}

fn build(prompt: &String) -> impl FnOnce(StreamAccumulator, Duration) -> TelemetryRecord {
    let prompt = prompt.clone();
    move |accumulator, elapsed| {
        let mut record = TelemetryRecord::new("test.stream", elapsed).with_prompt(prompt.clone());
        if let Some(id) = accumulator.request_id() {
            record = record.with_request_id(id);
        }
        if let Some(reason) = accumulator.finish_reason() {
            record = record.with_finish_reason(reason);
        }
        let usage = accumulator
            .usage()
            .unwrap_or_else(|| TokenUsage::estimated(&prompt, accumulator.text()));
        record.with_usage(usage).with_response(accumulator.into_text())
    }
}

fn recorder(sink: &RecordingSink) -> Recorder {
    Recorder::new(Labels::default(), Arc::new(sink.clone()))
}

#[tokio::test]
async fn caller_sees_every_chunk_in_order() {
    let sink = RecordingSink::default();
    let wrapped = instrument_stream(backend(upstream_chunks()), recorder(&sink), build);

    let observed: Vec<Chunk> = wrapped
        .call("count".to_string())
        .await
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;

    assert_eq!(observed, upstream_chunks());
}

#[tokio::test]
async fn exhausted_stream_emits_exactly_one_record() {
    let sink = RecordingSink::default();
    let wrapped = instrument_stream(backend(upstream_chunks()), recorder(&sink), build);

    let mut proxy = wrapped.call("count".to_string()).await.unwrap();
    while let Some(item) = proxy.next().await {
        item.unwrap();
    }

    let records = sink.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.response.as_deref(), Some("one two three four"));
    assert_eq!(record.request_id.as_deref(), Some("stream-1"));
    assert_eq!(record.finish_reason.as_deref(), Some("stop"));
    assert_eq!(record.completion_tokens, Some(6));
    assert_eq!(record.prompt_tokens, Some(estimate_tokens("count")));
    assert_eq!(
        record.total_tokens,
        Some(record.prompt_tokens.unwrap() + record.completion_tokens.unwrap())
    );
    assert!(record.request_duration >= 0.0);
}

#[tokio::test]
async fn no_record_until_exhaustion() {
    let sink = RecordingSink::default();
    let wrapped = instrument_stream(backend(upstream_chunks()), recorder(&sink), build);

    let mut proxy = wrapped.call("count".to_string()).await.unwrap();
    for _ in 0..upstream_chunks().len() {
        proxy.next().await.unwrap().unwrap();
        assert!(sink.records().is_empty());
    }
    assert!(proxy.next().await.is_none());
    assert_eq!(sink.records().len(), 1);
}

#[tokio::test]
async fn abandoned_stream_emits_nothing() {
    let sink = RecordingSink::default();
    let wrapped = instrument_stream(backend(upstream_chunks()), recorder(&sink), build);

    let mut proxy = wrapped.call("count".to_string()).await.unwrap();
    proxy.next().await.unwrap().unwrap();
    proxy.next().await.unwrap().unwrap();
    drop(proxy);

    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn provider_usage_wins_over_estimate() {
    let sink = RecordingSink::default();
    let mut chunks = upstream_chunks();
    chunks.push(Chunk {
        id: "stream-1".to_string(),
        text: None,
        usage: Some(TokenUsage::reported(9, 4, 13)),
        finish: None,
    });
    let wrapped = instrument_stream(backend(chunks), recorder(&sink), build);

    let _: Vec<_> = wrapped.call("count".to_string()).await.unwrap().collect().await;

    let record = &sink.records()[0];
    assert_eq!(record.prompt_tokens, Some(9));
    assert_eq!(record.completion_tokens, Some(4));
    assert_eq!(record.total_tokens, Some(13));
}

#[tokio::test]
async fn upstream_is_not_opened_twice_and_not_polled_early() {
    let opened = Arc::new(AtomicUsize::new(0));
    let pulled = Arc::new(AtomicUsize::new(0));
    let sink = RecordingSink::default();
    let original = {
        let opened = opened.clone();
        let pulled = pulled.clone();
        StreamEndpoint::new(move |_prompt: String| {
            opened.fetch_add(1, Ordering::SeqCst);
            let pulled = pulled.clone();
            async move {
                let chunks = stream::iter(upstream_chunks()).map(move |chunk| {
                    pulled.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, LlmeterError>(chunk)
                });
                Ok(chunks)
            }
        })
    };
    let wrapped = instrument_stream(original, recorder(&sink), build);

    let mut proxy = wrapped.call("count".to_string()).await.unwrap();
    assert_eq!(opened.load(Ordering::SeqCst), 1);
    assert_eq!(pulled.load(Ordering::SeqCst), 0);

    proxy.next().await.unwrap().unwrap();
    assert_eq!(pulled.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn open_failure_is_returned_unchanged() {
    let sink = RecordingSink::default();
    let original = StreamEndpoint::<String, Chunk, LlmeterError>::from_iter(|_prompt: String| {
        Err::<Vec<Result<Chunk, LlmeterError>>, _>(LlmeterError::Provider("bad key".to_string()))
    });
    let wrapped = instrument_stream(original, recorder(&sink), build);

    let err = match wrapped.call("count".to_string()).await {
        Ok(_) => panic!("open should fail"),
        Err(err) => err,
    };
    assert!(matches!(err, LlmeterError::Provider(_)));
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn mid_stream_error_is_forwarded_and_ends_the_proxy() {
    let sink = RecordingSink::default();
    let original = StreamEndpoint::from_iter(|_prompt: String| {
        Ok::<_, LlmeterError>(vec![
            Ok(Chunk::text("partial")),
            Err(LlmeterError::Provider("connection reset".to_string())),
            Ok(Chunk::text("never seen")),
        ])
    });
    let wrapped = instrument_stream(original, recorder(&sink), build);

    let items: Vec<_> = wrapped.call("count".to_string()).await.unwrap().collect().await;

    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert!(matches!(&items[1], Err(LlmeterError::Provider(_))));
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn sink_failure_surfaces_as_final_error_item() {
    let sink = RecordingSink {
        records: Arc::default(),
        fail: true,
    };
    let wrapped = instrument_stream(backend(upstream_chunks()), recorder(&sink), build);

    let items: Vec<_> = wrapped.call("count".to_string()).await.unwrap().collect().await;

    assert_eq!(items.len(), upstream_chunks().len() + 1);
    assert!(items[..upstream_chunks().len()].iter().all(Result::is_ok));
    assert!(matches!(
        items.last(),
        Some(Err(LlmeterError::Telemetry(SinkError::Other(_))))
    ));
}
