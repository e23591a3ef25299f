//! Capture-and-emit pipeline.
//!
//! [`instrument`] covers single-shot calls: the record builder may return one
//! record (single result) or one per candidate (`n`-way sampling), and all of
//! them are submitted before the response is handed back.
//!
//! [`instrument_stream`] returns a proxy stream that forwards every upstream
//! item untouched while folding it into a [`StreamAccumulator`]. The record is
//! built and submitted once, when upstream reports exhaustion. A proxy that is
//! dropped early takes its accumulator with it and emits nothing.

use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};

use crate::{
    CallFuture, ChunkStream, Endpoint, Recorder, ResponseExtractor, SinkError, StreamAccumulator,
    StreamEndpoint, TelemetryRecord,
};

/// Wraps a single-shot endpoint.
///
/// `build` runs against the request before it is handed to the backend and
/// returns the finisher that turns the response and elapsed time into records.
/// Backend errors are returned as-is and nothing is recorded. Sink errors are
/// converted into `E` and returned in place of the response.
pub fn instrument<Req, Resp, E, B, F>(
    original: Endpoint<Req, Resp, E>,
    recorder: Recorder,
    build: B,
) -> Endpoint<Req, Resp, E>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    E: From<SinkError> + Send + 'static,
    B: Fn(&Req) -> F + Send + Sync + 'static,
    F: FnOnce(&Resp, Duration) -> Vec<TelemetryRecord> + Send + 'static,
{
    Endpoint::new(move |request: Req| {
        let started = Instant::now();
        let finish = build(&request);
        let call = original.call(request);
        let recorder = recorder.clone();
        async move {
            let response = call.await?;
            let records = finish(&response, started.elapsed());
            recorder.emit(records).await?;
            Ok(response)
        }
    })
}

/// Wraps a streaming endpoint.
///
/// The wrapped call resolves as soon as upstream has opened the stream; no
/// chunk is pulled until the caller polls the returned proxy.
pub fn instrument_stream<Req, C, E, B, F>(
    original: StreamEndpoint<Req, C, E>,
    recorder: Recorder,
    build: B,
) -> StreamEndpoint<Req, C, E>
where
    Req: Send + 'static,
    C: ResponseExtractor + Send + 'static,
    E: From<SinkError> + Send + 'static,
    B: Fn(&Req) -> F + Send + Sync + 'static,
    F: FnOnce(StreamAccumulator, Duration) -> TelemetryRecord + Send + 'static,
{
    StreamEndpoint::new(move |request: Req| {
        let started = Instant::now();
        let finish = build(&request);
        let open: CallFuture<ChunkStream<C, E>, E> = original.call(request);
        let recorder = recorder.clone();
        async move {
            let upstream = open.await?;
            Ok(accumulate(upstream, recorder, started, finish))
        }
    })
}

enum StreamState<C, E, F> {
    Streaming {
        upstream: ChunkStream<C, E>,
        accumulator: StreamAccumulator,
        recorder: Recorder,
        started: Instant,
        finish: F,
    },
    Done,
}

/// Proxy stream: forwards items in order, emits one record on exhaustion.
///
/// An upstream error is forwarded and ends the proxy without a record. A sink
/// failure after exhaustion is yielded as one final error item.
pub fn accumulate<C, E, F>(
    upstream: ChunkStream<C, E>,
    recorder: Recorder,
    started: Instant,
    finish: F,
) -> ChunkStream<C, E>
where
    C: ResponseExtractor + Send + 'static,
    E: From<SinkError> + Send + 'static,
    F: FnOnce(StreamAccumulator, Duration) -> TelemetryRecord + Send + 'static,
{
    let initial = StreamState::Streaming {
        upstream,
        accumulator: StreamAccumulator::new(),
        recorder,
        started,
        finish,
    };

    stream::unfold(initial, |state| async move {
        match state {
            StreamState::Streaming {
                mut upstream,
                mut accumulator,
                recorder,
                started,
                finish,
            } => match upstream.next().await {
                Some(Ok(chunk)) => {
                    accumulator.observe(&chunk);
                    let next = StreamState::Streaming {
                        upstream,
                        accumulator,
                        recorder,
                        started,
                        finish,
                    };
                    Some((Ok(chunk), next))
                }
                Some(Err(err)) => Some((Err(err), StreamState::Done)),
                None => {
                    let record = finish(accumulator, started.elapsed());
                    match recorder.emit(vec![record]).await {
                        Ok(()) => None,
                        Err(err) => Some((Err(E::from(err)), StreamState::Done)),
                    }
                }
            },
            StreamState::Done => None,
        }
    })
    .boxed()
}
