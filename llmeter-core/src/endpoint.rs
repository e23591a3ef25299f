//! Interception registry.
//!
//! A provider client is modelled as a table of optional endpoint slots. Each
//! slot holds the real backend method as a shared closure; [`wrap`] swaps the
//! slot's content for a wrapper built around the original, which the wrapper
//! owns, so every later call still reaches the real backend.
//!
//! ```rust
//! use llmeter_core::{wrap, Endpoint, LlmeterError};
//!
//! let mut slot: Option<Endpoint<String, usize, LlmeterError>> =
//!     Some(Endpoint::from_sync(|prompt: String| Ok(prompt.len())));
//! let wrapped = wrap(&mut slot, "demo.len", |original| {
//!     Endpoint::new(move |prompt: String| original.call(prompt))
//! });
//! assert!(wrapped);
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::stream::{self, BoxStream, Stream, StreamExt};

pub type CallFuture<T, E> = BoxFuture<'static, Result<T, E>>;
pub type ChunkStream<C, E> = BoxStream<'static, Result<C, E>>;

type CallFn<Req, Resp, E> = dyn Fn(Req) -> CallFuture<Resp, E> + Send + Sync;

/// A single-shot method: one request in, one response out.
pub struct Endpoint<Req, Resp, E> {
    call: Arc<CallFn<Req, Resp, E>>,
}

impl<Req, Resp, E> Clone for Endpoint<Req, Resp, E> {
    fn clone(&self) -> Self {
        Self {
            call: Arc::clone(&self.call),
        }
    }
}

impl<Req, Resp, E> std::fmt::Debug for Endpoint<Req, Resp, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint").finish_non_exhaustive()
    }
}

impl<Req, Resp, E> Endpoint<Req, Resp, E>
where
    Req: 'static,
    Resp: 'static,
    E: 'static,
{
    pub fn new<F, Fut>(method: F) -> Self
    where
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Resp, E>> + Send + 'static,
    {
        let call: Arc<CallFn<Req, Resp, E>> =
            Arc::new(move |request: Req| -> CallFuture<Resp, E> { Box::pin(method(request)) });
        Self { call }
    }

    /// Adapts a method that returns its value directly.
    pub fn from_sync<F>(method: F) -> Self
    where
        F: Fn(Req) -> Result<Resp, E> + Send + Sync + 'static,
        Resp: Send,
        E: Send,
    {
        Self::new(move |request| future::ready(method(request)))
    }

    pub fn call(&self, request: Req) -> CallFuture<Resp, E> {
        (self.call)(request)
    }
}

type OpenFn<Req, C, E> = dyn Fn(Req) -> CallFuture<ChunkStream<C, E>, E> + Send + Sync;

/// A streaming method: the call resolves to a lazily consumed chunk stream.
pub struct StreamEndpoint<Req, C, E> {
    open: Arc<OpenFn<Req, C, E>>,
}

impl<Req, C, E> Clone for StreamEndpoint<Req, C, E> {
    fn clone(&self) -> Self {
        Self {
            open: Arc::clone(&self.open),
        }
    }
}

impl<Req, C, E> std::fmt::Debug for StreamEndpoint<Req, C, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamEndpoint").finish_non_exhaustive()
    }
}

impl<Req, C, E> StreamEndpoint<Req, C, E>
where
    Req: 'static,
    C: Send + 'static,
    E: Send + 'static,
{
    pub fn new<F, Fut, S>(method: F) -> Self
    where
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<S, E>> + Send + 'static,
        S: Stream<Item = Result<C, E>> + Send + 'static,
    {
        let open: Arc<OpenFn<Req, C, E>> =
            Arc::new(move |request: Req| -> CallFuture<ChunkStream<C, E>, E> {
                let opening = method(request);
                Box::pin(async move { opening.await.map(|chunks| chunks.boxed()) })
            });
        Self { open }
    }

    /// Adapts a method that hands back a synchronous iterator of chunks.
    pub fn from_iter<F, I>(method: F) -> Self
    where
        F: Fn(Req) -> Result<I, E> + Send + Sync + 'static,
        I: IntoIterator<Item = Result<C, E>>,
        I::IntoIter: Send + 'static,
    {
        Self::new(move |request| future::ready(method(request).map(stream::iter)))
    }

    pub fn call(&self, request: Req) -> CallFuture<ChunkStream<C, E>, E> {
        (self.open)(request)
    }
}

/// Replaces the method in `slot` with `wrapper(original)`.
///
/// An empty slot is left untouched and reported as `false`; wrapping a slot
/// twice nests the wrappers.
pub fn wrap<T>(slot: &mut Option<T>, path: &str, wrapper: impl FnOnce(T) -> T) -> bool {
    match slot.take() {
        Some(original) => {
            *slot = Some(wrapper(original));
            tracing::debug!(endpoint = path, "endpoint instrumented");
            true
        }
        None => {
            tracing::debug!(endpoint = path, "endpoint not present, skipping");
            false
        }
    }
}

/// Outcome of installing instrumentation on one client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WrappedEndpoints {
    wrapped: Vec<String>,
    skipped: Vec<String>,
}

impl WrappedEndpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// [`wrap`], recording whether the endpoint was present.
    pub fn wrap<T>(
        &mut self,
        slot: &mut Option<T>,
        path: impl Into<String>,
        wrapper: impl FnOnce(T) -> T,
    ) -> &mut Self {
        let path = path.into();
        if wrap(slot, &path, wrapper) {
            self.wrapped.push(path);
        } else {
            self.skipped.push(path);
        }
        self
    }

    pub fn wrapped(&self) -> &[String] {
        &self.wrapped
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn contains(&self, path: &str) -> bool {
        self.wrapped.iter().any(|wrapped| *wrapped == path)
    }
}
