//! Handler function types.
//!
//! A handler receives the framework adapter and its bound arguments and
//! returns a wire response. Handlers may be synchronous or asynchronous; a
//! synchronous handler is called directly, with no suspension point added.

use crate::adapter::FrameworkAdapter;
use crate::args::BoundArgs;
use crate::error::RestResult;
use bytes::Bytes;
use http::Response;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by asynchronous handlers.
pub type HandlerFuture = Pin<Box<dyn Future<Output = RestResult<Response<Bytes>>> + Send>>;

type SyncFn = dyn Fn(Arc<dyn FrameworkAdapter>, BoundArgs) -> RestResult<Response<Bytes>> + Send + Sync;
type AsyncFn = dyn Fn(Arc<dyn FrameworkAdapter>, BoundArgs) -> HandlerFuture + Send + Sync;

/// A request handler.
///
/// # Example
///
/// ```rust
/// use restbind_core::{json_response, BoundArgs, FrameworkAdapter, HandlerFn, RestError};
/// use http::{HeaderMap, StatusCode};
/// use std::sync::Arc;
///
/// let sync_handler = HandlerFn::sync(|_adapter: Arc<dyn FrameworkAdapter>, _args: BoundArgs| {
///     Ok(json_response(&serde_json::json!({}), StatusCode::OK, HeaderMap::new()))
/// });
///
/// let async_handler = HandlerFn::from_async(|_adapter, mut args: BoundArgs| async move {
///     let name: String = args.take("name")?;
///     Ok::<_, RestError>(json_response(&serde_json::json!({ "name": name }), StatusCode::OK, HeaderMap::new()))
/// });
///
/// assert!(!sync_handler.is_async());
/// assert!(async_handler.is_async());
/// ```
#[derive(Clone)]
pub enum HandlerFn {
    /// A synchronous handler.
    Sync(Arc<SyncFn>),
    /// An asynchronous handler.
    Async(Arc<AsyncFn>),
}

impl HandlerFn {
    /// Wraps a synchronous function.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Arc<dyn FrameworkAdapter>, BoundArgs) -> RestResult<Response<Bytes>>
            + Send
            + Sync
            + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    /// Wraps an asynchronous function.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<dyn FrameworkAdapter>, BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RestResult<Response<Bytes>>> + Send + 'static,
    {
        Self::Async(Arc::new(move |adapter, args| Box::pin(f(adapter, args))))
    }

    /// Returns `true` for asynchronous handlers.
    #[must_use]
    pub const fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }

    /// Invokes the handler.
    pub async fn call(
        &self,
        adapter: Arc<dyn FrameworkAdapter>,
        args: BoundArgs,
    ) -> RestResult<Response<Bytes>> {
        match self {
            Self::Sync(f) => f(adapter, args),
            Self::Async(f) => f(adapter, args).await,
        }
    }
}

impl fmt::Debug for HandlerFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("HandlerFn::Sync"),
            Self::Async(_) => f.write_str("HandlerFn::Async"),
        }
    }
}
