//! # Restbind Core
//!
//! Core types and traits for the restbind request-binding layer.
//!
//! This crate provides the foundational types used throughout restbind:
//!
//! - [`FrameworkAdapter`] - Accessors over the current request, implemented by web-framework glue
//! - [`HttpAdapter`] - Adapter over a buffered `http::Request`
//! - [`RequestContext`] - Per-request state (request id, active version, page size, error policy)
//! - [`RestError`] / [`ErrorKind`] - Error taxonomy and its status/title table
//! - [`Versioner`] / [`VersionHooks`] - Per-version request and response rewriting
//! - [`BoundArgs`] / [`HandlerFn`] - Resolved arguments and handler functions

#![doc(html_root_url = "https://docs.rs/restbind-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod adapter;
mod args;
mod context;
mod error;
mod handler;
mod http_adapter;
mod versioning;

pub use adapter::{json_response, try_with_version_hooks, with_version_hooks, FrameworkAdapter, QueryArgs};
pub use args::{ArgValue, BoundArgs};
pub use context::{ErrorPolicy, PageSize, RequestContext, RequestId, UNIQUE_ID_HEADER};
pub use error::{ErrorKind, RestError, RestResult};
pub use handler::{HandlerFn, HandlerFuture};
pub use http_adapter::{parse_query, HttpAdapter, HttpAdapterBuilder};
pub use versioning::{ActiveVersion, NoopHooks, VersionHooks, VersionStrategy, Versioner, VERSION_ARG};
