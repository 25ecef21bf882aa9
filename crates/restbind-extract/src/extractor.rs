//! The resolver trait.
//!
//! A [`FieldResolver`] knows how to pull one raw value out of a request.
//! It does not deserialize or validate; those steps belong to the
//! [`Binder`](crate::Binder) that owns the resolver.

use std::fmt;

use async_trait::async_trait;
use restbind_core::{FrameworkAdapter, RestResult};
use serde_json::Value;

use crate::ExtractionSource;

/// Extracts a raw value from the request.
///
/// Resolvers return `serde_json::Value` so that query strings, headers and
/// JSON bodies can share one deserialization pipeline.
///
/// # Errors
///
/// Implementations return [`RestError::MissingField`] when the value is
/// absent; binders with a default value rely on that kind to substitute it.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use restbind_core::{FrameworkAdapter, RestResult};
/// use restbind_extract::{ExtractionSource, FieldResolver};
/// use serde_json::Value;
///
/// #[derive(Debug)]
/// struct RequestPath;
///
/// #[async_trait]
/// impl FieldResolver for RequestPath {
///     async fn resolve(&self, adapter: &dyn FrameworkAdapter) -> RestResult<Value> {
///         Ok(Value::String(adapter.path()))
///     }
///
///     fn source(&self) -> ExtractionSource {
///         ExtractionSource::Custom
///     }
///
///     fn source_field(&self) -> &str {
///         "path"
///     }
/// }
/// ```
///
/// [`RestError::MissingField`]: restbind_core::RestError::MissingField
#[async_trait]
pub trait FieldResolver: Send + Sync + fmt::Debug {
    /// Reads the raw value.
    async fn resolve(&self, adapter: &dyn FrameworkAdapter) -> RestResult<Value>;

    /// Where the value comes from.
    fn source(&self) -> ExtractionSource;

    /// The name of the value within its source (header name, query key,
    /// body path).
    fn source_field(&self) -> &str;
}
