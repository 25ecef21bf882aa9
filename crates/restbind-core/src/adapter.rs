//! The web-framework adapter contract.
//!
//! Binders and response builders never touch a framework's request type
//! directly. They go through [`FrameworkAdapter`], which exposes accessors for
//! the current request and a response constructor.

use crate::context::RequestContext;
use crate::error::RestResult;
use crate::versioning::VersionHooks;
use async_trait::async_trait;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Method, Response, StatusCode};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// Query-string arguments: every key maps to all of its values, in order.
pub type QueryArgs = IndexMap<String, Vec<String>>;

/// Accessors over the request currently being handled.
#[async_trait]
pub trait FrameworkAdapter: Send + Sync {
    /// Returns the raw request body.
    async fn request_body(&self) -> RestResult<Bytes>;

    /// Returns the parsed query-string arguments.
    fn query_string_args(&self) -> QueryArgs;

    /// Returns the raw query string, without the leading `?`.
    fn query_string(&self) -> String;

    /// Returns the request headers.
    fn headers(&self) -> HeaderMap;

    /// Returns the request path.
    fn path(&self) -> String;

    /// Returns the path followed by `?` and the query string when one exists.
    fn full_path(&self) -> String {
        let query = self.query_string();
        if query.is_empty() {
            self.path()
        } else {
            format!("{}?{query}", self.path())
        }
    }

    /// Returns the full request URL.
    fn url(&self) -> String;

    /// Returns the request method.
    fn method(&self) -> Method;

    /// Attaches the request context to the current request.
    fn attach_request_context(&self, context: Arc<RequestContext>);

    /// Returns the request context attached to the current request.
    fn request_context(&self) -> Option<Arc<RequestContext>>;

    /// Builds a wire response from a JSON body.
    fn make_response(&self, body: &Value, status: StatusCode, headers: HeaderMap) -> Response<Bytes> {
        json_response(body, status, headers)
    }

    /// Returns `true` when handlers are being called directly by tests,
    /// in which case binding is skipped.
    fn is_in_test(&self) -> bool {
        false
    }
}

/// Runs `f` with the hooks of the active version, if any.
///
/// This is the helper resolvers and response builders use to apply the
/// request-scoped versioning transform.
pub fn with_version_hooks<T>(
    adapter: &dyn FrameworkAdapter,
    value: T,
    f: impl FnOnce(&dyn VersionHooks, T) -> T,
) -> T {
    match adapter.request_context() {
        Some(ctx) => match ctx.version() {
            Some(version) => f(version.hooks(), value),
            None => value,
        },
        None => value,
    }
}

/// Fallible variant of [`with_version_hooks`].
pub fn try_with_version_hooks<T>(
    adapter: &dyn FrameworkAdapter,
    value: T,
    f: impl FnOnce(&dyn VersionHooks, T) -> RestResult<T>,
) -> RestResult<T> {
    match adapter.request_context() {
        Some(ctx) => match ctx.version() {
            Some(version) => f(version.hooks(), value),
            None => Ok(value),
        },
        None => Ok(value),
    }
}

/// Builds a JSON response.
///
/// The caller's headers are applied after `Content-Type`, so they may
/// override it.
pub fn json_response(body: &Value, status: StatusCode, headers: HeaderMap) -> Response<Bytes> {
    let bytes = serde_json::to_vec(body).unwrap_or_default();
    let mut response = Response::new(Bytes::from(bytes));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    for (name, value) in &headers {
        response.headers_mut().insert(name.clone(), value.clone());
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_response() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("30"));

        let response = json_response(&json!({"a": 1}), StatusCode::CREATED, headers);

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(response.headers().get("retry-after").unwrap(), "30");
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body, json!({"a": 1}));
    }
}
