//! An adapter over an in-memory `http::Request`.
//!
//! [`HttpAdapter`] implements [`FrameworkAdapter`] for a fully buffered
//! request. It is what hyper-style servers hand to the dispatcher, and what
//! tests use to simulate requests.

use crate::adapter::{FrameworkAdapter, QueryArgs};
use crate::context::RequestContext;
use crate::error::RestResult;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::HeaderName;
use http::{header, HeaderMap, HeaderValue, Method, Request, Uri};
use parking_lot::RwLock;
use std::sync::Arc;

/// Adapter over a buffered HTTP request.
///
/// # Example
///
/// ```rust
/// use restbind_core::{FrameworkAdapter, HttpAdapter};
/// use http::Method;
///
/// let adapter = HttpAdapter::builder()
///     .method(Method::POST)
///     .uri("/items?page=2&x=3")
///     .header("X-Unique-ID", "abc")
///     .body(r#"{"a": 1}"#)
///     .build();
///
/// assert_eq!(adapter.path(), "/items");
/// assert_eq!(adapter.query_string(), "page=2&x=3");
/// assert_eq!(adapter.query_string_args()["x"], vec!["3".to_string()]);
/// ```
#[derive(Debug)]
pub struct HttpAdapter {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    context: RwLock<Option<Arc<RequestContext>>>,
    in_test: bool,
}

impl HttpAdapter {
    /// Creates a new adapter.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            context: RwLock::new(None),
            in_test: false,
        }
    }

    /// Creates an adapter from a buffered request.
    #[must_use]
    pub fn from_request(request: Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self::new(parts.method, parts.uri, parts.headers, body)
    }

    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> HttpAdapterBuilder {
        HttpAdapterBuilder::new()
    }

    /// Marks the adapter as being driven by a test, bypassing binding.
    #[must_use]
    pub fn in_test(mut self, in_test: bool) -> Self {
        self.in_test = in_test;
        self
    }

    /// Returns the URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }
}

#[async_trait]
impl FrameworkAdapter for HttpAdapter {
    async fn request_body(&self) -> RestResult<Bytes> {
        Ok(self.body.clone())
    }

    fn query_string_args(&self) -> QueryArgs {
        parse_query(&self.query_string())
    }

    fn query_string(&self) -> String {
        self.uri.query().unwrap_or_default().to_string()
    }

    fn headers(&self) -> HeaderMap {
        self.headers.clone()
    }

    fn path(&self) -> String {
        self.uri.path().to_string()
    }

    fn url(&self) -> String {
        if self.uri.scheme().is_some() {
            return self.uri.to_string();
        }
        let host = self
            .headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("localhost");
        format!("http://{host}{}", self.full_path())
    }

    fn method(&self) -> Method {
        self.method.clone()
    }

    fn attach_request_context(&self, context: Arc<RequestContext>) {
        *self.context.write() = Some(context);
    }

    fn request_context(&self) -> Option<Arc<RequestContext>> {
        self.context.read().clone()
    }

    fn is_in_test(&self) -> bool {
        self.in_test
    }
}

/// Parses a query string into ordered multi-valued arguments.
///
/// A key without `=` gets an empty value, so `?flag` yields `flag = [""]`.
#[must_use]
pub fn parse_query(query: &str) -> QueryArgs {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "unparseable query string");
        Vec::new()
    });

    let mut args = QueryArgs::new();
    for (key, value) in pairs {
        args.entry(key).or_default().push(value);
    }
    args
}

/// Builder for constructing an [`HttpAdapter`].
#[derive(Debug)]
pub struct HttpAdapterBuilder {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    in_test: bool,
}

impl HttpAdapterBuilder {
    /// Creates a new builder for `GET /`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            uri: Uri::from_static("/"),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            in_test: false,
        }
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the URI. An unparseable URI is ignored.
    #[must_use]
    pub fn uri(mut self, uri: &str) -> Self {
        match uri.parse() {
            Ok(uri) => self.uri = uri,
            Err(e) => tracing::warn!(uri, error = %e, "ignoring invalid URI"),
        }
        self
    }

    /// Sets the headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Adds a single header. Invalid names or values are ignored.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Marks the adapter as being driven by a test.
    #[must_use]
    pub fn in_test(mut self, in_test: bool) -> Self {
        self.in_test = in_test;
        self
    }

    /// Builds the adapter.
    #[must_use]
    pub fn build(self) -> HttpAdapter {
        HttpAdapter::new(self.method, self.uri, self.headers, self.body).in_test(self.in_test)
    }
}

impl Default for HttpAdapterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_groups_values() {
        let args = parse_query("a=1&b=2&a=3&flag");
        assert_eq!(args["a"], vec!["1", "3"]);
        assert_eq!(args["b"], vec!["2"]);
        assert_eq!(args["flag"], vec![""]);
        assert_eq!(args.keys().collect::<Vec<_>>(), vec!["a", "b", "flag"]);
    }

    #[test]
    fn test_parse_query_decodes() {
        let args = parse_query("q=hello%20world&r=a+b");
        assert_eq!(args["q"], vec!["hello world"]);
        assert_eq!(args["r"], vec!["a b"]);
    }

    #[test]
    fn test_full_path_and_url() {
        let adapter = HttpAdapter::builder()
            .uri("/items?page=2")
            .header("host", "api.example.com")
            .build();
        assert_eq!(adapter.full_path(), "/items?page=2");
        assert_eq!(adapter.url(), "http://api.example.com/items?page=2");

        let bare = HttpAdapter::builder().uri("/items").build();
        assert_eq!(bare.full_path(), "/items");
    }

    #[test]
    fn test_from_request() {
        let request = Request::builder()
            .method(Method::PUT)
            .uri("/things/1")
            .body(Bytes::from_static(b"{}"))
            .unwrap();
        let adapter = HttpAdapter::from_request(request);

        assert_eq!(adapter.method(), Method::PUT);
        assert_eq!(tokio_test::block_on(adapter.request_body()).unwrap(), "{}");
    }

    #[test]
    fn test_context_attachment() {
        let adapter = HttpAdapter::builder().build();
        assert!(adapter.request_context().is_none());

        let ctx = Arc::new(RequestContext::new());
        adapter.attach_request_context(Arc::clone(&ctx));
        assert_eq!(
            adapter.request_context().unwrap().request_id(),
            ctx.request_id()
        );
    }

    #[test]
    fn test_in_test_flag() {
        assert!(!HttpAdapter::builder().build().is_in_test());
        assert!(HttpAdapter::builder().in_test(true).build().is_in_test());
    }
}
