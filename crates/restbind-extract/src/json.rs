//! JSON body resolvers.
//!
//! The body is read, passed through the active version's `body` and
//! `body_dict` hooks, then parsed once per request and cached on the
//! request context so that several binders can read from it.

use async_trait::async_trait;
use restbind_core::{try_with_version_hooks, FrameworkAdapter, RestResult};
use serde_json::Value;
use tracing::debug;

use crate::error::{empty_body, invalid_json};
use crate::{ExtractionSource, FieldResolver};

/// Reads and parses the JSON request body.
///
/// # Errors
///
/// - `MissingField` when the body is empty
/// - `InvalidData` when the body is not valid JSON
/// - any error raised by a version hook
pub async fn read_json_body(adapter: &dyn FrameworkAdapter) -> RestResult<Value> {
    let context = adapter.request_context();
    if let Some(body) = context.as_ref().and_then(|ctx| ctx.cached_json_body()) {
        return Ok(body.clone());
    }

    let raw = adapter.request_body().await?;
    let raw = try_with_version_hooks(adapter, raw, |hooks, raw| hooks.body(raw))?;
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(empty_body());
    }

    let parsed: Value = serde_json::from_slice(&raw).map_err(invalid_json)?;
    let parsed = try_with_version_hooks(adapter, parsed, |hooks, body| hooks.body_dict(body))?;
    debug!(bytes = raw.len(), "parsed JSON request body");

    Ok(match context {
        Some(ctx) => ctx.cache_json_body(parsed).clone(),
        None => parsed,
    })
}

/// Follows a `/`-separated path of object keys.
///
/// Empty segments are ignored, so `"/a/b"` and `"a/b"` are the same path.
///
/// ```
/// use serde_json::json;
/// use restbind_extract::resolve_path;
///
/// let body = json!({"a": {"b": {"c": 3}}});
/// assert_eq!(resolve_path(&body, "a/b/c"), Some(&json!(3)));
/// assert_eq!(resolve_path(&body, "a/x"), None);
/// ```
#[must_use]
pub fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

/// Resolves the whole JSON body.
#[derive(Debug, Clone, Default)]
pub struct JsonBodyResolver;

#[async_trait]
impl FieldResolver for JsonBodyResolver {
    async fn resolve(&self, adapter: &dyn FrameworkAdapter) -> RestResult<Value> {
        read_json_body(adapter).await
    }

    fn source(&self) -> ExtractionSource {
        ExtractionSource::Body
    }

    fn source_field(&self) -> &str {
        ""
    }
}

/// Resolves one field of the JSON body, addressed by a `/`-separated path.
#[derive(Debug, Clone)]
pub struct JsonFieldResolver {
    path: String,
}

impl JsonFieldResolver {
    /// Creates a resolver for `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the last segment of the path, the default argument name.
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.path
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or(&self.path)
    }
}

#[async_trait]
impl FieldResolver for JsonFieldResolver {
    async fn resolve(&self, adapter: &dyn FrameworkAdapter) -> RestResult<Value> {
        let body = read_json_body(adapter).await?;
        resolve_path(&body, &self.path)
            .cloned()
            .ok_or_else(|| ExtractionSource::Body.missing(&self.path))
    }

    fn source(&self) -> ExtractionSource {
        ExtractionSource::Body
    }

    fn source_field(&self) -> &str {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use proptest::prelude::*;
    use restbind_core::{
        ActiveVersion, ErrorKind, HttpAdapter, RequestContext, RestResult, VersionHooks, Versioner,
    };
    use serde_json::json;

    fn adapter(body: &str) -> HttpAdapter {
        HttpAdapter::builder()
            .method(http::Method::POST)
            .uri("/items")
            .body(body.to_string())
            .build()
    }

    #[tokio::test]
    async fn test_reads_body() {
        let adapter = adapter(r#"{"data": {"name": "x"}}"#);
        let body = read_json_body(&adapter).await.unwrap();
        assert_eq!(body, json!({"data": {"name": "x"}}));
    }

    #[tokio::test]
    async fn test_empty_body_is_missing() {
        let adapter = adapter("  ");
        let err = read_json_body(&adapter).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingField);
    }

    #[tokio::test]
    async fn test_invalid_body() {
        let adapter = adapter("{not json");
        let err = read_json_body(&adapter).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert!(err.to_string().starts_with("request data is not valid JSON"));
    }

    #[tokio::test]
    async fn test_body_is_cached_on_context() {
        let adapter = adapter(r#"{"a": 1}"#);
        let ctx = Arc::new(RequestContext::new());
        adapter.attach_request_context(ctx.clone());

        read_json_body(&adapter).await.unwrap();
        assert_eq!(ctx.cached_json_body(), Some(&json!({"a": 1})));
    }

    struct RenameHooks;

    impl VersionHooks for RenameHooks {
        fn body_dict(&self, mut body: Value) -> RestResult<Value> {
            if let Some(old) = body.as_object_mut().and_then(|m| m.remove("old")) {
                body["new"] = old;
            }
            Ok(body)
        }
    }

    #[tokio::test]
    async fn test_body_dict_hook_is_applied() {
        let adapter = adapter(r#"{"old": 5}"#);
        let version: ActiveVersion = Versioner::new()
            .version("v1", RenameHooks)
            .select(Some("v1"))
            .unwrap();
        adapter.attach_request_context(Arc::new(RequestContext::new().with_version(version)));

        let value = JsonFieldResolver::new("new").resolve(&adapter).await.unwrap();
        assert_eq!(value, json!(5));
    }

    #[tokio::test]
    async fn test_json_field_missing() {
        let adapter = adapter(r#"{"a": {"b": 1}}"#);
        let err = JsonFieldResolver::new("a/c").resolve(&adapter).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingField);
        assert_eq!(
            err.to_string(),
            "The field a/c is not present in the content of the request."
        );
    }

    #[test]
    fn test_leaf() {
        assert_eq!(JsonFieldResolver::new("data/attributes/name").leaf(), "name");
        assert_eq!(JsonFieldResolver::new("json_field").leaf(), "json_field");
    }

    proptest! {
        #[test]
        fn prop_nested_resolution_composes(a in "[a-z]{1,6}", b in "[a-z]{1,6}", c in "[a-z]{1,6}", n in any::<i64>()) {
            let body = json!({ a.clone(): { b.clone(): { c.clone(): n } } });
            let direct = resolve_path(&body, &format!("{a}/{b}/{c}"));
            let stepwise = resolve_path(&body, &a)
                .and_then(|v| resolve_path(v, &b))
                .and_then(|v| resolve_path(v, &c));
            prop_assert_eq!(direct, stepwise);
            let expected = json!(n);
            prop_assert_eq!(direct, Some(&expected));
        }
    }
}
