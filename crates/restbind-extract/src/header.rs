//! Header resolver.

use async_trait::async_trait;
use restbind_core::{try_with_version_hooks, FrameworkAdapter, RestResult};
use serde_json::Value;

use crate::{ExtractionSource, FieldResolver};

/// Resolves a request header by name, after the active version's `headers`
/// hook has run.
///
/// Non-ASCII header bytes are decoded lossily rather than rejected.
#[derive(Debug, Clone)]
pub struct HeaderResolver {
    name: String,
}

impl HeaderResolver {
    /// Creates a resolver for the header `name` (case-insensitive).
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl FieldResolver for HeaderResolver {
    async fn resolve(&self, adapter: &dyn FrameworkAdapter) -> RestResult<Value> {
        let headers = try_with_version_hooks(adapter, adapter.headers(), |hooks, headers| {
            hooks.headers(headers)
        })?;
        headers
            .get(self.name.as_str())
            .map(|value| Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .ok_or_else(|| ExtractionSource::Header.missing(&self.name))
    }

    fn source(&self) -> ExtractionSource {
        ExtractionSource::Header
    }

    fn source_field(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restbind_core::{ErrorKind, HttpAdapter};
    use serde_json::json;

    #[tokio::test]
    async fn test_header_is_case_insensitive() {
        let adapter = HttpAdapter::builder().header("X-Header-Field", "true").build();
        let value = HeaderResolver::new("x-header-field").resolve(&adapter).await.unwrap();
        assert_eq!(value, json!("true"));
    }

    #[tokio::test]
    async fn test_missing_header() {
        let adapter = HttpAdapter::builder().build();
        let err = HeaderResolver::new("header_field").resolve(&adapter).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingField);
        assert_eq!(
            err.to_string(),
            "The field header_field is not present in the requests headers."
        );
    }
}
