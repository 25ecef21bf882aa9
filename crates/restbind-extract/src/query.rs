//! Query string resolver.

use async_trait::async_trait;
use restbind_core::{try_with_version_hooks, FrameworkAdapter, RestResult};
use serde_json::Value;

use crate::{ExtractionSource, FieldResolver};

/// Resolves a query string parameter.
///
/// A parameter given once resolves to a string; one given several times, or
/// any parameter when `as_list` is set, resolves to an array of strings.
#[derive(Debug, Clone)]
pub struct QueryResolver {
    name: String,
    as_list: bool,
}

impl QueryResolver {
    /// Creates a resolver for the parameter `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            as_list: false,
        }
    }

    /// Always resolve to an array.
    #[must_use]
    pub const fn as_list(mut self, as_list: bool) -> Self {
        self.as_list = as_list;
        self
    }
}

#[async_trait]
impl FieldResolver for QueryResolver {
    async fn resolve(&self, adapter: &dyn FrameworkAdapter) -> RestResult<Value> {
        let args = try_with_version_hooks(adapter, adapter.query_string_args(), |hooks, args| {
            hooks.query_string_args(args)
        })?;
        let mut values = args
            .get(&self.name)
            .cloned()
            .ok_or_else(|| ExtractionSource::Query.missing(&self.name))?;

        if values.len() == 1 && !self.as_list {
            return Ok(Value::String(values.remove(0)));
        }
        Ok(Value::Array(values.into_iter().map(Value::String).collect()))
    }

    fn source(&self) -> ExtractionSource {
        ExtractionSource::Query
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

    fn adapter(uri: &str) -> HttpAdapter {
        HttpAdapter::builder().uri(uri).build()
    }

    #[tokio::test]
    async fn test_single_value_is_scalar() {
        let value = QueryResolver::new("query_field")
            .resolve(&adapter("/x?query_field=hello"))
            .await
            .unwrap();
        assert_eq!(value, json!("hello"));
    }

    #[tokio::test]
    async fn test_as_list() {
        let value = QueryResolver::new("tag")
            .as_list(true)
            .resolve(&adapter("/x?tag=a"))
            .await
            .unwrap();
        assert_eq!(value, json!(["a"]));
    }

    #[tokio::test]
    async fn test_repeated_value_is_list() {
        let value = QueryResolver::new("tag")
            .resolve(&adapter("/x?tag=a&tag=b"))
            .await
            .unwrap();
        assert_eq!(value, json!(["a", "b"]));
    }

    #[tokio::test]
    async fn test_missing_query_field() {
        let err = QueryResolver::new("query_field")
            .resolve(&adapter("/x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingField);
        assert_eq!(
            err.to_string(),
            "The field query_field is not present in the query string."
        );
    }
}
