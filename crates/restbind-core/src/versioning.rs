//! Request and response versioning.
//!
//! A [`Versioner`] holds an ordered set of named API versions. Each version is
//! backed by a [`VersionHooks`] implementation that may rewrite the raw body,
//! the parsed body, headers and query arguments before binding, and the
//! response body and wire response afterwards. Every hook defaults to a no-op.
//!
//! # Example
//!
//! ```
//! use restbind_core::{RestResult, VersionHooks, Versioner, VersionStrategy};
//! use serde_json::Value;
//!
//! struct LegacyV1;
//!
//! impl VersionHooks for LegacyV1 {
//!     fn body_dict(&self, mut body: Value) -> RestResult<Value> {
//!         if let Some(obj) = body.as_object_mut() {
//!             if let Some(name) = obj.remove("username") {
//!                 obj.insert("name".to_string(), name);
//!             }
//!         }
//!         Ok(body)
//!     }
//! }
//!
//! let versioner = Versioner::new()
//!     .strategy(VersionStrategy::UrlRoot)
//!     .version("v1", LegacyV1)
//!     .version("v2", restbind_core::NoopHooks);
//!
//! assert_eq!(versioner.route_rule("/users"), "/<rest_helper_version>/users");
//! assert_eq!(versioner.select(None).unwrap().name(), "v2");
//! ```

use crate::adapter::QueryArgs;
use crate::error::{RestError, RestResult};
use bytes::Bytes;
use http::{HeaderMap, Response};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Name of the route argument carrying the requested version.
pub const VERSION_ARG: &str = "rest_helper_version";

/// Version-specific rewrite hooks.
pub trait VersionHooks: Send + Sync {
    /// Rewrites the raw request body before JSON parsing.
    fn body(&self, raw: Bytes) -> RestResult<Bytes> {
        Ok(raw)
    }

    /// Rewrites the parsed JSON body.
    fn body_dict(&self, body: Value) -> RestResult<Value> {
        Ok(body)
    }

    /// Rewrites the request headers.
    fn headers(&self, headers: HeaderMap) -> RestResult<HeaderMap> {
        Ok(headers)
    }

    /// Rewrites the query arguments.
    fn query_string_args(&self, args: QueryArgs) -> RestResult<QueryArgs> {
        Ok(args)
    }

    /// Rewrites a generated response body.
    fn response_body_dict(&self, body: Value) -> Value {
        body
    }

    /// Rewrites the final wire response.
    fn response(&self, response: Response<Bytes>) -> Response<Bytes> {
        response
    }
}

/// Hooks that change nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl VersionHooks for NoopHooks {}

/// How the version is carried in route rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionStrategy {
    /// Route rules are left unchanged.
    #[default]
    None,
    /// Route rules are prefixed with `/<rest_helper_version>`.
    UrlRoot,
}

/// The version selected for one request.
#[derive(Clone)]
pub struct ActiveVersion {
    name: String,
    hooks: Arc<dyn VersionHooks>,
}

impl ActiveVersion {
    /// Returns the version name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the hooks of this version.
    #[must_use]
    pub fn hooks(&self) -> &dyn VersionHooks {
        self.hooks.as_ref()
    }
}

impl fmt::Debug for ActiveVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveVersion")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An ordered set of API versions; the last one declared is the latest.
#[derive(Clone, Default)]
pub struct Versioner {
    versions: IndexMap<String, Arc<dyn VersionHooks>>,
    strategy: VersionStrategy,
}

impl Versioner {
    /// Creates an empty versioner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the route strategy.
    #[must_use]
    pub fn strategy(mut self, strategy: VersionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Declares a version. Later declarations are newer.
    #[must_use]
    pub fn version(mut self, name: impl Into<String>, hooks: impl VersionHooks + 'static) -> Self {
        self.versions.insert(name.into(), Arc::new(hooks));
        self
    }

    /// Returns the declared version names, oldest first.
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }

    /// Returns the latest version name.
    #[must_use]
    pub fn latest(&self) -> Option<&str> {
        self.versions.last().map(|(name, _)| name.as_str())
    }

    /// Selects the version for a request.
    ///
    /// With no requested version the latest one is used.
    pub fn select(&self, requested: Option<&str>) -> RestResult<ActiveVersion> {
        let entry = match requested {
            Some(name) => self.versions.get_key_value(name).ok_or_else(|| {
                let known: Vec<&str> = self.versions().collect();
                RestError::invalid_data(format!(
                    "The specified version ({name}) is not correct: it should be among [{}]",
                    known.join(", ")
                ))
            })?,
            None => self
                .versions
                .last()
                .ok_or_else(|| RestError::internal("no API version declared"))?,
        };

        Ok(ActiveVersion {
            name: entry.0.clone(),
            hooks: Arc::clone(entry.1),
        })
    }

    /// Rewrites a route rule according to the strategy.
    #[must_use]
    pub fn route_rule(&self, rule: &str) -> String {
        match self.strategy {
            VersionStrategy::None => rule.to_string(),
            VersionStrategy::UrlRoot => format!("/<{VERSION_ARG}>{rule}"),
        }
    }
}

impl fmt::Debug for Versioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Versioner")
            .field("versions", &self.versions.keys().collect::<Vec<_>>())
            .field("strategy", &self.strategy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    struct Upper;

    impl VersionHooks for Upper {
        fn response_body_dict(&self, body: Value) -> Value {
            json!({ "wrapped": body })
        }
    }

    fn versioner() -> Versioner {
        Versioner::new().version("v1", Upper).version("v2", NoopHooks)
    }

    #[test]
    fn test_latest_is_default() {
        let v = versioner();
        assert_eq!(v.latest(), Some("v2"));
        assert_eq!(v.select(None).unwrap().name(), "v2");
    }

    #[test]
    fn test_select_named_version() {
        let active = versioner().select(Some("v1")).unwrap();
        assert_eq!(active.name(), "v1");
        assert_eq!(
            active.hooks().response_body_dict(json!(1)),
            json!({"wrapped": 1})
        );
    }

    #[test]
    fn test_unknown_version_is_invalid_data() {
        let err = versioner().select(Some("v9")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_eq!(
            err.to_string(),
            "The specified version (v9) is not correct: it should be among [v1, v2]"
        );
    }

    #[test]
    fn test_empty_versioner_has_no_default() {
        let err = Versioner::new().select(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_route_rule() {
        assert_eq!(versioner().route_rule("/a"), "/a");
        assert_eq!(
            versioner().strategy(VersionStrategy::UrlRoot).route_rule("/a"),
            "/<rest_helper_version>/a"
        );
    }

    #[test]
    fn test_noop_hooks_pass_through() {
        let hooks = NoopHooks;
        let mut args = QueryArgs::new();
        args.insert("a".to_string(), vec!["1".to_string()]);
        assert_eq!(hooks.query_string_args(args.clone()).unwrap(), args);
        assert_eq!(hooks.body(Bytes::from_static(b"{}")).unwrap(), "{}");
    }
}
