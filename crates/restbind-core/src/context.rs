//! Request context types.
//!
//! The [`RequestContext`] carries per-request state from the dispatcher into
//! binders and response builders: the request id, the active API version,
//! the pagination default and the route's [`ErrorPolicy`]. It is created at the start of request handling,
//! attached to the framework adapter, and dropped with the request.

use crate::versioning::ActiveVersion;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it ideal for request tracking
/// and log correlation.
///
/// # Example
///
/// ```
/// use restbind_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Default page size for paginated responses.
///
/// A route either declares a fixed size, or a thunk that is evaluated only
/// when a paginated response actually needs it.
#[derive(Clone)]
pub enum PageSize {
    /// A fixed page size.
    Fixed(u32),
    /// A page size computed on demand.
    Lazy(Arc<dyn Fn() -> u32 + Send + Sync>),
}

impl PageSize {
    /// Creates a lazily evaluated page size.
    pub fn lazy<F>(f: F) -> Self
    where
        F: Fn() -> u32 + Send + Sync + 'static,
    {
        Self::Lazy(Arc::new(f))
    }

    /// Resolves the page size.
    #[must_use]
    pub fn resolve(&self) -> u32 {
        match self {
            Self::Fixed(size) => *size,
            Self::Lazy(f) => f(),
        }
    }
}

impl fmt::Debug for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(size) => f.debug_tuple("Fixed").field(size).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

impl From<u32> for PageSize {
    fn from(size: u32) -> Self {
        Self::Fixed(size)
    }
}

/// Default header carrying the client's error correlation id.
pub const UNIQUE_ID_HEADER: &str = "X-Unique-ID";

/// How error responses are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPolicy {
    /// Include the error message and trace in 500 details.
    pub expose_internal_details: bool,
    /// Header whose value becomes the error id.
    pub unique_id_header: String,
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self {
            expose_internal_details: true,
            unique_id_header: UNIQUE_ID_HEADER.to_string(),
        }
    }
}

impl ErrorPolicy {
    /// A policy that keeps internal details out of responses.
    #[must_use]
    pub fn redacted() -> Self {
        Self {
            expose_internal_details: false,
            ..Self::default()
        }
    }
}

/// Per-request context.
///
/// Everything except the parsed-body cache is set before the context is
/// attached to the adapter. The body cache is filled at most once by the
/// first binder that parses the JSON body.
///
/// # Example
///
/// ```
/// use restbind_core::{PageSize, RequestContext};
///
/// let ctx = RequestContext::new().with_page_size(PageSize::Fixed(25));
/// assert_eq!(ctx.page_size().map(PageSize::resolve), Some(25));
/// ```
#[derive(Debug)]
pub struct RequestContext {
    request_id: RequestId,
    version: Option<ActiveVersion>,
    page_size: Option<PageSize>,
    error_policy: ErrorPolicy,
    json_body: OnceLock<Value>,
    started_at: Instant,
}

impl RequestContext {
    /// Creates a new request context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: RequestId::new(),
            version: None,
            page_size: None,
            error_policy: ErrorPolicy::default(),
            json_body: OnceLock::new(),
            started_at: Instant::now(),
        }
    }

    /// Sets the active API version.
    #[must_use]
    pub fn with_version(mut self, version: ActiveVersion) -> Self {
        self.version = Some(version);
        self
    }

    /// Sets the pagination default.
    #[must_use]
    pub fn with_page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Sets how error responses for this request are rendered.
    #[must_use]
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the active API version, if any.
    #[must_use]
    pub const fn version(&self) -> Option<&ActiveVersion> {
        self.version.as_ref()
    }

    /// Returns the pagination default, if any.
    #[must_use]
    pub const fn page_size(&self) -> Option<&PageSize> {
        self.page_size.as_ref()
    }

    /// Returns the error policy.
    #[must_use]
    pub const fn error_policy(&self) -> &ErrorPolicy {
        &self.error_policy
    }

    /// Returns the parsed JSON body if a binder already parsed it.
    #[must_use]
    pub fn cached_json_body(&self) -> Option<&Value> {
        self.json_body.get()
    }

    /// Caches the parsed JSON body, returning the cached value.
    ///
    /// If a body was already cached the existing value wins.
    pub fn cache_json_body(&self, body: Value) -> &Value {
        self.json_body.get_or_init(|| body)
    }

    /// Returns the time elapsed since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
