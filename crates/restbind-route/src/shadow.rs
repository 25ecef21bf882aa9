//! Shadow traffic.
//!
//! A shadowed route sends a sample of its requests to a trusted server while
//! handling them locally, compares both responses, and returns the trusted
//! one whenever they disagree. It is meant for migrating an endpoint from a
//! legacy implementation without risking its clients.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use http::{HeaderMap, Response, StatusCode};
use reqwest::Client;
use restbind_config::ShadowConfig;
use restbind_core::FrameworkAdapter;
use tracing::debug;
use uuid::Uuid;

use crate::error::RouteError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const SAMPLE_BITS: u32 = 62;

/// The trusted server's answer to a mirrored request.
#[derive(Debug, Clone)]
pub struct MirroredResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl MirroredResponse {
    /// Converts into a wire response.
    #[must_use]
    pub fn into_response(self) -> Response<Bytes> {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            if name != TRANSFER_ENCODING && name != CONNECTION {
                headers.append(name.clone(), value.clone());
            }
        }
        response
    }
}

/// Decides whether the local response agrees with the trusted one.
pub trait ResponseComparator: Send + Sync {
    /// Returns `true` when `local` may be returned in place of `trusted`.
    fn matches(&self, local: &Response<Bytes>, trusted: &MirroredResponse) -> bool;
}

/// Compares status codes only.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusComparator;

impl ResponseComparator for StatusComparator {
    fn matches(&self, local: &Response<Bytes>, trusted: &MirroredResponse) -> bool {
        local.status() == trusted.status
    }
}

/// A shadow-traffic policy for one route.
///
/// # Example
///
/// ```
/// use restbind_route::ShadowTraffic;
///
/// let shadow = ShadowTraffic::new("https://legacy.example.com", 0.1).unwrap();
/// assert_eq!(shadow.target(), "https://legacy.example.com");
/// ```
#[derive(Clone)]
pub struct ShadowTraffic {
    target: String,
    ratio: f64,
    client: Client,
    comparator: Arc<dyn ResponseComparator>,
}

impl ShadowTraffic {
    /// Mirrors `ratio` of requests to `target`.
    ///
    /// # Errors
    ///
    /// Returns `RouteError::InvalidShadowRatio` when `ratio` is outside
    /// `0.0..=1.0`, and `RouteError::ShadowClient` when the HTTP client
    /// cannot be created.
    pub fn new(target: impl Into<String>, ratio: f64) -> Result<Self, RouteError> {
        Self::with_timeout(target, ratio, DEFAULT_TIMEOUT)
    }

    /// Like [`ShadowTraffic::new`], with a request timeout for the trusted
    /// server.
    ///
    /// # Errors
    ///
    /// See [`ShadowTraffic::new`].
    pub fn with_timeout(
        target: impl Into<String>,
        ratio: f64,
        timeout: Duration,
    ) -> Result<Self, RouteError> {
        if !(0.0..=1.0).contains(&ratio) {
            return Err(RouteError::InvalidShadowRatio(ratio));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RouteError::ShadowClient(e.to_string()))?;

        Ok(Self {
            target: target.into().trim_end_matches('/').to_string(),
            ratio,
            client,
            comparator: Arc::new(StatusComparator),
        })
    }

    /// Builds the policy described by `[shadow]`, or `None` when shadowing
    /// is disabled.
    ///
    /// # Errors
    ///
    /// Returns `RouteError::MissingShadowTarget` when shadowing is enabled
    /// without a target, plus the errors of [`ShadowTraffic::new`].
    pub fn from_config(config: &ShadowConfig) -> Result<Option<Self>, RouteError> {
        if !config.enabled {
            return Ok(None);
        }
        let target = config
            .target
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(RouteError::MissingShadowTarget)?;
        Self::new(target, config.ratio).map(Some)
    }

    /// Replaces the response comparator.
    #[must_use]
    pub fn comparator(mut self, comparator: impl ResponseComparator + 'static) -> Self {
        self.comparator = Arc::new(comparator);
        self
    }

    /// The trusted server base URL.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The fraction of requests mirrored.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Draws whether the current request is mirrored.
    #[must_use]
    pub fn should_sample(&self) -> bool {
        if self.ratio >= 1.0 {
            return true;
        }
        if self.ratio <= 0.0 {
            return false;
        }
        let (_, low) = Uuid::new_v4().as_u64_pair();
        let draw = (low & ((1 << SAMPLE_BITS) - 1)) as f64 / (1_u64 << SAMPLE_BITS) as f64;
        draw < self.ratio
    }

    pub(crate) fn agrees(&self, local: &Response<Bytes>, trusted: &MirroredResponse) -> bool {
        self.comparator.matches(local, trusted)
    }

    /// Sends the current request to the trusted server.
    ///
    /// # Errors
    ///
    /// Returns `RouteError::Mirror` when the request body cannot be read or
    /// the trusted server cannot be reached.
    pub async fn mirror(&self, adapter: &dyn FrameworkAdapter) -> Result<MirroredResponse, RouteError> {
        let url = format!("{}{}", self.target, adapter.full_path());
        let body = adapter
            .request_body()
            .await
            .map_err(|e| RouteError::Mirror(format!("failed to read request body: {e}")))?;

        let mut headers = adapter.headers();
        for name in [HOST, CONTENT_LENGTH, CONNECTION, TRANSFER_ENCODING] {
            headers.remove(name);
        }

        debug!(url = %url, method = %adapter.method(), "mirroring request");
        let response = self
            .client
            .request(adapter.method(), &url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| RouteError::Mirror(format!("request failed: {e}")))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| RouteError::Mirror(format!("failed to read body: {e}")))?;

        Ok(MirroredResponse {
            status,
            headers,
            body,
        })
    }
}

impl fmt::Debug for ShadowTraffic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowTraffic")
            .field("target", &self.target)
            .field("ratio", &self.ratio)
            .finish_non_exhaustive()
    }
}
