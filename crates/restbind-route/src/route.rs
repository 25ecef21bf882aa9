//! Routes and request dispatch.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::join;
use http::{Method, Response};
use restbind_config::RestbindConfig;
use restbind_core::{
    ActiveVersion, BoundArgs, FrameworkAdapter, HandlerFn, PageSize, RequestContext, RestError,
    RestResult, Versioner, VERSION_ARG,
};
use restbind_extract::Binder;
use restbind_response::{default_exception_handler, ErrorPolicy, ExceptionHandler};
use restbind_telemetry::{record_binding_failure, record_request, record_shadow_mismatch};
use tracing::{debug, error, info_span, warn, Instrument};

use crate::error::RouteError;
use crate::shadow::{MirroredResponse, ShadowTraffic};

/// A handler with its binders and response policies.
///
/// Routes are built once at registration time and then dispatched for every
/// matching request. The web framework owns routing; a route only turns a
/// matched request into a response.
///
/// # Example
///
/// ```
/// use restbind_core::{BoundArgs, FrameworkAdapter, HandlerFn, HttpAdapter, RestResult};
/// use restbind_extract::Binder;
/// use restbind_response::ok;
/// use restbind_route::Route;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let route = Route::builder()
///     .rule("/cars")
///     .binder(Binder::query("color"))
///     .handler(HandlerFn::sync(|adapter: Arc<dyn FrameworkAdapter>, mut args: BoundArgs| {
///         let color: serde_json::Value = args.take("color")?;
///         Ok(ok(adapter.as_ref(), json!({ "color": color })))
///     }))
///     .build()
///     .unwrap();
///
/// let adapter = Arc::new(HttpAdapter::builder().uri("/cars?color=red").build());
/// let response = tokio_test::block_on(route.dispatch(adapter, BoundArgs::new()));
/// assert_eq!(response.status(), 200);
/// ```
#[derive(Clone)]
pub struct Route {
    rule: String,
    methods: Vec<Method>,
    binders: Vec<Binder>,
    handler: HandlerFn,
    versioner: Option<Versioner>,
    page_size: Option<PageSize>,
    exception_handler: ExceptionHandler,
    error_policy: ErrorPolicy,
    shadow: Option<ShadowTraffic>,
}

impl Route {
    /// Starts building a route.
    #[must_use]
    pub fn builder() -> RouteBuilder {
        RouteBuilder::default()
    }

    /// The rule to register with the web framework, version prefix
    /// included.
    #[must_use]
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// The HTTP methods this route accepts.
    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// The binders, in resolution order.
    #[must_use]
    pub fn binders(&self) -> &[Binder] {
        &self.binders
    }

    /// The shadow-traffic policy, if any.
    #[must_use]
    pub fn shadow(&self) -> Option<&ShadowTraffic> {
        self.shadow.as_ref()
    }

    /// Handles one request.
    ///
    /// `args` carries the arguments the web framework extracted from the
    /// URL, including the requested version when the rule has one. Binders
    /// add the rest, except in test mode where the handler receives `args`
    /// unchanged. Failures never escape: they become error responses.
    pub async fn dispatch(&self, adapter: Arc<dyn FrameworkAdapter>, mut args: BoundArgs) -> Response<Bytes> {
        let requested = args.take_opt::<String>(VERSION_ARG);
        let (context, version) = self.request_context(requested.as_deref());
        let context = Arc::new(context);
        adapter.attach_request_context(Arc::clone(&context));

        let span = info_span!(
            "dispatch",
            route = %self.rule,
            request_id = %context.request_id(),
            http.method = %adapter.method(),
        );

        async {
            let local = async {
                match version {
                    Ok(version) => self.run(Arc::clone(&adapter), args, version).await,
                    Err(err) => Err(err),
                }
            };

            let response = match self.shadow.as_ref().filter(|s| s.should_sample()) {
                Some(shadow) => {
                    let (local, trusted) = join(local, shadow.mirror(adapter.as_ref())).await;
                    self.reconcile(adapter.as_ref(), shadow, local, trusted).await
                }
                None => match local.await {
                    Ok(response) => response,
                    Err(err) => self.fail(adapter.as_ref(), &err).await,
                },
            };

            record_request(&self.rule, response.status().as_u16(), context.elapsed());
            response
        }
        .instrument(span)
        .await
    }

    fn request_context(
        &self,
        requested: Option<&str>,
    ) -> (RequestContext, RestResult<Option<ActiveVersion>>) {
        let mut context = RequestContext::new().with_error_policy(self.error_policy.clone());
        if let Some(page_size) = &self.page_size {
            context = context.with_page_size(page_size.clone());
        }

        let version = match &self.versioner {
            Some(versioner) => match versioner.select(requested) {
                Ok(active) => {
                    context = context.with_version(active.clone());
                    Ok(Some(active))
                }
                Err(err) => Err(err),
            },
            None => Ok(None),
        };

        (context, version)
    }

    async fn run(
        &self,
        adapter: Arc<dyn FrameworkAdapter>,
        mut args: BoundArgs,
        version: Option<ActiveVersion>,
    ) -> RestResult<Response<Bytes>> {
        if adapter.is_in_test() {
            debug!("test mode, skipping binders");
        } else {
            for binder in &self.binders {
                match binder.resolve(adapter.as_ref()).await {
                    Ok(value) => args.insert_boxed(binder.field(), value),
                    Err(err) => {
                        record_binding_failure(binder.field(), err.kind().as_str());
                        return Err(err);
                    }
                }
            }
        }

        let response = self.handler.call(adapter, args).await?;
        Ok(match version {
            Some(active) => active.hooks().response(response),
            None => response,
        })
    }

    async fn reconcile(
        &self,
        adapter: &dyn FrameworkAdapter,
        shadow: &ShadowTraffic,
        local: RestResult<Response<Bytes>>,
        trusted: Result<MirroredResponse, RouteError>,
    ) -> Response<Bytes> {
        match (local, trusted) {
            (Ok(local), Ok(trusted)) => {
                if shadow.agrees(&local, &trusted) {
                    local
                } else {
                    warn!(
                        local_status = local.status().as_u16(),
                        trusted_status = trusted.status.as_u16(),
                        path = %adapter.full_path(),
                        "shadow response mismatch, returning trusted response"
                    );
                    record_shadow_mismatch(&self.rule);
                    trusted.into_response()
                }
            }
            (Err(err), Ok(trusted)) => {
                self.log_failure(adapter, &err).await;
                trusted.into_response()
            }
            (local, Err(mirror_err)) => {
                warn!(error = %mirror_err, "shadow request failed, returning local response");
                match local {
                    Ok(response) => response,
                    Err(err) => self.fail(adapter, &err).await,
                }
            }
        }
    }

    async fn fail(&self, adapter: &dyn FrameworkAdapter, err: &RestError) -> Response<Bytes> {
        self.log_failure(adapter, err).await;
        (self.exception_handler)(adapter, err, &self.error_policy)
    }

    async fn log_failure(&self, adapter: &dyn FrameworkAdapter, err: &RestError) {
        let body = adapter
            .request_body()
            .await
            .map(|raw| String::from_utf8_lossy(&raw).into_owned())
            .unwrap_or_default();

        error!(
            error.kind = err.kind().as_str(),
            error.message = %err,
            trace = %err.trace(),
            path = %adapter.full_path(),
            body = %body,
            "request failed"
        );
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("rule", &self.rule)
            .field("methods", &self.methods)
            .field("binders", &self.binders)
            .field("versioner", &self.versioner)
            .field("page_size", &self.page_size)
            .field("shadow", &self.shadow)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Route`].
#[derive(Default)]
pub struct RouteBuilder {
    rule: Option<String>,
    methods: Vec<Method>,
    binders: Vec<Binder>,
    handler: Option<HandlerFn>,
    versioner: Option<Versioner>,
    page_size: Option<PageSize>,
    exception_handler: Option<ExceptionHandler>,
    error_policy: ErrorPolicy,
    shadow: Option<ShadowTraffic>,
}

impl RouteBuilder {
    /// Sets the route rule, without version prefix.
    #[must_use]
    pub fn rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Adds an accepted method. Routes accept `GET` when none is given.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    /// Appends a binder.
    #[must_use]
    pub fn binder(mut self, binder: Binder) -> Self {
        self.binders.push(binder);
        self
    }

    /// Sets the handler.
    #[must_use]
    pub fn handler(mut self, handler: HandlerFn) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Enables API versioning.
    #[must_use]
    pub fn versioner(mut self, versioner: Versioner) -> Self {
        self.versioner = Some(versioner);
        self
    }

    /// Sets the default page size for paginated responses.
    #[must_use]
    pub fn page_size(mut self, page_size: impl Into<PageSize>) -> Self {
        self.page_size = Some(page_size.into());
        self
    }

    /// Replaces the exception handler.
    #[must_use]
    pub fn exception_handler(mut self, handler: ExceptionHandler) -> Self {
        self.exception_handler = Some(handler);
        self
    }

    /// Sets how error responses are rendered.
    #[must_use]
    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Mirrors requests to a trusted server.
    #[must_use]
    pub fn shadow(mut self, shadow: ShadowTraffic) -> Self {
        self.shadow = Some(shadow);
        self
    }

    /// Applies service configuration: the error policy, the default page
    /// size unless one was set, and shadowing when enabled.
    ///
    /// # Errors
    ///
    /// Returns `RouteError` when the shadow policy cannot be built.
    pub fn configure(mut self, config: &RestbindConfig) -> Result<Self, RouteError> {
        self.error_policy = config.error_policy();
        if self.page_size.is_none() {
            self.page_size = config.pagination.page_size();
        }
        if let Some(shadow) = ShadowTraffic::from_config(&config.shadow)? {
            self.shadow = Some(shadow);
        }
        Ok(self)
    }

    /// Validates the binders and builds the route.
    ///
    /// # Errors
    ///
    /// - [`RouteError::MissingRule`] / [`RouteError::MissingHandler`]
    /// - [`RouteError::DuplicateBinder`] when two binders share an argument
    ///   name
    /// - [`RouteError::InvalidBinder`] when a binder is misconfigured
    pub fn build(self) -> Result<Route, RouteError> {
        let rule = self.rule.ok_or(RouteError::MissingRule)?;
        let handler = self
            .handler
            .ok_or_else(|| RouteError::MissingHandler { rule: rule.clone() })?;

        let mut seen = HashSet::new();
        for binder in &self.binders {
            binder.finalize()?;
            if !seen.insert(binder.field()) {
                return Err(RouteError::DuplicateBinder {
                    field: binder.field().to_string(),
                });
            }
        }

        let rule = match &self.versioner {
            Some(versioner) => versioner.route_rule(&rule),
            None => rule,
        };
        let methods = if self.methods.is_empty() {
            vec![Method::GET]
        } else {
            self.methods
        };

        Ok(Route {
            rule,
            methods,
            binders: self.binders,
            handler,
            versioner: self.versioner,
            page_size: self.page_size,
            exception_handler: self.exception_handler.unwrap_or_else(default_exception_handler),
            error_policy: self.error_policy,
            shadow: self.shadow,
        })
    }
}
