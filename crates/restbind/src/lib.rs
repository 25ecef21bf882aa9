//! # Restbind
//!
//! **Declarative request binding and JSON:API responses for web handlers**
//!
//! Restbind sits between a web framework and its handlers:
//!
//! - **Binders** pull each handler argument out of the request (JSON body,
//!   JSON field, header, query string, OAuth bearer token), then validate and
//!   deserialize it
//! - **Responses** are shaped into JSON:API envelopes, with pagination and
//!   `json_path` projection
//! - **Errors** of every kind become well-formed error envelopes at a single
//!   dispatch boundary
//! - **Versioning** hooks rewrite requests and responses per API version
//!
//! ## Quick Start
//!
//! ```rust
//! use restbind::prelude::*;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let route = Route::builder()
//!     .rule("/cars")
//!     .method(http::Method::POST)
//!     .binder(Binder::json_field("specs/doors").typed::<i64>())
//!     .binder(Binder::header("X-Dry-Run").named("dry_run").typed::<bool>().default_value(false))
//!     .handler(HandlerFn::sync(|adapter: Arc<dyn FrameworkAdapter>, mut args: BoundArgs| {
//!         let doors: i64 = args.take("doors")?;
//!         let dry_run: bool = args.take("dry_run")?;
//!         Ok(created(adapter.as_ref(), json!({ "doors": doors, "dry_run": dry_run })))
//!     }))
//!     .build()
//!     .unwrap();
//!
//! let adapter = HttpAdapter::builder()
//!     .method(http::Method::POST)
//!     .uri("/cars")
//!     .body(r#"{"specs": {"doors": "4"}}"#)
//!     .build();
//!
//! let response = tokio_test::block_on(route.dispatch(Arc::new(adapter), BoundArgs::new()));
//! assert_eq!(response.status(), 201);
//! ```

#![doc(html_root_url = "https://docs.rs/restbind/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use restbind_core as core;

// Re-export the JSON:API model
pub use restbind_jsonapi as jsonapi;

// Re-export binders
pub use restbind_extract as extract;

// Re-export response builders
pub use restbind_response as response;

// Re-export routes
pub use restbind_route as route;

// Re-export configuration
pub use restbind_config as config;

// Re-export telemetry
pub use restbind_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// ```rust
/// use restbind::prelude::*;
/// ```
pub mod prelude {
    pub use restbind_core::{
        ArgValue, BoundArgs, ErrorKind, FrameworkAdapter, HandlerFn, HttpAdapter, PageSize,
        RequestContext, RestError, RestResult, VersionHooks, VersionStrategy, Versioner,
        VERSION_ARG,
    };

    pub use restbind_jsonapi::{Link, Relationship, Resource};

    pub use restbind_extract::{
        BindTarget, Binder, Deserializer, FieldResolver, Json, KeyCache, Model, OAuthResolver,
        Validate, ValidationOptions, Validator,
    };

    pub use restbind_response::{
        accepted, bad_request, created, error, internal_server_error, not_found, ok, success,
        ErrorPolicy, ExceptionHandler, Payload, Success,
    };

    pub use restbind_route::{Route, RouteBuilder, RouteError, ShadowTraffic};

    pub use restbind_config::{ConfigLoader, RestbindConfig};
}
