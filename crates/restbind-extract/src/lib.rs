//! # Restbind Extract
//!
//! Declarative request binders.
//!
//! A [`Binder`] ties one handler argument to one value in the request and
//! runs it through extraction, validation and deserialization:
//!
//! | Binder | Source |
//! |--------|--------|
//! | [`Binder::json_body`] | the whole JSON body |
//! | [`Binder::json_field`] | a `/`-separated path inside the JSON body |
//! | [`Binder::header`] | a request header |
//! | [`Binder::query`] / [`Binder::query_list`] | a query string parameter |
//! | [`Binder::oauth`] | the bearer token, verified as a JWT |
//! | [`Binder::custom`] | any [`FieldResolver`] |
//!
//! Target types are declared with [`Binder::typed`]; see [`BindTarget`] for
//! the supported types and [`Model`] for serde models with validation.
//!
//! ## Example
//!
//! ```
//! use restbind_core::HttpAdapter;
//! use restbind_extract::Binder;
//!
//! # tokio_test::block_on(async {
//! let adapter = HttpAdapter::builder()
//!     .uri("/search?page_hint=3")
//!     .build();
//!
//! let value = Binder::query("page_hint")
//!     .typed::<u32>()
//!     .resolve(&adapter)
//!     .await
//!     .unwrap();
//! assert_eq!(value.downcast_ref::<u32>(), Some(&3));
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/restbind-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod binder;
mod deserialize;
mod error;
mod extractor;
mod header;
mod json;
mod oauth;
mod query;
mod target;
mod validate;

pub use binder::Binder;
pub use deserialize::{
    parse_bool, parse_datetime, parse_decimal, parse_float, parse_int, value_to_string,
    Deserializer,
};
pub use error::{empty_body, invalid_field, invalid_json, BinderError, ExtractionSource};
pub use extractor::FieldResolver;
pub use header::HeaderResolver;
pub use json::{read_json_body, resolve_path, JsonBodyResolver, JsonFieldResolver};
pub use oauth::{
    clean_kid, HttpKeySource, KeyCache, KeySource, OAuthResolver, ValidationOptions,
    DEFAULT_OAUTH_FIELD,
};
pub use query::QueryResolver;
pub use target::{BindTarget, Json, Model};
pub use validate::{Stage, Validate, Validator};
