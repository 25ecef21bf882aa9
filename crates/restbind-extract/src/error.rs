//! Binding errors.
//!
//! Request-time failures are always [`RestError`]s; this module owns the
//! client-facing wording for each place a field can be missing from, plus
//! [`BinderError`] for binders that are declared inconsistently.

use std::fmt;

use restbind_core::RestError;
use thiserror::Error;

/// Where a binder reads its raw value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionSource {
    /// The JSON request body.
    Body,
    /// A request header.
    Header,
    /// The query string.
    Query,
    /// The `Authorization` header, as a bearer token.
    Authorization,
    /// A resolver supplied by the application.
    Custom,
}

impl ExtractionSource {
    /// Returns the source name as used in logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Header => "header",
            Self::Query => "query",
            Self::Authorization => "authorization",
            Self::Custom => "custom",
        }
    }

    /// Builds the error reported when `field` is absent from this source.
    #[must_use]
    pub fn missing(&self, field: &str) -> RestError {
        let message = match self {
            Self::Body => format!("The field {field} is not present in the content of the request."),
            Self::Query => format!("The field {field} is not present in the query string."),
            Self::Header | Self::Authorization => {
                format!("The field {field} is not present in the requests headers.")
            }
            Self::Custom => format!("The field {field} is not present in the request."),
        };
        RestError::missing_field(message)
    }
}

impl fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error reported when the request body is empty.
#[must_use]
pub fn empty_body() -> RestError {
    RestError::missing_field("The body of the request is not valid: a json object is expected.")
}

/// Error reported when the request body is not JSON.
#[must_use]
pub fn invalid_json(reason: impl fmt::Display) -> RestError {
    RestError::invalid_data(format!("request data is not valid JSON: {reason}"))
}

/// Error reported when a raw value fails pre-validation or deserialization.
#[must_use]
pub fn invalid_field(field: &str, reason: impl fmt::Display) -> RestError {
    RestError::invalid_data(format!("The value of the field {field} is not valid: {reason}"))
}

/// Errors in the declaration of a binder, detected before any request is
/// served.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BinderError {
    /// Both an explicit deserializer and a target type were given.
    #[error("binder {field}: a deserializer and a target type cannot be provided at the same time")]
    DeserializerConflict {
        /// The argument name.
        field: String,
    },

    /// The argument name is empty.
    #[error("binder argument name must not be empty")]
    EmptyField,
}
