//! Error types for restbind.
//!
//! This module provides the [`RestError`] type, the single error type that
//! flows from binders and handlers to the request-dispatch boundary, and the
//! [`ErrorKind`] table that maps each kind to its HTTP status and title.
//!
//! | `ErrorKind` | Status | Title |
//! |---|---|---|
//! | `MissingField` | 400 | Bad request |
//! | `InvalidData` | 400 | Bad request |
//! | `Unauthorized` | 401 | Unauthorized |
//! | `Forbidden` | 403 | Forbidden |
//! | `NotFound` | 404 | Not found |
//! | `Internal` | 500 | Internal server error |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`RestError`].
pub type RestResult<T> = Result<T, RestError>;

/// Kinds of errors, used to select the canned error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A bound field is absent from the request.
    MissingField,
    /// Malformed input or a failed validation.
    InvalidData,
    /// Missing or bad credentials.
    Unauthorized,
    /// Valid credentials, insufficient rights.
    Forbidden,
    /// The requested resource does not exist.
    NotFound,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Returns the HTTP status code for this kind.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingField | Self::InvalidData => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error title used in the error envelope.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::MissingField | Self::InvalidData => "Bad request",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not found",
            Self::Internal => "Internal server error",
        }
    }

    /// Returns the kind name as used in logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::InvalidData => "invalid_data",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard error type for restbind.
///
/// Binder failures, handler failures and credential failures are all
/// expressed as a `RestError`; the dispatcher is the only place that turns
/// one into a wire response.
///
/// # Example
///
/// ```
/// use restbind_core::{ErrorKind, RestError};
///
/// let err = RestError::missing_field("The field user_id is not present in the query string.");
/// assert_eq!(err.kind(), ErrorKind::MissingField);
/// assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
/// ```
#[derive(Error, Debug)]
pub enum RestError {
    /// A bound field is absent from the request.
    #[error("{message}")]
    MissingField {
        /// Human-readable error message.
        message: String,
    },

    /// Malformed input or failed validation.
    #[error("{message}")]
    InvalidData {
        /// Human-readable error message.
        message: String,
    },

    /// Authentication failed.
    #[error("{message}")]
    Unauthorized {
        /// Human-readable error message.
        message: String,
    },

    /// Authorization denied.
    #[error("{message}")]
    Forbidden {
        /// Human-readable error message.
        message: String,
        /// The error that caused the denial.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The requested resource does not exist.
    #[error("The requested resource does not exist.")]
    NotFound {
        /// Extra details appended to the client-visible message.
        details: Option<String>,
    },

    /// Internal error.
    #[error("{message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl RestError {
    /// Creates a missing-field error.
    #[must_use]
    pub fn missing_field(message: impl Into<String>) -> Self {
        Self::MissingField {
            message: message.into(),
        }
    }

    /// Creates an invalid-data error.
    #[must_use]
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Creates an unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a forbidden error wrapping the error that caused it.
    #[must_use]
    pub fn forbidden_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Forbidden {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(details: Option<String>) -> Self {
        Self::NotFound { details }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    #[must_use]
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField { .. } => ErrorKind::MissingField,
            Self::InvalidData { .. } => ErrorKind::InvalidData,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    /// Returns `true` for errors that map to a 4xx status.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Returns the full diagnostic trace of this error.
    ///
    /// For errors carrying a source this is the debug rendering of the
    /// source chain (including a backtrace when one was captured).
    #[must_use]
    pub fn trace(&self) -> String {
        match self {
            Self::Internal {
                source: Some(source),
                ..
            }
            | Self::Forbidden {
                source: Some(source),
                ..
            } => format!("{source:?}"),
            other => format!("{other:?}"),
        }
    }
}

impl From<anyhow::Error> for RestError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for RestError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal_with_source(format!("JSON serialization failed: {err}"), err)
    }
}
