//! The exception dispatcher: the one place a [`RestError`] becomes a wire
//! response.

use std::sync::Arc;

use bytes::Bytes;
use http::{Response, StatusCode};
use restbind_core::{ErrorKind, ErrorPolicy, FrameworkAdapter, RestError};

use crate::response::{
    bad_request_with_policy, error_with_policy, not_found_with_policy, REDACTED_DETAIL,
};

/// Converts an error into a response.
pub type ExceptionHandler =
    Arc<dyn Fn(&dyn FrameworkAdapter, &RestError, &ErrorPolicy) -> Response<Bytes> + Send + Sync>;

/// Maps each error kind to its canned response.
///
/// | Kind | Response |
/// |------|----------|
/// | `MissingField`, `InvalidData` | 400 `Client error: {message}` |
/// | `Unauthorized` | 401 |
/// | `Forbidden` | 403 |
/// | `NotFound` | 404, with the error's details |
/// | `Internal` | 500, with the message and trace unless redacted |
pub fn base_exception_handler(
    adapter: &dyn FrameworkAdapter,
    err: &RestError,
    policy: &ErrorPolicy,
) -> Response<Bytes> {
    match err {
        RestError::NotFound { details } => not_found_with_policy(adapter, policy, details.as_deref()),
        _ => match err.kind() {
            ErrorKind::MissingField | ErrorKind::InvalidData => {
                bad_request_with_policy(adapter, policy, err)
            }
            ErrorKind::Unauthorized => error_with_policy(
                adapter,
                policy,
                StatusCode::UNAUTHORIZED,
                "Unauthorized",
                "Your authentication was not successful.",
                None,
            ),
            ErrorKind::Forbidden => error_with_policy(
                adapter,
                policy,
                StatusCode::FORBIDDEN,
                "Forbidden",
                "You are not authorized to access the requested resources or perform the requested operation.",
                None,
            ),
            ErrorKind::NotFound | ErrorKind::Internal => {
                let detail = if policy.expose_internal_details {
                    format!("Server error: {} {} \n {}", err.kind(), err, err.trace())
                } else {
                    REDACTED_DETAIL.to_string()
                };
                error_with_policy(
                    adapter,
                    policy,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    &detail,
                    None,
                )
            }
        },
    }
}

/// The default [`ExceptionHandler`].
#[must_use]
pub fn default_exception_handler() -> ExceptionHandler {
    Arc::new(base_exception_handler)
}
