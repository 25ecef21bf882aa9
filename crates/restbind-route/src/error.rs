//! Route errors.

use restbind_extract::BinderError;
use thiserror::Error;

/// Errors raised while building a route or mirroring a request.
#[derive(Error, Debug)]
pub enum RouteError {
    /// No rule was given.
    #[error("route has no rule")]
    MissingRule,

    /// No handler was given.
    #[error("route {rule} has no handler")]
    MissingHandler {
        /// The route rule.
        rule: String,
    },

    /// Two binders bind the same argument.
    #[error("argument {field} is bound more than once")]
    DuplicateBinder {
        /// The argument name.
        field: String,
    },

    /// A binder is misconfigured.
    #[error("invalid binder: {0}")]
    InvalidBinder(#[from] BinderError),

    /// The shadow ratio is outside `0.0..=1.0`.
    #[error("shadow ratio must be between 0.0 and 1.0, got {0}")]
    InvalidShadowRatio(f64),

    /// Shadowing is enabled without a target.
    #[error("shadow target is missing")]
    MissingShadowTarget,

    /// The shadow HTTP client could not be built.
    #[error("failed to create shadow client: {0}")]
    ShadowClient(String),

    /// A mirrored request failed.
    #[error("shadow request failed: {0}")]
    Mirror(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            RouteError::DuplicateBinder {
                field: "limit".to_string()
            }
            .to_string(),
            "argument limit is bound more than once"
        );

        let err: RouteError = BinderError::EmptyField.into();
        assert!(err.to_string().starts_with("invalid binder:"));

        assert_eq!(
            RouteError::InvalidShadowRatio(1.5).to_string(),
            "shadow ratio must be between 0.0 and 1.0, got 1.5"
        );
    }
}
