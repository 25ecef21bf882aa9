//! JSON:API construction errors.

use thiserror::Error;

/// Errors raised when building JSON:API objects that would break the
/// document invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JsonApiError {
    /// A resource name or type is empty.
    #[error("resource {field} must not be empty")]
    EmptyField {
        /// The empty field.
        field: &'static str,
    },

    /// A nested resource type does not extend its parent's type.
    #[error("resource type {child} does not extend parent type {parent}")]
    ParentTypeMismatch {
        /// The parent type.
        parent: String,
        /// The child type.
        child: String,
    },

    /// An error object was built with a non-error status.
    #[error("error status must be at least 400, got {status}")]
    NonErrorStatus {
        /// The rejected status.
        status: u16,
    },

    /// `included` was set on a document without primary data.
    #[error("included resources require primary data")]
    IncludedWithoutData,
}
