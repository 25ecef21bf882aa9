//! Validators.
//!
//! A binder's validator runs twice: on the raw value before
//! deserialization ([`Stage::Pre`]) and on the typed value after it
//! ([`Stage::Post`]). Most validators only care about one of the two.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// The value being validated.
#[derive(Clone, Copy)]
pub enum Stage<'a> {
    /// The raw value, before deserialization.
    Pre(&'a Value),
    /// The deserialized value.
    Post(&'a (dyn Any + Send + Sync)),
}

impl Stage<'_> {
    /// Returns `true` for the post-deserialization stage.
    #[must_use]
    pub const fn is_post(&self) -> bool {
        matches!(self, Self::Post(_))
    }
}

impl fmt::Debug for Stage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pre(value) => f.debug_tuple("Pre").field(value).finish(),
            Self::Post(_) => f.write_str("Post(..)"),
        }
    }
}

type ValidateFn = dyn for<'a> Fn(Stage<'a>) -> Result<(), String> + Send + Sync;

/// Checks a value, returning the rejection reason on failure.
///
/// # Example
///
/// ```
/// use restbind_extract::{Stage, Validator};
/// use serde_json::json;
///
/// let positive = Validator::post(|n: &i64| {
///     if *n > 0 { Ok(()) } else { Err("must be positive".to_string()) }
/// });
///
/// assert!(positive.validate(Stage::Pre(&json!("-3"))).is_ok());
/// assert!(positive.validate(Stage::Post(&-3_i64)).is_err());
/// ```
#[derive(Clone)]
pub struct Validator(Arc<ValidateFn>);

impl Validator {
    /// Wraps a function that sees both stages.
    pub fn new<F>(f: F) -> Self
    where
        F: for<'a> Fn(Stage<'a>) -> Result<(), String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Validates only the raw value.
    pub fn pre<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Self::new(move |stage| match stage {
            Stage::Pre(value) => f(value),
            Stage::Post(_) => Ok(()),
        })
    }

    /// Validates only the deserialized value.
    ///
    /// A deserialized value that is not a `T` is rejected.
    pub fn post<T, F>(f: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    {
        Self::new(move |stage| match stage {
            Stage::Post(value) => match value.downcast_ref::<T>() {
                Some(value) => f(value),
                None => Err(format!(
                    "expected a value of type {}",
                    std::any::type_name::<T>()
                )),
            },
            Stage::Pre(_) => Ok(()),
        })
    }

    /// Runs `self`, then `other`.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::new(move |stage| {
            self.validate(stage)?;
            other.validate(stage)
        })
    }

    /// Runs the validator.
    ///
    /// # Errors
    ///
    /// Returns the rejection reason.
    pub fn validate(&self, stage: Stage<'_>) -> Result<(), String> {
        (self.0)(stage)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator(..)")
    }
}

/// Self-validation for bound models.
///
/// Types bound through [`Model`](crate::Model) are checked with this after
/// deserialization.
pub trait Validate {
    /// Checks the value.
    ///
    /// # Errors
    ///
    /// Returns the rejection reason.
    fn validate(&self) -> Result<(), String>;
}
