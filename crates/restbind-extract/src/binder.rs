//! The binder descriptor and its per-request pipeline.
//!
//! Each binder runs the same steps for every request:
//!
//! 1. **Extract** the raw value with its [`FieldResolver`].
//! 2. **Validate** the raw value ([`Stage::Pre`]).
//! 3. **Deserialize** it, if a deserializer is set.
//! 4. **Validate** the typed value ([`Stage::Post`]).
//!
//! When extraction reports a missing field and the binder has a default,
//! the default is bound instead and steps 2 to 4 are skipped.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use restbind_core::{ArgValue, FrameworkAdapter, RestError, RestResult};
use tracing::debug;

use crate::error::invalid_field;
use crate::{
    BindTarget, BinderError, Deserializer, ExtractionSource, FieldResolver, HeaderResolver,
    JsonBodyResolver, JsonFieldResolver, OAuthResolver, QueryResolver, Stage, Validator,
    DEFAULT_OAUTH_FIELD,
};

type DefaultFn = dyn Fn() -> ArgValue + Send + Sync;

/// The deserializer and validator implied by a target type.
#[derive(Clone)]
struct TargetHints {
    type_name: &'static str,
    deserializer: Option<Deserializer>,
    validator: Option<Validator>,
}

/// Binds one handler argument to a value taken from the request.
///
/// # Example
///
/// ```
/// use restbind_extract::Binder;
///
/// let binders = [
///     Binder::json_body("data"),
///     Binder::query("query"),
///     Binder::json_field("json_field").typed::<i64>(),
///     Binder::header("header_field").typed::<bool>().default_value(false),
/// ];
/// assert_eq!(binders[2].field(), "json_field");
/// assert!(binders[3].has_default());
/// ```
#[derive(Clone)]
pub struct Binder {
    field: String,
    resolver: Arc<dyn FieldResolver>,
    deserializer: Option<Deserializer>,
    validator: Option<Validator>,
    target: Option<TargetHints>,
    default: Option<Arc<DefaultFn>>,
}

impl Binder {
    /// Binds `field` to a value produced by a custom resolver.
    pub fn custom(field: impl Into<String>, resolver: impl FieldResolver + 'static) -> Self {
        Self {
            field: field.into(),
            resolver: Arc::new(resolver),
            deserializer: None,
            validator: None,
            target: None,
            default: None,
        }
    }

    /// Binds `field` to the whole JSON body.
    pub fn json_body(field: impl Into<String>) -> Self {
        Self::custom(field, JsonBodyResolver)
    }

    /// Binds the JSON body value at `path`. The argument is named after
    /// the last path segment.
    pub fn json_field(path: impl Into<String>) -> Self {
        let resolver = JsonFieldResolver::new(path);
        Self::custom(resolver.leaf().to_string(), resolver)
    }

    /// Binds the header `name` to an argument of the same name.
    pub fn header(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::custom(name.clone(), HeaderResolver::new(name))
    }

    /// Binds the query parameter `name` to an argument of the same name.
    pub fn query(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::custom(name.clone(), QueryResolver::new(name))
    }

    /// Binds the query parameter `name` as a list, even when given once.
    pub fn query_list(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::custom(name.clone(), QueryResolver::new(name).as_list(true))
    }

    /// Binds the decoded bearer token to `user_auth`.
    pub fn oauth(resolver: OAuthResolver) -> Self {
        Self::custom(DEFAULT_OAUTH_FIELD, resolver)
    }

    /// Renames the handler argument.
    pub fn named(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    /// Sets the deserializer.
    pub fn deserializer(mut self, deserializer: Deserializer) -> Self {
        self.deserializer = Some(deserializer);
        self
    }

    /// Sets the validator, replacing any validator implied by the target
    /// type.
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Declares the target type; its deserializer and validator are used
    /// unless set explicitly.
    pub fn typed<T: BindTarget>(mut self) -> Self {
        self.target = Some(TargetHints {
            type_name: std::any::type_name::<T::Output>(),
            deserializer: T::deserializer(),
            validator: T::validator(),
        });
        self
    }

    /// Value bound when the field is missing from the request.
    pub fn default_value<T>(self, value: T) -> Self
    where
        T: Clone + Any + Send + Sync,
    {
        self.default_with(move || value.clone())
    }

    /// Lazily built value bound when the field is missing.
    pub fn default_with<T, F>(mut self, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.default = Some(Arc::new(move || Box::new(f()) as ArgValue));
        self
    }

    /// Checks the declaration.
    ///
    /// # Errors
    ///
    /// - [`BinderError::EmptyField`] when the argument name is empty
    /// - [`BinderError::DeserializerConflict`] when both a deserializer and
    ///   a target type with its own deserializer were given
    pub fn finalize(&self) -> Result<(), BinderError> {
        if self.field.is_empty() {
            return Err(BinderError::EmptyField);
        }
        let typed = self.target.as_ref().is_some_and(|t| t.deserializer.is_some());
        if self.deserializer.is_some() && typed {
            return Err(BinderError::DeserializerConflict {
                field: self.field.clone(),
            });
        }
        Ok(())
    }

    /// The handler argument name.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The name of the value within its source.
    #[must_use]
    pub fn source_field(&self) -> &str {
        self.resolver.source_field()
    }

    /// Where the value is read from.
    #[must_use]
    pub fn source(&self) -> ExtractionSource {
        self.resolver.source()
    }

    /// The declared target type, if any.
    #[must_use]
    pub fn type_name(&self) -> Option<&'static str> {
        self.target.as_ref().map(|t| t.type_name)
    }

    /// Returns `true` when a default value is declared.
    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    fn effective_deserializer(&self) -> Option<&Deserializer> {
        self.deserializer
            .as_ref()
            .or_else(|| self.target.as_ref()?.deserializer.as_ref())
    }

    fn effective_validator(&self) -> Option<&Validator> {
        self.validator
            .as_ref()
            .or_else(|| self.target.as_ref()?.validator.as_ref())
    }

    /// Runs the pipeline for one request.
    ///
    /// # Errors
    ///
    /// - `MissingField` when the value is absent and no default is declared
    /// - `InvalidData` when validation or deserialization fails
    /// - any error raised by the resolver
    pub async fn resolve(&self, adapter: &dyn FrameworkAdapter) -> RestResult<ArgValue> {
        let raw = match self.resolver.resolve(adapter).await {
            Ok(raw) => raw,
            Err(RestError::MissingField { message }) => {
                return match &self.default {
                    Some(default) => {
                        debug!(field = %self.field, "field missing, binding default");
                        Ok(default())
                    }
                    None => Err(RestError::MissingField { message }),
                };
            }
            Err(err) => return Err(err),
        };

        let validator = self.effective_validator();
        if let Some(validator) = validator {
            validator
                .validate(Stage::Pre(&raw))
                .map_err(|reason| invalid_field(&self.field, reason))?;
        }

        let value = match self.effective_deserializer() {
            Some(deserializer) => deserializer.deserialize(raw).map_err(|reason| {
                debug!(field = %self.field, deserializer = deserializer.name(), "deserialization failed");
                invalid_field(&self.field, reason)
            })?,
            None => Box::new(raw) as ArgValue,
        };

        if let Some(validator) = validator {
            validator
                .validate(Stage::Post(value.as_ref()))
                .map_err(RestError::invalid_data)?;
        }

        debug!(field = %self.field, source = %self.source(), "bound argument");
        Ok(value)
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("field", &self.field)
            .field("source", &self.source())
            .field("source_field", &self.source_field())
            .field("type", &self.type_name())
            .field("has_default", &self.has_default())
            .finish_non_exhaustive()
    }
}
