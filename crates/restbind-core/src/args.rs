//! Resolved handler arguments.

use crate::error::{RestError, RestResult};
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;

/// A type-erased argument value.
pub type ArgValue = Box<dyn Any + Send + Sync>;

/// Named arguments handed to a handler.
///
/// Binders insert one entry each, keyed by the argument name. Handlers take
/// their arguments back out with the concrete type they declared.
///
/// # Example
///
/// ```
/// use restbind_core::BoundArgs;
///
/// let mut args = BoundArgs::new();
/// args.insert("page", 3_i64);
/// args.insert("name", "alice".to_string());
///
/// assert_eq!(args.get::<i64>("page"), Some(&3));
/// let name: String = args.take("name").unwrap();
/// assert_eq!(name, "alice");
/// ```
#[derive(Default)]
pub struct BoundArgs {
    values: IndexMap<String, ArgValue>,
}

impl BoundArgs {
    /// Creates an empty argument set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a typed argument, replacing any previous value.
    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.values.insert(name.into(), Box::new(value));
    }

    /// Inserts an already boxed argument.
    pub fn insert_boxed(&mut self, name: impl Into<String>, value: ArgValue) {
        self.values.insert(name.into(), value);
    }

    /// Returns `true` if an argument with this name is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Borrows an argument if it exists with type `T`.
    #[must_use]
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.values.get(name).and_then(|v| v.downcast_ref::<T>())
    }

    /// Removes an argument and returns it as `T`.
    ///
    /// A missing argument or a type mismatch is an internal error: both mean
    /// the route was registered with a binder that does not match the handler.
    pub fn take<T: Any>(&mut self, name: &str) -> RestResult<T> {
        let value = self
            .values
            .shift_remove(name)
            .ok_or_else(|| RestError::internal(format!("argument {name} was not bound")))?;

        value.downcast::<T>().map(|v| *v).map_err(|_| {
            RestError::internal(format!(
                "argument {name} is not a {}",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Removes an argument if it exists with type `T`.
    pub fn take_opt<T: Any>(&mut self, name: &str) -> Option<T> {
        if self.get::<T>(name).is_none() {
            return None;
        }
        self.take(name).ok()
    }

    /// Returns the bound argument names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Returns the number of bound arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no argument is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for BoundArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_take_wrong_type_is_internal() {
        let mut args = BoundArgs::new();
        args.insert("n", 1_i64);

        let err = args.take::<String>("n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().contains("argument n is not a"));
    }

    #[test]
    fn test_take_missing() {
        let mut args = BoundArgs::new();
        let err = args.take::<i64>("absent").unwrap_err();
        assert_eq!(err.to_string(), "argument absent was not bound");
    }

    #[test]
    fn test_take_opt_keeps_mismatched_value() {
        let mut args = BoundArgs::new();
        args.insert("flag", true);

        assert_eq!(args.take_opt::<i64>("flag"), None);
        assert!(args.contains("flag"));
        assert_eq!(args.take_opt::<bool>("flag"), Some(true));
        assert!(args.is_empty());
    }

    #[test]
    fn test_insert_replaces() {
        let mut args = BoundArgs::new();
        args.insert("a", 1_u32);
        args.insert("a", 2_u32);
        assert_eq!(args.len(), 1);
        assert_eq!(args.get::<u32>("a"), Some(&2));
        assert_eq!(format!("{args:?}"), "{\"a\"}");
    }
}
