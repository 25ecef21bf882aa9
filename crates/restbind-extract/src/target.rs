//! Target types.
//!
//! Naming a target type on a binder is enough to pick its deserializer and,
//! for models, its validator.

use std::any::Any;
use std::marker::PhantomData;

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Deserializer, Validate, Validator};

/// A type a binder can produce.
pub trait BindTarget {
    /// The argument type handed to the handler.
    type Output: Any + Send + Sync;

    /// The deserializer for this type. `None` passes the raw value through.
    fn deserializer() -> Option<Deserializer>;

    /// The validator implied by this type.
    fn validator() -> Option<Validator> {
        None
    }
}

macro_rules! integer_target {
    ($($ty:ty),*) => {
        $(
            impl BindTarget for $ty {
                type Output = $ty;

                fn deserializer() -> Option<Deserializer> {
                    Some(Deserializer::integer::<$ty>())
                }
            }
        )*
    };
}

integer_target!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl BindTarget for bool {
    type Output = Self;

    fn deserializer() -> Option<Deserializer> {
        Some(Deserializer::boolean())
    }
}

impl BindTarget for f64 {
    type Output = Self;

    fn deserializer() -> Option<Deserializer> {
        Some(Deserializer::float())
    }
}

impl BindTarget for Decimal {
    type Output = Self;

    fn deserializer() -> Option<Deserializer> {
        Some(Deserializer::decimal())
    }
}

impl BindTarget for DateTime<FixedOffset> {
    type Output = Self;

    fn deserializer() -> Option<Deserializer> {
        Some(Deserializer::datetime())
    }
}

impl BindTarget for DateTime<Utc> {
    type Output = Self;

    fn deserializer() -> Option<Deserializer> {
        Some(Deserializer::datetime_utc())
    }
}

impl BindTarget for String {
    type Output = Self;

    fn deserializer() -> Option<Deserializer> {
        Some(Deserializer::string())
    }
}

impl BindTarget for Vec<String> {
    type Output = Self;

    fn deserializer() -> Option<Deserializer> {
        Some(Deserializer::string_list())
    }
}

impl BindTarget for Value {
    type Output = Self;

    fn deserializer() -> Option<Deserializer> {
        None
    }
}

/// Binds a serde model and checks it with its [`Validate`] impl.
///
/// ```
/// use restbind_extract::{BindTarget, Model, Stage, Validate};
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Deserialize)]
/// struct Item {
///     name: String,
/// }
///
/// impl Validate for Item {
///     fn validate(&self) -> Result<(), String> {
///         if self.name.is_empty() { Err("name is required".into()) } else { Ok(()) }
///     }
/// }
///
/// let deserializer = Model::<Item>::deserializer().unwrap();
/// let validator = Model::<Item>::validator().unwrap();
///
/// let item = deserializer.deserialize(json!({"name": ""})).unwrap();
/// assert!(validator.validate(Stage::Post(item.as_ref())).is_err());
/// ```
#[derive(Debug)]
pub struct Model<T>(PhantomData<fn() -> T>);

impl<T> BindTarget for Model<T>
where
    T: DeserializeOwned + Validate + Any + Send + Sync,
{
    type Output = T;

    fn deserializer() -> Option<Deserializer> {
        Some(Deserializer::model::<T>())
    }

    fn validator() -> Option<Validator> {
        Some(Validator::post(|model: &T| model.validate()))
    }
}

/// Binds a serde model without validation.
#[derive(Debug)]
pub struct Json<T>(PhantomData<fn() -> T>);

impl<T> BindTarget for Json<T>
where
    T: DeserializeOwned + Any + Send + Sync,
{
    type Output = T;

    fn deserializer() -> Option<Deserializer> {
        Some(Deserializer::model::<T>())
    }
}
