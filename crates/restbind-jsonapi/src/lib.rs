//! # Restbind JSON:API
//!
//! The JSON:API object model used by restbind responses.
//!
//! | Type | Serialized as |
//! |------|---------------|
//! | [`Resource`] | `{id, type, attributes, relationships, links, meta}` |
//! | [`Relationship`] | `{links, data: {type, id}}` |
//! | [`Link`] | `"url"` or `{href, meta}` |
//! | [`SuccessDocument`] | `{data, meta, jsonapi, links, included}` |
//! | [`ErrorDocument`] | `{error, meta, jsonapi}` |
//!
//! Everything serializes to `serde_json::Value` so that responses can be
//! projected with `json_path` and rewritten by version hooks before they
//! reach the wire.

#![doc(html_root_url = "https://docs.rs/restbind-jsonapi/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod document;
mod error;
mod link;
mod resource;

pub use document::{ErrorDocument, ErrorObject, JsonApiObject, PrimaryData, SuccessDocument};
pub use error::JsonApiError;
pub use link::Link;
pub use resource::{links_to_value, Relationship, Resource, ResourceIdentifier};

use serde_json::Value;

/// Prepares an arbitrary value for output by removing every object key that
/// starts with an underscore, at any depth.
///
/// ```
/// use serde_json::json;
///
/// let value = json!({"name": "n", "_private": 1, "inner": [{"_x": 1, "y": 2}]});
/// assert_eq!(
///     restbind_jsonapi::to_jsonable(value),
///     json!({"name": "n", "inner": [{"y": 2}]})
/// );
/// ```
#[must_use]
pub fn to_jsonable(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(k, _)| !k.starts_with('_'))
                .map(|(k, v)| (k, to_jsonable(v)))
                .collect(),
        ),
        Value::Array(list) => Value::Array(list.into_iter().map(to_jsonable).collect()),
        other => other,
    }
}
