//! Top-level JSON:API documents.
//!
//! A document is either a [`SuccessDocument`] carrying primary data, or an
//! [`ErrorDocument`] carrying a single [`ErrorObject`]. Splitting the two into
//! separate types makes "exactly one of data/error" hold by construction.

use crate::error::JsonApiError;
use crate::link::Link;
use crate::resource::Resource;
use http::StatusCode;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Describes the server's JSON:API implementation.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonApiObject {
    version: String,
    meta: Option<Map<String, Value>>,
}

impl JsonApiObject {
    /// Creates a JSON:API 1.0 object.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: "1.0".to_string(),
            meta: None,
        }
    }

    /// Attaches metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Serializes the object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("version".to_string(), Value::String(self.version.clone()));
        if let Some(meta) = &self.meta {
            obj.insert("meta".to_string(), Value::Object(meta.clone()));
        }
        Value::Object(obj)
    }
}

impl Default for JsonApiObject {
    fn default() -> Self {
        Self::new()
    }
}

/// A JSON:API error object.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorObject {
    id: String,
    status: StatusCode,
    title: String,
    detail: String,
    links: IndexMap<String, Link>,
    about: Option<String>,
    code: Option<String>,
    source: Option<String>,
    pointer: Option<String>,
    parameter: Option<String>,
    meta: Map<String, Value>,
}

impl ErrorObject {
    /// Creates an error object. The status must be 400 or above.
    pub fn new(
        id: impl Into<String>,
        status: StatusCode,
        title: impl Into<String>,
        detail: impl Into<String>,
    ) -> Result<Self, JsonApiError> {
        if status.as_u16() < 400 {
            return Err(JsonApiError::NonErrorStatus {
                status: status.as_u16(),
            });
        }
        Ok(Self {
            id: id.into(),
            status,
            title: title.into(),
            detail: detail.into(),
            links: IndexMap::new(),
            about: None,
            code: None,
            source: None,
            pointer: None,
            parameter: None,
            meta: Map::new(),
        })
    }

    /// Adds a link.
    #[must_use]
    pub fn link(mut self, name: impl Into<String>, link: impl Into<Link>) -> Self {
        self.links.insert(name.into(), link.into());
        self
    }

    /// Sets the link to further details about this occurrence.
    #[must_use]
    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    /// Sets the application-specific error code.
    #[must_use]
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sets the error source.
    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the JSON pointer to the offending request field.
    #[must_use]
    pub fn pointer(mut self, pointer: impl Into<String>) -> Self {
        self.pointer = Some(pointer.into());
        self
    }

    /// Sets the query parameter that caused the error.
    #[must_use]
    pub fn parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = Some(parameter.into());
        self
    }

    /// Sets one metadata entry.
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Returns the error id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the detail.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Serializes the error object, dropping empty members.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        let mut put = |key: &str, value: &str| {
            if !value.is_empty() {
                obj.insert(key.to_string(), Value::String(value.to_string()));
            }
        };
        put("id", &self.id);
        put("title", &self.title);
        put("detail", &self.detail);
        for (key, value) in [
            ("about", &self.about),
            ("code", &self.code),
            ("source", &self.source),
            ("pointer", &self.pointer),
            ("parameter", &self.parameter),
        ] {
            if let Some(value) = value {
                put(key, value);
            }
        }
        obj.insert("status".to_string(), Value::from(self.status.as_u16()));
        if !self.links.is_empty() {
            obj.insert(
                "links".to_string(),
                crate::resource::links_to_value(&self.links),
            );
        }
        if !self.meta.is_empty() {
            obj.insert("meta".to_string(), Value::Object(self.meta.clone()));
        }
        Value::Object(obj)
    }
}

/// Primary data of a success document.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryData {
    /// A single resource.
    One(Box<Resource>),
    /// A list of resources.
    Many(Vec<Resource>),
    /// A list of arbitrary JSON values.
    Values(Vec<Value>),
}

impl PrimaryData {
    /// Serializes the data, collapsing resources to their ids when `id_only`.
    #[must_use]
    pub fn to_value(&self, id_only: bool) -> Value {
        match self {
            Self::One(res) if id_only => Value::String(res.id().to_string()),
            Self::One(res) => res.to_value(),
            Self::Many(list) if id_only => list
                .iter()
                .map(|r| Value::String(r.id().to_string()))
                .collect(),
            Self::Many(list) => list.iter().map(Resource::to_value).collect(),
            Self::Values(list) => list.iter().cloned().map(crate::to_jsonable).collect(),
        }
    }
}

/// A success document.
///
/// # Example
///
/// ```
/// use restbind_jsonapi::{PrimaryData, Resource, SuccessDocument};
///
/// let res = Resource::new("/test_type", "test_name_1")?;
/// let doc = SuccessDocument::new(Some(PrimaryData::One(Box::new(res)))).meta("count", 1);
/// let value = doc.to_value(false);
///
/// assert_eq!(value["data"]["id"], "/test_type/test_name_1");
/// assert_eq!(value["meta"]["count"], 1);
/// # Ok::<(), restbind_jsonapi::JsonApiError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SuccessDocument {
    data: Option<PrimaryData>,
    meta: Map<String, Value>,
    links: IndexMap<String, Link>,
    jsonapi: Option<JsonApiObject>,
    included: Vec<Resource>,
}

impl SuccessDocument {
    /// Creates a document with the given primary data.
    #[must_use]
    pub fn new(data: Option<PrimaryData>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    /// Sets one metadata entry.
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Merges metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta.extend(meta);
        self
    }

    /// Merges top-level links.
    #[must_use]
    pub fn with_links(mut self, links: IndexMap<String, Link>) -> Self {
        self.links.extend(links);
        self
    }

    /// Sets the JSON:API object.
    #[must_use]
    pub fn with_jsonapi(mut self, jsonapi: JsonApiObject) -> Self {
        self.jsonapi = Some(jsonapi);
        self
    }

    /// Sets the included resources. Requires primary data.
    pub fn with_included(mut self, included: Vec<Resource>) -> Result<Self, JsonApiError> {
        if self.data.is_none() && !included.is_empty() {
            return Err(JsonApiError::IncludedWithoutData);
        }
        self.included = included;
        Ok(self)
    }

    /// Returns the primary data.
    #[must_use]
    pub fn data(&self) -> Option<&PrimaryData> {
        self.data.as_ref()
    }

    /// Serializes the document.
    #[must_use]
    pub fn to_value(&self, id_only: bool) -> Value {
        let mut obj = Map::new();
        if let Some(data) = &self.data {
            obj.insert("data".to_string(), data.to_value(id_only));
        }
        if !self.meta.is_empty() {
            obj.insert("meta".to_string(), crate::to_jsonable(Value::Object(self.meta.clone())));
        }
        if let Some(jsonapi) = &self.jsonapi {
            obj.insert("jsonapi".to_string(), jsonapi.to_value());
        }
        if !self.links.is_empty() {
            obj.insert(
                "links".to_string(),
                Value::Object(
                    self.links
                        .iter()
                        .map(|(k, link)| (k.clone(), link.to_document_value()))
                        .collect(),
                ),
            );
        }
        if !self.included.is_empty() {
            obj.insert(
                "included".to_string(),
                self.included.iter().map(Resource::to_value).collect(),
            );
        }
        Value::Object(obj)
    }
}

/// An error document.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorDocument {
    error: ErrorObject,
    meta: Map<String, Value>,
    jsonapi: Option<JsonApiObject>,
}

impl ErrorDocument {
    /// Creates an error document.
    #[must_use]
    pub fn new(error: ErrorObject) -> Self {
        Self {
            error,
            meta: Map::new(),
            jsonapi: None,
        }
    }

    /// Sets one metadata entry.
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Sets the JSON:API object.
    #[must_use]
    pub fn with_jsonapi(mut self, jsonapi: JsonApiObject) -> Self {
        self.jsonapi = Some(jsonapi);
        self
    }

    /// Returns the error object.
    #[must_use]
    pub fn error(&self) -> &ErrorObject {
        &self.error
    }

    /// Serializes the document.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("error".to_string(), self.error.to_value());
        if !self.meta.is_empty() {
            obj.insert("meta".to_string(), Value::Object(self.meta.clone()));
        }
        if let Some(jsonapi) = &self.jsonapi {
            obj.insert("jsonapi".to_string(), jsonapi.to_value());
        }
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource(name: &str) -> Resource {
        Resource::new("/test_type", name).unwrap()
    }

    #[test]
    fn test_list_document() {
        let doc = SuccessDocument::new(Some(PrimaryData::Many(vec![
            resource("test_name_1"),
            resource("test_name_2"),
        ])))
        .meta("count", 2);

        assert_eq!(
            doc.to_value(false),
            json!({
                "data": [
                    {
                        "attributes": {"name": "test_name_1"},
                        "id": "/test_type/test_name_1",
                        "type": "/test_type",
                        "links": {"self": "/test_type/test_name_1"}
                    },
                    {
                        "attributes": {"name": "test_name_2"},
                        "id": "/test_type/test_name_2",
                        "type": "/test_type",
                        "links": {"self": "/test_type/test_name_2"}
                    }
                ],
                "meta": {"count": 2}
            })
        );
    }

    #[test]
    fn test_empty_list_keeps_data() {
        let doc = SuccessDocument::new(Some(PrimaryData::Many(vec![]))).meta("count", 0);
        assert_eq!(doc.to_value(false), json!({"data": [], "meta": {"count": 0}}));
    }

    #[test]
    fn test_id_only() {
        let one = SuccessDocument::new(Some(PrimaryData::One(Box::new(resource("a")))));
        assert_eq!(one.to_value(true), json!({"data": "/test_type/a"}));

        let many = SuccessDocument::new(Some(PrimaryData::Many(vec![resource("a"), resource("b")])));
        assert_eq!(
            many.to_value(true),
            json!({"data": ["/test_type/a", "/test_type/b"]})
        );
    }

    #[test]
    fn test_included_requires_data() {
        let err = SuccessDocument::new(None)
            .with_included(vec![resource("a")])
            .unwrap_err();
        assert_eq!(err, JsonApiError::IncludedWithoutData);

        let doc = SuccessDocument::new(Some(PrimaryData::One(Box::new(resource("a")))))
            .with_included(vec![resource("b")])
            .unwrap();
        assert_eq!(doc.to_value(false)["included"][0]["id"], "/test_type/b");
    }

    #[test]
    fn test_document_links_are_objects() {
        let mut links = IndexMap::new();
        links.insert("next".to_string(), Link::new("/?page=2"));
        let doc = SuccessDocument::new(Some(PrimaryData::Values(vec![]))).with_links(links);
        assert_eq!(doc.to_value(false)["links"], json!({"next": {"url": "/?page=2"}}));
    }

    #[test]
    fn test_jsonapi_object() {
        assert_eq!(JsonApiObject::new().to_value(), json!({"version": "1.0"}));

        let mut meta = Map::new();
        meta.insert("a".to_string(), json!(1));
        meta.insert("b".to_string(), json!("2"));
        assert_eq!(
            JsonApiObject::new().with_meta(meta).to_value(),
            json!({"version": "1.0", "meta": {"a": 1, "b": "2"}})
        );
    }

    #[test]
    fn test_error_status_must_be_error() {
        let err = ErrorObject::new("1", StatusCode::OK, "t", "d").unwrap_err();
        assert_eq!(err, JsonApiError::NonErrorStatus { status: 200 });
    }

    #[test]
    fn test_error_document() {
        let error = ErrorObject::new("abc", StatusCode::NOT_FOUND, "Not found", "")
            .unwrap()
            .code("E404");
        assert_eq!(
            ErrorDocument::new(error).to_value(),
            json!({"error": {"id": "abc", "status": 404, "title": "Not found", "code": "E404"}})
        );
    }
}
