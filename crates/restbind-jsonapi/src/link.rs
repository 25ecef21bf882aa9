//! JSON:API links.

use serde_json::{json, Map, Value};

/// A link, optionally carrying metadata.
///
/// Serializes as a bare URL string, or as `{href, meta}` when metadata is
/// present.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    url: String,
    meta: Option<Map<String, Value>>,
}

impl Link {
    /// Creates a link without metadata.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            meta: None,
        }
    }

    /// Attaches metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Returns the URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the metadata.
    #[must_use]
    pub fn meta(&self) -> Option<&Map<String, Value>> {
        self.meta.as_ref()
    }

    /// Serializes the link as it appears inside a resource or relationship.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match &self.meta {
            None => Value::String(self.url.clone()),
            Some(meta) => json!({ "href": self.url, "meta": meta }),
        }
    }

    /// Serializes the link as it appears in top-level document links.
    #[must_use]
    pub fn to_document_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("url".to_string(), Value::String(self.url.clone()));
        if let Some(meta) = &self.meta {
            obj.insert("meta".to_string(), Value::Object(meta.clone()));
        }
        Value::Object(obj)
    }
}

impl From<&str> for Link {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for Link {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}
