//! JSON:API resources and relationships.
//!
//! A resource is addressed by a slash-delimited ancestry path:
//!
//! ```text
//! id   = /authors/marktwain/books/tomsawyer
//! type = /authors/books
//! ```
//!
//! The id is derived from the parent id, the last segment of the type and the
//! resource name, so a nested resource can only be built from its parent.

use crate::error::JsonApiError;
use crate::link::Link;
use indexmap::IndexMap;
use serde_json::{json, Map, Value};

const STRUCTURAL_KEYS: [&str; 5] = ["id", "type", "relationships", "links", "meta"];

/// A named edge from a resource to at most one related resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    links: IndexMap<String, Link>,
    data: Option<ResourceIdentifier>,
}

/// The `{type, id}` pair identifying a related resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIdentifier {
    /// The resource type.
    pub resource_type: String,
    /// The resource id.
    pub id: String,
}

impl Relationship {
    /// Creates a relationship pointing at a resource.
    #[must_use]
    pub fn to(resource: &Resource) -> Self {
        Self {
            links: IndexMap::new(),
            data: Some(resource.identifier()),
        }
    }

    /// Creates a relationship carrying only links.
    #[must_use]
    pub fn with_links(links: IndexMap<String, Link>) -> Self {
        Self { links, data: None }
    }

    /// Adds a link.
    #[must_use]
    pub fn link(mut self, name: impl Into<String>, link: impl Into<Link>) -> Self {
        self.links.insert(name.into(), link.into());
        self
    }

    /// Returns the links.
    #[must_use]
    pub fn links(&self) -> &IndexMap<String, Link> {
        &self.links
    }

    /// Returns the related resource identifier.
    #[must_use]
    pub fn data(&self) -> Option<&ResourceIdentifier> {
        self.data.as_ref()
    }

    /// Serializes the relationship, optionally adding a `self` link.
    #[must_use]
    pub fn to_value(&self, self_link: Option<&str>) -> Value {
        let mut links = self.links.clone();
        if let Some(url) = self_link {
            links.insert("self".to_string(), Link::new(url));
        }

        let mut obj = Map::new();
        if !links.is_empty() {
            obj.insert("links".to_string(), links_to_value(&links));
        }
        if let Some(data) = &self.data {
            obj.insert(
                "data".to_string(),
                json!({ "type": data.resource_type, "id": data.id }),
            );
        }
        Value::Object(obj)
    }
}

/// A uniquely addressable domain entity.
///
/// # Example
///
/// ```
/// use restbind_jsonapi::Resource;
///
/// let author = Resource::new("/authors", "marktwain")?;
/// let book = Resource::with_parent("/authors/books", "tomsawyer", &author)?;
///
/// assert_eq!(book.id(), "/authors/marktwain/books/tomsawyer");
/// assert!(book.relationships().contains_key("parent"));
/// # Ok::<(), restbind_jsonapi::JsonApiError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    id: String,
    resource_type: String,
    name: String,
    attributes: Map<String, Value>,
    relationships: IndexMap<String, Relationship>,
    links: IndexMap<String, Link>,
    meta: Map<String, Value>,
}

impl Resource {
    /// Creates a top-level resource.
    pub fn new(resource_type: &str, name: &str) -> Result<Self, JsonApiError> {
        Self::build(resource_type, name, None)
    }

    /// Creates a resource nested under `parent`.
    ///
    /// The type must extend the parent's type, and a `parent` relationship
    /// is created automatically.
    pub fn with_parent(
        resource_type: &str,
        name: &str,
        parent: &Resource,
    ) -> Result<Self, JsonApiError> {
        Self::build(resource_type, name, Some(parent))
    }

    fn build(
        resource_type: &str,
        name: &str,
        parent: Option<&Resource>,
    ) -> Result<Self, JsonApiError> {
        if name.is_empty() {
            return Err(JsonApiError::EmptyField { field: "name" });
        }
        if resource_type.is_empty() {
            return Err(JsonApiError::EmptyField { field: "type" });
        }
        if let Some(parent) = parent {
            if !resource_type.starts_with(&parent.resource_type) {
                return Err(JsonApiError::ParentTypeMismatch {
                    parent: parent.resource_type.clone(),
                    child: resource_type.to_string(),
                });
            }
        }

        let segment = resource_type.rsplit('/').next().unwrap_or(resource_type);
        let parent_id = parent.map(|p| p.id.as_str()).unwrap_or_default();
        let id = format!("{parent_id}/{segment}/{name}");

        let mut relationships = IndexMap::new();
        if let Some(parent) = parent {
            relationships.insert(
                "parent".to_string(),
                Relationship::to(parent)
                    .link("self", format!("{id}/relationships/parent"))
                    .link("parent", parent.id.clone()),
            );
        }

        let mut links = IndexMap::new();
        links.insert("self".to_string(), Link::new(id.clone()));

        Ok(Self {
            id,
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            attributes: Map::new(),
            relationships,
            links,
            meta: Map::new(),
        })
    }

    /// Overrides the derived id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets one attribute.
    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Merges a map of attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// Adds or replaces a relationship.
    #[must_use]
    pub fn relationship(mut self, name: impl Into<String>, relationship: Relationship) -> Self {
        self.relationships.insert(name.into(), relationship);
        self
    }

    /// Adds or replaces a link. Replacing `self` is allowed.
    #[must_use]
    pub fn link(mut self, name: impl Into<String>, link: impl Into<Link>) -> Self {
        self.links.insert(name.into(), link.into());
        self
    }

    /// Sets one metadata entry.
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Returns the id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the type.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the attributes.
    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Returns the relationships.
    #[must_use]
    pub fn relationships(&self) -> &IndexMap<String, Relationship> {
        &self.relationships
    }

    /// Returns the links.
    #[must_use]
    pub fn links(&self) -> &IndexMap<String, Link> {
        &self.links
    }

    /// Returns the metadata.
    #[must_use]
    pub fn meta_map(&self) -> &Map<String, Value> {
        &self.meta
    }

    /// Returns the `{type, id}` identifier.
    #[must_use]
    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier {
            resource_type: self.resource_type.clone(),
            id: self.id.clone(),
        }
    }

    /// Serializes the resource as `{id, type, attributes, relationships, links, meta}`.
    ///
    /// Empty sections are omitted. Relationship links gain a `self` link
    /// pointing at the relationship through `json_path`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut attributes = Map::new();
        attributes.insert("name".to_string(), Value::String(self.name.clone()));
        for (key, value) in &self.attributes {
            if key.starts_with('_') || STRUCTURAL_KEYS.contains(&key.as_str()) {
                continue;
            }
            attributes.insert(key.clone(), crate::to_jsonable(value.clone()));
        }

        let mut obj = Map::new();
        obj.insert("id".to_string(), Value::String(self.id.clone()));
        obj.insert(
            "type".to_string(),
            Value::String(self.resource_type.clone()),
        );
        obj.insert("attributes".to_string(), Value::Object(attributes));

        if !self.relationships.is_empty() {
            let prefix = format!("{}?json_path=/relationships", self.id);
            let relationships: Map<String, Value> = self
                .relationships
                .iter()
                .map(|(k, rel)| (k.clone(), rel.to_value(Some(&format!("{prefix}/{k}")))))
                .collect();
            obj.insert("relationships".to_string(), Value::Object(relationships));
        }

        let mut links = self.links.clone();
        links
            .entry("self".to_string())
            .or_insert_with(|| Link::new(self.id.clone()));
        obj.insert("links".to_string(), links_to_value(&links));

        if !self.meta.is_empty() {
            obj.insert("meta".to_string(), Value::Object(self.meta.clone()));
        }

        Value::Object(obj)
    }
}

/// Serializes a map of links.
#[must_use]
pub fn links_to_value(links: &IndexMap<String, Link>) -> Value {
    Value::Object(
        links
            .iter()
            .map(|(k, link)| (k.clone(), link.to_value()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark_twain() -> Resource {
        let related = Resource::new("/american_famous_writers", "19thcentury").unwrap();
        Resource::new("/authors", "marktwain")
            .unwrap()
            .relationship("part of", Relationship::to(&related))
            .relationship(
                "bio",
                Relationship::with_links(IndexMap::new())
                    .link("related", "http://host:80/bios/mtwain"),
            )
            .link("self", "http://host:80/authors/marktwain")
            .link("related", "http://host:80/american_famous_writers/19thcentury")
            .meta("count", 1)
    }

    #[test]
    fn test_top_level_resource() {
        let res = Resource::new("/test_type", "test_name_1").unwrap();
        assert_eq!(
            res.to_value(),
            json!({
                "attributes": {"name": "test_name_1"},
                "id": "/test_type/test_name_1",
                "type": "/test_type",
                "links": {"self": "/test_type/test_name_1"}
            })
        );
    }

    #[test]
    fn test_parent_relationship() {
        let parent = mark_twain();
        let child = Resource::with_parent("/authors/books", "tomsawyer", &parent)
            .unwrap()
            .link("self", "http://host:80/authors/marktwain/books/tomsayer")
            .meta("count", 1);

        assert_eq!(
            child.to_value(),
            json!({
                "attributes": {"name": "tomsawyer"},
                "id": "/authors/marktwain/books/tomsawyer",
                "links": {"self": "http://host:80/authors/marktwain/books/tomsayer"},
                "meta": {"count": 1},
                "relationships": {
                    "parent": {
                        "data": {"id": "/authors/marktwain", "type": "/authors"},
                        "links": {
                            "parent": "/authors/marktwain",
                            "self": "/authors/marktwain/books/tomsawyer?json_path=/relationships/parent"
                        }
                    }
                },
                "type": "/authors/books"
            })
        );
    }

    #[test]
    fn test_relationship_self_links() {
        assert_eq!(
            mark_twain().to_value(),
            json!({
                "attributes": {"name": "marktwain"},
                "id": "/authors/marktwain",
                "links": {
                    "related": "http://host:80/american_famous_writers/19thcentury",
                    "self": "http://host:80/authors/marktwain"
                },
                "meta": {"count": 1},
                "relationships": {
                    "bio": {
                        "links": {
                            "related": "http://host:80/bios/mtwain",
                            "self": "/authors/marktwain?json_path=/relationships/bio"
                        }
                    },
                    "part of": {
                        "data": {
                            "id": "/american_famous_writers/19thcentury",
                            "type": "/american_famous_writers"
                        },
                        "links": {"self": "/authors/marktwain?json_path=/relationships/part of"}
                    }
                },
                "type": "/authors"
            })
        );
    }

    #[test]
    fn test_relationship_without_self_link() {
        let target = Resource::new("/test_type", "test_name").unwrap();
        let rel = Relationship::to(&target).link("related", "/a/b/c");
        assert_eq!(
            rel.to_value(None),
            json!({
                "data": {"type": "/test_type", "id": "/test_type/test_name"},
                "links": {"related": "/a/b/c"}
            })
        );
    }

    #[test]
    fn test_parent_type_must_be_extended() {
        let parent = Resource::new("/authors", "marktwain").unwrap();
        let err = Resource::with_parent("/books", "tomsawyer", &parent).unwrap_err();
        assert_eq!(
            err,
            JsonApiError::ParentTypeMismatch {
                parent: "/authors".to_string(),
                child: "/books".to_string()
            }
        );
    }

    #[test]
    fn test_empty_name_rejected() {
        assert_eq!(
            Resource::new("/t", "").unwrap_err(),
            JsonApiError::EmptyField { field: "name" }
        );
    }

    #[test]
    fn test_attributes_hide_private_and_structural_keys() {
        let res = Resource::new("/t", "n")
            .unwrap()
            .attribute("visible", 1)
            .attribute("_hidden", 2)
            .attribute("id", "spoofed")
            .attribute("nested", json!({"a": 1, "_b": 2}));

        let value = res.to_value();
        assert_eq!(
            value["attributes"],
            json!({"name": "n", "visible": 1, "nested": {"a": 1}})
        );
        assert_eq!(value["id"], "/t/n");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn id_is_derived_from_ancestry(
                parent_seg in "[a-z]{1,8}",
                parent_name in "[a-z0-9]{1,8}",
                child_seg in "[a-z]{1,8}",
                name in "[a-z0-9]{1,8}",
            ) {
                let parent_type = format!("/{parent_seg}");
                let parent = Resource::new(&parent_type, &parent_name).unwrap();
                let parent_value = parent.to_value();
                let parent_id = parent_value["id"].as_str().unwrap().to_string();
                prop_assert_eq!(parent_id, format!("/{parent_seg}/{parent_name}"));

                let child_type = format!("{parent_type}/{child_seg}");
                let child = Resource::with_parent(&child_type, &name, &parent).unwrap();
                let child_value = child.to_value();
                let child_id = child_value["id"].as_str().unwrap().to_string();
                prop_assert_eq!(child_id, format!("{}/{child_seg}/{name}", parent.id()));
            }
        }
    }
}
