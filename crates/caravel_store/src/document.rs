//! JSON document payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A JSON document with a string id.
///
/// The body is a JSON object; the id is carried alongside it and serialized
/// as `_id`, so a rendered document is self-describing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document id, unique within a collection.
    #[serde(rename = "_id")]
    id: String,
    /// Document fields.
    #[serde(flatten)]
    body: Map<String, Value>,
}

impl Document {
    /// Creates an empty document with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: Map::new(),
        }
    }

    /// Returns the document id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Sets a string field.
    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.body.insert(key.into(), Value::String(value.into()));
        self
    }

    /// Sets a string-array field.
    pub fn set_string_array<I, S>(&mut self, key: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let array = values
            .into_iter()
            .map(|v| Value::String(v.into()))
            .collect();
        self.body.insert(key.into(), Value::Array(array));
        self
    }

    /// Gets a string field, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(Value::as_str)
    }

    /// Returns the document fields.
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Renders the document (id included) as a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"_id\":\"{}\"}}", self.id))
    }
}
