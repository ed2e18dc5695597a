//! Create/update payloads
//!
//! Explicit field → value data handed to the store, built field by field or from any
//! serializable struct.

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload(Map<String, Value>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    /// Set a field to null
    pub fn unset(self, field: &str) -> Self {
        self.set(field, Value::Null)
    }

    /// Build from a struct serializing to a JSON object
    pub fn from_serializable<S: Serialize>(data: &S) -> Result<Self, serde_json::Error> {
        match serde_json::to_value(data)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(serde::ser::Error::custom(format!(
                "payload must serialize to an object, got {}",
                other
            ))),
        }
    }

    /// Copy every field of `other` over this payload
    pub fn merge(mut self, other: Payload) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
