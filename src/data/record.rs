//! DataRecord: one addressable entry of a data source.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::path::set_in;

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

/// Keys stored outside a record's fields.
pub const RESERVED_FIELDS: [&str; 2] = ["id", "mutable"];

/// Whether `key` names a record's id or mutability flag rather than a field.
pub fn is_reserved_field(key: &str) -> bool {
    RESERVED_FIELDS.contains(&key)
}

/// A record: an id, a mutability flag and arbitrary JSON fields.
///
/// Serialized flat, as `{ "id": "u1", "name": "Ann", ... }`, with
/// `"mutable": false` present only for immutable records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRecord {
    pub id: String,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    mutable: bool,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl DataRecord {
    /// Create an empty, mutable record.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mutable: true,
            fields: Map::new(),
        }
    }

    /// Set a field (builder). Reserved keys are ignored.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if !is_reserved_field(&key) {
            self.fields.insert(key, value.into());
        }
        self
    }

    /// Set mutability (builder). Immutable records refuse removal.
    pub fn with_mutable(mut self, mutable: bool) -> Self {
        self.mutable = mutable;
        self
    }

    /// Build a record from a JSON object with an `id` key.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    /// A single field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// The record as a JSON object, `id` first.
    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(self.fields.len() + 2);
        map.insert("id".to_owned(), Value::String(self.id.clone()));
        if !self.mutable {
            map.insert("mutable".to_owned(), Value::Bool(false));
        }
        for (k, v) in &self.fields {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }

    /// Replace a top-level field. Returns the previous value.
    pub(crate) fn set_field(&mut self, key: &str, value: Value) -> Option<Value> {
        self.fields.insert(key.to_owned(), value)
    }

    /// Write below a top-level field. `segments[0]` is the field name and
    /// must not be reserved.
    pub(crate) fn set_nested<S: AsRef<str>>(&mut self, segments: &[S], value: Value) -> bool {
        let Some((first, rest)) = segments.split_first() else {
            return false;
        };
        if is_reserved_field(first.as_ref()) {
            return false;
        }
        if rest.is_empty() {
            self.set_field(first.as_ref(), value);
            return true;
        }
        let slot = self
            .fields
            .entry(first.as_ref().to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        set_in(slot, rest, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn builder_and_accessors() {
        let rec = DataRecord::new("u1").with_field("name", "Ann").with_field("age", 31);
        assert_eq!(rec.id, "u1");
        assert!(rec.is_mutable());
        assert_eq!(rec.get("name"), Some(&json!("Ann")));
        assert_eq!(rec.get("missing"), None);
        assert_eq!(rec.to_value(), json!({ "id": "u1", "name": "Ann", "age": 31 }));
    }

    #[test]
    fn serde_is_flat() {
        let rec = DataRecord::from_value(json!({ "id": "r", "mutable": false, "x": [1] })).unwrap();
        assert!(!rec.is_mutable());
        assert_eq!(rec.get("x"), Some(&json!([1])));
        assert_eq!(
            serde_json::to_value(&rec).unwrap(),
            json!({ "id": "r", "mutable": false, "x": [1] })
        );

        let rec = DataRecord::from_value(json!({ "id": "m" })).unwrap();
        assert!(rec.is_mutable());
        assert_eq!(serde_json::to_value(&rec).unwrap(), json!({ "id": "m" }));
    }

    #[test]
    fn nested_writes() {
        let mut rec = DataRecord::new("r").with_field("profile", json!({ "tags": ["a"] }));
        assert!(rec.set_nested(&["profile", "tags", "0"], json!("b")));
        assert!(rec.set_nested(&["fresh", "k"], json!(1)));
        assert!(rec.set_nested(&["top"], json!(true)));
        assert_eq!(
            rec.to_value(),
            json!({ "id": "r", "profile": { "tags": ["b"] }, "fresh": { "k": 1 }, "top": true })
        );
    }

    #[test]
    fn reserved_keys_stay_out_of_fields() {
        let mut rec = DataRecord::new("r").with_field("id", "other").with_field("mutable", false);
        assert!(!rec.set_nested(&["id"], json!("x")));
        assert!(!rec.set_nested(&["mutable", "deep"], json!(false)));
        assert!(rec.fields().is_empty());
        assert!(rec.is_mutable());
        assert_eq!(rec.to_value(), json!({ "id": "r" }));
        assert!(is_reserved_field("id"));
        assert!(!is_reserved_field("identity"));
    }
}
