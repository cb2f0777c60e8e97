//! DataSource: an identified, ordered collection of records.
//!
//! Mutations are crate-private: they are driven by
//! [`Editor`](crate::Editor), which pairs every change with its
//! notification.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::path::string_to_path;
use super::record::{is_reserved_field, DataRecord};
use crate::error::DataError;

/// Hook applied to every record field write.
///
/// Receives the record id, the written key (or path below the record) and
/// the incoming value; returns the value actually stored.
pub type SetValueTransformer = Rc<dyn Fn(&str, &str, Value) -> Value>;

/// Value transformers attached to a data source.
#[derive(Clone, Default)]
pub struct Transformers {
    pub on_record_set_value: Option<SetValueTransformer>,
}

impl Transformers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the record write hook (builder).
    pub fn on_record_set_value(mut self, f: impl Fn(&str, &str, Value) -> Value + 'static) -> Self {
        self.on_record_set_value = Some(Rc::new(f));
        self
    }
}

impl fmt::Debug for Transformers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformers")
            .field("on_record_set_value", &self.on_record_set_value.is_some())
            .finish()
    }
}

/// Serializable form of a data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceDef {
    pub id: String,
    #[serde(default)]
    pub records: Vec<DataRecord>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip_from_storage: bool,
}

impl DataSourceDef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            records: Vec::new(),
            skip_from_storage: false,
        }
    }

    /// Append a record (builder).
    pub fn with_record(mut self, record: DataRecord) -> Self {
        self.records.push(record);
        self
    }

    /// Append several records (builder).
    pub fn with_records(mut self, records: impl IntoIterator<Item = DataRecord>) -> Self {
        self.records.extend(records);
        self
    }

    /// Exclude this source from saved project data (builder).
    pub fn skip_from_storage(mut self, skip: bool) -> Self {
        self.skip_from_storage = skip;
        self
    }
}

impl From<DataSourceDef> for DataSource {
    fn from(def: DataSourceDef) -> Self {
        DataSource::from_def(def)
    }
}

/// A live data source.
#[derive(Debug, Clone)]
pub struct DataSource {
    id: String,
    records: Vec<DataRecord>,
    skip_from_storage: bool,
    transformers: Transformers,
}

impl DataSource {
    pub fn new(id: impl Into<String>) -> Self {
        Self::from_def(DataSourceDef::new(id))
    }

    pub fn from_def(def: DataSourceDef) -> Self {
        Self {
            id: def.id,
            records: def.records,
            skip_from_storage: def.skip_from_storage,
            transformers: Transformers::default(),
        }
    }

    /// Attach transformers (builder).
    pub fn with_transformers(mut self, transformers: Transformers) -> Self {
        self.transformers = transformers;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn skips_storage(&self) -> bool {
        self.skip_from_storage
    }

    pub fn transformers(&self) -> &Transformers {
        &self.transformers
    }

    pub fn get_record(&self, id: &str) -> Option<&DataRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[DataRecord] {
        &self.records
    }

    pub fn record_ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The source as a JSON object of records keyed by id.
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .records
            .iter()
            .map(|r| (r.id.clone(), r.to_value()))
            .collect();
        Value::Object(map)
    }

    pub fn to_def(&self) -> DataSourceDef {
        DataSourceDef {
            id: self.id.clone(),
            records: self.records.clone(),
            skip_from_storage: self.skip_from_storage,
        }
    }

    pub(crate) fn add_record(&mut self, record: DataRecord) -> Result<(), DataError> {
        if self.get_record(&record.id).is_some() {
            return Err(DataError::DuplicateRecord {
                data_source: self.id.clone(),
                record: record.id,
            });
        }
        self.records.push(record);
        Ok(())
    }

    /// Remove a record. Immutable records are refused unless `dangerously`.
    pub(crate) fn remove_record(&mut self, id: &str, dangerously: bool) -> Result<DataRecord, DataError> {
        let index = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| DataError::RecordNotFound {
                data_source: self.id.clone(),
                record: id.to_owned(),
            })?;
        if !self.records[index].is_mutable() && !dangerously {
            return Err(DataError::ImmutableRecord {
                data_source: self.id.clone(),
                record: id.to_owned(),
            });
        }
        Ok(self.records.remove(index))
    }

    pub(crate) fn set_records(&mut self, records: Vec<DataRecord>) {
        self.records = records;
    }

    pub(crate) fn replace_with(&mut self, def: DataSourceDef) {
        self.records = def.records;
        self.skip_from_storage = def.skip_from_storage;
    }

    /// Write a value at `key` (a field name or a path below the record),
    /// running it through the set-value transformer first.
    ///
    /// The reserved keys `id` and `mutable` are refused.
    pub(crate) fn set_record_value(&mut self, record_id: &str, key: &str, value: Value) -> Result<(), DataError> {
        let segments = string_to_path(key);
        if segments.first().is_some_and(|first| is_reserved_field(first)) {
            return Err(DataError::ReservedField {
                data_source: self.id.clone(),
                record: record_id.to_owned(),
                key: key.to_owned(),
            });
        }
        let value = match &self.transformers.on_record_set_value {
            Some(transform) => transform(record_id, key, value),
            None => value,
        };
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| DataError::RecordNotFound {
                data_source: self.id.clone(),
                record: record_id.to_owned(),
            })?;
        record.set_nested(&segments, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn users() -> DataSource {
        DataSource::from_def(DataSourceDef::new("users").with_records([
            DataRecord::new("u1").with_field("name", "Ann"),
            DataRecord::new("u2").with_field("name", "Bob").with_mutable(false),
        ]))
    }

    #[test]
    fn lookup_and_order() {
        let ds = users();
        assert_eq!(ds.id(), "users");
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.record_ids().collect::<Vec<_>>(), vec!["u1", "u2"]);
        assert_eq!(ds.get_record("u2").and_then(|r| r.get("name")), Some(&json!("Bob")));
        assert!(ds.get_record("u3").is_none());
    }

    #[test]
    fn to_value_keys_records_by_id() {
        assert_eq!(
            users().to_value(),
            json!({
                "u1": { "id": "u1", "name": "Ann" },
                "u2": { "id": "u2", "mutable": false, "name": "Bob" }
            })
        );
    }

    #[test]
    fn add_rejects_duplicates() {
        let mut ds = users();
        ds.add_record(DataRecord::new("u3")).unwrap();
        let err = ds.add_record(DataRecord::new("u1")).unwrap_err();
        assert!(matches!(err, DataError::DuplicateRecord { .. }));
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn immutable_records_need_dangerously() {
        let mut ds = users();
        let err = ds.remove_record("u2", false).unwrap_err();
        assert!(matches!(err, DataError::ImmutableRecord { .. }));
        assert_eq!(ds.len(), 2);

        let removed = ds.remove_record("u2", true).unwrap();
        assert_eq!(removed.id, "u2");
        assert!(ds.remove_record("u1", false).is_ok());
        assert!(matches!(
            ds.remove_record("u1", false),
            Err(DataError::RecordNotFound { .. })
        ));
    }

    #[test]
    fn transformer_rewrites_written_values() {
        let mut ds = users().with_transformers(Transformers::new().on_record_set_value(
            |_id, key, value| match (key, value) {
                ("name", Value::String(s)) => Value::String(s.to_uppercase()),
                (_, v) => v,
            },
        ));
        ds.set_record_value("u1", "name", json!("zoe")).unwrap();
        ds.set_record_value("u1", "age", json!(4)).unwrap();
        let rec = ds.get_record("u1").unwrap();
        assert_eq!(rec.get("name"), Some(&json!("ZOE")));
        assert_eq!(rec.get("age"), Some(&json!(4)));
    }

    #[test]
    fn reserved_keys_are_refused() {
        let mut ds = users();
        for key in ["id", "mutable", "id.nested"] {
            let err = ds.set_record_value("u1", key, json!("x")).unwrap_err();
            assert!(matches!(err, DataError::ReservedField { .. }), "{key}");
        }
        let rec = ds.get_record("u1").unwrap();
        assert_eq!(rec.to_value(), json!({ "id": "u1", "name": "Ann" }));
        assert!(ds.set_record_value("u1", "identity", json!("x")).is_ok());
    }

    #[test]
    fn def_round_trip() {
        let def: DataSourceDef = serde_json::from_value(json!({
            "id": "cfg",
            "records": [{ "id": "a", "v": 1 }],
            "skipFromStorage": true
        }))
        .unwrap();
        assert!(def.skip_from_storage);
        let ds = DataSource::from_def(def.clone());
        assert!(ds.skips_storage());
        assert_eq!(ds.to_def(), def);
        assert_eq!(
            serde_json::to_value(DataSourceDef::new("x")).unwrap(),
            json!({ "id": "x", "records": [] })
        );
    }
}
