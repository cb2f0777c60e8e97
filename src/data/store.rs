//! DataSources: the registry of data sources and path-based lookup.

use serde_json::Value;

use super::path::{get_in, string_to_path};
use super::record::DataRecord;
use super::source::DataSource;

/// Registry of data sources, in registration order.
#[derive(Debug, Default, Clone)]
pub struct DataSources {
    sources: Vec<DataSource>,
}

impl DataSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&DataSource> {
        self.sources.iter().find(|s| s.id() == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut DataSource> {
        self.sources.iter_mut().find(|s| s.id() == id)
    }

    /// All registered sources.
    pub fn all(&self) -> &[DataSource] {
        &self.sources
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Register a source. An existing source with the same id is replaced in
    /// place, keeping its position. Returns `true` when the id was new.
    pub(crate) fn add(&mut self, source: DataSource) -> bool {
        match self.sources.iter_mut().find(|s| s.id() == source.id()) {
            Some(slot) => {
                *slot = source;
                false
            }
            None => {
                self.sources.push(source);
                true
            }
        }
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<DataSource> {
        let index = self.sources.iter().position(|s| s.id() == id)?;
        Some(self.sources.remove(index))
    }

    pub(crate) fn clear(&mut self) {
        self.sources.clear();
    }

    /// Resolve a path to a value.
    ///
    /// - `source` gives the whole source as an object of records keyed by id.
    /// - `source.record` gives the record object.
    /// - `source.record.field...` walks into the record's fields.
    ///
    /// Anything missing along the way yields `default`.
    pub fn get_value(&self, path: &str, default: &Value) -> Value {
        let segments = string_to_path(path);
        let Some((source_id, rest)) = segments.split_first() else {
            return default.clone();
        };
        let Some(source) = self.get(source_id) else {
            return default.clone();
        };
        let Some((record_id, fields)) = rest.split_first() else {
            return source.to_value();
        };
        let Some(record) = source.get_record(record_id) else {
            return default.clone();
        };
        if fields.is_empty() {
            return record.to_value();
        }
        let (first, nested) = (&fields[0], &fields[1..]);
        if first == "id" && nested.is_empty() {
            return Value::String(record.id.clone());
        }
        record
            .get(first)
            .and_then(|field| get_in(field, nested))
            .cloned()
            .unwrap_or_else(|| default.clone())
    }

    /// The source and record a path points into, as far as they exist.
    pub fn from_path(&self, path: &str) -> (Option<&DataSource>, Option<&DataRecord>) {
        let segments = string_to_path(path);
        let source = segments.first().and_then(|id| self.get(id));
        let record = match (source, segments.get(1)) {
            (Some(source), Some(record_id)) => source.get_record(record_id),
            _ => None,
        };
        (source, record)
    }
}
