//! Collection definitions and the pure half of expansion: turning a
//! configuration plus the current data into one state map per item.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::state::{merge_state_maps, CollectionState, CollectionStateMap};
use crate::data::path::string_to_path;
use crate::data::DataSources;
use crate::dom::ComponentDef;
use crate::logging::{Channel, ErrorLog};
use crate::resolver::{resolve_collection_variable, CollectionResolution, DataCondition, DataVariableProps, ResolverProps};

/// `collectionDef` of a collection component.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataCollectionDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_config: Option<DataCollectionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_def: Option<Box<ComponentDef>>,
}

impl DataCollectionDef {
    pub fn new(config: DataCollectionConfig, template: ComponentDef) -> Self {
        Self {
            collection_config: Some(config),
            component_def: Some(Box::new(template)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataCollectionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<CollectionDataSource>,
}

impl DataCollectionConfig {
    pub fn new(collection_id: impl Into<String>, data_source: CollectionDataSource) -> Self {
        Self {
            collection_id: Some(collection_id.into()),
            start_index: None,
            end_index: None,
            data_source: Some(data_source),
        }
    }

    /// Set the first index (builder).
    pub fn with_start_index(mut self, index: i64) -> Self {
        self.start_index = Some(index);
        self
    }

    /// Set the last index, inclusive (builder).
    pub fn with_end_index(mut self, index: i64) -> Self {
        self.end_index = Some(index);
        self
    }
}

/// Where a collection's items come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollectionDataSource {
    /// Literal items.
    Items(Vec<Value>),
    /// A data source id: one item per record.
    SourceId(String),
    /// A resolver whose value (or path) provides the items.
    Resolver(ResolverProps),
    /// Unrecognized shape.
    Other(Value),
}

impl From<DataVariableProps> for CollectionDataSource {
    fn from(props: DataVariableProps) -> Self {
        CollectionDataSource::Resolver(ResolverProps::Variable(props))
    }
}

/// One data variable per record of `source_id`, in record order.
pub fn list_source_variables(store: &DataSources, source_id: &str) -> Vec<Value> {
    store
        .get(source_id)
        .map(|source| {
            source
                .record_ids()
                .map(|id| DataVariableProps::new(format!("{source_id}.{id}")).to_value())
                .collect()
        })
        .unwrap_or_default()
}

fn variable_items(store: &DataSources, variable: &DataVariableProps) -> Vec<Value> {
    let segments = string_to_path(&variable.path);
    if segments.len() == 1 {
        return list_source_variables(store, &segments[0]);
    }
    match store.get_value(&variable.path, &Value::Array(Vec::new())) {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

/// Resolve the item list of a collection.
pub fn collection_items(
    source: &CollectionDataSource,
    store: &DataSources,
    parent_state: &CollectionStateMap,
    log: &ErrorLog,
) -> Vec<Value> {
    match source {
        CollectionDataSource::Items(items) => items.clone(),
        CollectionDataSource::SourceId(id) => list_source_variables(store, id),
        CollectionDataSource::Resolver(ResolverProps::Variable(variable)) => variable_items(store, variable),
        CollectionDataSource::Resolver(ResolverProps::CollectionVariable(props)) => {
            match resolve_collection_variable(props, Some(parent_state), log) {
                CollectionResolution::Variable(variable) => variable_items(store, &variable),
                CollectionResolution::Value(Value::Array(items)) => items,
                CollectionResolution::Value(_) => Vec::new(),
            }
        }
        CollectionDataSource::Resolver(ResolverProps::Condition(props)) => {
            match DataCondition::new(props.clone(), store) {
                Ok(condition) => match condition.get_data_value(store) {
                    Value::Array(items) => items,
                    _ => Vec::new(),
                },
                Err(err) => {
                    log.error(Channel::Collection, format!("invalid collection data source: {err}"));
                    Vec::new()
                }
            }
        }
        CollectionDataSource::Other(value) => {
            log.error(Channel::Collection, format!("unsupported collection data source: {value}"));
            Vec::new()
        }
    }
}

/// The resolver whose changes should re-expand the collection, if any.
pub fn watched_resolver(
    source: &CollectionDataSource,
    parent_state: &CollectionStateMap,
    log: &ErrorLog,
) -> Option<ResolverProps> {
    match source {
        CollectionDataSource::SourceId(id) => Some(DataVariableProps::new(id.clone()).into()),
        CollectionDataSource::Resolver(ResolverProps::CollectionVariable(props)) => {
            match resolve_collection_variable(props, Some(parent_state), log) {
                CollectionResolution::Variable(variable) => Some(variable.into()),
                CollectionResolution::Value(_) => None,
            }
        }
        CollectionDataSource::Resolver(props) => Some(props.clone()),
        CollectionDataSource::Items(_) | CollectionDataSource::Other(_) => None,
    }
}

fn required(log: &ErrorLog, property: &str) {
    log.error(
        Channel::Collection,
        format!("the \"{property}\" property is required in the collection definition"),
    );
}

/// Compute the state map of every item.
///
/// Each returned map is `parent_state` plus this collection's entry. An
/// invalid configuration, or a collection id already present in
/// `parent_state`, logs an error and yields no items.
pub fn plan_items(
    def: &DataCollectionDef,
    store: &DataSources,
    parent_state: &CollectionStateMap,
    log: &ErrorLog,
) -> Vec<CollectionStateMap> {
    let Some(config) = def.collection_config.as_ref() else {
        required(log, "collectionConfig");
        return Vec::new();
    };
    if def.component_def.is_none() {
        required(log, "componentDef");
        return Vec::new();
    }
    let Some(collection_id) = config.collection_id.as_deref().filter(|id| !id.is_empty()) else {
        required(log, "collectionConfig.collectionId");
        return Vec::new();
    };
    let Some(source) = config.data_source.as_ref() else {
        required(log, "collectionConfig.dataSource");
        return Vec::new();
    };
    if parent_state.contains_key(collection_id) {
        log.error(
            Channel::Collection,
            format!(
                "The collection ID \"{collection_id}\" already exists in the parent collection state. \
                 Overriding it is not allowed."
            ),
        );
        return Vec::new();
    }

    let items = collection_items(source, store, parent_state, log);
    let Some(last) = items.len().checked_sub(1) else {
        return Vec::new();
    };
    let start = config.start_index.unwrap_or(0).max(0) as usize;
    let end = match config.end_index {
        Some(end) if end < 0 => return Vec::new(),
        Some(end) => (end as usize).min(last),
        None => last,
    };
    if start > end {
        return Vec::new();
    }
    let total = end - start + 1;

    (start..=end)
        .map(|index| {
            let state = CollectionState {
                collection_id: collection_id.to_owned(),
                current_index: index,
                current_item: items[index].clone(),
                start_index: start,
                end_index: end,
                total_items: total,
                remaining_items: end - index,
            };
            let own = CollectionStateMap::from([(collection_id.to_owned(), state)]);
            merge_state_maps(parent_state, &own)
        })
        .collect()
}
