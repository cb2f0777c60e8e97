//! DataCollectionVariable: reads the state of an enclosing collection item.

use serde_json::Value;

use super::listener::ListenerId;
use super::props::{DataCollectionVariableProps, DataVariableProps};
use crate::collection::{CollectionStateMap, CollectionStateVariableType};
use crate::data::path::{get_in, join_path, string_to_path};
use crate::data::DataSources;
use crate::logging::{Channel, ErrorLog};

/// What a collection variable resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionResolution {
    /// A plain value.
    Value(Value),
    /// The current item is backed by a record: read it live through a data
    /// variable.
    Variable(DataVariableProps),
}

/// Resolve a collection variable against a state map.
///
/// Problems are logged and resolve to an empty string.
pub fn resolve_collection_variable(
    props: &DataCollectionVariableProps,
    state_map: Option<&CollectionStateMap>,
    log: &ErrorLog,
) -> CollectionResolution {
    let empty = || CollectionResolution::Value(Value::String(String::new()));

    let Some(state_map) = state_map else {
        log.error(
            Channel::Resolver,
            format!(
                "collection variable for \"{}\" used outside of a collection",
                props.collection_id
            ),
        );
        return empty();
    };
    let Some(state) = state_map.get(&props.collection_id) else {
        log.error(
            Channel::Resolver,
            format!("collection \"{}\" not found in collection state", props.collection_id),
        );
        return empty();
    };
    let Some(variable_type) = props.variable_type else {
        log.error(
            Channel::Resolver,
            format!("missing variable type for collection \"{}\"", props.collection_id),
        );
        return empty();
    };

    if variable_type != CollectionStateVariableType::CurrentItem {
        return CollectionResolution::Value(state.get(variable_type));
    }

    let item = &state.current_item;
    let path = props.path.as_deref().unwrap_or("");
    if let Some(variable) = DataVariableProps::from_operand(item) {
        let path = join_path(&variable.path, path);
        return CollectionResolution::Variable(DataVariableProps { path, ..variable });
    }
    if path.is_empty() {
        return CollectionResolution::Value(item.clone());
    }
    match get_in(item, &string_to_path(path)) {
        Some(value) if !value.is_null() => CollectionResolution::Value(value.clone()),
        _ => {
            log.error(
                Channel::Resolver,
                format!(
                    "path \"{path}\" not found in the current item of collection \"{}\"",
                    props.collection_id
                ),
            );
            empty()
        }
    }
}

#[derive(Debug, Clone)]
pub struct DataCollectionVariable {
    props: DataCollectionVariableProps,
    state_map: Option<CollectionStateMap>,
    resolution: CollectionResolution,
    /// Listener on the record-backed variable, when the resolution is one.
    pub(crate) inner: Option<ListenerId>,
}

impl DataCollectionVariable {
    pub fn new(props: DataCollectionVariableProps, state_map: Option<CollectionStateMap>, log: &ErrorLog) -> Self {
        let resolution = resolve_collection_variable(&props, state_map.as_ref(), log);
        Self {
            props,
            state_map,
            resolution,
            inner: None,
        }
    }

    /// Swap in a new state map and resolve again. Returns whether the
    /// resolution changed.
    pub fn update_collections_state_map(&mut self, state_map: CollectionStateMap, log: &ErrorLog) -> bool {
        let resolution = resolve_collection_variable(&self.props, Some(&state_map), log);
        self.state_map = Some(state_map);
        let changed = resolution != self.resolution;
        self.resolution = resolution;
        changed
    }

    pub fn get_data_value(&self, store: &DataSources) -> Value {
        match &self.resolution {
            CollectionResolution::Value(value) => value.clone(),
            CollectionResolution::Variable(variable) => variable.resolve(store),
        }
    }

    pub fn resolution(&self) -> &CollectionResolution {
        &self.resolution
    }

    /// The data variable backing the resolved value, if any.
    pub fn data_variable(&self) -> Option<&DataVariableProps> {
        match &self.resolution {
            CollectionResolution::Variable(variable) => Some(variable),
            CollectionResolution::Value(_) => None,
        }
    }

    pub fn state_map(&self) -> Option<&CollectionStateMap> {
        self.state_map.as_ref()
    }

    pub fn props(&self) -> &DataCollectionVariableProps {
        &self.props
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::CollectionState;
    use crate::data::{DataRecord, DataSource, DataSourceDef};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn map(item: Value, index: usize) -> CollectionStateMap {
        CollectionStateMap::from([(
            "list".to_owned(),
            CollectionState {
                collection_id: "list".into(),
                current_index: index,
                current_item: item,
                start_index: 0,
                end_index: 2,
                total_items: 3,
                remaining_items: 2 - index,
            },
        )])
    }

    fn props(ty: CollectionStateVariableType) -> DataCollectionVariableProps {
        DataCollectionVariableProps::new("list", ty)
    }

    #[test]
    fn reads_scalar_state() {
        let log = ErrorLog::new();
        let m = map(json!({}), 1);
        assert_eq!(
            resolve_collection_variable(&props(CollectionStateVariableType::CurrentIndex), Some(&m), &log),
            CollectionResolution::Value(json!(1))
        );
        assert_eq!(
            resolve_collection_variable(&props(CollectionStateVariableType::RemainingItems), Some(&m), &log),
            CollectionResolution::Value(json!(1))
        );
        assert!(log.is_empty());
    }

    #[test]
    fn current_item_paths() {
        let log = ErrorLog::new();
        let m = map(json!({ "name": "Ann", "tags": ["a"] }), 0);
        let p = props(CollectionStateVariableType::CurrentItem);
        assert_eq!(
            resolve_collection_variable(&p.clone().with_path("name"), Some(&m), &log),
            CollectionResolution::Value(json!("Ann"))
        );
        assert_eq!(
            resolve_collection_variable(&p.clone().with_path("tags[0]"), Some(&m), &log),
            CollectionResolution::Value(json!("a"))
        );
        assert_eq!(
            resolve_collection_variable(&p, Some(&m), &log),
            CollectionResolution::Value(json!({ "name": "Ann", "tags": ["a"] }))
        );
        assert!(log.is_empty());

        assert_eq!(
            resolve_collection_variable(&p.with_path("age"), Some(&m), &log),
            CollectionResolution::Value(json!(""))
        );
        assert!(log.contains("path \"age\" not found"));
    }

    #[test]
    fn record_backed_items_resolve_to_variables() {
        let log = ErrorLog::new();
        let m = map(json!({ "type": "data-variable", "path": "users.u1" }), 0);
        let p = props(CollectionStateVariableType::CurrentItem).with_path("name");
        assert_eq!(
            resolve_collection_variable(&p, Some(&m), &log),
            CollectionResolution::Variable(DataVariableProps::new("users.u1.name"))
        );
    }

    #[test]
    fn missing_state_logs_and_yields_empty() {
        let log = ErrorLog::new();
        let p = props(CollectionStateVariableType::CurrentIndex);
        assert_eq!(
            resolve_collection_variable(&p, None, &log),
            CollectionResolution::Value(json!(""))
        );
        let other = DataCollectionVariableProps::new("other", CollectionStateVariableType::CurrentIndex);
        assert_eq!(
            resolve_collection_variable(&other, Some(&map(json!(1), 0)), &log),
            CollectionResolution::Value(json!(""))
        );
        let untyped = DataCollectionVariableProps {
            variable_type: None,
            collection_id: "list".into(),
            path: None,
        };
        assert_eq!(
            resolve_collection_variable(&untyped, Some(&map(json!(1), 0)), &log),
            CollectionResolution::Value(json!(""))
        );
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn state_map_updates_change_resolution() {
        let log = ErrorLog::new();
        let mut store = DataSources::new();
        store.add(DataSource::from_def(DataSourceDef::new("users").with_records([
            DataRecord::new("u1").with_field("name", "Ann"),
            DataRecord::new("u2").with_field("name", "Bob"),
        ])));

        let p = props(CollectionStateVariableType::CurrentItem).with_path("name");
        let item = |id: &str| json!({ "type": "data-variable", "path": format!("users.{id}") });
        let mut var = DataCollectionVariable::new(p, Some(map(item("u1"), 0)), &log);
        assert_eq!(var.get_data_value(&store), json!("Ann"));
        assert_eq!(var.data_variable().map(|v| v.path.as_str()), Some("users.u1.name"));

        assert!(var.update_collections_state_map(map(item("u2"), 1), &log));
        assert_eq!(var.get_data_value(&store), json!("Bob"));
        assert!(!var.update_collections_state_map(map(item("u2"), 1), &log));
        assert_eq!(var.state_map().map(|m| m["list"].current_index), Some(1));
    }
}
