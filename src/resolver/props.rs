//! Serializable resolver definitions.
//!
//! A resolver definition is a JSON object tagged by `type`:
//!
//! ```json
//! { "type": "data-variable", "path": "users.u1.name", "defaultValue": "" }
//! { "type": "data-condition", "condition": { ... }, "ifTrue": 1, "ifFalse": 0 }
//! { "type": "data-collection-variable", "variableType": "currentItem",
//!   "collectionId": "users_list", "path": "name" }
//! ```
//!
//! Objects with any other `type` (or none) are ordinary values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collection::CollectionStateVariableType;
use crate::condition::ConditionProps;
use crate::data::DataSources;
use crate::error::ResolverError;

pub const DATA_VARIABLE_TYPE: &str = "data-variable";
pub const DATA_CONDITION_TYPE: &str = "data-condition";
pub const LEGACY_CONDITION_TYPE: &str = "conditional-variable";
pub const DATA_COLLECTION_VARIABLE_TYPE: &str = "data-collection-variable";

/// Any resolver definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResolverProps {
    #[serde(rename = "data-variable")]
    Variable(DataVariableProps),
    #[serde(rename = "data-condition", alias = "conditional-variable")]
    Condition(DataConditionProps),
    #[serde(rename = "data-collection-variable")]
    CollectionVariable(DataCollectionVariableProps),
}

impl ResolverProps {
    /// Whether `value` is tagged as one of the resolver types.
    pub fn is_resolver(value: &Value) -> bool {
        matches!(
            resolver_tag(value),
            Some(DATA_VARIABLE_TYPE | DATA_CONDITION_TYPE | LEGACY_CONDITION_TYPE | DATA_COLLECTION_VARIABLE_TYPE)
        )
    }

    /// Parse a value as a resolver definition.
    ///
    /// Returns `Ok(None)` for plain values and an error for objects tagged
    /// as a resolver whose fields don't fit.
    pub fn from_value(value: &Value) -> Result<Option<Self>, ResolverError> {
        if !Self::is_resolver(value) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value.clone())?))
    }

    pub fn to_value(&self) -> Value {
        // Plain structs of JSON values always serialize.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ResolverProps::Variable(_) => DATA_VARIABLE_TYPE,
            ResolverProps::Condition(_) => DATA_CONDITION_TYPE,
            ResolverProps::CollectionVariable(_) => DATA_COLLECTION_VARIABLE_TYPE,
        }
    }

    pub fn is_collection_variable(&self) -> bool {
        matches!(self, ResolverProps::CollectionVariable(_))
    }
}

/// Whether `value` is a collection variable definition.
pub fn is_collection_variable(value: &Value) -> bool {
    resolver_tag(value) == Some(DATA_COLLECTION_VARIABLE_TYPE)
}

fn resolver_tag(value: &Value) -> Option<&str> {
    value.as_object()?.get("type")?.as_str()
}

impl From<DataVariableProps> for ResolverProps {
    fn from(props: DataVariableProps) -> Self {
        ResolverProps::Variable(props)
    }
}

impl From<DataConditionProps> for ResolverProps {
    fn from(props: DataConditionProps) -> Self {
        ResolverProps::Condition(props)
    }
}

impl From<DataCollectionVariableProps> for ResolverProps {
    fn from(props: DataCollectionVariableProps) -> Self {
        ResolverProps::CollectionVariable(props)
    }
}

// ---------------------------------------------------------------------------
// DataVariableProps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataVariableProps {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl DataVariableProps {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            default_value: None,
        }
    }

    /// Set the fallback value (builder).
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Read the variable from the store. Missing paths give the default, or
    /// null without one.
    pub fn resolve(&self, store: &DataSources) -> Value {
        let default = self.default_value.clone().unwrap_or(Value::Null);
        store.get_value(&self.path, &default)
    }

    /// Interpret a condition operand or branch as a data variable.
    pub fn from_operand(value: &Value) -> Option<Self> {
        if resolver_tag(value) != Some(DATA_VARIABLE_TYPE) {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub fn to_value(&self) -> Value {
        ResolverProps::Variable(self.clone()).to_value()
    }
}

// ---------------------------------------------------------------------------
// DataConditionProps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataConditionProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionProps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_true: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_false: Option<Value>,
}

impl DataConditionProps {
    pub fn new(condition: impl Into<ConditionProps>) -> Self {
        Self {
            condition: Some(condition.into()),
            if_true: None,
            if_false: None,
        }
    }

    /// Set the value used when the condition holds (builder).
    pub fn if_true(mut self, value: impl Into<Value>) -> Self {
        self.if_true = Some(value.into());
        self
    }

    /// Set the value used when the condition fails (builder).
    pub fn if_false(mut self, value: impl Into<Value>) -> Self {
        self.if_false = Some(value.into());
        self
    }
}

// ---------------------------------------------------------------------------
// DataCollectionVariableProps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataCollectionVariableProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_type: Option<CollectionStateVariableType>,
    pub collection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl DataCollectionVariableProps {
    pub fn new(collection_id: impl Into<String>, variable_type: CollectionStateVariableType) -> Self {
        Self {
            variable_type: Some(variable_type),
            collection_id: collection_id.into(),
            path: None,
        }
    }

    /// Set the path read from the current item (builder).
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn to_value(&self) -> Value {
        ResolverProps::CollectionVariable(self.clone()).to_value()
    }
}
