//! Error types for every subsystem, plus the [`EditorError`] aggregate.
//!
//! Errors here are the "thrown" failures: invalid definitions and illegal
//! operations. Resolution problems at runtime (missing collection, missing
//! item field, absent state map) are logged through
//! [`ErrorLog`](crate::logging::ErrorLog) instead and degrade to defaults.

use std::fmt;

use crate::dom::ComponentId;

/// The operator family an operator name was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorFamily {
    Generic,
    Number,
    String,
    Logical,
}

impl fmt::Display for OperatorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperatorFamily::Generic => "generic",
            OperatorFamily::Number => "number",
            OperatorFamily::String => "string",
            OperatorFamily::Logical => "logical",
        };
        f.write_str(name)
    }
}

/// Errors raised while evaluating a condition tree.
#[derive(Debug, thiserror::Error)]
pub enum ConditionError {
    #[error("invalid condition type")]
    InvalidCondition,

    #[error("unsupported {family} operator: {operator}")]
    UnsupportedOperator {
        operator: String,
        family: OperatorFamily,
    },

    #[error("unsupported data type {data_type} for operator {operator}")]
    UnsupportedDataType {
        operator: String,
        data_type: &'static str,
    },

    #[error("regex pattern must be provided")]
    EmptyRegexPattern,

    #[error("invalid regex pattern: {0}")]
    InvalidRegex(#[from] regex::Error),
}

/// Errors raised by data source and record operations.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("cannot remove immutable record {record} from data source {data_source}")]
    ImmutableRecord { data_source: String, record: String },

    #[error("record {record} already exists in data source {data_source}")]
    DuplicateRecord { data_source: String, record: String },

    #[error("data source not found: {0}")]
    SourceNotFound(String),

    #[error("record {record} not found in data source {data_source}")]
    RecordNotFound { data_source: String, record: String },

    #[error("path does not address a record field: {0}")]
    InvalidPath(String),

    #[error("field {key} of record {record} in data source {data_source} is reserved")]
    ReservedField {
        data_source: String,
        record: String,
        key: String,
    },
}

/// Errors raised while building a resolver from its definition.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("no condition was provided to a conditional resolver")]
    MissingCondition,

    #[error("unsupported resolver type: {0}")]
    UnsupportedType(String),

    #[error("invalid resolver definition: {0}")]
    InvalidDefinition(#[from] serde_json::Error),

    #[error(transparent)]
    Condition(#[from] ConditionError),
}

/// Top-level error returned by [`Editor`](crate::Editor) operations.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error(transparent)]
    Condition(#[from] ConditionError),

    #[error("component not found: {0:?}")]
    ComponentNotFound(ComponentId),

    #[error("invalid definition: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = EditorError> = std::result::Result<T, E>;
