//! Data resolvers: values computed from data sources, conditions and
//! collection state instead of stored literally.
//!
//! Resolver definitions ([`ResolverProps`]) are plain tagged objects. The
//! editor turns them into live [`Resolver`]s stored in an arena keyed by
//! [`ResolverId`], and [`ResolverListener`]s tie a resolver's dependencies
//! to one update callback.

pub mod collection_variable;
pub mod condition;
pub mod listener;
pub mod props;
pub mod variable;

use serde_json::Value;
use slotmap::new_key_type;

use crate::collection::CollectionStateMap;
use crate::data::DataSources;
use crate::error::ResolverError;
use crate::logging::ErrorLog;

pub use collection_variable::{resolve_collection_variable, CollectionResolution, DataCollectionVariable};
pub use condition::DataCondition;
pub use listener::{ListenerId, ListenerState, ResolverListener, UpdateFn};
pub use props::{
    is_collection_variable, DataCollectionVariableProps, DataConditionProps, DataVariableProps, ResolverProps,
    DATA_COLLECTION_VARIABLE_TYPE, DATA_CONDITION_TYPE, DATA_VARIABLE_TYPE, LEGACY_CONDITION_TYPE,
};
pub use variable::DataVariable;

new_key_type! {
    /// Identifies a live resolver in the editor's resolver arena.
    pub struct ResolverId;
}

/// A live resolver.
#[derive(Debug, Clone)]
pub enum Resolver {
    Variable(DataVariable),
    Condition(DataCondition),
    CollectionVariable(DataCollectionVariable),
}

impl Resolver {
    /// Build a resolver from its definition.
    ///
    /// `scope` is the collection state visible where the resolver is used;
    /// only collection variables read it. A condition without a
    /// `condition` fails here.
    pub fn from_props(
        props: ResolverProps,
        scope: Option<CollectionStateMap>,
        store: &DataSources,
        log: &ErrorLog,
    ) -> Result<Self, ResolverError> {
        Ok(match props {
            ResolverProps::Variable(props) => Resolver::Variable(DataVariable::new(props)),
            ResolverProps::Condition(props) => Resolver::Condition(DataCondition::new(props, store)?),
            ResolverProps::CollectionVariable(props) => {
                Resolver::CollectionVariable(DataCollectionVariable::new(props, scope, log))
            }
        })
    }

    /// Current value.
    pub fn get_data_value(&self, store: &DataSources) -> Value {
        match self {
            Resolver::Variable(variable) => variable.get_data_value(store),
            Resolver::Condition(condition) => condition.get_data_value(store),
            Resolver::CollectionVariable(variable) => variable.get_data_value(store),
        }
    }

    /// The definition this resolver serializes back to.
    pub fn props(&self) -> ResolverProps {
        match self {
            Resolver::Variable(variable) => ResolverProps::Variable(variable.props().clone()),
            Resolver::Condition(condition) => ResolverProps::Condition(condition.props().clone()),
            Resolver::CollectionVariable(variable) => ResolverProps::CollectionVariable(variable.props().clone()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Resolver::Variable(_) => DATA_VARIABLE_TYPE,
            Resolver::Condition(_) => DATA_CONDITION_TYPE,
            Resolver::CollectionVariable(_) => DATA_COLLECTION_VARIABLE_TYPE,
        }
    }

    pub fn is_collection_variable(&self) -> bool {
        matches!(self, Resolver::CollectionVariable(_))
    }
}
