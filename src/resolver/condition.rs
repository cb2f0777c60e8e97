//! DataCondition: a condition plus the values it selects between.

use serde_json::Value;

use super::props::{DataConditionProps, DataVariableProps};
use crate::condition::{resolve_operand, ConditionProps};
use crate::data::DataSources;
use crate::error::{ConditionError, ResolverError};

#[derive(Debug, Clone, PartialEq)]
pub struct DataCondition {
    props: DataConditionProps,
    condition: ConditionProps,
    last_evaluation_result: bool,
}

impl DataCondition {
    /// Build and evaluate once.
    ///
    /// Fails when the definition has no condition, or when the first
    /// evaluation fails.
    pub fn new(props: DataConditionProps, store: &DataSources) -> Result<Self, ResolverError> {
        let condition = props.condition.clone().ok_or(ResolverError::MissingCondition)?;
        let last_evaluation_result = condition.evaluate(store)?;
        Ok(Self {
            props,
            condition,
            last_evaluation_result,
        })
    }

    /// Result of the most recent evaluation.
    pub fn is_true(&self) -> bool {
        self.last_evaluation_result
    }

    /// Evaluate again against the current data and cache the result. On
    /// error the cached result is left untouched.
    pub fn reevaluate(&mut self, store: &DataSources) -> Result<bool, ConditionError> {
        self.last_evaluation_result = self.condition.evaluate(store)?;
        Ok(self.last_evaluation_result)
    }

    /// The selected branch, with data variables resolved.
    pub fn get_data_value(&self, store: &DataSources) -> Value {
        let branch = if self.last_evaluation_result {
            &self.props.if_true
        } else {
            &self.props.if_false
        };
        branch
            .as_ref()
            .map(|v| resolve_operand(v, store))
            .unwrap_or(Value::Null)
    }

    /// Data variables in the condition, followed by either branch that is
    /// itself a data variable.
    pub fn dependent_data_variables(&self) -> Vec<DataVariableProps> {
        let mut vars = self.condition.data_variables();
        for branch in [&self.props.if_true, &self.props.if_false].into_iter().flatten() {
            vars.extend(DataVariableProps::from_operand(branch));
        }
        vars
    }

    pub fn condition(&self) -> &ConditionProps {
        &self.condition
    }

    pub fn props(&self) -> &DataConditionProps {
        &self.props
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataRecord, DataSource, DataSourceDef};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn store(value: i64) -> DataSources {
        let mut store = DataSources::new();
        store.add(DataSource::from_def(
            DataSourceDef::new("ds").with_record(DataRecord::new("r").with_field("n", value)),
        ));
        store
    }

    fn var(path: &str) -> Value {
        json!({ "type": "data-variable", "path": path })
    }

    #[test]
    fn missing_condition_fails() {
        let props = DataConditionProps {
            condition: None,
            if_true: Some(json!(1)),
            if_false: None,
        };
        assert!(matches!(
            DataCondition::new(props, &store(0)),
            Err(ResolverError::MissingCondition)
        ));
    }

    #[test]
    fn invalid_condition_fails_at_construction() {
        let props: DataConditionProps = serde_json::from_value(json!({ "condition": { "x": 1 } })).unwrap();
        assert!(matches!(
            DataCondition::new(props, &store(0)),
            Err(ResolverError::Condition(ConditionError::InvalidCondition))
        ));
    }

    #[test]
    fn selects_branch_and_reevaluates() {
        let props = DataConditionProps::new(ConditionProps::expression(var("ds.r.n"), ">", 5))
            .if_true("big")
            .if_false("small");
        let mut cond = DataCondition::new(props, &store(10)).unwrap();
        assert!(cond.is_true());
        assert_eq!(cond.get_data_value(&store(10)), json!("big"));

        let changed = store(1);
        assert!(!cond.reevaluate(&changed).unwrap());
        assert_eq!(cond.get_data_value(&changed), json!("small"));
    }

    #[test]
    fn branches_resolve_variables_and_default_to_null() {
        let props = DataConditionProps::new(true).if_true(var("ds.r.n"));
        let cond = DataCondition::new(props, &store(7)).unwrap();
        assert_eq!(cond.get_data_value(&store(7)), json!(7));

        let cond = DataCondition::new(DataConditionProps::new(false), &store(7)).unwrap();
        assert_eq!(cond.get_data_value(&store(7)), Value::Null);
    }

    #[test]
    fn dependencies_include_branch_variables() {
        let props = DataConditionProps::new(ConditionProps::expression(var("ds.a"), "equals", var("ds.b")))
            .if_true(var("ds.t"))
            .if_false("plain");
        let cond = DataCondition::new(props, &store(0)).unwrap();
        let paths: Vec<_> = cond.dependent_data_variables().into_iter().map(|v| v.path).collect();
        assert_eq!(paths, vec!["ds.a", "ds.b", "ds.t"]);
    }
}
