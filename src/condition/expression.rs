//! Condition trees: booleans, expressions and logic groups.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::operators::{type_name, GenericOperator, LogicalOperator, NumberOperator, StringOperator};
use crate::data::DataSources;
use crate::error::{ConditionError, OperatorFamily};
use crate::resolver::DataVariableProps;

/// A condition definition.
///
/// Shapes are tried in order: a literal boolean, a logic group
/// (`logicalOperator` + `statements`), an expression (`left` + string
/// `operator`). Anything else deserializes as [`ConditionProps::Invalid`]
/// and fails when evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionProps {
    Boolean(bool),
    Group(LogicGroup),
    Expression(Expression),
    Invalid(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicGroup {
    pub logical_operator: String,
    pub statements: Vec<ConditionProps>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub left: Value,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<Value>,
}

impl Expression {
    pub fn new(left: impl Into<Value>, operator: impl Into<String>, right: impl Into<Value>) -> Self {
        Self {
            left: left.into(),
            operator: operator.into(),
            right: Some(right.into()),
        }
    }
}

impl ConditionProps {
    /// Build an expression condition.
    pub fn expression(left: impl Into<Value>, operator: impl Into<String>, right: impl Into<Value>) -> Self {
        ConditionProps::Expression(Expression::new(left, operator, right))
    }

    /// Build a logic group.
    pub fn group(operator: LogicalOperator, statements: Vec<ConditionProps>) -> Self {
        ConditionProps::Group(LogicGroup {
            logical_operator: operator.as_str().to_owned(),
            statements,
        })
    }

    /// Evaluate against the current data.
    pub fn evaluate(&self, store: &DataSources) -> Result<bool, ConditionError> {
        match self {
            ConditionProps::Boolean(b) => Ok(*b),
            ConditionProps::Group(group) => {
                let operator = LogicalOperator::parse(&group.logical_operator)?;
                let results = group
                    .statements
                    .iter()
                    .map(|s| s.evaluate(store))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(operator.evaluate(&results))
            }
            ConditionProps::Expression(expr) => evaluate_expression(expr, store),
            ConditionProps::Invalid(_) => Err(ConditionError::InvalidCondition),
        }
    }

    /// Every data variable referenced as an operand, in tree order.
    pub fn data_variables(&self) -> Vec<DataVariableProps> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut Vec<DataVariableProps>) {
        match self {
            ConditionProps::Expression(expr) => {
                out.extend(DataVariableProps::from_operand(&expr.left));
                if let Some(right) = &expr.right {
                    out.extend(DataVariableProps::from_operand(right));
                }
            }
            ConditionProps::Group(group) => {
                for statement in &group.statements {
                    statement.collect_variables(out);
                }
            }
            ConditionProps::Boolean(_) | ConditionProps::Invalid(_) => {}
        }
    }
}

impl From<bool> for ConditionProps {
    fn from(value: bool) -> Self {
        ConditionProps::Boolean(value)
    }
}

/// Resolve an operand: data variables read the store, anything else is
/// taken literally.
pub fn resolve_operand(operand: &Value, store: &DataSources) -> Value {
    match DataVariableProps::from_operand(operand) {
        Some(variable) => variable.resolve(store),
        None => operand.clone(),
    }
}

fn evaluate_expression(expr: &Expression, store: &DataSources) -> Result<bool, ConditionError> {
    let left = resolve_operand(&expr.left, store);
    let right = expr
        .right
        .as_ref()
        .map(|r| resolve_operand(r, store))
        .unwrap_or(Value::Null);
    let name = expr.operator.as_str();

    if let Some(op) = GenericOperator::parse(name) {
        return Ok(op.evaluate(&left, &right));
    }

    match &left {
        Value::Number(n) => {
            let op = NumberOperator::parse(name).ok_or_else(|| ConditionError::UnsupportedOperator {
                operator: name.to_owned(),
                family: OperatorFamily::Number,
            })?;
            Ok(n.as_f64().is_some_and(|l| op.evaluate(l, &right)))
        }
        Value::String(s) => {
            let op = StringOperator::parse(name).ok_or_else(|| ConditionError::UnsupportedOperator {
                operator: name.to_owned(),
                family: OperatorFamily::String,
            })?;
            op.evaluate(s, &right)
        }
        other => Err(ConditionError::UnsupportedDataType {
            operator: name.to_owned(),
            data_type: type_name(other),
        }),
    }
}
