//! Condition evaluation: operator families and condition trees.

pub mod expression;
pub mod operators;

pub use expression::{resolve_operand, ConditionProps, Expression, LogicGroup};
pub use operators::{GenericOperator, LogicalOperator, NumberOperator, StringOperator};
