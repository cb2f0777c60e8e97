//! Operator families used by condition expressions.
//!
//! Each family is a closed enum parsed from the operator name found in a
//! condition definition. The family an expression uses is picked from the
//! operator name (generic operators apply to any value) and then from the
//! type of the resolved left operand.

use regex::Regex;
use serde_json::Value;

use crate::error::{ConditionError, OperatorFamily};

// ---------------------------------------------------------------------------
// Generic
// ---------------------------------------------------------------------------

/// Operators applicable to any value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenericOperator {
    Equals,
    NotEquals,
    IsTrue,
    IsFalse,
    IsDefined,
    IsNull,
    IsArray,
    IsObject,
    IsString,
    IsNumber,
    IsBoolean,
}

impl GenericOperator {
    pub const ALL: [GenericOperator; 11] = [
        GenericOperator::Equals,
        GenericOperator::NotEquals,
        GenericOperator::IsTrue,
        GenericOperator::IsFalse,
        GenericOperator::IsDefined,
        GenericOperator::IsNull,
        GenericOperator::IsArray,
        GenericOperator::IsObject,
        GenericOperator::IsString,
        GenericOperator::IsNumber,
        GenericOperator::IsBoolean,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GenericOperator::Equals => "equals",
            GenericOperator::NotEquals => "notEquals",
            GenericOperator::IsTrue => "isTrue",
            GenericOperator::IsFalse => "isFalse",
            GenericOperator::IsDefined => "isDefined",
            GenericOperator::IsNull => "isNull",
            GenericOperator::IsArray => "isArray",
            GenericOperator::IsObject => "isObject",
            GenericOperator::IsString => "isString",
            GenericOperator::IsNumber => "isNumber",
            GenericOperator::IsBoolean => "isBoolean",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }

    pub fn evaluate(self, left: &Value, right: &Value) -> bool {
        match self {
            GenericOperator::Equals => loose_equals(left, right),
            GenericOperator::NotEquals => !loose_equals(left, right),
            GenericOperator::IsTrue => left == &Value::Bool(true),
            GenericOperator::IsFalse => left == &Value::Bool(false),
            GenericOperator::IsDefined => !left.is_null(),
            GenericOperator::IsNull => left.is_null(),
            GenericOperator::IsArray => left.is_array(),
            GenericOperator::IsObject => left.is_object(),
            GenericOperator::IsString => left.is_string(),
            GenericOperator::IsNumber => left.is_number(),
            GenericOperator::IsBoolean => left.is_boolean(),
        }
    }
}

/// JSON equality, except numbers compare by numeric value (`1 == 1.0`).
fn loose_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

// ---------------------------------------------------------------------------
// Number
// ---------------------------------------------------------------------------

/// Numeric comparisons. The right operand is coerced from numeric strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberOperator {
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Equals,
    NotEquals,
}

impl NumberOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            NumberOperator::GreaterThan => ">",
            NumberOperator::LessThan => "<",
            NumberOperator::GreaterThanOrEqual => ">=",
            NumberOperator::LessThanOrEqual => "<=",
            NumberOperator::Equals => "=",
            NumberOperator::NotEquals => "!=",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let op = match name {
            ">" => NumberOperator::GreaterThan,
            "<" => NumberOperator::LessThan,
            ">=" => NumberOperator::GreaterThanOrEqual,
            "<=" => NumberOperator::LessThanOrEqual,
            "=" => NumberOperator::Equals,
            "!=" => NumberOperator::NotEquals,
            _ => return None,
        };
        Some(op)
    }

    pub fn evaluate(self, left: f64, right: &Value) -> bool {
        let Some(right) = coerce_number(right) else {
            return self == NumberOperator::NotEquals;
        };
        match self {
            NumberOperator::GreaterThan => left > right,
            NumberOperator::LessThan => left < right,
            NumberOperator::GreaterThanOrEqual => left >= right,
            NumberOperator::LessThanOrEqual => left <= right,
            NumberOperator::Equals => left == right,
            NumberOperator::NotEquals => left != right,
        }
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// String
// ---------------------------------------------------------------------------

/// String comparisons. The right operand is stringified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringOperator {
    Contains,
    StartsWith,
    EndsWith,
    MatchesRegex,
    EqualsIgnoreCase,
    TrimEquals,
}

impl StringOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            StringOperator::Contains => "contains",
            StringOperator::StartsWith => "startsWith",
            StringOperator::EndsWith => "endsWith",
            StringOperator::MatchesRegex => "matchesRegex",
            StringOperator::EqualsIgnoreCase => "equalsIgnoreCase",
            StringOperator::TrimEquals => "trimEquals",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let op = match name {
            "contains" => StringOperator::Contains,
            "startsWith" => StringOperator::StartsWith,
            "endsWith" => StringOperator::EndsWith,
            "matchesRegex" => StringOperator::MatchesRegex,
            "equalsIgnoreCase" => StringOperator::EqualsIgnoreCase,
            "trimEquals" => StringOperator::TrimEquals,
            _ => return None,
        };
        Some(op)
    }

    pub fn evaluate(self, left: &str, right: &Value) -> Result<bool, ConditionError> {
        let right = stringify(right);
        let result = match self {
            StringOperator::Contains => left.contains(right.as_str()),
            StringOperator::StartsWith => left.starts_with(right.as_str()),
            StringOperator::EndsWith => left.ends_with(right.as_str()),
            StringOperator::MatchesRegex => {
                if right.is_empty() {
                    return Err(ConditionError::EmptyRegexPattern);
                }
                Regex::new(&right)?.is_match(left)
            }
            StringOperator::EqualsIgnoreCase => left.to_lowercase() == right.to_lowercase(),
            StringOperator::TrimEquals => left.trim() == right.trim(),
        };
        Ok(result)
    }
}

/// String form of an operand: strings as-is, null as empty, anything else
/// as its JSON text.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Logical
// ---------------------------------------------------------------------------

/// Combinators over a list of statement results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
    Xor,
}

impl LogicalOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOperator::And => "and",
            LogicalOperator::Or => "or",
            LogicalOperator::Xor => "xor",
        }
    }

    /// Parse an operator name, failing for unknown names.
    pub fn parse(name: &str) -> Result<Self, ConditionError> {
        match name {
            "and" => Ok(LogicalOperator::And),
            "or" => Ok(LogicalOperator::Or),
            "xor" => Ok(LogicalOperator::Xor),
            _ => Err(ConditionError::UnsupportedOperator {
                operator: name.to_owned(),
                family: OperatorFamily::Logical,
            }),
        }
    }

    /// `xor` is true when exactly one statement is true.
    pub fn evaluate(self, results: &[bool]) -> bool {
        match self {
            LogicalOperator::And => results.iter().all(|&r| r),
            LogicalOperator::Or => results.iter().any(|&r| r),
            LogicalOperator::Xor => results.iter().filter(|&&r| r).count() == 1,
        }
    }
}

/// JSON type name of a value, for error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generic_names_round_trip() {
        for op in GenericOperator::ALL {
            assert_eq!(GenericOperator::parse(op.as_str()), Some(op));
        }
        assert_eq!(GenericOperator::parse(">"), None);
    }

    #[test]
    fn generic_checks() {
        use GenericOperator::*;
        assert!(Equals.evaluate(&json!("a"), &json!("a")));
        assert!(Equals.evaluate(&json!(1), &json!(1.0)));
        assert!(!Equals.evaluate(&json!(1), &json!("1")));
        assert!(NotEquals.evaluate(&json!([1]), &json!([2])));
        assert!(IsTrue.evaluate(&json!(true), &Value::Null));
        assert!(!IsTrue.evaluate(&json!("true"), &Value::Null));
        assert!(IsFalse.evaluate(&json!(false), &Value::Null));
        assert!(IsDefined.evaluate(&json!(0), &Value::Null));
        assert!(!IsDefined.evaluate(&Value::Null, &Value::Null));
        assert!(IsNull.evaluate(&Value::Null, &Value::Null));
        assert!(IsArray.evaluate(&json!([]), &Value::Null));
        assert!(IsObject.evaluate(&json!({}), &Value::Null));
        assert!(IsString.evaluate(&json!(""), &Value::Null));
        assert!(IsNumber.evaluate(&json!(2.5), &Value::Null));
        assert!(IsBoolean.evaluate(&json!(false), &Value::Null));
    }

    #[test]
    fn number_comparisons() {
        use NumberOperator::*;
        assert!(GreaterThan.evaluate(5.0, &json!(3)));
        assert!(!GreaterThan.evaluate(3.0, &json!(3)));
        assert!(LessThan.evaluate(2.0, &json!("10")));
        assert!(GreaterThanOrEqual.evaluate(3.0, &json!(3)));
        assert!(LessThanOrEqual.evaluate(3.0, &json!(3.5)));
        assert!(Equals.evaluate(4.0, &json!(4)));
        assert!(NotEquals.evaluate(4.0, &json!(5)));
        assert!(!GreaterThan.evaluate(4.0, &json!("abc")));
        assert!(NotEquals.evaluate(4.0, &json!("abc")));
        assert_eq!(NumberOperator::parse(">="), Some(GreaterThanOrEqual));
        assert_eq!(NumberOperator::parse("contains"), None);
    }

    #[test]
    fn string_comparisons() {
        use StringOperator::*;
        assert!(Contains.evaluate("hello world", &json!("lo w")).unwrap());
        assert!(StartsWith.evaluate("hello", &json!("he")).unwrap());
        assert!(EndsWith.evaluate("hello", &json!("llo")).unwrap());
        assert!(!EndsWith.evaluate("hello", &json!("he")).unwrap());
        assert!(MatchesRegex.evaluate("abc123", &json!(r"^[a-z]+\d+$")).unwrap());
        assert!(EqualsIgnoreCase.evaluate("HeLLo", &json!("hello")).unwrap());
        assert!(TrimEquals.evaluate("  hi ", &json!("hi")).unwrap());
        assert!(Contains.evaluate("v5", &json!(5)).unwrap());
    }

    #[test]
    fn regex_errors() {
        let err = StringOperator::MatchesRegex.evaluate("x", &json!("")).unwrap_err();
        assert!(matches!(err, ConditionError::EmptyRegexPattern));
        let err = StringOperator::MatchesRegex.evaluate("x", &json!("(")).unwrap_err();
        assert!(matches!(err, ConditionError::InvalidRegex(_)));
    }

    #[test]
    fn logical_combinators() {
        use LogicalOperator::*;
        assert!(And.evaluate(&[true, true]));
        assert!(!And.evaluate(&[true, false]));
        assert!(Or.evaluate(&[false, true]));
        assert!(!Or.evaluate(&[false, false]));
        assert!(Xor.evaluate(&[false, true, false]));
        assert!(!Xor.evaluate(&[true, true, false]));
        assert!(!Xor.evaluate(&[false, false]));
        assert!(matches!(
            LogicalOperator::parse("nand"),
            Err(ConditionError::UnsupportedOperator { family: OperatorFamily::Logical, .. })
        ));
    }
}
