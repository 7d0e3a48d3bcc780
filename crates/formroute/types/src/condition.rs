//! The stage condition mini-language
//!
//! A stage's conditions arrive as a JSON mapping of field name to a mapping
//! of operator symbol to threshold, e.g.
//! `{"leave_days": {">": 3}, "category": {"==": "SICK"}}`.
//!
//! Conditions are parsed into a tagged representation at workflow-authoring
//! time. An unknown operator symbol is a configuration error and fails the
//! parse; it can never surface while a live submission is being routed.
//! Evaluation itself lives in the engine crate and is a pure function.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Failure to parse a condition mapping. Always a configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConditionError {
    #[error("unknown operator '{operator}' on field '{field}'")]
    UnknownOperator { field: String, operator: String },

    #[error("operator '{operator}' on field '{field}' requires a numeric threshold")]
    NonNumericThreshold { field: String, operator: String },

    #[error("conditions must be an object of field -> operator -> threshold: {0}")]
    InvalidShape(String),
}

// ── Checks ───────────────────────────────────────────────────────────

/// One validated operator check against a single form field.
#[derive(Clone, Debug, PartialEq)]
pub enum Check {
    /// `>` - strict numeric greater-than
    GreaterThan(f64),
    /// `<` - strict numeric less-than
    LessThan(f64),
    /// `>=` - numeric at-least
    AtLeast(f64),
    /// `<=` - numeric at-most
    AtMost(f64),
    /// `==` - case-insensitive textual equality
    Equals(String),
    /// `!=` - case-insensitive textual inequality
    NotEquals(String),
    /// `IN` - membership in a sequence threshold. The raw threshold is kept
    /// as authored: a non-sequence evaluates to false at runtime rather than
    /// failing validation.
    OneOf(Value),
}

impl Check {
    /// The wire symbol for this operator
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::GreaterThan(_) => ">",
            Self::LessThan(_) => "<",
            Self::AtLeast(_) => ">=",
            Self::AtMost(_) => "<=",
            Self::Equals(_) => "==",
            Self::NotEquals(_) => "!=",
            Self::OneOf(_) => "IN",
        }
    }

    fn threshold_value(&self) -> Value {
        match self {
            Self::GreaterThan(n) | Self::LessThan(n) | Self::AtLeast(n) | Self::AtMost(n) => {
                serde_json::json!(n)
            }
            Self::Equals(s) | Self::NotEquals(s) => Value::String(s.clone()),
            Self::OneOf(v) => v.clone(),
        }
    }
}

/// All operator checks attached to one form field (AND semantics)
#[derive(Clone, Debug, PartialEq)]
pub struct FieldCondition {
    pub field: String,
    pub checks: Vec<Check>,
}

// ── Condition Set ────────────────────────────────────────────────────

/// The validated condition set of a stage.
///
/// Semantics are a conjunction: the stage applies only if every check of
/// every field holds. An empty set always applies.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ConditionSet {
    fields: Vec<FieldCondition>,
}

impl ConditionSet {
    /// The always-applies condition set
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[FieldCondition] {
        &self.fields
    }

    /// Parse and validate a raw condition mapping.
    ///
    /// `null` (or an empty object) parses to the empty set. Any other shape
    /// must be an object of field name to operator-to-threshold objects.
    pub fn parse(raw: &Value) -> Result<Self, ConditionError> {
        let object = match raw {
            Value::Null => return Ok(Self::empty()),
            Value::Object(map) => map,
            other => return Err(ConditionError::InvalidShape(other.to_string())),
        };

        let mut fields = Vec::with_capacity(object.len());
        for (field, checks_raw) in object {
            let checks_map = checks_raw.as_object().ok_or_else(|| {
                ConditionError::InvalidShape(format!(
                    "field '{}' must map to an operator object",
                    field
                ))
            })?;

            let mut checks = Vec::with_capacity(checks_map.len());
            for (operator, threshold) in checks_map {
                checks.push(parse_check(field, operator, threshold)?);
            }
            fields.push(FieldCondition {
                field: field.clone(),
                checks,
            });
        }
        Ok(Self { fields })
    }

    /// Render the set back to its JSON wire form
    pub fn to_value(&self) -> Value {
        let mut object = serde_json::Map::new();
        for field in &self.fields {
            let mut checks = serde_json::Map::new();
            for check in &field.checks {
                checks.insert(check.symbol().to_string(), check.threshold_value());
            }
            object.insert(field.field.clone(), Value::Object(checks));
        }
        Value::Object(object)
    }
}

fn parse_check(field: &str, operator: &str, threshold: &Value) -> Result<Check, ConditionError> {
    let numeric = |op: &str| -> Result<f64, ConditionError> {
        threshold_as_number(threshold).ok_or_else(|| ConditionError::NonNumericThreshold {
            field: field.to_string(),
            operator: op.to_string(),
        })
    };

    match operator {
        ">" => Ok(Check::GreaterThan(numeric(">")?)),
        "<" => Ok(Check::LessThan(numeric("<")?)),
        ">=" => Ok(Check::AtLeast(numeric(">=")?)),
        "<=" => Ok(Check::AtMost(numeric("<=")?)),
        "==" => Ok(Check::Equals(value_as_text(threshold))),
        "!=" => Ok(Check::NotEquals(value_as_text(threshold))),
        "IN" => Ok(Check::OneOf(threshold.clone())),
        other => Err(ConditionError::UnknownOperator {
            field: field.to_string(),
            operator: other.to_string(),
        }),
    }
}

/// Coerce a threshold to a number: JSON numbers directly, numeric strings
/// by parsing (administrators routinely type "3" into a text box).
pub fn threshold_as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Textualize a JSON value for the `==`/`!=` operators
pub fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

// Serde goes through the JSON wire form so that anything deserialized is
// revalidated by the same parser workflow authoring uses.
impl Serialize for ConditionSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ConditionSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_and_empty_parse_to_empty() {
        assert!(ConditionSet::parse(&Value::Null).unwrap().is_empty());
        assert!(ConditionSet::parse(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn test_parse_mixed_operators() {
        let set = ConditionSet::parse(&json!({
            "leave_days": {">": 3, "<=": 30},
            "category": {"==": "SICK"},
            "region": {"IN": ["EU", "NA"]}
        }))
        .unwrap();

        assert_eq!(set.fields().len(), 3);
        let days = set.fields().iter().find(|f| f.field == "leave_days").unwrap();
        assert!(days.checks.contains(&Check::GreaterThan(3.0)));
        assert!(days.checks.contains(&Check::AtMost(30.0)));
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        let err = ConditionSet::parse(&json!({"days": {"~=": 1}})).unwrap_err();
        assert!(matches!(err, ConditionError::UnknownOperator { .. }));
        assert!(err.to_string().contains("~="));
    }

    #[test]
    fn test_numeric_threshold_validation() {
        let err = ConditionSet::parse(&json!({"days": {">": "many"}})).unwrap_err();
        assert!(matches!(err, ConditionError::NonNumericThreshold { .. }));

        // Numeric strings are accepted
        let set = ConditionSet::parse(&json!({"days": {">": "3"}})).unwrap();
        assert_eq!(set.fields()[0].checks[0], Check::GreaterThan(3.0));
    }

    #[test]
    fn test_non_object_shapes_rejected() {
        assert!(matches!(
            ConditionSet::parse(&json!([1, 2])),
            Err(ConditionError::InvalidShape(_))
        ));
        assert!(matches!(
            ConditionSet::parse(&json!({"days": 3})),
            Err(ConditionError::InvalidShape(_))
        ));
    }

    #[test]
    fn test_in_with_non_sequence_threshold_parses() {
        // Validation keeps the raw threshold; evaluation treats it as false.
        let set = ConditionSet::parse(&json!({"region": {"IN": "EU"}})).unwrap();
        assert_eq!(set.fields()[0].checks[0], Check::OneOf(json!("EU")));
    }

    #[test]
    fn test_wire_form_roundtrip() {
        let raw = json!({"amount": {">": 1000.0}, "category": {"==": "TRAVEL"}});
        let set = ConditionSet::parse(&raw).unwrap();
        assert_eq!(set.to_value(), raw);

        let reparsed: ConditionSet = serde_json::from_value(set.to_value()).unwrap();
        assert_eq!(reparsed, set);
    }

    #[test]
    fn test_deserialize_rejects_unknown_operator() {
        let result: Result<ConditionSet, _> =
            serde_json::from_value(json!({"days": {"BETWEEN": [1, 2]}}));
        assert!(result.is_err());
    }
}
