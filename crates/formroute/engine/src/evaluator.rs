//! Stage condition evaluation
//!
//! Evaluation is total: by the time a submission is being routed, every
//! condition set has already passed authoring-time validation, so the only
//! question left is whether the checks hold for this payload. A check that
//! cannot be answered (missing field, non-coercible value, malformed `IN`
//! threshold) evaluates to a definite boolean rather than an error.

use formroute_types::{threshold_as_number, value_as_text, Check, ConditionSet};
use serde_json::Value;

/// Evaluates stage conditions against a submission's form payload.
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Does this condition set apply to this payload?
    ///
    /// Conjunction over every check of every field; the empty set always
    /// applies. Missing-field semantics per operator:
    /// - numeric comparisons, `==`, and `IN` are false (nothing to compare);
    /// - `!=` is true (an absent value differs from any threshold).
    pub fn applies(conditions: &ConditionSet, form_data: &Value) -> bool {
        conditions.fields().iter().all(|field_condition| {
            let value = form_data.get(&field_condition.field);
            field_condition
                .checks
                .iter()
                .all(|check| Self::check_holds(check, value))
        })
    }

    fn check_holds(check: &Check, value: Option<&Value>) -> bool {
        match check {
            Check::GreaterThan(threshold) => {
                Self::as_number(value).is_some_and(|n| n > *threshold)
            }
            Check::LessThan(threshold) => Self::as_number(value).is_some_and(|n| n < *threshold),
            Check::AtLeast(threshold) => Self::as_number(value).is_some_and(|n| n >= *threshold),
            Check::AtMost(threshold) => Self::as_number(value).is_some_and(|n| n <= *threshold),
            Check::Equals(threshold) => {
                value.is_some_and(|v| value_as_text(v).eq_ignore_ascii_case(threshold))
            }
            Check::NotEquals(threshold) => {
                !value.is_some_and(|v| value_as_text(v).eq_ignore_ascii_case(threshold))
            }
            Check::OneOf(threshold) => {
                let (Some(value), Some(items)) = (value, threshold.as_array()) else {
                    return false;
                };
                // Plain membership: raw value equality, case-sensitive.
                // Numbers additionally compare numerically so 42 is a
                // member of [42.0].
                items.iter().any(|item| {
                    item == value
                        || matches!(
                            (item.as_f64(), value.as_f64()),
                            (Some(a), Some(b)) if a == b
                        )
                })
            }
        }
    }

    /// Numeric coercion mirrors the threshold side: numbers directly,
    /// numeric strings by parsing.
    fn as_number(value: Option<&Value>) -> Option<f64> {
        value.and_then(threshold_as_number)
    }
}
