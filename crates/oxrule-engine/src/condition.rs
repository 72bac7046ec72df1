use crate::field::{self, FieldValue};
use crate::RepeatCounter;
use oxrule_common::types::{Condition, Event, Operator, Rule};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;

/// Operand of a `repeat_over` condition, e.g.
/// `{"threshold": 3, "minutes": 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatWindow {
    pub threshold: i64,
    pub window_minutes: u32,
}

impl RepeatWindow {
    /// Parses the operand object. `None` when a sub-field is missing,
    /// non-integral, a negative threshold or a zero-length window.
    pub fn from_operand(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let threshold = integer_param(obj, &["threshold"])?;
        let minutes = integer_param(obj, &["minutes", "window_minutes", "window-minutes"])?;
        if threshold < 0 || minutes <= 0 {
            return None;
        }
        Some(Self {
            threshold,
            window_minutes: u32::try_from(minutes).ok()?,
        })
    }
}

fn integer_param(obj: &Map<String, Value>, names: &[&str]) -> Option<i64> {
    let value = names.iter().find_map(|name| obj.get(*name))?;
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    let f = value.as_f64()?;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

/// Applies a non-stateful operator to a resolved field and an operand.
///
/// `repeat_over` and unknown operators are not handled here and evaluate
/// false.
pub fn match_operator(operator: &Operator, field: FieldValue<'_>, operand: &Value) -> bool {
    let operand_value = FieldValue::from_json(operand);
    match operator {
        Operator::Eq => field.equals(&operand_value),
        Operator::Neq => !field.equals(&operand_value),
        Operator::Gt => field.compare(&operand_value) == Some(Ordering::Greater),
        Operator::Gte => matches!(
            field.compare(&operand_value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Operator::Lt => field.compare(&operand_value) == Some(Ordering::Less),
        Operator::Lte => matches!(
            field.compare(&operand_value),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Operator::In => in_set(field, operand_value),
        Operator::NotIn => !in_set(field, operand_value),
        Operator::Contains => contains(field, operand_value),
        Operator::RepeatOver | Operator::Unknown(_) => false,
    }
}

fn in_set(field: FieldValue<'_>, set: FieldValue<'_>) -> bool {
    match set.elements() {
        Some(members) => members.iter().any(|m| field.equals(m)),
        None => false,
    }
}

fn contains(field: FieldValue<'_>, needle: FieldValue<'_>) -> bool {
    match (field, needle) {
        (FieldValue::Str(haystack), FieldValue::Str(needle)) => haystack.contains(needle),
        (FieldValue::Tags(_) | FieldValue::List(_), needle) if needle.is_scalar() => field
            .elements()
            .is_some_and(|items| items.iter().any(|item| item.equals(&needle))),
        _ => false,
    }
}

/// Evaluates single conditions against an event.
///
/// Holds the repeat counter used by `repeat_over`; every other operator is
/// pure.
#[derive(Clone)]
pub struct ConditionEvaluator {
    counter: Arc<dyn RepeatCounter>,
}

impl ConditionEvaluator {
    pub fn new(counter: Arc<dyn RepeatCounter>) -> Self {
        Self { counter }
    }

    /// Returns whether `condition` holds for `event`. `rule` scopes the
    /// repeat counter.
    ///
    /// Never fails: malformed operands, unknown operators and counter
    /// errors all evaluate false.
    pub async fn evaluate(&self, event: &mut Event, condition: &Condition, rule: &Rule) -> bool {
        tracing::debug!(
            field = %condition.field,
            operator = %condition.operator,
            value = %condition.value,
            "Checking condition"
        );

        match &condition.operator {
            Operator::RepeatOver => self.repeat_over(event, condition, rule).await,
            Operator::Unknown(name) => {
                tracing::debug!(operator = %name, rule_id = %rule.id, "Unsupported operator");
                false
            }
            operator => {
                let value = field::resolve(event, &condition.field);
                match_operator(operator, value, &condition.value)
            }
        }
    }

    async fn repeat_over(&self, event: &mut Event, condition: &Condition, rule: &Rule) -> bool {
        let Some(window) = RepeatWindow::from_operand(&condition.value) else {
            tracing::warn!(
                rule_id = %rule.id,
                value = %condition.value,
                "repeat_over condition has an invalid value, expected {{threshold, minutes}}"
            );
            return false;
        };

        let count = match self
            .counter
            .count_in_window(event, rule, window.window_minutes)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(rule_id = %rule.id, error = %e, "Repeat count unavailable");
                return false;
            }
        };
        event.repeat_count = count;

        tracing::debug!(
            rule_id = %rule.id,
            count,
            threshold = window.threshold,
            "repeat_over check"
        );
        count >= window.threshold
    }
}
