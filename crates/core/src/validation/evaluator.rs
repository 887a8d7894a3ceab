//! Rule evaluator. Pure logic, no I/O.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::rules::{FieldRule, RuleKind, StepValidation};

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

/// Evaluate every rule against the form fields, collecting all violations.
pub fn evaluate_rules(rules: &[FieldRule], fields: &Map<String, Value>) -> StepValidation {
    let mut result = StepValidation::passed();
    for rule in rules {
        if !rule_holds(rule, fields.get(rule.field)) {
            result.add_error(rule.field, rule.message);
        }
    }
    result
}

fn rule_holds(rule: &FieldRule, value: Option<&Value>) -> bool {
    match &rule.kind {
        RuleKind::Required => match value {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        },
        RuleKind::MinLength(min) => match value {
            Some(Value::String(s)) => s.trim().chars().count() >= *min,
            None | Some(Value::Null) => true, // presence is Required's job
            Some(_) => false,
        },
        RuleKind::Date => match value {
            Some(Value::String(s)) if s.is_empty() => true,
            Some(Value::String(s)) => is_calendar_date(s),
            None | Some(Value::Null) => true,
            Some(_) => false,
        },
        RuleKind::IntegerAtLeast(min) => match value.and_then(as_integer) {
            Some(n) => n >= *min,
            None => value.map_or(true, |v| v.is_null()),
        },
        RuleKind::NumberAtLeast(min) => match value.and_then(as_number) {
            Some(n) => n >= *min,
            None => value.map_or(true, |v| v.is_null()),
        },
        RuleKind::Accepted => matches!(value, Some(Value::Bool(true))),
    }
}

fn is_calendar_date(s: &str) -> bool {
    DATE_RE.is_match(s) && chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// Form inputs arrive as numbers or numeric strings.
pub(crate) fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
