//! Field rule and result types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A primitive constraint on one form field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub field: &'static str,
    pub kind: RuleKind,
    pub message: &'static str,
}

impl FieldRule {
    pub const fn new(field: &'static str, kind: RuleKind, message: &'static str) -> Self {
        Self {
            field,
            kind,
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    /// Present, non-null and not an empty string.
    Required,
    /// String of at least this many characters (trimmed).
    MinLength(usize),
    /// `YYYY-MM-DD` calendar date.
    Date,
    /// Integer not below the bound.
    IntegerAtLeast(i64),
    /// Number not below the bound.
    NumberAtLeast(f64),
    /// Boolean `true`.
    Accepted,
}

/// Outcome of validating one step: pass/fail plus messages per field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepValidation {
    pub valid: bool,
    pub errors: BTreeMap<String, Vec<String>>,
}

impl StepValidation {
    pub fn passed() -> Self {
        Self {
            valid: true,
            errors: BTreeMap::new(),
        }
    }

    /// Record a violation; the result becomes invalid.
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let message = message.into();
        let messages = self.errors.entry(field.into()).or_default();
        if !messages.contains(&message) {
            messages.push(message);
        }
        self.valid = false;
    }

    /// Fold another result into this one.
    pub fn merge(&mut self, other: StepValidation) {
        for (field, messages) in other.errors {
            for message in messages {
                self.add_error(field.clone(), message);
            }
        }
        self.valid = self.valid && other.valid;
    }

    pub fn messages_for(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_error_deduplicates_messages() {
        let mut result = StepValidation::passed();
        result.add_error("travelers", "Required");
        result.add_error("travelers", "Required");
        assert!(!result.valid);
        assert_eq!(result.messages_for("travelers").len(), 1);
    }

    #[test]
    fn merge_keeps_invalid_state() {
        let mut result = StepValidation::passed();
        let mut other = StepValidation::passed();
        other.valid = false;
        result.merge(other);
        assert!(!result.valid);
        assert!(result.messages_for("missing").is_empty());
    }
}
