//! Step validation engine.
//!
//! Provides field rule types, a pure-logic evaluator, and the per-step
//! rule tables and semantic checks. Remote validation is layered on top by
//! the session crate.

pub mod evaluator;
pub mod rules;
pub mod steps;

pub use evaluator::evaluate_rules;
pub use rules::{FieldRule, RuleKind, StepValidation};
pub use steps::{field_rules, semantic_rules, ProviderCheck, StepContext};
