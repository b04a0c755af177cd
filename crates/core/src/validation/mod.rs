//! Property data validation.
//!
//! Provides rule types, the built-in rule set, and a pure-logic rule engine
//! with best-effort auto-fix.

pub mod defaults;
pub mod engine;
pub mod rules;

pub use engine::ValidationRuleEngine;
pub use rules::{
    AutoFixOutcome, ValidationIssue, ValidationResult, ValidationRule, ValidationSeverity,
};
