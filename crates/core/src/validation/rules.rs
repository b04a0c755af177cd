//! Validation rule and result types.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::PropertyRecord;

/// Predicate deciding whether a record passes a rule.
pub type RulePredicate = Arc<dyn Fn(&PropertyRecord) -> bool + Send + Sync>;
/// Builds the human-readable message for a failing record.
pub type RuleMessage = Arc<dyn Fn(&PropertyRecord) -> String + Send + Sync>;
/// Produces a normalized copy of a failing record.
pub type RuleFix = Arc<dyn Fn(&PropertyRecord) -> PropertyRecord + Send + Sync>;

/// How serious a rule violation is. Each level costs a fixed number of
/// quality-score points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl ValidationSeverity {
    /// Points deducted from the 100-point quality score per issue.
    pub fn score_penalty(self) -> u32 {
        match self {
            Self::Info => 1,
            Self::Warning => 5,
            Self::Error => 20,
            Self::Critical => 50,
        }
    }

    /// Error and critical issues mark a record as having critical issues.
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Error | Self::Critical)
    }
}

/// A named check applied to every record, with an optional auto-fix.
#[derive(Clone)]
pub struct ValidationRule {
    pub id: String,
    pub name: String,
    pub severity: ValidationSeverity,
    validate: RulePredicate,
    message: RuleMessage,
    fix: Option<RuleFix>,
}

impl ValidationRule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        severity: ValidationSeverity,
        validate: impl Fn(&PropertyRecord) -> bool + Send + Sync + 'static,
        message: impl Fn(&PropertyRecord) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            severity,
            validate: Arc::new(validate),
            message: Arc::new(message),
            fix: None,
        }
    }

    /// Attach an auto-fix to the rule.
    pub fn with_fix(
        mut self,
        fix: impl Fn(&PropertyRecord) -> PropertyRecord + Send + Sync + 'static,
    ) -> Self {
        self.fix = Some(Arc::new(fix));
        self
    }

    pub fn passes(&self, record: &PropertyRecord) -> bool {
        (self.validate)(record)
    }

    pub fn message_for(&self, record: &PropertyRecord) -> String {
        (self.message)(record)
    }

    pub fn can_auto_fix(&self) -> bool {
        self.fix.is_some()
    }

    /// Apply the fix, if any. Returns `None` for rules without a fix.
    pub fn apply_fix(&self, record: &PropertyRecord) -> Option<PropertyRecord> {
        self.fix.as_ref().map(|fix| fix(record))
    }

    /// Build the issue reported when `record` fails this rule.
    pub fn issue_for(&self, record: &PropertyRecord) -> ValidationIssue {
        ValidationIssue {
            rule_id: self.id.clone(),
            rule_name: self.name.clone(),
            severity: self.severity,
            message: self.message_for(record),
            can_auto_fix: self.can_auto_fix(),
        }
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("severity", &self.severity)
            .field("can_auto_fix", &self.can_auto_fix())
            .finish()
    }
}

/// A single failed rule for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub rule_id: String,
    pub rule_name: String,
    pub severity: ValidationSeverity,
    pub message: String,
    pub can_auto_fix: bool,
}

/// Aggregated result of evaluating all rules against one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub record: PropertyRecord,
    pub issues: Vec<ValidationIssue>,
    pub is_valid: bool,
    /// Quality score in `[0, 100]`.
    pub score: u32,
    pub has_critical_issues: bool,
}

impl ValidationResult {
    pub fn from_issues(record: PropertyRecord, issues: Vec<ValidationIssue>) -> Self {
        let penalty: u32 = issues.iter().map(|i| i.severity.score_penalty()).sum();
        let has_critical_issues = issues.iter().any(|i| i.severity.is_blocking());

        Self {
            record,
            is_valid: issues.is_empty(),
            score: 100u32.saturating_sub(penalty),
            has_critical_issues,
            issues,
        }
    }
}

/// Result of a best-effort auto-fix pass over one record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoFixOutcome {
    pub record: PropertyRecord,
    /// Issues whose fix made their own rule pass.
    pub fixed_issues: Vec<ValidationIssue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(severity: ValidationSeverity) -> ValidationIssue {
        ValidationIssue {
            rule_id: "r".into(),
            rule_name: "R".into(),
            severity,
            message: "failed".into(),
            can_auto_fix: false,
        }
    }

    #[test]
    fn score_deducts_by_severity() {
        let result = ValidationResult::from_issues(
            PropertyRecord::default(),
            vec![
                issue(ValidationSeverity::Info),
                issue(ValidationSeverity::Warning),
                issue(ValidationSeverity::Error),
            ],
        );
        assert_eq!(result.score, 100 - 1 - 5 - 20);
        assert!(!result.is_valid);
        assert!(result.has_critical_issues);
    }

    #[test]
    fn score_clamps_at_zero() {
        let result = ValidationResult::from_issues(
            PropertyRecord::default(),
            vec![
                issue(ValidationSeverity::Critical),
                issue(ValidationSeverity::Critical),
                issue(ValidationSeverity::Critical),
            ],
        );
        assert_eq!(result.score, 0);
    }

    #[test]
    fn warnings_only_are_not_critical() {
        let result = ValidationResult::from_issues(
            PropertyRecord::default(),
            vec![issue(ValidationSeverity::Warning)],
        );
        assert!(!result.is_valid);
        assert!(!result.has_critical_issues);
        assert_eq!(result.score, 95);
    }

    #[test]
    fn no_issues_is_valid_with_full_score() {
        let result = ValidationResult::from_issues(PropertyRecord::default(), vec![]);
        assert!(result.is_valid);
        assert_eq!(result.score, 100);
        assert!(!result.has_critical_issues);
    }

    #[test]
    fn severity_serializes_lowercase() {
        let json = serde_json::to_string(&ValidationSeverity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }
}
