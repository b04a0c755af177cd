//! Rule engine: an ordered rule registry plus evaluation and auto-fix.

use super::defaults::{default_rules, default_rules_for_year};
use super::rules::{AutoFixOutcome, ValidationResult, ValidationRule};
use crate::types::PropertyRecord;

/// Applies an ordered list of [`ValidationRule`]s to property records.
///
/// Rules are kept in registration order and every rule runs for every
/// record. Rule ids are not unique: registering the same id twice keeps
/// both rules, and both report an issue.
#[derive(Debug, Clone, Default)]
pub struct ValidationRuleEngine {
    rules: Vec<ValidationRule>,
}

impl ValidationRuleEngine {
    pub fn new(rules: Vec<ValidationRule>) -> Self {
        Self { rules }
    }

    /// Engine loaded with the built-in property rules.
    pub fn with_default_rules() -> Self {
        Self::new(default_rules())
    }

    /// Built-in rules, with the year-built upper bound pinned to `current_year`.
    pub fn with_default_rules_for_year(current_year: i32) -> Self {
        Self::new(default_rules_for_year(current_year))
    }

    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }

    pub fn add_rule(&mut self, rule: ValidationRule) {
        self.rules.push(rule);
    }

    /// Remove every rule with the given id. Returns the number removed.
    pub fn remove_rule(&mut self, id: &str) -> usize {
        let before = self.rules.len();
        self.rules.retain(|r| r.id != id);
        before - self.rules.len()
    }

    /// Evaluate every rule against `record`.
    pub fn validate(&self, record: &PropertyRecord) -> ValidationResult {
        let issues = self
            .rules
            .iter()
            .filter(|rule| !rule.passes(record))
            .map(|rule| rule.issue_for(record))
            .collect();

        ValidationResult::from_issues(record.clone(), issues)
    }

    /// Validate each record, preserving input order.
    pub fn validate_batch(&self, records: &[PropertyRecord]) -> Vec<ValidationResult> {
        records.iter().map(|r| self.validate(r)).collect()
    }

    /// Apply every applicable fix in rule order to a working copy.
    ///
    /// Each fix is kept even when it does not satisfy its own rule; only
    /// fixes that make their rule pass are reported in `fixed_issues`.
    pub fn auto_fix(&self, record: &PropertyRecord) -> AutoFixOutcome {
        let mut working = record.clone();
        let mut fixed_issues = Vec::new();

        for rule in &self.rules {
            if rule.passes(&working) {
                continue;
            }
            let issue = rule.issue_for(&working);
            let Some(candidate) = rule.apply_fix(&working) else {
                continue;
            };
            working = candidate;
            if rule.passes(&working) {
                fixed_issues.push(issue);
            }
        }

        AutoFixOutcome {
            record: working,
            fixed_issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::defaults::{
        RULE_REQUIRED_FIELDS, RULE_YEAR_BUILT_RANGE, RULE_ZIPCODE_FORMAT,
    };
    use crate::validation::rules::ValidationSeverity;

    const YEAR: i32 = 2024;

    fn engine() -> ValidationRuleEngine {
        ValidationRuleEngine::with_default_rules_for_year(YEAR)
    }

    fn complete_record() -> PropertyRecord {
        PropertyRecord {
            id: Some("p-1".into()),
            address: Some("123 Main St".into()),
            city: Some("Springfield".into()),
            state: Some("IL".into()),
            zip_code: Some("62701".into()),
            property_type: Some("residential".into()),
            price: Some(300_000.0),
            square_feet: Some(1_500.0),
            year_built: Some(1990),
            ..Default::default()
        }
    }

    fn always_fails(id: &str, severity: ValidationSeverity) -> ValidationRule {
        ValidationRule::new(id, id, severity, |_| false, |_| "always fails".into())
    }

    // -- validate ------------------------------------------------------------

    #[test]
    fn valid_record_has_full_score() {
        let result = engine().validate(&complete_record());
        assert!(result.is_valid);
        assert!(result.issues.is_empty());
        assert_eq!(result.score, 100);
    }

    #[test]
    fn empty_record_reports_required_fields_only_once() {
        let result = engine().validate(&PropertyRecord::default());
        assert!(!result.is_valid);
        assert!(result.has_critical_issues);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].rule_id, RULE_REQUIRED_FIELDS);
        assert_eq!(result.score, 80);
    }

    #[test]
    fn issues_carry_auto_fix_flag() {
        let record = PropertyRecord {
            zip_code: Some("1234".into()),
            ..complete_record()
        };
        let result = engine().validate(&record);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].rule_id, RULE_ZIPCODE_FORMAT);
        assert!(result.issues[0].can_auto_fix);
        assert_eq!(result.score, 95);
        assert!(!result.has_critical_issues);
    }

    #[test]
    fn score_stays_in_range_and_validity_tracks_issues() {
        let mut engine = engine();
        for i in 0..5 {
            engine.add_rule(always_fails(&format!("crit-{i}"), ValidationSeverity::Critical));
        }
        let records = vec![PropertyRecord::default(), complete_record()];
        for result in engine.validate_batch(&records) {
            assert!(result.score <= 100);
            assert_eq!(result.is_valid, result.issues.is_empty());
            if result.has_critical_issues {
                assert!(!result.is_valid);
            }
        }
    }

    #[test]
    fn validate_batch_preserves_order() {
        let records: Vec<PropertyRecord> = (0..4)
            .map(|i| PropertyRecord {
                id: Some(format!("p-{i}")),
                ..complete_record()
            })
            .collect();
        let results = engine().validate_batch(&records);
        let ids: Vec<_> = results.iter().map(|r| r.record.id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["p-0", "p-1", "p-2", "p-3"]);
    }

    // -- registry ------------------------------------------------------------

    #[test]
    fn duplicate_rule_ids_are_both_evaluated() {
        let mut engine = ValidationRuleEngine::default();
        engine.add_rule(always_fails("dup", ValidationSeverity::Info));
        engine.add_rule(always_fails("dup", ValidationSeverity::Info));

        let result = engine.validate(&PropertyRecord::default());
        assert_eq!(result.issues.len(), 2);
        assert_eq!(result.score, 98);
    }

    #[test]
    fn remove_rule_drops_every_match() {
        let mut engine = ValidationRuleEngine::default();
        engine.add_rule(always_fails("dup", ValidationSeverity::Info));
        engine.add_rule(always_fails("keep", ValidationSeverity::Info));
        engine.add_rule(always_fails("dup", ValidationSeverity::Info));

        assert_eq!(engine.remove_rule("dup"), 2);
        assert_eq!(engine.rules().len(), 1);
        assert_eq!(engine.rules()[0].id, "keep");
        assert_eq!(engine.remove_rule("missing"), 0);
    }

    // -- auto_fix ------------------------------------------------------------

    #[test]
    fn auto_fix_repairs_zip_and_future_year() {
        let record = PropertyRecord {
            zip_code: Some("123456789".into()),
            year_built: Some(3000),
            ..complete_record()
        };
        let outcome = engine().auto_fix(&record);

        assert_eq!(outcome.record.zip_code.as_deref(), Some("12345-6789"));
        assert_eq!(outcome.record.year_built, Some(YEAR));
        let fixed: Vec<_> = outcome.fixed_issues.iter().map(|i| i.rule_id.as_str()).collect();
        assert_eq!(fixed, vec![RULE_YEAR_BUILT_RANGE, RULE_ZIPCODE_FORMAT]);
        assert!(engine().validate(&outcome.record).is_valid);
    }

    #[test]
    fn auto_fix_keeps_fix_that_does_not_satisfy_rule() {
        let record = PropertyRecord {
            year_built: Some(1500),
            ..complete_record()
        };
        let outcome = engine().auto_fix(&record);

        assert_eq!(outcome.record.year_built, Some(1700));
        assert!(outcome.fixed_issues.is_empty());
    }

    #[test]
    fn auto_fix_converges_on_second_run() {
        let engine = engine();
        let record = PropertyRecord {
            address: Some("  77   sunset   blvd ".into()),
            zip_code: Some("12345".into()),
            year_built: Some(1500),
            ..complete_record()
        };
        let once = engine.auto_fix(&record).record;
        let twice = engine.auto_fix(&once).record;
        assert_eq!(once, twice);
        assert_eq!(twice.zip_code.as_deref(), Some("12345"));
    }

    #[test]
    fn later_rules_see_earlier_fixes() {
        let mut engine = ValidationRuleEngine::default();
        engine.add_rule(
            ValidationRule::new(
                "set-city",
                "Set City",
                ValidationSeverity::Warning,
                |r| r.city.is_some(),
                |_| "city missing".into(),
            )
            .with_fix(|r| PropertyRecord {
                city: Some("Springfield".into()),
                ..r.clone()
            }),
        );
        engine.add_rule(
            ValidationRule::new(
                "city-upper",
                "City Upper",
                ValidationSeverity::Warning,
                |r| r.city.as_deref().map_or(true, |c| c == c.to_uppercase()),
                |_| "city not uppercase".into(),
            )
            .with_fix(|r| PropertyRecord {
                city: r.city.as_ref().map(|c| c.to_uppercase()),
                ..r.clone()
            }),
        );

        let outcome = engine.auto_fix(&PropertyRecord::default());
        assert_eq!(outcome.record.city.as_deref(), Some("SPRINGFIELD"));
        assert_eq!(outcome.fixed_issues.len(), 2);
    }

    #[test]
    fn auto_fix_leaves_valid_record_untouched() {
        let record = complete_record();
        let outcome = engine().auto_fix(&record);
        assert_eq!(outcome.record, record);
        assert!(outcome.fixed_issues.is_empty());
    }
}
