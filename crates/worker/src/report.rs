//! JSON report emitted at the end of a worker run.

use assessor_core::batch::ValidationPartition;
use assessor_core::intelligence::{
    AppealRisk, MarketTrend, PropertyAssessmentInsights, PropertyOutlier,
};
use assessor_core::types::PropertyRecord;
use assessor_core::validation::{AutoFixOutcome, ValidationResult};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentReport {
    pub run_id: Uuid,
    pub record_count: usize,
    pub validation: ValidationSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_fix: Option<AutoFixSummary>,
    pub outliers: Vec<PropertyOutlier>,
    pub market_trends: Vec<MarketTrend>,
    pub appeal_risks: Vec<AppealRisk>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub insights: Vec<PropertyAssessmentInsights>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub valid_count: usize,
    pub invalid_count: usize,
    /// Mean quality score, 0 for an empty input.
    pub average_score: f64,
    pub results: Vec<ValidationResult>,
}

impl From<ValidationPartition> for ValidationSummary {
    fn from(partition: ValidationPartition) -> Self {
        let average_score = if partition.results.is_empty() {
            0.0
        } else {
            let total: u64 = partition.results.iter().map(|r| u64::from(r.score)).sum();
            total as f64 / partition.results.len() as f64
        };

        Self {
            valid_count: partition.valid.len(),
            invalid_count: partition.invalid.len(),
            average_score,
            results: partition.results,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoFixSummary {
    pub fixed_count: usize,
    pub unchanged_count: usize,
    pub fixed_issue_count: usize,
}

impl AutoFixSummary {
    /// Tally outcomes against the records they were produced from.
    pub fn tally(inputs: &[PropertyRecord], outcomes: &[AutoFixOutcome]) -> Self {
        let fixed_count = inputs
            .iter()
            .zip(outcomes)
            .filter(|(input, outcome)| outcome.record != **input)
            .count();

        Self {
            fixed_count,
            unchanged_count: outcomes.len() - fixed_count,
            fixed_issue_count: outcomes.iter().map(|o| o.fixed_issues.len()).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use assessor_core::batch::partition_results;
    use assessor_core::validation::ValidationRuleEngine;

    use super::*;

    #[test]
    fn empty_partition_averages_to_zero() {
        let summary = ValidationSummary::from(partition_results(Vec::new()));
        assert_eq!(summary.valid_count, 0);
        assert_eq!(summary.invalid_count, 0);
        assert_eq!(summary.average_score, 0.0);
    }

    #[test]
    fn summary_counts_and_averages_scores() {
        let engine = ValidationRuleEngine::with_default_rules_for_year(2024);
        let complete = PropertyRecord {
            address: Some("12 Oak Street".into()),
            city: Some("Springfield".into()),
            state: Some("IL".into()),
            zip_code: Some("62704".into()),
            property_type: Some("residential".into()),
            ..Default::default()
        };
        // Missing required fields: one error issue.
        let bare = PropertyRecord::default();

        let summary =
            ValidationSummary::from(partition_results(engine.validate_batch(&[complete, bare])));
        assert_eq!(summary.valid_count, 1);
        assert_eq!(summary.invalid_count, 1);
        assert_eq!(summary.average_score, 90.0);
    }

    #[test]
    fn tally_counts_changed_records_only() {
        let engine = ValidationRuleEngine::with_default_rules_for_year(2024);
        let inputs = vec![
            PropertyRecord {
                zip_code: Some("123456789".into()),
                ..Default::default()
            },
            PropertyRecord::default(),
        ];
        let outcomes: Vec<_> = inputs.iter().map(|r| engine.auto_fix(r)).collect();

        let summary = AutoFixSummary::tally(&inputs, &outcomes);
        assert_eq!(
            summary,
            AutoFixSummary {
                fixed_count: 1,
                unchanged_count: 1,
                fixed_issue_count: 1,
            }
        );
    }
}
