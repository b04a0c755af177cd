//! Assessment intelligence: statistical scoring over property collections.
//!
//! All analyses are pure functions of their inputs. [`AssessmentIntelligenceEngine`]
//! bundles them behind one handle and pins the reference date used for
//! time-of-sale adjustments and building age.

pub mod appeal_risk;
pub mod comparables;
pub mod geo;
pub mod insights;
pub mod outliers;
pub mod stats;
pub mod trends;

use chrono::NaiveDate;

pub use appeal_risk::{AppealRisk, AssessmentHistory, HistoricalAssessment, RecommendedAction};
pub use comparables::{ComparableOptions, ComparableProperty, ValueAdjustment};
pub use insights::PropertyAssessmentInsights;
pub use outliers::{OutlierGroupBy, OutlierMethod, OutlierOptions, OutlierType, PropertyOutlier};
pub use trends::{AreaType, MarketTrend, TrendOptions, TrendPeriod};

use crate::types::PropertyRecord;

#[derive(Debug, Clone, Copy)]
pub struct AssessmentIntelligenceEngine {
    reference_date: NaiveDate,
}

impl Default for AssessmentIntelligenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AssessmentIntelligenceEngine {
    /// Engine using today's date (UTC) as the reference date.
    pub fn new() -> Self {
        Self::with_reference_date(chrono::Utc::now().date_naive())
    }

    pub fn with_reference_date(reference_date: NaiveDate) -> Self {
        Self { reference_date }
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    pub fn detect_outliers(
        &self,
        records: &[PropertyRecord],
        options: &OutlierOptions,
    ) -> Vec<PropertyOutlier> {
        outliers::detect_outliers(records, options)
    }

    pub fn analyze_market_trends(
        &self,
        records: &[PropertyRecord],
        options: &TrendOptions,
    ) -> Vec<MarketTrend> {
        trends::analyze_market_trends(records, options)
    }

    pub fn predict_appeal_risk(
        &self,
        records: &[PropertyRecord],
        history: Option<&AssessmentHistory>,
    ) -> Vec<AppealRisk> {
        appeal_risk::predict_appeal_risk(records, history)
    }

    pub fn find_comparable_properties(
        &self,
        subject: &PropertyRecord,
        candidates: &[PropertyRecord],
        options: &ComparableOptions,
    ) -> Vec<ComparableProperty> {
        comparables::find_comparable_properties(subject, candidates, options, self.reference_date)
    }

    pub fn get_property_assessment_insights(
        &self,
        subject: &PropertyRecord,
        all_records: &[PropertyRecord],
        history: Option<&AssessmentHistory>,
    ) -> PropertyAssessmentInsights {
        insights::property_assessment_insights(subject, all_records, history, self.reference_date)
    }
}
