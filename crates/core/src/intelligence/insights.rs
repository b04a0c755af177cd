//! Per-property assessment report assembled from the other analyses.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::appeal_risk::{predict_appeal_risk, AppealRisk, AssessmentHistory};
use super::comparables::{find_comparable_properties, ComparableOptions, ComparableProperty};
use super::outliers::{detect_outliers, OutlierOptions, PropertyOutlier, UNKNOWN_GROUP};
use super::stats::mean;
use super::trends::{analyze_market_trends, MarketTrend, TrendOptions};
use crate::types::PropertyRecord;

// ---------------------------------------------------------------------------
// Valuation weights and assumptions
// ---------------------------------------------------------------------------

pub const SALES_COMPARISON_WEIGHT: f64 = 0.7;
pub const COST_APPROACH_WEIGHT: f64 = 0.2;
pub const INCOME_APPROACH_WEIGHT: f64 = 0.1;

/// Share of value attributed to land in the cost approach.
const LAND_VALUE_SHARE: f64 = 0.25;
const ANNUAL_DEPRECIATION: f64 = 0.01;
const MIN_DEPRECIATION_FACTOR: f64 = 0.5;

/// Monthly gross rent as a fraction of value.
const MONTHLY_RENT_RATIO: f64 = 0.007;
/// Net operating income as a fraction of gross rent.
const NOI_RATIO: f64 = 0.6;
const CAP_RATE: f64 = 0.06;

/// Half-width of the reported value range, as a fraction of the estimate.
const VALUE_RANGE_SPREAD: f64 = 0.1;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationApproaches {
    pub sales_comparison: f64,
    pub cost_approach: f64,
    pub income_approach: f64,
    pub weighted_value: f64,
    pub value_range: ValueRange,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentQuality {
    pub uniformity: f64,
    pub fairness: f64,
    pub accuracy: f64,
    pub overall: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyAssessmentInsights {
    pub property: PropertyRecord,
    pub comparables: Vec<ComparableProperty>,
    pub outlier: Option<PropertyOutlier>,
    pub appeal_risk: Option<AppealRisk>,
    pub market_trends: Vec<MarketTrend>,
    /// `None` when the subject has no price.
    pub valuation: Option<ValuationApproaches>,
    pub assessment_quality: Option<AssessmentQuality>,
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

fn cost_approach(price: f64, year_built: Option<i32>, reference_year: i32) -> f64 {
    let age = year_built.map_or(0, |y| (reference_year - y).max(0)) as f64;
    let depreciation = (1.0 - age * ANNUAL_DEPRECIATION).max(MIN_DEPRECIATION_FACTOR);
    price * LAND_VALUE_SHARE + price * (1.0 - LAND_VALUE_SHARE) * depreciation
}

fn income_approach(price: f64) -> f64 {
    let annual_noi = price * MONTHLY_RENT_RATIO * 12.0 * NOI_RATIO;
    annual_noi / CAP_RATE
}

fn valuation(
    subject: &PropertyRecord,
    comparables: &[ComparableProperty],
    reference_year: i32,
) -> Option<ValuationApproaches> {
    let price = subject.positive_price()?;

    let adjusted: Vec<f64> = comparables.iter().map(|c| c.adjusted_value).collect();
    let sales_comparison = mean(&adjusted).unwrap_or(price);
    let cost_approach = cost_approach(price, subject.year_built, reference_year);
    let income_approach = income_approach(price);

    let weighted_value = sales_comparison * SALES_COMPARISON_WEIGHT
        + cost_approach * COST_APPROACH_WEIGHT
        + income_approach * INCOME_APPROACH_WEIGHT;

    Some(ValuationApproaches {
        sales_comparison,
        cost_approach,
        income_approach,
        weighted_value,
        value_range: ValueRange {
            low: weighted_value * (1.0 - VALUE_RANGE_SPREAD),
            high: weighted_value * (1.0 + VALUE_RANGE_SPREAD),
        },
    })
}

fn quality(
    price: f64,
    weighted_value: f64,
    outlier: Option<&PropertyOutlier>,
    appeal_risk: Option<&AppealRisk>,
) -> AssessmentQuality {
    let uniformity = 100.0 - outlier.map_or(0.0, |o| o.score as f64);
    let fairness = 100.0 - appeal_risk.map_or(0.0, |r| r.risk_score as f64);
    let accuracy = if weighted_value > 0.0 {
        100.0 - (price - weighted_value).abs() / weighted_value * 100.0
    } else {
        0.0
    };

    AssessmentQuality {
        uniformity,
        fairness,
        accuracy,
        overall: (uniformity + fairness + accuracy) / 3.0,
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Assemble comparables, outlier status, appeal risk, local trends and a
/// weighted three-approach value estimate for `subject`. Appeal risk uses
/// `history` when supplied, like [`predict_appeal_risk`].
pub fn property_assessment_insights(
    subject: &PropertyRecord,
    all_records: &[PropertyRecord],
    history: Option<&AssessmentHistory>,
    reference_date: NaiveDate,
) -> PropertyAssessmentInsights {
    let comparables = find_comparable_properties(
        subject,
        all_records,
        &ComparableOptions::default(),
        reference_date,
    );

    let mut peer_group = vec![subject.clone()];
    peer_group.extend(comparables.iter().map(|c| c.property.clone()));
    let outlier = detect_outliers(&peer_group, &OutlierOptions::default())
        .into_iter()
        .find(|o| o.property == *subject);

    let appeal_risk = predict_appeal_risk(std::slice::from_ref(subject), history)
        .into_iter()
        .next();

    let area = subject.neighborhood.as_deref().unwrap_or(UNKNOWN_GROUP);
    let market_trends: Vec<MarketTrend> =
        analyze_market_trends(all_records, &TrendOptions::default())
            .into_iter()
            .filter(|t| t.area_id == area)
            .collect();

    let valuation = valuation(subject, &comparables, reference_date.year());
    let assessment_quality = match (&valuation, subject.positive_price()) {
        (Some(v), Some(price)) => Some(quality(
            price,
            v.weighted_value,
            outlier.as_ref(),
            appeal_risk.as_ref(),
        )),
        _ => None,
    };

    PropertyAssessmentInsights {
        property: subject.clone(),
        comparables,
        outlier,
        appeal_risk,
        market_trends,
        valuation,
        assessment_quality,
    }
}
