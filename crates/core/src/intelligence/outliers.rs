//! Assessment outlier detection.
//!
//! Records are grouped by neighborhood and/or property type, and each
//! member's value per square foot is compared against the group median
//! using the mean absolute deviation as the spread measure.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::stats::{mean_absolute_deviation, upper_median};
use crate::batch::group_by_key;
use crate::error::CoreError;
use crate::types::PropertyRecord;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default percentage deviation from the group median that counts as an outlier.
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 15.0;
/// Groups (and their priced subsets) smaller than this are skipped.
pub const MIN_GROUP_SIZE: usize = 3;
/// Deviation score above which the statistical method flags a record.
pub const STATISTICAL_Z_THRESHOLD: f64 = 2.5;
/// Deviation score above which the hybrid method considers a record.
pub const HYBRID_Z_THRESHOLD: f64 = 1.5;
/// Points of outlier score per unit of deviation score.
pub const SCORE_PER_DEVIATION: f64 = 25.0;
pub const MAX_SIMILAR_PROPERTIES: usize = 5;
/// Similar properties must be within this fraction of the outlier's size.
pub const SIMILAR_SQFT_TOLERANCE: f64 = 0.25;
/// Group key used when the grouping field is missing.
pub const UNKNOWN_GROUP: &str = "unknown";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutlierMethod {
    /// Deviation score only.
    Statistical,
    /// Percentage difference only.
    Comparative,
    /// Both a moderate deviation score and a large percentage difference.
    Hybrid,
}

impl FromStr for OutlierMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "statistical" => Ok(Self::Statistical),
            "comparative" => Ok(Self::Comparative),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(CoreError::Validation(format!(
                "Unknown outlier method '{other}'. Must be one of: statistical, comparative, hybrid"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutlierGroupBy {
    Neighborhood,
    PropertyType,
    Both,
}

impl FromStr for OutlierGroupBy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "neighborhood" => Ok(Self::Neighborhood),
            "propertyType" | "property_type" => Ok(Self::PropertyType),
            "both" => Ok(Self::Both),
            other => Err(CoreError::Validation(format!(
                "Unknown outlier grouping '{other}'. Must be one of: neighborhood, propertyType, both"
            ))),
        }
    }
}

impl OutlierGroupBy {
    pub fn key_for(self, record: &PropertyRecord) -> String {
        let neighborhood = record.neighborhood.as_deref().unwrap_or(UNKNOWN_GROUP);
        let property_type = record.property_type.as_deref().unwrap_or(UNKNOWN_GROUP);
        match self {
            Self::Neighborhood => neighborhood.to_string(),
            Self::PropertyType => property_type.to_string(),
            Self::Both => format!("{neighborhood}|{property_type}"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OutlierOptions {
    /// Percentage difference threshold used by comparative and hybrid.
    pub threshold: f64,
    pub method: OutlierMethod,
    pub group_by: OutlierGroupBy,
}

impl Default for OutlierOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_OUTLIER_THRESHOLD,
            method: OutlierMethod::Hybrid,
            group_by: OutlierGroupBy::Both,
        }
    }
}

impl OutlierOptions {
    fn is_outlier(&self, deviation_score: f64, percent_diff: f64) -> bool {
        match self.method {
            OutlierMethod::Statistical => deviation_score > STATISTICAL_Z_THRESHOLD,
            OutlierMethod::Comparative => percent_diff.abs() > self.threshold,
            OutlierMethod::Hybrid => {
                deviation_score > HYBRID_Z_THRESHOLD && percent_diff.abs() > self.threshold
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierType {
    Overassessed,
    Underassessed,
    /// Reserved for outliers not explained by value per square foot.
    Other,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyOutlier {
    pub property: PropertyRecord,
    /// Outlier strength in `[0, 100]`.
    pub score: u32,
    #[serde(rename = "type")]
    pub outlier_type: OutlierType,
    pub reason: String,
    pub similar_properties: Vec<PropertyRecord>,
    pub percentage_difference: f64,
    pub value_per_sq_ft: f64,
    pub group_median: f64,
    pub group_key: String,
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Flag records whose value per square foot deviates from their group.
///
/// Returns outliers across all groups, strongest first. Groups with fewer
/// than [`MIN_GROUP_SIZE`] members, or fewer priced members, are skipped.
pub fn detect_outliers(
    records: &[PropertyRecord],
    options: &OutlierOptions,
) -> Vec<PropertyOutlier> {
    let mut outliers = Vec::new();

    for (group_key, members) in group_by_key(records, |r| options.group_by.key_for(r)) {
        if members.len() < MIN_GROUP_SIZE {
            continue;
        }

        let priced: Vec<(PropertyRecord, f64)> = members
            .into_iter()
            .filter_map(|r| r.value_per_sq_ft().map(|v| (r, v)))
            .collect();
        if priced.len() < MIN_GROUP_SIZE {
            continue;
        }

        let values: Vec<f64> = priced.iter().map(|(_, v)| *v).collect();
        let Some(median) = upper_median(&values) else {
            continue;
        };
        let mad = mean_absolute_deviation(&values, median);

        for (index, (record, value)) in priced.iter().enumerate() {
            let percent_diff = (value - median) / median * 100.0;
            let deviation_score = if mad > 0.0 {
                (value - median).abs() / mad
            } else {
                0.0
            };

            if !options.is_outlier(deviation_score, percent_diff) {
                continue;
            }

            let outlier_type = if percent_diff > 0.0 {
                OutlierType::Overassessed
            } else {
                OutlierType::Underassessed
            };
            let direction = if percent_diff > 0.0 { "above" } else { "below" };

            outliers.push(PropertyOutlier {
                property: record.clone(),
                score: (deviation_score * SCORE_PER_DEVIATION).round().min(100.0) as u32,
                outlier_type,
                reason: format!(
                    "Value per sq ft of ${value:.2} is {:.1}% {direction} the {group_key} median of ${median:.2}",
                    percent_diff.abs()
                ),
                similar_properties: similar_properties(&priced, index),
                percentage_difference: percent_diff,
                value_per_sq_ft: *value,
                group_median: median,
                group_key: group_key.clone(),
            });
        }
    }

    outliers.sort_by(|a, b| b.score.cmp(&a.score));
    outliers
}

/// Up to [`MAX_SIMILAR_PROPERTIES`] group members close in size to
/// `priced[target]`, closest first.
fn similar_properties(priced: &[(PropertyRecord, f64)], target: usize) -> Vec<PropertyRecord> {
    let Some(target_sqft) = priced[target].0.positive_square_feet() else {
        return Vec::new();
    };
    let tolerance = target_sqft * SIMILAR_SQFT_TOLERANCE;

    let mut candidates: Vec<(f64, &PropertyRecord)> = priced
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != target)
        .filter_map(|(_, (r, _))| {
            let diff = (r.positive_square_feet()? - target_sqft).abs();
            (diff <= tolerance).then_some((diff, r))
        })
        .collect();

    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
    candidates
        .into_iter()
        .take(MAX_SIMILAR_PROPERTIES)
        .map(|(_, r)| r.clone())
        .collect()
}
