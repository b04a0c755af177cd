//! Market trend estimation per area.
//!
//! The trend figure is a deterministic placeholder derived from the area id;
//! it stands in for a time-series feature over sale history and carries no
//! statistical meaning. Group sizes, confidence and ordering are real.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::outliers::UNKNOWN_GROUP;
use super::stats::mean;
use crate::batch::group_by_key;
use crate::error::CoreError;
use crate::types::PropertyRecord;

/// Areas with fewer properties than this are not reported.
pub const MIN_TREND_GROUP_SIZE: usize = 5;
pub const DEFAULT_SIGNIFICANCE_THRESHOLD: f64 = 5.0;
pub const MAX_TREND_CONFIDENCE: f64 = 0.95;
/// Trends with a smaller magnitude are reported as stable.
pub const STABLE_TREND_BAND: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrendPeriod {
    Month,
    Quarter,
    Year,
}

impl TrendPeriod {
    /// Fraction of a year covered by one period.
    fn year_fraction(self) -> f64 {
        match self {
            Self::Month => 1.0 / 12.0,
            Self::Quarter => 0.25,
            Self::Year => 1.0,
        }
    }
}

impl FromStr for TrendPeriod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "month" => Ok(Self::Month),
            "quarter" => Ok(Self::Quarter),
            "year" => Ok(Self::Year),
            other => Err(CoreError::Validation(format!(
                "Unknown trend period '{other}'. Must be one of: month, quarter, year"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AreaType {
    Neighborhood,
    City,
    County,
    ZipCode,
}

impl AreaType {
    pub fn area_id(self, record: &PropertyRecord) -> String {
        let field = match self {
            Self::Neighborhood => &record.neighborhood,
            Self::City => &record.city,
            Self::County => &record.county,
            Self::ZipCode => &record.zip_code,
        };
        field.as_deref().unwrap_or(UNKNOWN_GROUP).to_string()
    }
}

impl FromStr for AreaType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "neighborhood" => Ok(Self::Neighborhood),
            "city" => Ok(Self::City),
            "county" => Ok(Self::County),
            "zipCode" | "zip_code" => Ok(Self::ZipCode),
            other => Err(CoreError::Validation(format!(
                "Unknown area type '{other}'. Must be one of: neighborhood, city, county, zipCode"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TrendOptions {
    pub period: TrendPeriod,
    pub area_type: AreaType,
    /// Minimum absolute trend percentage considered significant.
    pub significance_threshold: f64,
}

impl Default for TrendOptions {
    fn default() -> Self {
        Self {
            period: TrendPeriod::Year,
            area_type: AreaType::Neighborhood,
            significance_threshold: DEFAULT_SIGNIFICANCE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTrend {
    pub area_id: String,
    pub area_type: AreaType,
    pub period: TrendPeriod,
    pub trend_percentage: f64,
    pub direction: TrendDirection,
    pub is_significant: bool,
    pub confidence: f64,
    pub property_count: usize,
    pub average_value: Option<f64>,
}

/// Placeholder annual trend in percent, in `[-8, 12]`.
pub fn placeholder_annual_trend(area_id: &str) -> f64 {
    let char_sum: u32 = area_id.chars().map(|c| c as u32).sum();
    (char_sum % 21) as f64 - 8.0
}

/// Confidence grows with group size, capped at [`MAX_TREND_CONFIDENCE`].
pub fn trend_confidence(property_count: usize) -> f64 {
    (0.5 + property_count as f64 / 20.0).min(MAX_TREND_CONFIDENCE)
}

/// Per-area trends, ordered by `|trend| * confidence` descending.
pub fn analyze_market_trends(
    records: &[PropertyRecord],
    options: &TrendOptions,
) -> Vec<MarketTrend> {
    let mut trends: Vec<MarketTrend> = group_by_key(records, |r| options.area_type.area_id(r))
        .into_iter()
        .filter(|(_, members)| members.len() >= MIN_TREND_GROUP_SIZE)
        .map(|(area_id, members)| {
            let trend = placeholder_annual_trend(&area_id) * options.period.year_fraction();
            let prices: Vec<f64> = members.iter().filter_map(|r| r.positive_price()).collect();
            let direction = if trend.abs() < STABLE_TREND_BAND {
                TrendDirection::Stable
            } else if trend > 0.0 {
                TrendDirection::Increasing
            } else {
                TrendDirection::Decreasing
            };

            MarketTrend {
                area_type: options.area_type,
                period: options.period,
                trend_percentage: trend,
                direction,
                is_significant: trend.abs() >= options.significance_threshold,
                confidence: trend_confidence(members.len()),
                property_count: members.len(),
                average_value: mean(&prices),
                area_id,
            }
        })
        .collect();

    trends.sort_by(|a, b| {
        let weight = |t: &MarketTrend| t.trend_percentage.abs() * t.confidence;
        weight(b).total_cmp(&weight(a))
    });
    trends
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_area(neighborhood: &str, count: usize) -> Vec<PropertyRecord> {
        (0..count)
            .map(|i| PropertyRecord {
                id: Some(format!("{neighborhood}-{i}")),
                neighborhood: Some(neighborhood.into()),
                city: Some("Springfield".into()),
                price: Some(100_000.0 * (i + 1) as f64),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn placeholder_trend_is_deterministic() {
        assert_eq!(placeholder_annual_trend("Riverside"), placeholder_annual_trend("Riverside"));
        // 'X' = 88, 88 mod 21 = 4.
        assert_eq!(placeholder_annual_trend("X"), -4.0);
    }

    #[test]
    fn small_areas_are_skipped() {
        let mut records = in_area("Big", 5);
        records.extend(in_area("Small", 4));
        let trends = analyze_market_trends(&records, &TrendOptions::default());
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].area_id, "Big");
        assert_eq!(trends[0].property_count, 5);
        assert_eq!(trends[0].average_value, Some(300_000.0));
    }

    #[test]
    fn confidence_grows_with_size_and_caps() {
        assert!((trend_confidence(5) - 0.75).abs() < 1e-9);
        assert_eq!(trend_confidence(100), MAX_TREND_CONFIDENCE);
    }

    #[test]
    fn significance_uses_threshold() {
        let records = in_area("X", 6);
        let lenient = TrendOptions {
            significance_threshold: 4.0,
            ..TrendOptions::default()
        };
        let strict = TrendOptions {
            significance_threshold: 4.5,
            ..TrendOptions::default()
        };
        assert!(analyze_market_trends(&records, &lenient)[0].is_significant);
        assert!(!analyze_market_trends(&records, &strict)[0].is_significant);
        assert_eq!(
            analyze_market_trends(&records, &lenient)[0].direction,
            TrendDirection::Decreasing
        );
    }

    #[test]
    fn period_scales_trend() {
        let records = in_area("X", 5);
        let quarterly = TrendOptions {
            period: TrendPeriod::Quarter,
            ..TrendOptions::default()
        };
        let trend = &analyze_market_trends(&records, &quarterly)[0];
        assert_eq!(trend.trend_percentage, -1.0);
    }

    #[test]
    fn groups_by_requested_area_type() {
        let mut records = in_area("A", 3);
        records.extend(in_area("B", 3));
        let by_city = TrendOptions {
            area_type: AreaType::City,
            ..TrendOptions::default()
        };
        let trends = analyze_market_trends(&records, &by_city);
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].area_id, "Springfield");
        assert_eq!(trends[0].property_count, 6);
    }

    #[test]
    fn ordered_by_weighted_magnitude() {
        let mut records = Vec::new();
        for area in ["Alpha", "Beta", "Gamma", "Delta"] {
            records.extend(in_area(area, 5));
        }
        let trends = analyze_market_trends(&records, &TrendOptions::default());
        for pair in trends.windows(2) {
            let a = pair[0].trend_percentage.abs() * pair[0].confidence;
            let b = pair[1].trend_percentage.abs() * pair[1].confidence;
            assert!(a >= b);
        }
    }

    #[test]
    fn missing_area_falls_back_to_unknown() {
        let records: Vec<_> = (0..5).map(|_| PropertyRecord::default()).collect();
        let trends = analyze_market_trends(&records, &TrendOptions::default());
        assert_eq!(trends[0].area_id, UNKNOWN_GROUP);
    }
}
