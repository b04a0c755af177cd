//! Comparable-property search with value adjustments.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::geo::haversine_miles;
use crate::types::PropertyRecord;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DEFAULT_COMPARABLE_COUNT: usize = 5;
pub const DEFAULT_MAX_DISTANCE_MILES: f64 = 1.0;

/// Blend between the base score and the distance factor.
const BASE_WEIGHT: f64 = 0.7;
const DISTANCE_WEIGHT: f64 = 0.3;
/// Distance factor points lost per mile.
const DISTANCE_PENALTY_PER_MILE: f64 = 100.0;
/// Score points lost per unit of relative size difference.
const SIZE_PENALTY: f64 = 50.0;
const AGE_PENALTY_PER_YEAR: f64 = 2.0;
const MAX_AGE_PENALTY: f64 = 30.0;

/// Fraction of comp value per century of age difference.
const AGE_ADJUSTMENT_RATE: f64 = 0.5;
/// Age adjustments at or below this amount are ignored.
const MIN_AGE_ADJUSTMENT: f64 = 1_000.0;
/// Market appreciation per month since the comp's sale.
const MONTHLY_APPRECIATION: f64 = 0.005;
pub const GARAGE_SPACE_VALUE: f64 = 10_000.0;
pub const POOL_VALUE: f64 = 25_000.0;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct ComparableOptions {
    pub count: usize,
    pub max_distance_miles: f64,
    pub adjust_for_time: bool,
    pub adjust_for_features: bool,
}

impl Default for ComparableOptions {
    fn default() -> Self {
        Self {
            count: DEFAULT_COMPARABLE_COUNT,
            max_distance_miles: DEFAULT_MAX_DISTANCE_MILES,
            adjust_for_time: true,
            adjust_for_features: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentKind {
    Size,
    Age,
    Time,
    Garage,
    Pool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueAdjustment {
    pub kind: AdjustmentKind,
    pub amount: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparableProperty {
    pub property: PropertyRecord,
    /// Similarity to the subject in `[0, 100]`.
    pub similarity_score: f64,
    pub distance_miles: f64,
    pub adjustments: Vec<ValueAdjustment>,
    /// Comp price plus all adjustments.
    pub adjusted_value: f64,
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Whole months from `from` to `to`, never negative.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0) as u32
}

fn similarity(subject: &PropertyRecord, comp: &PropertyRecord, distance: f64) -> f64 {
    let distance_factor = (100.0 - distance * DISTANCE_PENALTY_PER_MILE).max(0.0);
    let mut score = 100.0 * BASE_WEIGHT + distance_factor * DISTANCE_WEIGHT;

    if let (Some(subject_sqft), Some(comp_sqft)) =
        (subject.positive_square_feet(), comp.positive_square_feet())
    {
        score -= (subject_sqft - comp_sqft).abs() / subject_sqft * SIZE_PENALTY;
    }
    if let (Some(subject_year), Some(comp_year)) = (subject.year_built, comp.year_built) {
        let years = (subject_year - comp_year).abs() as f64;
        score -= (years * AGE_PENALTY_PER_YEAR).min(MAX_AGE_PENALTY);
    }

    score.clamp(0.0, 100.0)
}

fn adjustments(
    subject: &PropertyRecord,
    comp: &PropertyRecord,
    comp_price: f64,
    comp_sqft: f64,
    options: &ComparableOptions,
    reference_date: NaiveDate,
) -> Vec<ValueAdjustment> {
    let mut out = Vec::new();

    if let Some(subject_sqft) = subject.positive_square_feet() {
        let diff = subject_sqft - comp_sqft;
        if diff != 0.0 {
            let per_sqft = comp_price / comp_sqft;
            out.push(ValueAdjustment {
                kind: AdjustmentKind::Size,
                amount: diff * per_sqft,
                reason: format!("Size difference of {diff:+.0} sq ft at ${per_sqft:.2}/sq ft"),
            });
        }
    }

    if let (Some(subject_year), Some(comp_year)) = (subject.year_built, comp.year_built) {
        let years = (subject_year - comp_year) as f64;
        let amount = years / 100.0 * AGE_ADJUSTMENT_RATE * comp_price;
        if amount.abs() > MIN_AGE_ADJUSTMENT {
            out.push(ValueAdjustment {
                kind: AdjustmentKind::Age,
                amount,
                reason: format!("Age difference of {years:+.0} years"),
            });
        }
    }

    if options.adjust_for_time {
        if let Some(sold) = comp.last_sold_date {
            let months = months_between(sold, reference_date);
            if months > 0 {
                out.push(ValueAdjustment {
                    kind: AdjustmentKind::Time,
                    amount: months as f64 * MONTHLY_APPRECIATION * comp_price,
                    reason: format!("Market appreciation over {months} months since sale"),
                });
            }
        }
    }

    if options.adjust_for_features {
        if let (Some(subject_spaces), Some(comp_spaces)) = (subject.garage_spaces, comp.garage_spaces)
        {
            let diff = subject_spaces as i64 - comp_spaces as i64;
            if diff != 0 {
                out.push(ValueAdjustment {
                    kind: AdjustmentKind::Garage,
                    amount: diff as f64 * GARAGE_SPACE_VALUE,
                    reason: format!("Garage difference of {diff:+} spaces"),
                });
            }
        }
        if let (Some(subject_pool), Some(comp_pool)) = (subject.has_pool, comp.has_pool) {
            if subject_pool != comp_pool {
                let (amount, reason) = if subject_pool {
                    (POOL_VALUE, "Subject has a pool")
                } else {
                    (-POOL_VALUE, "Comparable has a pool")
                };
                out.push(ValueAdjustment {
                    kind: AdjustmentKind::Pool,
                    amount,
                    reason: reason.to_string(),
                });
            }
        }
    }

    out
}

/// Nearby priced properties most similar to `subject`, best first.
///
/// Returns an empty list when the subject has no coordinates. Candidates
/// need coordinates, a price and square footage; the subject itself (same
/// id, or an identical record when the subject has no id) is never its own
/// comparable.
pub fn find_comparable_properties(
    subject: &PropertyRecord,
    candidates: &[PropertyRecord],
    options: &ComparableOptions,
    reference_date: NaiveDate,
) -> Vec<ComparableProperty> {
    let Some(origin) = subject.coordinates() else {
        return Vec::new();
    };

    let mut comps: Vec<ComparableProperty> = candidates
        .iter()
        .filter(|c| *c != subject && (subject.id.is_none() || c.id != subject.id))
        .filter_map(|comp| {
            let location = comp.coordinates()?;
            let price = comp.positive_price()?;
            let sqft = comp.positive_square_feet()?;

            let distance = haversine_miles(origin, location);
            if distance > options.max_distance_miles {
                return None;
            }

            let adjustments = adjustments(subject, comp, price, sqft, options, reference_date);
            let adjusted_value = price + adjustments.iter().map(|a| a.amount).sum::<f64>();

            Some(ComparableProperty {
                property: comp.clone(),
                similarity_score: similarity(subject, comp, distance),
                distance_miles: distance,
                adjustments,
                adjusted_value,
            })
        })
        .collect();

    comps.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
    comps.truncate(options.count);
    comps
}
