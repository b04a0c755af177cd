//! Built-in property rule set.
//!
//! Thresholds here are shared with the assessment UI and its exported
//! reports; change them together.

use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;

use super::rules::{ValidationRule, ValidationSeverity};
use crate::types::PropertyRecord;

// ---------------------------------------------------------------------------
// Rule ids
// ---------------------------------------------------------------------------

pub const RULE_REQUIRED_FIELDS: &str = "required-fields";
pub const RULE_ADDRESS_FORMAT: &str = "address-format";
pub const RULE_VALUE_RANGE: &str = "value-range";
pub const RULE_SQFT_RANGE: &str = "sqft-range";
pub const RULE_YEAR_BUILT_RANGE: &str = "year-built-range";
pub const RULE_ZIPCODE_FORMAT: &str = "zipcode-format";
pub const RULE_PRICE_SQFT_CONSISTENCY: &str = "price-sqft-consistency";

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Exclusive upper bound for an assessed value.
pub const MAX_PROPERTY_VALUE: f64 = 100_000_000.0;
/// Exclusive upper bound for living area.
pub const MAX_SQUARE_FEET: f64 = 50_000.0;
/// Exclusive lower bound for year built; also the clamp floor.
pub const MIN_YEAR_BUILT: i32 = 1700;
/// Exclusive bounds for price per square foot.
pub const MIN_PRICE_PER_SQFT: f64 = 50.0;
pub const MAX_PRICE_PER_SQFT: f64 = 10_000.0;

static ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s+[\w\s.,#'/-]+$").expect("valid regex"));

static ZIP_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("valid regex"));

/// Default rules evaluated against the current calendar year.
pub fn default_rules() -> Vec<ValidationRule> {
    default_rules_for_year(chrono::Utc::now().year())
}

/// Default rules with an explicit "current year" for the year-built check.
pub fn default_rules_for_year(current_year: i32) -> Vec<ValidationRule> {
    vec![
        required_fields_rule(),
        address_format_rule(),
        value_range_rule(),
        sqft_range_rule(),
        year_built_rule(current_year),
        zip_code_rule(),
        price_sqft_rule(),
    ]
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn missing_required_fields(record: &PropertyRecord) -> Vec<&'static str> {
    [
        ("address", &record.address),
        ("city", &record.city),
        ("state", &record.state),
        ("zipCode", &record.zip_code),
        ("propertyType", &record.property_type),
    ]
    .into_iter()
    .filter(|(_, value)| is_blank(value))
    .map(|(name, _)| name)
    .collect()
}

fn required_fields_rule() -> ValidationRule {
    ValidationRule::new(
        RULE_REQUIRED_FIELDS,
        "Required Fields",
        ValidationSeverity::Error,
        |r| missing_required_fields(r).is_empty(),
        |r| {
            format!(
                "Missing required fields: {}",
                missing_required_fields(r).join(", ")
            )
        },
    )
}

fn address_format_rule() -> ValidationRule {
    ValidationRule::new(
        RULE_ADDRESS_FORMAT,
        "Address Format",
        ValidationSeverity::Warning,
        |r| match r.address.as_deref() {
            Some(a) if !a.trim().is_empty() => ADDRESS_RE.is_match(a),
            _ => true,
        },
        |r| {
            format!(
                "Address '{}' does not follow the '<number> <street>' format",
                r.address.as_deref().unwrap_or_default()
            )
        },
    )
    .with_fix(|r| PropertyRecord {
        address: r.address.as_deref().map(normalize_address),
        ..r.clone()
    })
}

fn value_range_rule() -> ValidationRule {
    ValidationRule::new(
        RULE_VALUE_RANGE,
        "Value Range",
        ValidationSeverity::Warning,
        |r| r.price.map_or(true, |p| p > 0.0 && p < MAX_PROPERTY_VALUE),
        |r| {
            format!(
                "Assessed value {} is outside the expected range (0 - {MAX_PROPERTY_VALUE})",
                r.price.unwrap_or_default()
            )
        },
    )
}

fn sqft_range_rule() -> ValidationRule {
    ValidationRule::new(
        RULE_SQFT_RANGE,
        "Square Footage Range",
        ValidationSeverity::Warning,
        |r| r.square_feet.map_or(true, |s| s > 0.0 && s < MAX_SQUARE_FEET),
        |r| {
            format!(
                "Square footage {} is outside the expected range (0 - {MAX_SQUARE_FEET})",
                r.square_feet.unwrap_or_default()
            )
        },
    )
}

fn year_built_rule(current_year: i32) -> ValidationRule {
    ValidationRule::new(
        RULE_YEAR_BUILT_RANGE,
        "Year Built Range",
        ValidationSeverity::Warning,
        move |r| {
            r.year_built
                .map_or(true, |y| y > MIN_YEAR_BUILT && y <= current_year)
        },
        move |r| {
            format!(
                "Year built {} is outside the expected range ({MIN_YEAR_BUILT} - {current_year})",
                r.year_built.unwrap_or_default()
            )
        },
    )
    .with_fix(move |r| PropertyRecord {
        year_built: r
            .year_built
            .map(|y| y.clamp(MIN_YEAR_BUILT, current_year.max(MIN_YEAR_BUILT))),
        ..r.clone()
    })
}

fn zip_code_rule() -> ValidationRule {
    ValidationRule::new(
        RULE_ZIPCODE_FORMAT,
        "ZIP Code Format",
        ValidationSeverity::Warning,
        |r| r.zip_code.as_deref().map_or(true, |z| ZIP_CODE_RE.is_match(z)),
        |r| {
            format!(
                "ZIP code '{}' is not in 12345 or 12345-6789 format",
                r.zip_code.as_deref().unwrap_or_default()
            )
        },
    )
    .with_fix(|r| PropertyRecord {
        zip_code: r.zip_code.as_deref().map(normalize_zip_code),
        ..r.clone()
    })
}

fn price_sqft_rule() -> ValidationRule {
    ValidationRule::new(
        RULE_PRICE_SQFT_CONSISTENCY,
        "Price per Square Foot Consistency",
        ValidationSeverity::Warning,
        |r| match (r.price, r.square_feet) {
            (Some(price), Some(sqft)) if sqft > 0.0 => {
                let per_sqft = price / sqft;
                per_sqft > MIN_PRICE_PER_SQFT && per_sqft < MAX_PRICE_PER_SQFT
            }
            _ => true,
        },
        |r| {
            let per_sqft = match (r.price, r.square_feet) {
                (Some(price), Some(sqft)) if sqft > 0.0 => price / sqft,
                _ => 0.0,
            };
            format!(
                "Price per square foot {per_sqft:.2} is outside the expected range \
                 ({MIN_PRICE_PER_SQFT} - {MAX_PRICE_PER_SQFT})"
            )
        },
    )
}

// ---------------------------------------------------------------------------
// Normalizers
// ---------------------------------------------------------------------------

/// Collapse runs of whitespace and uppercase the first letter of each word.
pub fn normalize_address(address: &str) -> String {
    address
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Strip non-digits and re-hyphenate as `12345` or `12345-6789`.
///
/// Fewer than five digits cannot be repaired and are returned as-is
/// (digits only).
pub fn normalize_zip_code(zip: &str) -> String {
    let digits: String = zip.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() >= 9 {
        format!("{}-{}", &digits[..5], &digits[5..9])
    } else if digits.len() >= 5 {
        digits[..5].to_string()
    } else {
        digits
    }
}
