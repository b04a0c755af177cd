use std::collections::HashSet;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use assessor_core::batch::DEFAULT_CHUNK_SIZE;
use assessor_core::intelligence::outliers::DEFAULT_OUTLIER_THRESHOLD;
use assessor_core::intelligence::trends::DEFAULT_SIGNIFICANCE_THRESHOLD;
use assessor_core::intelligence::{
    AreaType, OutlierGroupBy, OutlierMethod, OutlierOptions, TrendOptions, TrendPeriod,
};
use validator::Validate;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone, Validate)]
pub struct WorkerConfig {
    /// JSON array of property records to analyse.
    pub input_path: PathBuf,
    /// Report destination; stdout when `None`.
    pub output_path: Option<PathBuf>,
    /// Optional JSON object mapping property id to assessment history.
    pub history_path: Option<PathBuf>,
    /// Records per chunk between progress events.
    #[validate(range(min = 1))]
    pub chunk_size: usize,
    #[validate(range(min = 0.0))]
    pub outlier_threshold: f64,
    pub outlier_method: OutlierMethod,
    pub outlier_group_by: OutlierGroupBy,
    pub trend_period: TrendPeriod,
    pub trend_area: AreaType,
    #[validate(range(min = 0.0))]
    pub significance_threshold: f64,
    pub auto_fix: bool,
    /// Property ids that get a full insights report.
    pub insight_ids: HashSet<String>,
}

impl WorkerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                           | Default        |
    /// |-----------------------------------|----------------|
    /// | `ASSESSOR_INPUT_PATH`             | required       |
    /// | `ASSESSOR_OUTPUT_PATH`            | stdout         |
    /// | `ASSESSOR_HISTORY_PATH`           | none           |
    /// | `ASSESSOR_CHUNK_SIZE`             | `100`          |
    /// | `ASSESSOR_OUTLIER_THRESHOLD`      | `15`           |
    /// | `ASSESSOR_OUTLIER_METHOD`         | `hybrid`       |
    /// | `ASSESSOR_OUTLIER_GROUP_BY`       | `both`         |
    /// | `ASSESSOR_TREND_PERIOD`           | `year`         |
    /// | `ASSESSOR_TREND_AREA`             | `neighborhood` |
    /// | `ASSESSOR_SIGNIFICANCE_THRESHOLD` | `5`            |
    /// | `ASSESSOR_AUTO_FIX`               | `true`         |
    /// | `ASSESSOR_INSIGHT_IDS`            | none           |
    pub fn from_env() -> WorkerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> WorkerResult<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let input_path = var("ASSESSOR_INPUT_PATH")
            .map(PathBuf::from)
            .ok_or_else(|| WorkerError::Config("ASSESSOR_INPUT_PATH is required".into()))?;

        let auto_fix = match var("ASSESSOR_AUTO_FIX") {
            Some(v) => parse_bool("ASSESSOR_AUTO_FIX", &v)?,
            None => true,
        };

        let insight_ids = var("ASSESSOR_INSIGHT_IDS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let config = Self {
            input_path,
            output_path: var("ASSESSOR_OUTPUT_PATH").map(PathBuf::from),
            history_path: var("ASSESSOR_HISTORY_PATH").map(PathBuf::from),
            chunk_size: parse_or(
                "ASSESSOR_CHUNK_SIZE",
                var("ASSESSOR_CHUNK_SIZE"),
                DEFAULT_CHUNK_SIZE,
            )?,
            outlier_threshold: parse_or(
                "ASSESSOR_OUTLIER_THRESHOLD",
                var("ASSESSOR_OUTLIER_THRESHOLD"),
                DEFAULT_OUTLIER_THRESHOLD,
            )?,
            outlier_method: parse_or(
                "ASSESSOR_OUTLIER_METHOD",
                var("ASSESSOR_OUTLIER_METHOD"),
                OutlierMethod::Hybrid,
            )?,
            outlier_group_by: parse_or(
                "ASSESSOR_OUTLIER_GROUP_BY",
                var("ASSESSOR_OUTLIER_GROUP_BY"),
                OutlierGroupBy::Both,
            )?,
            trend_period: parse_or(
                "ASSESSOR_TREND_PERIOD",
                var("ASSESSOR_TREND_PERIOD"),
                TrendPeriod::Year,
            )?,
            trend_area: parse_or(
                "ASSESSOR_TREND_AREA",
                var("ASSESSOR_TREND_AREA"),
                AreaType::Neighborhood,
            )?,
            significance_threshold: parse_or(
                "ASSESSOR_SIGNIFICANCE_THRESHOLD",
                var("ASSESSOR_SIGNIFICANCE_THRESHOLD"),
                DEFAULT_SIGNIFICANCE_THRESHOLD,
            )?,
            auto_fix,
            insight_ids,
        };

        config
            .validate()
            .map_err(|e| WorkerError::Config(e.to_string()))?;

        Ok(config)
    }

    pub fn outlier_options(&self) -> OutlierOptions {
        OutlierOptions {
            threshold: self.outlier_threshold,
            method: self.outlier_method,
            group_by: self.outlier_group_by,
        }
    }

    pub fn trend_options(&self) -> TrendOptions {
        TrendOptions {
            period: self.trend_period,
            area_type: self.trend_area,
            significance_threshold: self.significance_threshold,
        }
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> WorkerResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    match value {
        Some(v) => v
            .parse()
            .map_err(|e| WorkerError::Config(format!("{key}='{v}' is invalid: {e}"))),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, value: &str) -> WorkerResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(WorkerError::Config(format!(
            "{key}='{value}' is invalid: expected true or false"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> WorkerResult<WorkerConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_input_is_set() {
        let config = load(&[("ASSESSOR_INPUT_PATH", "records.json")]).unwrap();
        assert_eq!(config.input_path, PathBuf::from("records.json"));
        assert!(config.output_path.is_none());
        assert!(config.history_path.is_none());
        assert_eq!(config.chunk_size, 100);
        assert_eq!(config.outlier_threshold, 15.0);
        assert_eq!(config.outlier_method, OutlierMethod::Hybrid);
        assert_eq!(config.outlier_group_by, OutlierGroupBy::Both);
        assert_eq!(config.trend_period, TrendPeriod::Year);
        assert_eq!(config.trend_area, AreaType::Neighborhood);
        assert_eq!(config.significance_threshold, 5.0);
        assert!(config.auto_fix);
        assert!(config.insight_ids.is_empty());
    }

    #[test]
    fn missing_input_is_a_config_error() {
        assert_matches!(load(&[]), Err(WorkerError::Config(_)));
        assert_matches!(
            load(&[("ASSESSOR_INPUT_PATH", "  ")]),
            Err(WorkerError::Config(_))
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("ASSESSOR_INPUT_PATH", "in.json"),
            ("ASSESSOR_OUTPUT_PATH", "out.json"),
            ("ASSESSOR_CHUNK_SIZE", "25"),
            ("ASSESSOR_OUTLIER_METHOD", "comparative"),
            ("ASSESSOR_OUTLIER_GROUP_BY", "neighborhood"),
            ("ASSESSOR_TREND_PERIOD", "quarter"),
            ("ASSESSOR_TREND_AREA", "zipCode"),
            ("ASSESSOR_AUTO_FIX", "no"),
            ("ASSESSOR_INSIGHT_IDS", "p-1, p-2,,"),
        ])
        .unwrap();

        assert_eq!(config.output_path, Some(PathBuf::from("out.json")));
        assert_eq!(config.chunk_size, 25);
        assert_eq!(config.outlier_options().method, OutlierMethod::Comparative);
        assert_eq!(config.outlier_options().group_by, OutlierGroupBy::Neighborhood);
        assert_eq!(config.trend_options().period, TrendPeriod::Quarter);
        assert_eq!(config.trend_options().area_type, AreaType::ZipCode);
        assert!(!config.auto_fix);
        assert_eq!(config.insight_ids.len(), 2);
        assert!(config.insight_ids.contains("p-2"));
    }

    #[test]
    fn unparsable_values_are_rejected() {
        assert_matches!(
            load(&[("ASSESSOR_INPUT_PATH", "in.json"), ("ASSESSOR_CHUNK_SIZE", "many")]),
            Err(WorkerError::Config(msg)) if msg.contains("ASSESSOR_CHUNK_SIZE")
        );
        assert_matches!(
            load(&[("ASSESSOR_INPUT_PATH", "in.json"), ("ASSESSOR_OUTLIER_METHOD", "magic")]),
            Err(WorkerError::Config(msg)) if msg.contains("Unknown outlier method")
        );
        assert_matches!(
            load(&[("ASSESSOR_INPUT_PATH", "in.json"), ("ASSESSOR_AUTO_FIX", "maybe")]),
            Err(WorkerError::Config(_))
        );
    }

    #[test]
    fn out_of_range_values_fail_validation() {
        assert_matches!(
            load(&[("ASSESSOR_INPUT_PATH", "in.json"), ("ASSESSOR_CHUNK_SIZE", "0")]),
            Err(WorkerError::Config(_))
        );
        assert_matches!(
            load(&[
                ("ASSESSOR_INPUT_PATH", "in.json"),
                ("ASSESSOR_OUTLIER_THRESHOLD", "-3")
            ]),
            Err(WorkerError::Config(_))
        );
    }
}
