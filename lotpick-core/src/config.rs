use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use lotpick_db::models::{LUCKY_COUNT, MAIN_COUNT};

use crate::error::{LotpickError, Result};
use crate::thresholds::{Bounds, Thresholds};

/// User-adjustable overlay on top of the analyzer thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationConfig {
    pub min_main: u8,
    pub max_main: u8,
    pub count_main: usize,
    pub min_lucky: u8,
    pub max_lucky: u8,
    pub count_lucky: usize,
    /// Acceptance threshold on the positional frequency score, in percent.
    pub min_score: f64,
    pub max_iterations: u64,
    pub sum_range: Bounds,
    pub main_gap_threshold: u32,
    pub lucky_gap_threshold: u32,
    pub odd_range: Bounds,
    pub multiples_allowed: BTreeMap<u8, u32>,
    /// Max main numbers in any one bucket of `cluster_width` consecutive values.
    pub cluster_max: usize,
    pub cluster_width: u8,
    /// Retries allowed to find a never-tried unique set before giving up.
    pub max_unique_attempts: u32,
    pub debug: bool,
}

pub fn default_multiples_allowed() -> BTreeMap<u8, u32> {
    BTreeMap::from([
        (2, 4),
        (3, 4),
        (4, 3),
        (5, 2),
        (6, 2),
        (7, 2),
        (8, 2),
        (9, 2),
        (10, 2),
    ])
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            min_main: 1,
            max_main: 50,
            count_main: MAIN_COUNT,
            min_lucky: 1,
            max_lucky: 11,
            count_lucky: LUCKY_COUNT,
            min_score: 5.0,
            max_iterations: 1_000_000,
            sum_range: Bounds::new(42, 222),
            main_gap_threshold: 19,
            lucky_gap_threshold: 4,
            odd_range: Bounds::new(1, 4),
            multiples_allowed: default_multiples_allowed(),
            cluster_max: 2,
            cluster_width: 10,
            max_unique_attempts: 1000,
            debug: false,
        }
    }
}

impl GenerationConfig {
    /// Defaults with every threshold-derived field replaced by the analyzer output.
    pub fn from_thresholds(thresholds: &Thresholds) -> Self {
        let mut config = Self::default();
        config.apply_thresholds(thresholds);
        config
    }

    pub fn apply_thresholds(&mut self, thresholds: &Thresholds) {
        self.sum_range = thresholds.sum_range;
        self.main_gap_threshold = thresholds.main_gap_threshold;
        self.lucky_gap_threshold = thresholds.lucky_gap_threshold;
        self.odd_range = thresholds.odd_range;
        self.multiples_allowed = thresholds.multiples_allowed.clone();
    }

    /// Rejects configurations the sampler can never satisfy or that do not fit a 5+2 draw.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(LotpickError::InvalidConfig(msg));

        if self.count_main != MAIN_COUNT || self.count_lucky != LUCKY_COUNT {
            return invalid(format!(
                "block counts {}+{} do not match the {}+{} draw layout",
                self.count_main, self.count_lucky, MAIN_COUNT, LUCKY_COUNT
            ));
        }
        for (name, min, max, count) in [
            ("main", self.min_main, self.max_main, self.count_main),
            ("lucky", self.min_lucky, self.max_lucky, self.count_lucky),
        ] {
            if min == 0 || min > max || max > 99 {
                return invalid(format!("{} range {}-{} is not within 1-99", name, min, max));
            }
            if count > (max - min) as usize + 1 {
                return invalid(format!(
                    "cannot pick {} distinct {} numbers from {}-{}",
                    count, name, min, max
                ));
            }
        }
        if self.sum_range.min > self.sum_range.max {
            return invalid(format!("sum range {} is empty", self.sum_range));
        }
        if self.odd_range.min > self.odd_range.max {
            return invalid(format!("odd range {} is empty", self.odd_range));
        }
        if self.cluster_width == 0 {
            return invalid("cluster width must be positive".to_string());
        }
        if !self.min_score.is_finite() || self.min_score < 0.0 {
            return invalid(format!("min score {} must be a non-negative number", self.min_score));
        }
        if let Some(base) = self.multiples_allowed.keys().find(|&&b| b < 2) {
            return invalid(format!("multiples base {} must be at least 2", base));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_test_draws;
    use crate::thresholds::analyze;

    #[test]
    fn test_default_config_is_valid() {
        let config = GenerationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.multiples_allowed[&4], 3);
        assert_eq!(config.max_iterations, 1_000_000);
    }

    #[test]
    fn test_from_thresholds_copies_fields() {
        let thresholds = analyze(&make_test_draws(60, 1), false).unwrap();
        let config = GenerationConfig::from_thresholds(&thresholds);
        assert_eq!(config.sum_range, thresholds.sum_range);
        assert_eq!(config.odd_range, thresholds.odd_range);
        assert_eq!(config.main_gap_threshold, thresholds.main_gap_threshold);
        assert_eq!(config.lucky_gap_threshold, thresholds.lucky_gap_threshold);
        assert_eq!(config.multiples_allowed, thresholds.multiples_allowed);
        assert_eq!(config.max_lucky, 11);
    }

    #[test]
    fn test_validate_rejects_infeasible() {
        let mut config = GenerationConfig::default();
        config.max_lucky = 1;
        assert!(config.validate().is_err());

        let mut config = GenerationConfig::default();
        config.count_main = 6;
        assert!(config.validate().is_err());

        let mut config = GenerationConfig::default();
        config.sum_range = Bounds::new(200, 100);
        assert!(config.validate().is_err());

        let mut config = GenerationConfig::default();
        config.cluster_width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"minScore": 0, "maxIterations": 500, "oddRange": {"min": 2, "max": 3}}"#;
        let config: GenerationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.min_score, 0.0);
        assert_eq!(config.max_iterations, 500);
        assert_eq!(config.odd_range, Bounds::new(2, 3));
        assert_eq!(config.max_main, 50);
        assert_eq!(config.cluster_max, 2);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = GenerationConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: GenerationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }
}
