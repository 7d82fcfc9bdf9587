//! Run configuration.
//!
//! Values come from three places, lowest precedence first:
//! 1. The named defaults below
//! 2. An optional TOML file ([`BenchConfig::from_file`])
//! 3. Command line flags applied by the binary
//!
//! The result is checked once with [`BenchConfig::validate`] before anything
//! is sent.

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, report::AggregateStats, scenario::HealthRating};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_INSTRUMENT: &str = "BTC-USD";
pub const DEFAULT_BASE_PRICE: f64 = 70_000.0;
pub const DEFAULT_QUANTITY: f64 = 0.01;
pub const DEFAULT_JITTER_BOUND: f64 = 50.0;
pub const DEFAULT_PACING_DELAY_MS: u64 = 100;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_COOLDOWN_MS: u64 = 1_000;
pub const DEFAULT_SEQUENTIAL_COUNT: usize = 10;
pub const DEFAULT_CONCURRENT_BATCH_SIZES: [usize; 4] = [5, 10, 20, 50];
/// 3 of 5
pub const DEFAULT_ESCALATION_MIN_SUCCESS_RATIO: f64 = 0.6;
pub const DEFAULT_GOOD_THRESHOLD: f64 = 0.8;
pub const DEFAULT_MODERATE_THRESHOLD: f64 = 0.5;

/// Everything a run needs to know, with named defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Root of the order service; orders go to `{base_url}/orders`
    pub base_url: String,
    /// Keep idle connections for reuse between requests
    pub keep_alive: bool,

    pub instrument: String,
    pub base_price: f64,
    pub quantity: f64,
    /// Orders are priced uniformly within `base_price ± jitter_bound`
    pub jitter_bound: f64,

    /// Pause between two sequential requests
    pub pacing_delay_ms: u64,
    /// Bound on a single outstanding request
    pub request_timeout_ms: u64,
    /// Pause between two executed stages
    pub cooldown_ms: u64,

    pub sequential_count: usize,
    pub concurrent_batch_sizes: Vec<usize>,
    /// Success ratio the previous concurrent batch needs before the next,
    /// larger one runs
    pub escalation_min_success_ratio: f64,

    pub health: HealthThresholds,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            keep_alive: true,
            instrument: DEFAULT_INSTRUMENT.to_string(),
            base_price: DEFAULT_BASE_PRICE,
            quantity: DEFAULT_QUANTITY,
            jitter_bound: DEFAULT_JITTER_BOUND,
            pacing_delay_ms: DEFAULT_PACING_DELAY_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            sequential_count: DEFAULT_SEQUENTIAL_COUNT,
            concurrent_batch_sizes: DEFAULT_CONCURRENT_BATCH_SIZES.to_vec(),
            escalation_min_success_ratio: DEFAULT_ESCALATION_MIN_SUCCESS_RATIO,
            health: HealthThresholds::default(),
        }
    }
}

impl BenchConfig {
    /// Load a configuration from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::Toml { path, source: e })
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Validation(msg));

        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ConfigError::Validation(format!("base_url '{}': {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return invalid(format!("base_url must be http or https, got '{}'", url.scheme()));
        }

        if self.instrument.trim().is_empty() {
            return invalid("instrument cannot be empty".into());
        }
        if !(self.base_price > 0.0 && self.base_price.is_finite()) {
            return invalid(format!("base_price must be positive, got {}", self.base_price));
        }
        if !(self.quantity > 0.0) {
            return invalid(format!("quantity must be positive, got {}", self.quantity));
        }
        if !(self.jitter_bound >= 0.0 && self.jitter_bound < self.base_price) {
            return invalid(format!(
                "jitter_bound must be in [0, base_price), got {}",
                self.jitter_bound
            ));
        }

        if self.request_timeout_ms == 0 {
            return invalid("request_timeout_ms must be non-zero".into());
        }
        if self.sequential_count == 0 {
            return invalid("sequential_count must be at least 1".into());
        }
        if self.concurrent_batch_sizes.is_empty() {
            return invalid("concurrent_batch_sizes cannot be empty".into());
        }
        if self.concurrent_batch_sizes.contains(&0) {
            return invalid("concurrent_batch_sizes must all be at least 1".into());
        }
        if !(0.0..=1.0).contains(&self.escalation_min_success_ratio) {
            return invalid(format!(
                "escalation_min_success_ratio must be within [0, 1], got {}",
                self.escalation_min_success_ratio
            ));
        }

        self.health.validate()
    }
}

/// Success-rate bands used to rate a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    /// At or above: GOOD
    pub good: f64,
    /// At or above (and below `good`): MODERATE
    pub moderate: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            good: DEFAULT_GOOD_THRESHOLD,
            moderate: DEFAULT_MODERATE_THRESHOLD,
        }
    }
}

impl HealthThresholds {
    pub fn classify_rate(&self, success_rate: f64) -> HealthRating {
        if success_rate >= self.good {
            HealthRating::Good
        } else if success_rate >= self.moderate {
            HealthRating::Moderate
        } else {
            HealthRating::Poor
        }
    }

    /// Rate a run from its overall stats. A run that sent nothing is POOR.
    pub fn classify(&self, overall: &AggregateStats) -> HealthRating {
        if overall.sample_count == 0 {
            return HealthRating::Poor;
        }
        self.classify_rate(overall.success_rate)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(self.good) || !in_unit(self.moderate) {
            return Err(ConfigError::Validation(format!(
                "health thresholds must be within [0, 1], got good={} moderate={}",
                self.good, self.moderate
            )));
        }
        if self.moderate > self.good {
            return Err(ConfigError::Validation(format!(
                "health.moderate ({}) cannot exceed health.good ({})",
                self.moderate, self.good
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{aggregate::aggregate, metric::Outcome};

    #[test]
    fn defaults_are_valid() {
        let config = BenchConfig::default();
        config.validate().unwrap();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.concurrent_batch_sizes, vec![5, 10, 20, 50]);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: BenchConfig = toml::from_str(
            r#"
            base_url = "http://orders.internal:8080"
            pacing_delay_ms = 150
            concurrent_batch_sizes = [5, 10]

            [health]
            good = 0.9
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "http://orders.internal:8080");
        assert_eq!(config.pacing_delay(), Duration::from_millis(150));
        assert_eq!(config.concurrent_batch_sizes, vec![5, 10]);
        assert_eq!(config.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
        assert_eq!(config.health.good, 0.9);
        assert_eq!(config.health.moderate, DEFAULT_MODERATE_THRESHOLD);
        config.validate().unwrap();
    }

    #[test]
    fn missing_file_reports_path() {
        let err = BenchConfig::from_file("/nonexistent/orderload.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/orderload.toml"));
    }

    #[test]
    fn rejects_jitter_that_could_make_price_non_positive() {
        let config = BenchConfig {
            base_price: 100.0,
            jitter_bound: 100.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_bad_values() {
        let cases = [
            BenchConfig {
                base_url: "localhost:3000".into(),
                ..Default::default()
            },
            BenchConfig {
                request_timeout_ms: 0,
                ..Default::default()
            },
            BenchConfig {
                concurrent_batch_sizes: vec![5, 0],
                ..Default::default()
            },
            BenchConfig {
                escalation_min_success_ratio: 1.5,
                ..Default::default()
            },
            BenchConfig {
                health: HealthThresholds {
                    good: 0.4,
                    moderate: 0.6,
                },
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }

    #[test]
    fn classification_boundaries() {
        let t = HealthThresholds::default();
        assert_eq!(t.classify_rate(800.0 / 1000.0), HealthRating::Good);
        assert_eq!(t.classify_rate(799.0 / 1000.0), HealthRating::Moderate);
        assert_eq!(t.classify_rate(500.0 / 1000.0), HealthRating::Moderate);
        assert_eq!(t.classify_rate(499.0 / 1000.0), HealthRating::Poor);
    }

    #[test]
    fn classification_from_outcome_counts() {
        let t = HealthThresholds::default();
        let run = |successes: usize, total: usize| {
            let outcomes: Vec<Outcome> = (0..total)
                .map(|i| {
                    if i < successes {
                        Outcome::success(Duration::from_millis(10), "id")
                    } else {
                        Outcome::failure(Duration::from_millis(10), "err")
                    }
                })
                .collect();
            t.classify(&aggregate(&outcomes, 100))
        };

        assert_eq!(run(8, 10), HealthRating::Good);
        assert_eq!(run(799, 1000), HealthRating::Moderate);
        assert_eq!(run(5, 10), HealthRating::Moderate);
        assert_eq!(run(499, 1000), HealthRating::Poor);
        assert_eq!(run(0, 0), HealthRating::Poor);
    }
}
