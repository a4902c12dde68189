//! Analysis configuration.
//!
//! Loaded from environment variables with the `WELLNESS` prefix; nested values use
//! a double underscore, e.g. `WELLNESS__THRESHOLDS__CRISIS_RATE=25` or
//! `WELLNESS__TREND__METHOD=split_half`. A `.env` file is read first when present.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::population::{AnalysisSettings, DEFAULT_TREND_WINDOW_DAYS};
use crate::risk::{RiskThresholds, MAX_WINDOW_DAYS};
use crate::trend::{TrendPolicy, DEFAULT_CORRELATION_THRESHOLD, DEFAULT_SPLIT_HALF_THRESHOLD};

pub const ENV_PREFIX: &str = "WELLNESS";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMethod {
    #[default]
    Correlation,
    SplitHalf,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrendConfig {
    #[serde(default)]
    pub method: TrendMethod,
    /// Falls back to the method's own default when unset.
    #[serde(default)]
    pub threshold: Option<f64>,
}

impl TrendConfig {
    pub fn policy(&self) -> TrendPolicy {
        match self.method {
            TrendMethod::Correlation => TrendPolicy::Correlation {
                threshold: self.threshold.unwrap_or(DEFAULT_CORRELATION_THRESHOLD),
            },
            TrendMethod::SplitHalf => TrendPolicy::SplitHalf {
                threshold: self.threshold.unwrap_or(DEFAULT_SPLIT_HALF_THRESHOLD),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub thresholds: RiskThresholds,

    #[serde(default)]
    pub trend: TrendConfig,

    #[serde(default = "default_trend_window_days")]
    pub trend_window_days: i64,
}

fn default_trend_window_days() -> i64 {
    DEFAULT_TREND_WINDOW_DAYS
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            thresholds: RiskThresholds::default(),
            trend: TrendConfig::default(),
            trend_window_days: DEFAULT_TREND_WINDOW_DAYS,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trend_window_days < 1 {
            return Err(ConfigError::Invalid("trend_window_days must be at least 1"));
        }
        if self.trend_window_days > MAX_WINDOW_DAYS {
            return Err(ConfigError::Invalid("trend_window_days exceeds 36500 days"));
        }
        if self.trend.threshold.is_some_and(|t| t < 0.0) {
            return Err(ConfigError::Invalid("trend threshold must not be negative"));
        }
        if self.thresholds.crisis_rate > 100.0 {
            return Err(ConfigError::Invalid("crisis rate threshold exceeds 100%"));
        }
        Ok(())
    }

    pub fn settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            thresholds: self.thresholds,
            trend: self.trend.policy(),
            trend_window_days: self.trend_window_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        env::remove_var("WELLNESS__THRESHOLDS__WELLNESS");
        env::remove_var("WELLNESS__THRESHOLDS__CRISIS_RATE");
        env::remove_var("WELLNESS__TREND__METHOD");
        env::remove_var("WELLNESS__TREND_WINDOW_DAYS");
    }

    #[test]
    fn defaults_match_analysis_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.settings(), AnalysisSettings::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn loads_overrides_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("WELLNESS__THRESHOLDS__WELLNESS", "3.0");
        env::set_var("WELLNESS__TREND__METHOD", "split_half");
        env::set_var("WELLNESS__TREND_WINDOW_DAYS", "14");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.thresholds.wellness, 3.0);
        assert_eq!(config.thresholds.crisis_rate, 30.0);
        assert_eq!(config.trend_window_days, 14);
        assert_eq!(config.settings().trend, TrendPolicy::split_half());
    }

    #[test]
    fn rejects_empty_trend_window() {
        let config = AppConfig {
            trend_window_days: 0,
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_trend_window_beyond_a_century() {
        let config = AppConfig {
            trend_window_days: 100_000_000,
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = AppConfig {
            trend_window_days: MAX_WINDOW_DAYS,
            ..AppConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserializes_partial_json() {
        let config: AppConfig =
            serde_json::from_str(r#"{"thresholds":{"hopeful":1.5},"trend":{"threshold":0.4}}"#)
                .unwrap();
        assert_eq!(config.thresholds.hopeful, 1.5);
        assert_eq!(config.thresholds.wellness, 6.0);
        assert_eq!(
            config.trend.policy(),
            TrendPolicy::Correlation { threshold: 0.4 }
        );
    }
}
