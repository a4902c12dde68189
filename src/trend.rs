use std::fmt;

use serde::{Deserialize, Serialize};

use crate::stats;

pub const DEFAULT_CORRELATION_THRESHOLD: f64 = 0.3;
pub const DEFAULT_SPLIT_HALF_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Stable => "stable",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a chronological series is reduced to a [`Trend`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum TrendPolicy {
    /// Pearson correlation between position and value.
    Correlation { threshold: f64 },
    /// Mean of the second half minus mean of the first half.
    SplitHalf { threshold: f64 },
}

impl Default for TrendPolicy {
    fn default() -> Self {
        TrendPolicy::Correlation {
            threshold: DEFAULT_CORRELATION_THRESHOLD,
        }
    }
}

impl TrendPolicy {
    pub fn split_half() -> Self {
        TrendPolicy::SplitHalf {
            threshold: DEFAULT_SPLIT_HALF_THRESHOLD,
        }
    }

    pub fn classify(&self, values: &[f64]) -> Trend {
        if values.len() < 2 {
            return Trend::Stable;
        }

        let (signal, threshold) = match *self {
            TrendPolicy::Correlation { threshold } => {
                let positions: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
                match stats::pearson(&positions, values) {
                    Some(correlation) => (correlation, threshold),
                    None => return Trend::Stable,
                }
            }
            TrendPolicy::SplitHalf { threshold } => {
                let (first, second) = values.split_at(values.len() / 2);
                (
                    stats::mean_or_zero(second) - stats::mean_or_zero(first),
                    threshold,
                )
            }
        };

        if signal > threshold {
            Trend::Improving
        } else if signal < -threshold {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }
}

/// Classifies with the default correlation policy.
pub fn classify(values: &[f64]) -> Trend {
    TrendPolicy::default().classify(values)
}
