//! Wellness scoring, crisis detection and risk aggregation for youth self-report
//! surveys.
//!
//! The analysis core (`scoring`, `trend`, `risk`, `population`) is pure and
//! synchronous: callers materialise users and surveys in memory and pass slices in.
//! `db`, `export` and `report` are the thin collaborators used by the CLI.

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod population;
pub mod report;
pub mod risk;
pub mod scoring;
pub mod stats;
pub mod trend;

pub use error::{ConfigError, ValidationError};
pub use models::{Dimension, SurveyKind, SurveyRecord, SurveyResponses, UserProfile, UserRiskSummary};
pub use population::{analyze, AnalysisSettings, PopulationRiskReport};
pub use risk::{is_high_risk, profile_user, RiskThresholds};
pub use scoring::{assess, is_crisis, wellness_score, Assessment};
pub use trend::{classify, Trend, TrendPolicy};
