use thiserror::Error;

use crate::models::Dimension;

/// Rejections raised while building model values from collaborator input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("age {0} is outside the supported range 13-25")]
    AgeOutOfRange(i32),

    #[error("{dimension} answer {value} is outside the range 1-5")]
    ResponseOutOfRange { dimension: Dimension, value: i32 },

    #[error("unknown survey kind: {0}")]
    UnknownSurveyKind(String),

    #[error("user name must not be empty")]
    EmptyName,
}

/// Errors raised while loading analysis configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration loading failed: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}
