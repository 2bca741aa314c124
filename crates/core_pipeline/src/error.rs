//! Error types for the scoring pipeline

use crate::types::NumberId;
use thiserror::Error;

/// Errors raised by individual pipeline stages
///
/// The pipeline itself is fail-soft: the wrappers that drive a capture log
/// these and fall back, so they never reach the user.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image bytes were empty or could not be decoded
    #[error("Failed to decode captured image: {0}")]
    Decode(String),

    /// A preprocessing filter rejected its input
    #[error("Failed to preprocess image: {0}")]
    Preprocess(String),

    /// The region detector failed
    #[error("Failed to detect text regions: {0}")]
    Detect(String),

    /// The text recognizer failed on a region
    #[error("Failed to recognize text: {0}")]
    Recognize(String),

    /// Toggle targeted a number that is not in the store
    #[error("No detected number with id {0}")]
    UnknownNumber(NumberId),
}

/// Errors raised while reading configuration overrides
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
