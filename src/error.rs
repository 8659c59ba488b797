//! Error taxonomy for the exposure pipeline.
//!
//! Two families live here:
//!
//! - [`RowError`]: a single raw row could not be normalized. These never
//!   escape the pipeline; the row is dropped and counted.
//! - [`ConfigError`]: a configuration knob is out of range. These are raised
//!   by [`crate::pipeline::Pipeline::new`] before any data is touched.
//!
//! Transport failures (unreadable file, HTTP error) are plain
//! [`anyhow::Error`]s raised at the edges.

use thiserror::Error;

/// Why a raw row was excluded during normalization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("row has no date")]
    MissingDate,

    #[error("unrecognised date '{0}'")]
    InvalidDate(String),

    #[error("row has no city")]
    MissingCity,

    #[error("row has no {field} field")]
    AbsentField { field: &'static str },

    #[error("{field} is empty")]
    MissingValue { field: &'static str },

    #[error("{field} is not numeric: '{value}'")]
    NonNumeric { field: &'static str, value: String },

    #[error("{field} is negative: {value}")]
    Negative { field: &'static str, value: f64 },
}

/// A configuration value that would make the pipeline meaningless.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a reduction in [0, 1), got {value}")]
    ReductionOutOfRange { name: &'static str, value: f64 },

    #[error("window must cover 1..={max} days, got {value}")]
    WindowOutOfRange { value: u32, max: u32 },

    #[error("threshold for {pollutant} must be finite and non-negative, got {value}")]
    InvalidThreshold { pollutant: String, value: f64 },

    #[error("wellness rule '{name}': {reason}")]
    InvalidWellnessRule { name: String, reason: String },

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("failed to read config file '{path}'")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}'")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
