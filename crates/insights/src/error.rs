//! Insight error types

use thiserror::Error;

/// Errors surfaced by the metric query compiler
///
/// Schema-resolution misses and empty result sets are deliberately not
/// errors: an unknown property degrades to a match-nothing clause and an
/// empty result yields an empty series list.
#[derive(Debug, Error)]
pub enum InsightError {
    /// Invalid filter (operator not valid for the operand type)
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Invalid time range
    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),

    /// Invalid metric definition
    #[error("invalid metric: {0}")]
    InvalidMetric(String),

    /// The opaque translator produced output that cannot be parsed into a
    /// metric definition; the request fails fast instead of guessing
    #[error("malformed translation output: {0}")]
    MalformedTranslation(String),

    /// Store execution failed; terminal, not retried here
    #[error("store error: {0}")]
    Store(#[from] vantage_store::StoreError),
}

/// Result type for insight operations
pub type Result<T> = std::result::Result<T, InsightError>;
