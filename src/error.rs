//! ═══════════════════════════════════════════════════════════════════════════════
//! ERROR — Unified Error Type for Liftlens
//! ═══════════════════════════════════════════════════════════════════════════════
//! Centralized error handling. No scattered .unwrap() or .expect() calls.
//!
//! Taxonomy note: a low-confidence attribution is NOT an error. Missing optional
//! context (paid media, promo) degrades the confidence grade of an otherwise
//! successful run. Only malformed input surfaces as `Validation`.
//! ═══════════════════════════════════════════════════════════════════════════════

use chrono::{DateTime, Utc};
use thiserror::Error;

/// The unified error type for the engine. A single variant today; the enum
/// keeps the call-site signatures stable as failure modes are added.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or insufficient input — always surfaced, never silently corrected
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Input-validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// No historical buckets at all
    #[error("historical data is empty")]
    EmptyHistory,
    /// Series out of chronological order
    #[error("series '{series}' not chronologically sorted at index {index}")]
    UnsortedSeries { series: &'static str, index: usize },
    /// Two buckets share a timestamp
    #[error("series '{series}' has duplicate timestamp at index {index}")]
    DuplicateTimestamp { series: &'static str, index: usize },
    /// Revenue below zero is always bad data, not a refund model
    #[error("negative revenue {revenue} at {timestamp}")]
    NegativeRevenue {
        timestamp: DateTime<Utc>,
        revenue: f64,
    },
    /// A date range with end before start
    #[error("inverted date range in '{name}'")]
    InvertedRange { name: String },
    /// Promo windows must be mutually disjoint (at most one active per instant)
    #[error("overlapping promo windows around {timestamp}")]
    OverlappingPromoWindows { timestamp: DateTime<Utc> },
    /// Discount magnitude outside the sane [0, 1) band
    #[error("invalid promo discount {value}: must be in [0, 1)")]
    InvalidDiscount { value: f64 },
    /// Observed campaign series must follow the lookback history
    #[error("observed series starts before history ends")]
    ObservedPrecedesHistory,
    /// History and observed series must share one bucket size
    #[error("granularity mismatch between history and observed series")]
    GranularityMismatch,
}

/// Type alias for Result with EngineError
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::Validation(ValidationError::EmptyHistory);
        assert!(err.to_string().contains("empty"));

        let err = EngineError::Validation(ValidationError::InvalidDiscount { value: 1.5 });
        assert!(err.to_string().contains("1.5"));
    }

    #[test]
    fn test_validation_lifts_into_engine_error() {
        let err: EngineError = ValidationError::ObservedPrecedesHistory.into();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
