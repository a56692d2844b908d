//! ═══════════════════════════════════════════════════════════════════════════════
//! LIFTLENS — Influencer Revenue Attribution Engine
//! ═══════════════════════════════════════════════════════════════════════════════
//! Estimates how much of a merchant's revenue is causally attributable to
//! influencer activity, without tracking links or promo codes:
//!
//!   input → baseline → momentum/promo adjusters → paid-media neutralizer →
//!   lift detector → multi-influencer attributor → graded report
//!
//! The engine is a pure, synchronous computation over an immutable input
//! snapshot: all I/O (order history, post timestamps) is resolved by the
//! caller beforehand. Results carry an explicit confidence grade — this is a
//! best-effort statistical estimate, not a certified causal measurement.
//! ═══════════════════════════════════════════════════════════════════════════════

// ═══════════════════════════════════════════════════════════════════════════════
// FOUNDATION MODULES — The spine (time, data contract, statistics)
// ═══════════════════════════════════════════════════════════════════════════════

pub mod error;
pub mod model;
pub mod stats;
pub mod timeline;

// ═══════════════════════════════════════════════════════════════════════════════
// PIPELINE STAGES
// ═══════════════════════════════════════════════════════════════════════════════

pub mod adjust;
pub mod attribute;
pub mod baseline;
pub mod detect;
pub mod neutralize;

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE — Pipeline variants and entry points
// ═══════════════════════════════════════════════════════════════════════════════

pub mod engine;

// ═══════════════════════════════════════════════════════════════════════════════
// SCENARIO — Synthetic Fixtures for Regression & Stress Testing
// ═══════════════════════════════════════════════════════════════════════════════

pub mod scenario;

// Re-export common error types
pub use error::{EngineError, EngineResult, ValidationError};

// Re-export the data contract
pub use model::{
    AttributionInput, DailyData, HistoricalData, InfluencerPost, MomentumConfig, PaidMediaContext,
    PaidMediaWindow, PromoCodeUsage, PromoContext, PromoWindow,
};
pub use timeline::{DateRange, Granularity, SeasonalKey};

// Re-export pipeline stages and results
pub use adjust::{apply_momentum, apply_promo, PromoResponse};
pub use attribute::{ConfidenceGrade, ConfidenceInputs, InfluencerAttribution, WeightConfig};
pub use baseline::{BaselineBasis, BaselineConfig, BaselineEstimate, BaselineEstimator};
pub use detect::{AdjustedBucket, AdjustedSeries, DetectorConfig, LiftWindow};
pub use engine::{
    run_full_attribution, run_simple_attribution, AttributionPipeline, DataCompleteness,
    EngineConfig, FullAttributionReport, FullEngine, SimpleAttributionReport, SimpleEngine,
};
pub use neutralize::{neutralize_paid_media, PaidMediaResponse};
pub use scenario::{
    generate_test_scenarios, Expectation, Regime, ScenarioGenerator, TestScenario, DEFAULT_SEED,
};
