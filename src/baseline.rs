//! ═══════════════════════════════════════════════════════════════════════════════
//! BASELINE — Seasonality-Aware, Trend-Corrected Revenue Baseline
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Expected revenue absent any influencer effect. Three-step estimation:
//! 1. Fit a linear trend over the lookback (growth/decline correction)
//! 2. Group detrended residuals by seasonal key (weekday, or weekday×hour)
//!    and take a trimmed mean per key — one outlier day cannot distort it
//! 3. At prediction time, reapply the trend at the target bucket's index and
//!    add the seasonal offset
//!
//! Properties:
//! - Min-history gate before the seasonal basis is trusted
//! - MAD-based robust scale estimation for later significance testing
//! - Graded fallbacks (Seasonal → Flat → Sparse) instead of failure: thin
//!   history lowers the downstream confidence grade, it never errors
//! ═══════════════════════════════════════════════════════════════════════════════

use crate::model::HistoricalData;
use crate::stats::{trimmed_mean, SeriesSummary, TrendFit};
use crate::timeline::{bucket_index, Granularity, SeasonalKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for the baseline estimator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineConfig {
    /// Minimum buckets of history before any seasonal/trend structure is used
    pub min_history: usize,
    /// Minimum samples per seasonal key before that key's average is trusted
    pub min_seasonal_samples: usize,
    /// Fraction trimmed from each tail when averaging a seasonal group
    pub trim_frac: f64,
    /// Remove linear trend before seasonal averaging, reapply at prediction
    pub detrend: bool,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            min_history: 14,        // Two full weekly cycles
            min_seasonal_samples: 2, // At least two same-weekday observations
            trim_frac: 0.2,         // Drop top/bottom 20% per group
            detrend: true,
        }
    }
}

/// How the baseline for a bucket was derived. Ordered from most to least
/// informative; the confidence scorer downgrades on weaker bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BaselineBasis {
    /// History too short for trend or seasonality: flat robust estimate
    Sparse,
    /// Enough history, but this seasonal key was undersampled
    Flat,
    /// Full seasonal + trend estimate
    Seasonal,
}

/// Expected revenue for one bucket, with the dispersion scale used for
/// significance testing downstream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineEstimate {
    pub expected: f64,
    /// Robust dispersion of the (detrended) history — the noise floor
    pub scale: f64,
    pub basis: BaselineBasis,
}

/// Precomputed baseline model for one lookback series.
/// Built once per attribution run; pure lookups afterwards.
#[derive(Debug, Clone)]
pub struct BaselineEstimator {
    config: BaselineConfig,
    granularity: Granularity,
    origin: DateTime<Utc>,
    history_len: usize,
    trend: TrendFit,
    /// Trimmed mean of detrended residuals per seasonal key
    seasonal_offsets: HashMap<SeasonalKey, f64>,
    seasonal_counts: HashMap<SeasonalKey, usize>,
    /// Robust level of the raw series (sparse fallback)
    flat_level: f64,
    /// Robust dispersion of detrended residuals
    scale: f64,
}

impl BaselineEstimator {
    /// Fit the estimator over a lookback series. Never fails: a series too
    /// short for structure degrades to the sparse basis.
    pub fn fit(history: &HistoricalData, config: BaselineConfig) -> Self {
        let granularity = history.granularity();
        let origin = history.start().unwrap_or_else(Utc::now);
        let revenues: Vec<f64> = history.buckets().iter().map(|b| b.revenue).collect();
        let history_len = revenues.len();

        let raw_summary = SeriesSummary::from_samples(&revenues);
        let flat_level = raw_summary.as_ref().map(|s| s.median).unwrap_or(0.0);

        if history_len < config.min_history {
            tracing::warn!(
                history_len,
                min_history = config.min_history,
                "history below minimum, baseline degrades to sparse basis"
            );
            let scale = raw_summary.as_ref().map(|s| s.scale()).unwrap_or(1e-6);
            return Self {
                config,
                granularity,
                origin,
                history_len,
                trend: TrendFit {
                    slope: 0.0,
                    intercept: flat_level,
                },
                seasonal_offsets: HashMap::new(),
                seasonal_counts: HashMap::new(),
                flat_level,
                scale,
            };
        }

        let trend = if config.detrend {
            TrendFit::fit(&revenues)
        } else {
            TrendFit {
                slope: 0.0,
                intercept: flat_level,
            }
        };
        let residuals = trend.detrend(&revenues);

        // Group residuals by seasonal key
        let mut groups: HashMap<SeasonalKey, Vec<f64>> = HashMap::new();
        for (bucket, residual) in history.buckets().iter().zip(residuals.iter()) {
            let key = granularity.seasonal_key(bucket.timestamp);
            groups.entry(key).or_default().push(*residual);
        }

        let mut seasonal_offsets = HashMap::with_capacity(groups.len());
        let mut seasonal_counts = HashMap::with_capacity(groups.len());
        for (key, samples) in groups {
            seasonal_counts.insert(key, samples.len());
            if let Some(offset) = trimmed_mean(&samples, config.trim_frac) {
                seasonal_offsets.insert(key, offset);
            }
        }

        let scale = SeriesSummary::from_samples(&residuals)
            .map(|s| s.scale())
            .unwrap_or(1e-6);

        tracing::debug!(
            history_len,
            slope = trend.slope,
            scale,
            keys = seasonal_offsets.len(),
            "baseline fitted"
        );

        Self {
            config,
            granularity,
            origin,
            history_len,
            trend,
            seasonal_offsets,
            seasonal_counts,
            flat_level,
            scale,
        }
    }

    /// Expected revenue for a target bucket timestamp.
    /// Negative trend extrapolations clamp at zero — revenue cannot go below it.
    pub fn estimate(&self, ts: DateTime<Utc>) -> BaselineEstimate {
        if self.history_len < self.config.min_history {
            return BaselineEstimate {
                expected: self.flat_level.max(0.0),
                scale: self.scale,
                basis: BaselineBasis::Sparse,
            };
        }

        let index = bucket_index(self.origin, ts, self.granularity);
        let trend_level = self.trend.predict(index);
        let key = self.granularity.seasonal_key(ts);
        let samples = self.seasonal_counts.get(&key).copied().unwrap_or(0);

        if samples >= self.config.min_seasonal_samples {
            let offset = self.seasonal_offsets.get(&key).copied().unwrap_or(0.0);
            BaselineEstimate {
                expected: (trend_level + offset).max(0.0),
                scale: self.scale,
                basis: BaselineBasis::Seasonal,
            }
        } else {
            BaselineEstimate {
                expected: trend_level.max(0.0),
                scale: self.scale,
                basis: BaselineBasis::Flat,
            }
        }
    }

    /// The weakest basis this estimator can produce for any bucket —
    /// feeds the data-completeness component of confidence scoring
    pub fn primary_basis(&self) -> BaselineBasis {
        if self.history_len < self.config.min_history {
            BaselineBasis::Sparse
        } else if self
            .seasonal_counts
            .values()
            .any(|&n| n >= self.config.min_seasonal_samples)
        {
            BaselineBasis::Seasonal
        } else {
            BaselineBasis::Flat
        }
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }

    /// Robust noise scale of the detrended history
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn trend(&self) -> TrendFit {
        self.trend
    }
}
