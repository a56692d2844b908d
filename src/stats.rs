//! ═══════════════════════════════════════════════════════════════════════════════
//! STATS — Statistical Primitives for Series Analysis
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Batch statistics over a revenue series known in full at run start:
//! - Median/MAD for robust central tendency and scale
//! - Trimmed mean for outlier-resistant averaging
//! - Series summary (mean/stddev/median/MAD in one pass over a slice)
//! - Ordinary least squares trend fit for growth/decline correction
//!
//! These are the building blocks for the baseline estimator and the
//! confidence scorer.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::cmp::Ordering;

/// Total-order float comparison for sorting samples
pub fn float_cmp(a: &f64, b: &f64) -> Ordering {
    a.total_cmp(b)
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROBUST CENTRAL TENDENCY
// ═══════════════════════════════════════════════════════════════════════════════

/// Median of a sample slice
pub fn median(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(float_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Median Absolute Deviation, scaled by 1.4826 for consistency with the
/// standard deviation of a normal distribution
pub fn mad(samples: &[f64]) -> Option<f64> {
    let med = median(samples)?;
    let deviations: Vec<f64> = samples.iter().map(|&x| (x - med).abs()).collect();
    median(&deviations).map(|m| m * 1.4826)
}

/// Mean after symmetrically dropping `trim_frac` of samples from each tail.
/// `trim_frac` of 0.2 drops the lowest and highest 20%. A single outlier day
/// therefore cannot distort a weekday average.
pub fn trimmed_mean(samples: &[f64], trim_frac: f64) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(float_cmp);
    let drop = ((sorted.len() as f64) * trim_frac.clamp(0.0, 0.45)) as usize;
    let kept = &sorted[drop..sorted.len() - drop];
    if kept.is_empty() {
        // Trimming consumed everything (tiny sample) — fall back to plain median
        return median(&sorted);
    }
    Some(kept.iter().sum::<f64>() / kept.len() as f64)
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERIES SUMMARY — One-pass descriptive stats for a slice
// ═══════════════════════════════════════════════════════════════════════════════

/// Descriptive statistics of a sample slice
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    pub n: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub median: f64,
    pub mad: f64,
    pub min: f64,
    pub max: f64,
}

impl SeriesSummary {
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;

        let mut sorted = samples.to_vec();
        sorted.sort_by(float_cmp);

        Some(Self {
            n,
            mean,
            std_dev: variance.sqrt(),
            median: median(samples).unwrap_or(mean),
            mad: mad(samples).unwrap_or(0.0),
            min: sorted[0],
            max: sorted[n - 1],
        })
    }

    /// Robust scale estimate: MAD when it carries signal, else stddev,
    /// floored away from zero so z-scores stay finite
    pub fn scale(&self) -> f64 {
        let s = if self.mad > 1e-9 { self.mad } else { self.std_dev };
        s.max(1e-6)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TREND FIT — Ordinary least squares over bucket index
// ═══════════════════════════════════════════════════════════════════════════════

/// Linear trend `y = intercept + slope * x` fitted over bucket indices 0..n.
/// Used to detrend history before seasonal averaging and to reapply the trend
/// at prediction time, so growth or decline is not misread as lift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendFit {
    pub slope: f64,
    pub intercept: f64,
}

impl TrendFit {
    /// Fit by least squares; a series shorter than 2 points gets a flat trend
    /// at its own level.
    pub fn fit(samples: &[f64]) -> Self {
        let n = samples.len();
        if n < 2 {
            return Self {
                slope: 0.0,
                intercept: samples.first().copied().unwrap_or(0.0),
            };
        }
        let nf = n as f64;
        let x_mean = (nf - 1.0) / 2.0;
        let y_mean = samples.iter().sum::<f64>() / nf;

        let mut sxx = 0.0;
        let mut sxy = 0.0;
        for (i, &y) in samples.iter().enumerate() {
            let dx = i as f64 - x_mean;
            sxx += dx * dx;
            sxy += dx * (y - y_mean);
        }

        let slope = if sxx > 1e-12 { sxy / sxx } else { 0.0 };
        Self {
            slope,
            intercept: y_mean - slope * x_mean,
        }
    }

    /// Trend value at bucket index (extrapolates beyond the fitted range)
    pub fn predict(&self, index: f64) -> f64 {
        self.intercept + self.slope * index
    }

    /// Residuals after removing the trend
    pub fn detrend(&self, samples: &[f64]) -> Vec<f64> {
        samples
            .iter()
            .enumerate()
            .map(|(i, &y)| y - self.predict(i as f64))
            .collect()
    }
}
