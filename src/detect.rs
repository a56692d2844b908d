//! ═══════════════════════════════════════════════════════════════════════════════
//! DETECT — Residual Lift Detection over Post Windows
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! For each influencer post, a bounded detection window [post − lead,
//! post + lag) — configurable, since response latency varies by content type.
//! The window's raw lift is `Σ (actual − fully adjusted baseline)` over the
//! buckets it covers. Windows from different posts that overlap merge into one
//! combined window BEFORE attribution, so the same revenue is never counted
//! under two posts.
//!
//! A window whose summed residual sits within the noise tolerance
//! (`noise_sigma × scale × √buckets`) is classified non-significant.
//!
//! Windows select buckets by start-timestamp containment. At daily
//! granularity a mid-day post's own bucket starts at midnight, before the
//! window opens with the default 1-hour lead: size `lead_hours` to reach
//! back past the bucket start (24 covers any post hour) when running daily
//! series.
//! ═══════════════════════════════════════════════════════════════════════════════

use crate::baseline::BaselineBasis;
use crate::model::InfluencerPost;
use crate::timeline::DateRange;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Detection-window shape and noise tolerance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Hours before the post timestamp the window opens (anticipation and
    /// timezone slack). Buckets count only when their start timestamp falls
    /// inside the window, so for daily series this should reach back past
    /// the post day's midnight.
    pub lead_hours: i64,
    /// Hours after the post the window stays open
    pub lag_hours: i64,
    /// Residual sums within this many scale units of zero are noise
    pub noise_sigma: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            lead_hours: 1,
            lag_hours: 24,
            noise_sigma: 1.0,
        }
    }
}

impl DetectorConfig {
    /// Detection window for a post timestamp: [ts − lead, ts + lag)
    pub fn window_for(&self, ts: DateTime<Utc>) -> DateRange {
        DateRange::new(
            ts - Duration::hours(self.lead_hours),
            ts + Duration::hours(self.lag_hours),
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADJUSTED SERIES — The detector's input contract
// ═══════════════════════════════════════════════════════════════════════════════

/// One observed bucket with its fully adjusted baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustedBucket {
    pub timestamp: DateTime<Utc>,
    pub actual_revenue: f64,
    pub actual_orders: u32,
    pub expected: f64,
    pub basis: BaselineBasis,
}

/// Per-run arena of adjusted buckets: allocated once when the pipeline applies
/// its adjustments, read-only afterwards. Nothing here outlives the run.
#[derive(Debug, Clone)]
pub struct AdjustedSeries {
    pub buckets: Vec<AdjustedBucket>,
    /// Robust noise scale inherited from the baseline estimator
    pub scale: f64,
}

impl AdjustedSeries {
    /// Buckets whose start timestamp falls inside the range
    pub fn slice(&self, range: DateRange) -> impl Iterator<Item = &AdjustedBucket> {
        self.buckets
            .iter()
            .filter(move |b| range.contains(b.timestamp))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIFT WINDOW — Detector output
// ═══════════════════════════════════════════════════════════════════════════════

/// A detection window with its measured residual lift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiftWindow {
    pub range: DateRange,
    /// Indices into the input's post list that share this window
    pub contributors: Vec<usize>,
    pub lift_revenue: f64,
    pub lift_orders: f64,
    /// Lift as a percentage of the adjusted baseline over the window
    pub lift_pct: f64,
    pub baseline_revenue: f64,
    pub actual_revenue: f64,
    pub bucket_count: usize,
    /// False when the residual sum is within noise tolerance of zero
    pub significant: bool,
}

/// Build one window per post without merging (simplified model path).
/// Returned windows are sorted by start.
pub fn per_post_windows(
    posts: &[InfluencerPost],
    config: &DetectorConfig,
) -> Vec<(DateRange, Vec<usize>)> {
    let mut windows: Vec<(DateRange, Vec<usize>)> = posts
        .iter()
        .enumerate()
        .map(|(i, p)| (config.window_for(p.timestamp), vec![i]))
        .collect();
    windows.sort_by_key(|(r, _)| r.start);
    windows
}

/// Build detection windows and merge any that overlap into a single combined
/// window carrying every contributing post (full model path).
pub fn merged_windows(
    posts: &[InfluencerPost],
    config: &DetectorConfig,
) -> Vec<(DateRange, Vec<usize>)> {
    let mut merged: Vec<(DateRange, Vec<usize>)> = Vec::new();
    for (range, contributors) in per_post_windows(posts, config) {
        match merged.last_mut() {
            Some((last_range, last_contributors)) if last_range.overlaps(&range) => {
                *last_range = last_range.union(&range);
                last_contributors.extend(contributors);
            }
            _ => merged.push((range, contributors)),
        }
    }
    merged
}

/// Measure residual lift for each window against the adjusted series
pub fn measure_windows(
    windows: &[(DateRange, Vec<usize>)],
    series: &AdjustedSeries,
    config: &DetectorConfig,
) -> Vec<LiftWindow> {
    windows
        .iter()
        .map(|(range, contributors)| measure_one(range, contributors, series, config))
        .collect()
}

fn measure_one(
    range: &DateRange,
    contributors: &[usize],
    series: &AdjustedSeries,
    config: &DetectorConfig,
) -> LiftWindow {
    let mut actual_revenue = 0.0;
    let mut baseline_revenue = 0.0;
    let mut actual_orders: u32 = 0;
    let mut bucket_count = 0usize;

    for bucket in series.slice(*range) {
        actual_revenue += bucket.actual_revenue;
        baseline_revenue += bucket.expected;
        actual_orders += bucket.actual_orders;
        bucket_count += 1;
    }

    let raw_lift = actual_revenue - baseline_revenue;
    let tolerance = config.noise_sigma * series.scale * (bucket_count.max(1) as f64).sqrt();
    let significant = raw_lift.abs() > tolerance && bucket_count > 0;

    // Guarded ratios: near-zero denominators resolve to zero, never NaN
    let lift_pct = if baseline_revenue > 1e-9 {
        raw_lift / baseline_revenue * 100.0
    } else {
        0.0
    };
    let lift_orders = if actual_revenue > 1e-9 {
        actual_orders as f64 * (raw_lift / actual_revenue)
    } else {
        0.0
    };

    if significant {
        tracing::debug!(
            ?range,
            lift = raw_lift,
            pct = lift_pct,
            contributors = contributors.len(),
            "candidate lift window"
        );
    }

    LiftWindow {
        range: *range,
        contributors: contributors.to_vec(),
        lift_revenue: raw_lift,
        lift_orders,
        lift_pct,
        baseline_revenue,
        actual_revenue,
        bucket_count,
        significant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, d, h, 0, 0).unwrap()
    }

    fn post(id: &str, influencer: &str, timestamp: DateTime<Utc>) -> InfluencerPost {
        InfluencerPost {
            post_id: id.to_string(),
            influencer: influencer.to_string(),
            timestamp,
            audience_size: 10_000,
            engagement_rate: 0.05,
            promo_code: None,
        }
    }

    fn flat_series(start: DateTime<Utc>, hours: usize, actual: f64, expected: f64) -> AdjustedSeries {
        AdjustedSeries {
            buckets: (0..hours)
                .map(|i| AdjustedBucket {
                    timestamp: start + Duration::hours(i as i64),
                    actual_revenue: actual,
                    actual_orders: 2,
                    expected,
                    basis: BaselineBasis::Seasonal,
                })
                .collect(),
            scale: 5.0,
        }
    }

    #[test]
    fn test_window_shape_configurable() {
        let cfg = DetectorConfig {
            lead_hours: 2,
            lag_hours: 48,
            noise_sigma: 1.0,
        };
        let w = cfg.window_for(ts(10, 12));
        assert_eq!(w.start, ts(10, 10));
        assert_eq!(w.end, ts(12, 12));
    }

    #[test]
    fn test_overlapping_windows_merge() {
        // Two posts 2h apart, 24h lag -> windows overlap heavily
        let posts = vec![post("p1", "alice", ts(10, 12)), post("p2", "bob", ts(10, 14))];
        let merged = merged_windows(&posts, &DetectorConfig::default());
        assert_eq!(merged.len(), 1, "overlapping windows must combine");
        assert_eq!(merged[0].1, vec![0, 1]);
        assert_eq!(merged[0].0.start, ts(10, 11));
        assert_eq!(merged[0].0.end, ts(11, 14));
    }

    #[test]
    fn test_distant_windows_stay_separate() {
        let posts = vec![post("p1", "alice", ts(10, 0)), post("p2", "bob", ts(20, 0))];
        let merged = merged_windows(&posts, &DetectorConfig::default());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_lift_measured_over_window() {
        let cfg = DetectorConfig::default();
        let posts = vec![post("p1", "alice", ts(10, 6))];
        // Actual runs 130 against an expected 100, for 48 hourly buckets
        let series = flat_series(ts(10, 0), 48, 130.0, 100.0);
        let windows = merged_windows(&posts, &cfg);
        let lifts = measure_windows(&windows, &series, &cfg);

        assert_eq!(lifts.len(), 1);
        let w = &lifts[0];
        // Window [05:00, 11th 06:00) covers 25 hourly buckets
        assert_eq!(w.bucket_count, 25);
        assert!((w.lift_revenue - 25.0 * 30.0).abs() < 1e-6);
        assert!((w.lift_pct - 30.0).abs() < 1e-6);
        assert!(w.significant);
    }

    #[test]
    fn test_noise_classified_non_significant() {
        let cfg = DetectorConfig::default();
        let posts = vec![post("p1", "alice", ts(10, 6))];
        // Residual of 0.5/bucket against scale 5.0: pure noise
        let series = flat_series(ts(10, 0), 48, 100.5, 100.0);
        let lifts = measure_windows(&merged_windows(&posts, &cfg), &series, &cfg);
        assert!(!lifts[0].significant);
    }

    #[test]
    fn test_daily_granularity_lead_must_reach_bucket_start() {
        // A mid-day post with a short lead misses its own day bucket (which
        // starts at midnight); a lead reaching back past midnight covers it
        let series = AdjustedSeries {
            buckets: vec![AdjustedBucket {
                timestamp: ts(10, 0),
                actual_revenue: 500.0,
                actual_orders: 5,
                expected: 100.0,
                basis: BaselineBasis::Seasonal,
            }],
            scale: 5.0,
        };
        let noon_post = vec![post("p1", "alice", ts(10, 12))];

        let short = DetectorConfig::default();
        let lifts = measure_windows(&per_post_windows(&noon_post, &short), &series, &short);
        assert_eq!(lifts[0].bucket_count, 0);

        let wide = DetectorConfig {
            lead_hours: 24,
            ..DetectorConfig::default()
        };
        let lifts = measure_windows(&per_post_windows(&noon_post, &wide), &series, &wide);
        assert_eq!(lifts[0].bucket_count, 1);
        assert!(lifts[0].significant);
    }

    #[test]
    fn test_empty_series_guarded() {
        let cfg = DetectorConfig::default();
        let posts = vec![post("p1", "alice", ts(10, 6))];
        let series = AdjustedSeries {
            buckets: vec![],
            scale: 5.0,
        };
        let lifts = measure_windows(&merged_windows(&posts, &cfg), &series, &cfg);
        assert_eq!(lifts[0].lift_revenue, 0.0);
        assert_eq!(lifts[0].lift_pct, 0.0);
        assert!(!lifts[0].significant);
    }
}
