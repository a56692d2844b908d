//! ═══════════════════════════════════════════════════════════════════════════════
//! ATTRIBUTE — Multi-Influencer Split & Confidence Grading
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Splits a combined window's lift across contributing posts by a deterministic
//! weight blend:
//!
//!   weight_i ∝ 0.6 × audience_share_i + 0.4 × recency_share_i
//!
//! Recency decays exponentially with hours between the window start and the
//! post (half-life configurable): posts closer to window start draw a larger
//! share. Weights always sum to 1; attributed revenue sums to the window's
//! total lift within floating-point tolerance.
//!
//! Confidence grade combines three fixed-threshold components:
//!   (a) signal strength — lift vs the baseline noise scale
//!   (b) overlap penalty — more co-contributors, less certainty per influencer
//!   (c) data completeness — history depth, baseline basis, optional contexts
//! ═══════════════════════════════════════════════════════════════════════════════

use crate::baseline::BaselineBasis;
use crate::detect::LiftWindow;
use crate::model::InfluencerPost;
use crate::timeline::DateRange;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// WEIGHTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Blend and decay constants for the per-post weight function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightConfig {
    /// Share of the blend driven by audience size
    pub audience_blend: f64,
    /// Share of the blend driven by recency within the window
    pub recency_blend: f64,
    /// Hours for the recency score to halve
    pub recency_half_life_hours: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            audience_blend: 0.6,
            recency_blend: 0.4,
            recency_half_life_hours: 6.0,
        }
    }
}

/// Normalized weight per contributing post. Empty input yields empty output;
/// degenerate metrics (all-zero audiences) fall back to equal shares.
/// Invariant: returned weights sum to 1 (within fp tolerance).
pub fn post_weights(
    window: &DateRange,
    posts: &[&InfluencerPost],
    config: &WeightConfig,
) -> Vec<f64> {
    if posts.is_empty() {
        return Vec::new();
    }
    let n = posts.len() as f64;

    let total_audience: f64 = posts.iter().map(|p| p.audience_size as f64).sum();
    let audience_shares: Vec<f64> = if total_audience > 0.0 {
        posts
            .iter()
            .map(|p| p.audience_size as f64 / total_audience)
            .collect()
    } else {
        vec![1.0 / n; posts.len()]
    };

    let recency_scores: Vec<f64> = posts
        .iter()
        .map(|p| {
            let hours = (p.timestamp - window.start).num_minutes() as f64 / 60.0;
            let hours = hours.max(0.0);
            0.5_f64.powf(hours / config.recency_half_life_hours.max(1e-6))
        })
        .collect();
    let total_recency: f64 = recency_scores.iter().sum();
    let recency_shares: Vec<f64> = if total_recency > 0.0 {
        recency_scores.iter().map(|s| s / total_recency).collect()
    } else {
        vec![1.0 / n; posts.len()]
    };

    let blended: Vec<f64> = audience_shares
        .iter()
        .zip(&recency_shares)
        .map(|(a, r)| config.audience_blend * a + config.recency_blend * r)
        .collect();
    let total: f64 = blended.iter().sum();
    blended.iter().map(|w| w / total).collect()
}

/// Proportional split of a total across normalized weights.
/// Invariant: `sum(split) == total` within fp tolerance.
pub fn split_by_weights(total: f64, weights: &[f64]) -> Vec<f64> {
    weights.iter().map(|w| total * w).collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIDENCE
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordinal reliability grade attached to every attribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceGrade {
    Low,
    Medium,
    High,
}

impl ConfidenceGrade {
    pub fn as_ordinal(&self) -> u8 {
        match self {
            ConfidenceGrade::Low => 0,
            ConfidenceGrade::Medium => 1,
            ConfidenceGrade::High => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceGrade::Low => "low",
            ConfidenceGrade::Medium => "medium",
            ConfidenceGrade::High => "high",
        }
    }
}

/// Fixed grading thresholds on the combined score. Stable across runs.
pub const HIGH_CONFIDENCE_SCORE: f64 = 0.60;
pub const MEDIUM_CONFIDENCE_SCORE: f64 = 0.30;
/// Signal z at which the strength component saturates at 1.0
pub const SIGNAL_SATURATION_Z: f64 = 4.0;

/// Inputs to the grade, computed by the engine per window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInputs {
    /// Window lift divided by (scale × √buckets): the residual z-score
    pub signal_z: f64,
    /// Number of posts sharing the window
    pub co_contributors: usize,
    /// Data-completeness score in [0, 1] (see `completeness_score`)
    pub completeness: f64,
}

/// Combined score: strength × overlap penalty × completeness, each in [0, 1]
pub fn confidence_score(inputs: &ConfidenceInputs) -> f64 {
    let strength = (inputs.signal_z.abs() / SIGNAL_SATURATION_Z).min(1.0);
    let overlap_penalty = 1.0 / (inputs.co_contributors.max(1) as f64).sqrt();
    strength * overlap_penalty * inputs.completeness.clamp(0.0, 1.0)
}

/// Grade from the combined score, against fixed documented thresholds
pub fn grade_confidence(inputs: &ConfidenceInputs) -> ConfidenceGrade {
    let score = confidence_score(inputs);
    if score >= HIGH_CONFIDENCE_SCORE {
        ConfidenceGrade::High
    } else if score >= MEDIUM_CONFIDENCE_SCORE {
        ConfidenceGrade::Medium
    } else {
        ConfidenceGrade::Low
    }
}

/// Data-completeness component. Starts at 1.0 and loses fixed penalties for
/// each weak signal source; a sparse baseline caps the achievable grade below
/// High on its own.
pub fn completeness_score(
    basis: BaselineBasis,
    has_promo_context: bool,
    has_paid_media: bool,
) -> f64 {
    let mut score: f64 = 1.0;
    match basis {
        BaselineBasis::Seasonal => {}
        BaselineBasis::Flat => score -= 0.20,
        BaselineBasis::Sparse => score -= 0.50,
    }
    if !has_promo_context {
        score -= 0.10;
    }
    if !has_paid_media {
        score -= 0.25;
    }
    score.max(0.0)
}

// ═══════════════════════════════════════════════════════════════════════════════
// PER-INFLUENCER RESULT
// ═══════════════════════════════════════════════════════════════════════════════

/// Attributed outcome for one influencer across the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluencerAttribution {
    pub influencer: String,
    pub attributed_revenue: f64,
    pub attributed_orders: f64,
    /// Lift percentage of the window(s) this influencer contributed to
    pub lift_pct: f64,
    /// This influencer's share of the combined window weight
    pub weight: f64,
    pub confidence: ConfidenceGrade,
}

/// Split one measured window across its contributing posts.
/// Empty contributor set ⇒ empty result (the window is skipped, not an error).
pub fn attribute_window(
    window: &LiftWindow,
    posts: &[InfluencerPost],
    weight_config: &WeightConfig,
    confidence: ConfidenceGrade,
) -> Vec<InfluencerAttribution> {
    let contributing: Vec<&InfluencerPost> = window
        .contributors
        .iter()
        .filter_map(|&i| posts.get(i))
        .collect();
    if contributing.is_empty() {
        return Vec::new();
    }

    let weights = post_weights(&window.range, &contributing, weight_config);
    let revenue_shares = split_by_weights(window.lift_revenue, &weights);
    let order_shares = split_by_weights(window.lift_orders, &weights);

    contributing
        .iter()
        .enumerate()
        .map(|(i, post)| InfluencerAttribution {
            influencer: post.influencer.clone(),
            attributed_revenue: revenue_shares[i],
            attributed_orders: order_shares[i],
            lift_pct: window.lift_pct,
            weight: weights[i],
            confidence,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, h, 0, 0).unwrap()
    }

    fn post(influencer: &str, hour: u32, audience: u64) -> InfluencerPost {
        InfluencerPost {
            post_id: format!("{influencer}-{hour}"),
            influencer: influencer.to_string(),
            timestamp: ts(hour),
            audience_size: audience,
            engagement_rate: 0.05,
            promo_code: None,
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        let window = DateRange::new(ts(8), ts(20));
        let posts = [post("a", 9, 50_000), post("b", 11, 10_000), post("c", 15, 500)];
        let refs: Vec<&InfluencerPost> = posts.iter().collect();
        let weights = post_weights(&window, &refs, &WeightConfig::default());
        let sum: f64 = weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_larger_audience_draws_larger_share() {
        let window = DateRange::new(ts(8), ts(20));
        // Same timing, 10x audience difference
        let posts = [post("big", 9, 100_000), post("small", 9, 10_000)];
        let refs: Vec<&InfluencerPost> = posts.iter().collect();
        let weights = post_weights(&window, &refs, &WeightConfig::default());
        assert!(weights[0] > weights[1]);
    }

    #[test]
    fn test_earlier_post_draws_larger_share() {
        let window = DateRange::new(ts(8), ts(20));
        // Same audience, 6h apart (one half-life)
        let posts = [post("early", 8, 10_000), post("late", 14, 10_000)];
        let refs: Vec<&InfluencerPost> = posts.iter().collect();
        let weights = post_weights(&window, &refs, &WeightConfig::default());
        assert!(weights[0] > weights[1]);
    }

    #[test]
    fn test_split_70_30() {
        let shares = split_by_weights(1000.0, &[0.7, 0.3]);
        assert!((shares[0] - 700.0).abs() < 1e-9);
        assert!((shares[1] - 300.0).abs() < 1e-9);
        assert!((shares.iter().sum::<f64>() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_audience_falls_back_to_equal_shares() {
        let window = DateRange::new(ts(8), ts(20));
        let posts = [post("a", 9, 0), post("b", 9, 0)];
        let refs: Vec<&InfluencerPost> = posts.iter().collect();
        let weights = post_weights(&window, &refs, &WeightConfig::default());
        assert!((weights[0] - 0.5).abs() < 1e-9);
        assert!((weights[1] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(ConfidenceGrade::High > ConfidenceGrade::Medium);
        assert!(ConfidenceGrade::Medium > ConfidenceGrade::Low);
        assert_eq!(ConfidenceGrade::High.as_str(), "high");
    }

    #[test]
    fn test_strong_clean_signal_grades_high() {
        let inputs = ConfidenceInputs {
            signal_z: 10.0,
            co_contributors: 1,
            completeness: 0.9,
        };
        assert_eq!(grade_confidence(&inputs), ConfidenceGrade::High);
    }

    #[test]
    fn test_overlap_lowers_confidence() {
        let alone = ConfidenceInputs {
            signal_z: 4.0,
            co_contributors: 1,
            completeness: 0.9,
        };
        let crowded = ConfidenceInputs {
            co_contributors: 9,
            ..alone
        };
        assert!(confidence_score(&crowded) < confidence_score(&alone));
    }

    #[test]
    fn test_sparse_baseline_never_high() {
        // Completeness cap from a sparse baseline keeps even a saturated,
        // uncontested signal below the High threshold
        let completeness = completeness_score(BaselineBasis::Sparse, true, true);
        let inputs = ConfidenceInputs {
            signal_z: 100.0,
            co_contributors: 1,
            completeness,
        };
        assert!(grade_confidence(&inputs) < ConfidenceGrade::High);
    }

    #[test]
    fn test_attribute_window_sums_to_total() {
        let window = LiftWindow {
            range: DateRange::new(ts(8), ts(20)),
            contributors: vec![0, 1],
            lift_revenue: 1000.0,
            lift_orders: 40.0,
            lift_pct: 25.0,
            baseline_revenue: 4000.0,
            actual_revenue: 5000.0,
            bucket_count: 12,
            significant: true,
        };
        let posts = vec![post("a", 9, 60_000), post("b", 11, 20_000)];
        let attrs = attribute_window(
            &window,
            &posts,
            &WeightConfig::default(),
            ConfidenceGrade::Medium,
        );
        let revenue: f64 = attrs.iter().map(|a| a.attributed_revenue).sum();
        let orders: f64 = attrs.iter().map(|a| a.attributed_orders).sum();
        assert!((revenue - 1000.0).abs() < 1e-6);
        assert!((orders - 40.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_contributors_skipped() {
        let window = LiftWindow {
            range: DateRange::new(ts(8), ts(20)),
            contributors: vec![],
            lift_revenue: 500.0,
            lift_orders: 10.0,
            lift_pct: 12.0,
            baseline_revenue: 4000.0,
            actual_revenue: 4500.0,
            bucket_count: 12,
            significant: true,
        };
        let attrs = attribute_window(&window, &[], &WeightConfig::default(), ConfidenceGrade::Low);
        assert!(attrs.is_empty());
    }
}
