//! ═══════════════════════════════════════════════════════════════════════════════
//! ADJUST — Momentum & Promotion Baseline Adjusters
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Neutralizing corrections for known, non-influencer demand shifts. Both are
//! pure functions: `adjust(baseline, context, bucket) -> adjusted baseline`.
//!
//! Momentum combination rule (deterministic, order-independent within class):
//! all multiplicative factors covering the bucket compose by product and apply
//! FIRST, then all additive deltas sum and apply. Later-declared configs never
//! override earlier ones.
//! ═══════════════════════════════════════════════════════════════════════════════

use crate::model::{MomentumConfig, PromoContext};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Demand response to a store-wide discount.
/// Expected revenue scales by `1 + gain * discount^exponent`; the exponent
/// below 1 makes the response sub-linear — a 40% discount does not pull twice
/// the demand of a 20% one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoResponse {
    pub gain: f64,
    pub exponent: f64,
}

impl Default for PromoResponse {
    fn default() -> Self {
        Self {
            gain: 0.8,     // A 100% discount would roughly double demand
            exponent: 0.5, // Square-root response curve
        }
    }
}

/// Apply every momentum event covering the bucket: product of multipliers,
/// then sum of additive deltas. Result never drops below zero.
pub fn apply_momentum(
    baseline: f64,
    ts: DateTime<Utc>,
    configs: &[MomentumConfig],
) -> f64 {
    let mut multiplier = 1.0;
    let mut additive = 0.0;
    for cfg in configs.iter().filter(|c| c.range.contains(ts)) {
        multiplier *= cfg.multiplier;
        additive += cfg.additive;
    }
    (baseline * multiplier + additive).max(0.0)
}

/// Raise expected revenue while a store-wide promotion is active
pub fn apply_promo(
    baseline: f64,
    ts: DateTime<Utc>,
    promo: Option<&PromoContext>,
    response: &PromoResponse,
) -> f64 {
    let Some(window) = promo.and_then(|p| p.active_at(ts)) else {
        return baseline;
    };
    let factor = 1.0 + response.gain * window.discount.max(0.0).powf(response.exponent);
    baseline * factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PromoWindow;
    use crate::timeline::DateRange;
    use chrono::TimeZone;

    fn ts(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, d, 0, 0, 0).unwrap()
    }

    fn range(from: u32, to: u32) -> DateRange {
        DateRange::new(ts(from), ts(to))
    }

    #[test]
    fn test_momentum_outside_range_is_identity() {
        let configs = vec![MomentumConfig::multiplicative("bf", range(28, 30), 2.0)];
        assert_eq!(apply_momentum(100.0, ts(5), &configs), 100.0);
    }

    #[test]
    fn test_momentum_multiplicative_before_additive() {
        // Overlapping configs: 1.5x sale and +40 flat event
        let configs = vec![
            MomentumConfig::multiplicative("sale", range(1, 10), 1.5),
            MomentumConfig::additive("launch", range(1, 10), 40.0),
        ];
        // 100 * 1.5 + 40, never (100 + 40) * 1.5
        assert_eq!(apply_momentum(100.0, ts(5), &configs), 190.0);
    }

    #[test]
    fn test_momentum_multipliers_compose_by_product() {
        let configs = vec![
            MomentumConfig::multiplicative("a", range(1, 10), 2.0),
            MomentumConfig::multiplicative("b", range(1, 10), 1.5),
        ];
        assert_eq!(apply_momentum(100.0, ts(5), &configs), 300.0);
    }

    #[test]
    fn test_momentum_declaration_order_irrelevant() {
        let fwd = vec![
            MomentumConfig::multiplicative("a", range(1, 10), 1.3),
            MomentumConfig::additive("b", range(1, 10), 25.0),
        ];
        let rev: Vec<_> = fwd.iter().rev().cloned().collect();
        assert_eq!(
            apply_momentum(200.0, ts(5), &fwd),
            apply_momentum(200.0, ts(5), &rev)
        );
    }

    #[test]
    fn test_momentum_floor_at_zero() {
        let configs = vec![MomentumConfig::additive("refund-wave", range(1, 10), -500.0)];
        assert_eq!(apply_momentum(100.0, ts(5), &configs), 0.0);
    }

    #[test]
    fn test_promo_sublinear_response() {
        let response = PromoResponse::default();
        let promo = |discount: f64| {
            PromoContext::new(vec![PromoWindow {
                range: range(1, 10),
                discount,
            }])
        };

        let at_20 = apply_promo(100.0, ts(5), Some(&promo(0.2)), &response);
        let at_40 = apply_promo(100.0, ts(5), Some(&promo(0.4)), &response);

        assert!(at_20 > 100.0);
        assert!(at_40 > at_20);
        // Sub-linear: doubling the discount less than doubles the uplift
        let uplift_20 = at_20 - 100.0;
        let uplift_40 = at_40 - 100.0;
        assert!(uplift_40 < 2.0 * uplift_20);
    }

    #[test]
    fn test_promo_absent_is_identity() {
        let response = PromoResponse::default();
        assert_eq!(apply_promo(100.0, ts(5), None, &response), 100.0);
    }
}
