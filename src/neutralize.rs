//! ═══════════════════════════════════════════════════════════════════════════════
//! NEUTRALIZE — Paid-Media Lift Discounting (Full Model Only)
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Ad spend concurrent with an influencer post would otherwise be read as
//! influencer lift. The neutralizer raises the adjusted baseline by a
//! diminishing-returns factor in per-bucket spend, so only revenue beyond
//! what the ads explain survives into lift detection.
//!
//! No `PaidMediaContext` ⇒ identity. The simplified engine always takes the
//! identity path.
//! ═══════════════════════════════════════════════════════════════════════════════

use crate::model::PaidMediaContext;
use crate::timeline::Granularity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Diminishing-returns curve for ad-driven demand:
/// `factor = 1 + beta * ln(1 + spend_per_bucket / spend_scale)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaidMediaResponse {
    /// Strength of the ad response
    pub beta: f64,
    /// Spend (currency units per bucket) at which returns start flattening
    pub spend_scale: f64,
}

impl Default for PaidMediaResponse {
    fn default() -> Self {
        Self {
            beta: 0.25,
            spend_scale: 100.0,
        }
    }
}

/// Discount the adjusted baseline upward for concurrent ad spend.
/// Pure; identity when no context covers the bucket.
pub fn neutralize_paid_media(
    baseline: f64,
    ts: DateTime<Utc>,
    granularity: Granularity,
    paid: Option<&PaidMediaContext>,
    response: &PaidMediaResponse,
) -> f64 {
    let Some(paid) = paid else {
        return baseline;
    };
    let spend = paid.spend_for_bucket(ts, granularity);
    if spend <= 0.0 {
        return baseline;
    }
    let factor = 1.0 + response.beta * (1.0 + spend / response.spend_scale).ln();
    baseline * factor
}
