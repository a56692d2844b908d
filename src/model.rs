//! ═══════════════════════════════════════════════════════════════════════════════
//! MODEL — Commerce & Social Value Objects
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Everything the engine consumes, fully resolved into memory before a run:
//! - Commerce series (revenue/orders per bucket, with per-promo-code slices)
//! - Known demand context (momentum events, store-wide promos, paid media)
//! - Social events (influencer posts with audience metrics)
//!
//! `AttributionInput` is the aggregate root. It is constructed fresh per run,
//! validated once, and never mutated during computation.
//! ═══════════════════════════════════════════════════════════════════════════════

use crate::error::ValidationError;
use crate::timeline::{DateRange, Granularity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// COMMERCE SERIES
// ═══════════════════════════════════════════════════════════════════════════════

/// Revenue booked under one promo code within a bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoCodeUsage {
    pub code: String,
    pub revenue: f64,
    pub orders: u32,
}

/// One bucket (calendar day or hour) of commerce activity. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyData {
    /// Bucket start timestamp
    pub timestamp: DateTime<Utc>,
    pub revenue: f64,
    pub orders: u32,
    /// Per-code slices of this bucket's revenue (direct attribution signal)
    #[serde(default)]
    pub code_usage: Vec<PromoCodeUsage>,
}

impl DailyData {
    pub fn new(timestamp: DateTime<Utc>, revenue: f64, orders: u32) -> Self {
        Self {
            timestamp,
            revenue,
            orders,
            code_usage: Vec::new(),
        }
    }

    pub fn with_code_usage(mut self, usage: PromoCodeUsage) -> Self {
        self.code_usage.push(usage);
        self
    }
}

/// An ordered series of commerce buckets at one granularity.
/// Invariant (checked by `validate`): chronologically sorted, no duplicate
/// timestamps, no negative revenue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalData {
    buckets: Vec<DailyData>,
    granularity: Granularity,
}

impl HistoricalData {
    pub fn new(buckets: Vec<DailyData>, granularity: Granularity) -> Self {
        Self {
            buckets,
            granularity,
        }
    }

    pub fn buckets(&self) -> &[DailyData] {
        &self.buckets
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.buckets.first().map(|b| b.timestamp)
    }

    /// End of the series: last bucket start plus one bucket
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.buckets
            .last()
            .map(|b| b.timestamp + self.granularity.bucket_duration())
    }

    /// Check ordering, duplicates, and revenue sign. `series` names the series
    /// in error messages ("history" / "observed").
    pub fn validate(&self, series: &'static str) -> Result<(), ValidationError> {
        for (i, bucket) in self.buckets.iter().enumerate() {
            if bucket.revenue < 0.0 {
                return Err(ValidationError::NegativeRevenue {
                    timestamp: bucket.timestamp,
                    revenue: bucket.revenue,
                });
            }
            if i > 0 {
                let prev = self.buckets[i - 1].timestamp;
                if bucket.timestamp == prev {
                    return Err(ValidationError::DuplicateTimestamp { series, index: i });
                }
                if bucket.timestamp < prev {
                    return Err(ValidationError::UnsortedSeries { series, index: i });
                }
            }
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEMAND CONTEXT — Known non-influencer effects
// ═══════════════════════════════════════════════════════════════════════════════

/// A known calendar-driven demand event (sale, holiday). Multiple configs may
/// cover the same instant; the adjuster composes them (product of multipliers,
/// then sum of additive deltas).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumConfig {
    pub name: String,
    pub range: DateRange,
    /// Multiplicative demand factor (1.0 = neutral)
    pub multiplier: f64,
    /// Additive revenue delta per bucket (0.0 = neutral)
    pub additive: f64,
}

impl MomentumConfig {
    pub fn multiplicative(name: impl Into<String>, range: DateRange, multiplier: f64) -> Self {
        Self {
            name: name.into(),
            range,
            multiplier,
            additive: 0.0,
        }
    }

    pub fn additive(name: impl Into<String>, range: DateRange, additive: f64) -> Self {
        Self {
            name: name.into(),
            range,
            multiplier: 1.0,
            additive,
        }
    }
}

/// One store-wide promotion window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoWindow {
    pub range: DateRange,
    /// Discount magnitude in [0, 1): 0.2 = 20% off
    pub discount: f64,
}

/// Store-wide promotion schedule. Invariant: windows are mutually disjoint —
/// at most one promotion active per instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromoContext {
    pub windows: Vec<PromoWindow>,
}

impl PromoContext {
    pub fn new(windows: Vec<PromoWindow>) -> Self {
        Self { windows }
    }

    /// The promotion active at an instant, if any
    pub fn active_at(&self, ts: DateTime<Utc>) -> Option<&PromoWindow> {
        self.windows.iter().find(|w| w.range.contains(ts))
    }
}

/// Paid-advertising flight: spend and impressions over a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaidMediaWindow {
    pub range: DateRange,
    pub spend: f64,
    pub impressions: u64,
}

/// Paid-media schedule, consumed only by the full model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaidMediaContext {
    pub windows: Vec<PaidMediaWindow>,
}

impl PaidMediaContext {
    pub fn new(windows: Vec<PaidMediaWindow>) -> Self {
        Self { windows }
    }

    /// Spend allocated to one bucket: each flight's spend spread uniformly
    /// across the buckets its range covers.
    pub fn spend_for_bucket(&self, ts: DateTime<Utc>, granularity: Granularity) -> f64 {
        self.windows
            .iter()
            .filter(|w| w.range.contains(ts))
            .map(|w| {
                let n = w.range.bucket_count(granularity).max(1) as f64;
                w.spend / n
            })
            .sum()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SOCIAL EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// One influencer post or story. Many may exist per influencer and per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluencerPost {
    /// Stable identity of the post itself
    pub post_id: String,
    /// Owning influencer identity
    pub influencer: String,
    pub timestamp: DateTime<Utc>,
    pub audience_size: u64,
    /// Engagement fraction of audience (likes+comments / audience)
    pub engagement_rate: f64,
    /// Promo code dedicated to this influencer, if the merchant issued one
    pub promo_code: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATTRIBUTION INPUT — The aggregate root
// ═══════════════════════════════════════════════════════════════════════════════

/// Immutable snapshot of everything one attribution run consumes.
/// `history` is the pre-campaign lookback used only for baseline estimation;
/// `observed` is the campaign-period series the detector compares against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionInput {
    pub history: HistoricalData,
    pub observed: HistoricalData,
    pub momentum: Vec<MomentumConfig>,
    pub promo: Option<PromoContext>,
    pub paid_media: Option<PaidMediaContext>,
    pub posts: Vec<InfluencerPost>,
}

impl AttributionInput {
    /// Full input-contract check. Called by both engine entry points before
    /// any computation; errors are surfaced, never corrected.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.history.is_empty() {
            return Err(ValidationError::EmptyHistory);
        }
        self.history.validate("history")?;
        self.observed.validate("observed")?;

        if self.history.granularity() != self.observed.granularity() {
            return Err(ValidationError::GranularityMismatch);
        }

        // Observed campaign window must not reach back into the lookback,
        // otherwise the baseline would be trained on its own evaluation data.
        if let (Some(history_end), Some(observed_start)) = (self.history.end(), self.observed.start())
        {
            if observed_start < history_end {
                return Err(ValidationError::ObservedPrecedesHistory);
            }
        }

        for m in &self.momentum {
            if !m.range.is_valid() {
                return Err(ValidationError::InvertedRange {
                    name: m.name.clone(),
                });
            }
        }

        if let Some(promo) = &self.promo {
            for (i, w) in promo.windows.iter().enumerate() {
                if !w.range.is_valid() {
                    return Err(ValidationError::InvertedRange {
                        name: format!("promo window {i}"),
                    });
                }
                if !(0.0..1.0).contains(&w.discount) {
                    return Err(ValidationError::InvalidDiscount { value: w.discount });
                }
                for other in &promo.windows[i + 1..] {
                    if w.range.overlaps(&other.range) {
                        return Err(ValidationError::OverlappingPromoWindows {
                            timestamp: w.range.start.max(other.range.start),
                        });
                    }
                }
            }
        }

        if let Some(paid) = &self.paid_media {
            for (i, w) in paid.windows.iter().enumerate() {
                if !w.range.is_valid() {
                    return Err(ValidationError::InvertedRange {
                        name: format!("paid media window {i}"),
                    });
                }
            }
        }

        Ok(())
    }
}
