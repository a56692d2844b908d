//! ═══════════════════════════════════════════════════════════════════════════════
//! TIMELINE — Calendar Buckets, Date Ranges, Seasonal Keys
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! The engine reasons over two time shapes:
//! - Buckets: fixed-size slots (one day or one hour) carrying revenue/orders
//! - Ranges: half-open [start, end) intervals for momentum events, promos,
//!   paid-media flights, and detection windows
//!
//! Half-open ranges make adjacency unambiguous: a promo ending at midnight and
//! one starting at midnight do not overlap.
//! ═══════════════════════════════════════════════════════════════════════════════

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// GRANULARITY — Bucket size of a commerce series
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    /// One bucket per calendar day
    Daily,
    /// One bucket per hour
    Hourly,
}

impl Granularity {
    /// Length of one bucket
    pub fn bucket_duration(&self) -> Duration {
        match self {
            Granularity::Daily => Duration::days(1),
            Granularity::Hourly => Duration::hours(1),
        }
    }

    /// Seasonal key for a bucket timestamp.
    /// Daily series repeat weekly (weekday), hourly series repeat weekly with
    /// intraday structure (weekday × hour).
    pub fn seasonal_key(&self, ts: DateTime<Utc>) -> SeasonalKey {
        let weekday = ts.weekday().num_days_from_monday() as u8;
        match self {
            Granularity::Daily => SeasonalKey {
                weekday,
                hour: None,
            },
            Granularity::Hourly => SeasonalKey {
                weekday,
                hour: Some(ts.hour() as u8),
            },
        }
    }

    /// Number of distinct seasonal keys in one full cycle
    pub fn cycle_len(&self) -> usize {
        match self {
            Granularity::Daily => 7,
            Granularity::Hourly => 7 * 24,
        }
    }
}

/// Position of a bucket in the weekly seasonality cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeasonalKey {
    /// 0 = Monday .. 6 = Sunday
    pub weekday: u8,
    /// Hour of day for hourly series, None for daily
    pub hour: Option<u8>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// DATE RANGE — Half-open [start, end) interval
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// A range is well-formed when it spans a positive duration
    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }

    /// Does this range contain the instant? [start, end)
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Do two half-open ranges share any instant?
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Smallest range covering both
    pub fn union(&self, other: &DateRange) -> DateRange {
        DateRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Number of buckets of the given granularity whose start falls inside
    pub fn bucket_count(&self, granularity: Granularity) -> usize {
        let bucket = granularity.bucket_duration().num_seconds();
        let span = (self.end - self.start).num_seconds();
        if span <= 0 || bucket <= 0 {
            return 0;
        }
        // Ceiling division; both operands are positive past the guard
        ((span + bucket - 1) / bucket) as usize
    }
}

/// Index of a bucket timestamp relative to a series origin, in bucket units.
/// May be negative (before origin) or beyond the series end (trend
/// extrapolation at prediction time).
pub fn bucket_index(origin: DateTime<Utc>, ts: DateTime<Utc>, granularity: Granularity) -> f64 {
    let bucket_secs = granularity.bucket_duration().num_seconds() as f64;
    (ts - origin).num_seconds() as f64 / bucket_secs
}
