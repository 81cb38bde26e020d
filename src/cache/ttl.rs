//! TTL Module
//!
//! Relative lifetimes supplied by callers, normalized to whole seconds.

use std::time::{Duration, SystemTime};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

// == Interval ==
/// Calendar-style duration. A month counts as 30 days, a year as 365.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Interval {
    pub years: i64,
    pub months: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Interval {
    /// Total length in seconds.
    pub fn as_seconds(&self) -> i64 {
        self.years
            .saturating_mul(YEAR)
            .saturating_add(self.months.saturating_mul(MONTH))
            .saturating_add(self.days.saturating_mul(DAY))
            .saturating_add(self.hours.saturating_mul(HOUR))
            .saturating_add(self.minutes.saturating_mul(MINUTE))
            .saturating_add(self.seconds)
    }
}

// == Ttl ==
/// How long a written entry stays fresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Ttl {
    /// Entry does not expire
    #[default]
    Never,
    /// Entry expires after this many seconds; zero or less means never
    Seconds(i64),
    /// Entry expires after a calendar-style interval
    Interval(Interval),
}

impl Ttl {
    /// Normalized lifetime in seconds, or `None` if the entry never expires.
    pub fn as_seconds(&self) -> Option<u64> {
        let secs = match self {
            Ttl::Never => return None,
            Ttl::Seconds(secs) => *secs,
            Ttl::Interval(interval) => interval.as_seconds(),
        };
        if secs <= 0 {
            None
        } else {
            Some(secs as u64)
        }
    }

    /// Absolute expiry instant measured from `now`, or `None` for never.
    pub fn expires_at(&self, now: SystemTime) -> Option<SystemTime> {
        self.as_seconds()
            .and_then(|secs| now.checked_add(Duration::from_secs(secs)))
    }
}

impl From<i64> for Ttl {
    fn from(secs: i64) -> Self {
        Ttl::Seconds(secs)
    }
}

impl From<u64> for Ttl {
    fn from(secs: u64) -> Self {
        Ttl::Seconds(i64::try_from(secs).unwrap_or(i64::MAX))
    }
}

impl From<Duration> for Ttl {
    fn from(duration: Duration) -> Self {
        Ttl::from(duration.as_secs())
    }
}

impl From<chrono::Duration> for Ttl {
    fn from(duration: chrono::Duration) -> Self {
        Ttl::Seconds(duration.num_seconds())
    }
}

impl From<Interval> for Ttl {
    fn from(interval: Interval) -> Self {
        Ttl::Interval(interval)
    }
}
