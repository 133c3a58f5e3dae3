//! The trailing recency window every scraped document must fall into.
//!
//! All timestamps are compared as instants, so a site's naive local time is
//! pinned to that site's UTC offset (see [`crate::dates`]) before it gets
//! here.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Default window length, in days.
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// A fixed reference time plus a window length.
///
/// The reference time is captured once per run so every source is judged
/// against the same clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutoffWindow {
    now: DateTime<Utc>,
    length: Duration,
}

impl CutoffWindow {
    pub fn new(now: DateTime<Utc>, window_days: i64) -> Self {
        Self {
            now,
            length: Duration::days(window_days),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Earliest in-window instant.
    pub fn start(&self) -> DateTime<Utc> {
        self.now - self.length
    }

    pub fn days(&self) -> i64 {
        self.length.num_days()
    }

    /// True iff `now - candidate <= window`. A timestamp exactly one window
    /// old is still in; future timestamps are in.
    pub fn contains<Tz: TimeZone>(&self, candidate: &DateTime<Tz>) -> bool {
        in_window(candidate, self.now, self.days())
    }
}

/// `now - candidate <= window_days`, compared as instants.
pub fn in_window<Tz: TimeZone>(
    candidate: &DateTime<Tz>,
    now: DateTime<Utc>,
    window_days: i64,
) -> bool {
    now.signed_duration_since(candidate) <= Duration::days(window_days)
}
