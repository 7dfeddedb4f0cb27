// File: crates/chart-pipeline/src/bucket.rs
// Summary: Calendar bucket functions (day, Monday-start week, month) used to group time keys.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Calendar granularity of a bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    /// ISO week, starting on Monday.
    Week,
    Month,
}

/// A partition of the time axis into contiguous buckets.
///
/// Contract:
/// - `floor(floor(t)) == floor(t)`
/// - `next_floor(t) > floor(t)`, and equals `floor(t)` advanced by one bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeBucket {
    granularity: Granularity,
}

impl TimeBucket {
    pub const DAY: TimeBucket = TimeBucket { granularity: Granularity::Day };
    pub const WEEK: TimeBucket = TimeBucket { granularity: Granularity::Week };
    pub const MONTH: TimeBucket = TimeBucket { granularity: Granularity::Month };

    pub const fn new(granularity: Granularity) -> Self { Self { granularity } }

    pub const fn granularity(&self) -> Granularity { self.granularity }

    /// Start of the bucket containing `t`.
    pub fn floor(&self, t: NaiveDateTime) -> NaiveDateTime {
        let date = t.date();
        let start = match self.granularity {
            Granularity::Day => date,
            Granularity::Week => date - Duration::days(date.weekday().num_days_from_monday() as i64),
            Granularity::Month => date.with_day(1).unwrap_or(date),
        };
        midnight(start)
    }

    /// Start of the bucket after the one containing `t`.
    pub fn next_floor(&self, t: NaiveDateTime) -> NaiveDateTime {
        let start = self.floor(t);
        match self.granularity {
            Granularity::Day => start + Duration::days(1),
            Granularity::Week => start + Duration::days(7),
            Granularity::Month => start
                .checked_add_months(Months::new(1))
                .unwrap_or(NaiveDateTime::MAX),
        }
    }

    /// Nominal length of one bucket, measured from the 1970-01-01 epoch.
    /// Month length varies, so use this for heuristics only.
    pub fn size(&self) -> Duration {
        let epoch = midnight(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default());
        let after_epoch = epoch + Duration::milliseconds(1);
        self.next_floor(after_epoch) - self.floor(epoch)
    }

    /// Bucket starts from `floor(from)` up to and including `floor(to)`.
    pub fn range(&self, from: NaiveDateTime, to: NaiveDateTime) -> Vec<NaiveDateTime> {
        let mut out = Vec::new();
        let mut b = self.floor(from);
        let last = self.floor(to);
        while b <= last {
            out.push(b);
            b = self.next_floor(b);
        }
        out
    }
}

impl From<Granularity> for TimeBucket {
    fn from(g: Granularity) -> Self { Self::new(g) }
}

/// Bucket functions for `granularities`, in the given order.
pub fn time_buckets(granularities: &[Granularity]) -> Vec<TimeBucket> {
    granularities.iter().copied().map(TimeBucket::new).collect()
}

/// Day, week, month: the default grouping choices.
pub fn default_time_buckets() -> Vec<TimeBucket> {
    time_buckets(&[Granularity::Day, Granularity::Week, Granularity::Month])
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap_or_default()
}
