//! Time bucketing
//!
//! Maps a granularity and timezone to store-side bucketing expressions and
//! produces the canonical ordered bucket skeleton for a resolved range.
//! The skeleton is the authority for dense output: the store is never
//! trusted to return a row for every bucket.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::timerange::ResolvedRange;

/// Name of the bound timezone parameter shared by every emitted query
pub const TIMEZONE_PARAM: &str = "timezone";

/// The timezone-aware event timestamp expression used uniformly by every
/// query this subsystem emits
pub fn event_time_expr() -> String {
    format!("toTimeZone(e.time, {{{}:String}})", TIMEZONE_PARAM)
}

/// Time granularity for bucketing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Per day
    #[default]
    Day,
    /// Per week (Monday-pinned)
    Week,
    /// Per month
    Month,
}

impl Granularity {
    /// Store-side truncation applied to the event-time expression
    ///
    /// Week truncation is pinned to Monday (mode 1) so bucket labels line
    /// up with the skeleton regardless of server defaults.
    pub fn bucket_expr(&self, time_expr: &str) -> String {
        match self {
            Self::Day => format!("toStartOfDay({})", time_expr),
            Self::Week => format!("toStartOfWeek({}, 1)", time_expr),
            Self::Month => format!("toStartOfMonth({})", time_expr),
        }
    }

    /// Truncate a date to the start of its bucket
    fn truncate(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => date,
            Self::Week => {
                let days_from_monday = date.weekday().num_days_from_monday();
                date - Duration::days(days_from_monday as i64)
            }
            Self::Month => date.with_day(1).unwrap_or(date),
        }
    }

    /// Advance a bucket start to the next bucket
    fn advance(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => date + Duration::days(1),
            Self::Week => date + Duration::days(7),
            Self::Month => {
                let (year, month) = if date.month() == 12 {
                    (date.year() + 1, 1)
                } else {
                    (date.year(), date.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
            }
        }
    }

    /// The lookup key the store will return for a bucket start
    ///
    /// toStartOfDay yields a DateTime, toStartOfWeek/toStartOfMonth yield a
    /// Date; the JSON row formats render them differently.
    fn lookup_key(&self, date: NaiveDate) -> String {
        match self {
            Self::Day => date.format("%Y-%m-%d 00:00:00").to_string(),
            Self::Week | Self::Month => date.format("%Y-%m-%d").to_string(),
        }
    }

    /// Human-readable bucket label
    fn label(&self, date: NaiveDate) -> String {
        match self {
            Self::Day | Self::Week => date.format("%b %-d").to_string(),
            Self::Month => date.format("%b %Y").to_string(),
        }
    }
}

/// One bucket's display label and store lookup key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateHeader {
    /// Display label (e.g. "Jan 3")
    pub label: String,
    /// Key matching the store's bucket column output
    pub lookup_value: String,
}

/// The canonical ordered set of buckets for one request
///
/// Built once per request and shared read-only across every series the
/// request produces; each series copies the zero-default map before
/// overlaying real counts.
#[derive(Debug, Clone)]
pub struct BucketSkeleton {
    headers: Vec<DateHeader>,
    zero_map: BTreeMap<String, f64>,
}

impl BucketSkeleton {
    /// Build the skeleton for a resolved range
    ///
    /// Produces one bucket per granularity step between from and to,
    /// inclusive of partial boundary buckets, with no gaps.
    pub fn build(range: &ResolvedRange, granularity: Granularity) -> Self {
        let mut headers = Vec::new();
        let mut zero_map = BTreeMap::new();

        let mut bucket = granularity.truncate(range.from.date());
        while bucket_start(bucket) < range.to {
            let lookup = granularity.lookup_key(bucket);
            headers.push(DateHeader {
                label: granularity.label(bucket),
                lookup_value: lookup.clone(),
            });
            zero_map.insert(lookup, 0.0);
            bucket = granularity.advance(bucket);
        }

        Self { headers, zero_map }
    }

    /// Ordered display headers
    pub fn headers(&self) -> &[DateHeader] {
        &self.headers
    }

    /// Number of buckets
    pub fn bucket_count(&self) -> usize {
        self.headers.len()
    }

    /// Fresh zero-filled copy for one series to overlay real counts onto
    pub fn zero_map(&self) -> BTreeMap<String, f64> {
        self.zero_map.clone()
    }

    /// Whether a lookup key belongs to this skeleton
    pub fn contains(&self, lookup: &str) -> bool {
        self.zero_map.contains_key(lookup)
    }
}

fn bucket_start(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).expect("midnight is always valid")
}
