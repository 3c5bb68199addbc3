//! Time range types and resolution
//!
//! A request carries either an explicit date pair or a relative/rolling
//! range. Either way it is resolved exactly once, before query
//! construction, into a concrete half-open `[from, to)` interval of
//! wall-clock datetimes in the caller's timezone. Timezone conversion of
//! stored event timestamps is delegated to the store, so the resolved
//! endpoints stay naive.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{InsightError, Result};

/// A requested time range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimeRange {
    /// Explicit date pair, both days included
    Explicit {
        /// First day of the range
        from: NaiveDate,
        /// Last day of the range (inclusive)
        to: NaiveDate,
    },
    /// Today so far
    Today,
    /// All of yesterday
    Yesterday,
    /// Rolling 7 days ending today
    Last7Days,
    /// Rolling 30 days ending today
    Last30Days,
    /// Rolling 90 days ending today
    Last90Days,
    /// Rolling 6 calendar months ending today
    Last6Months,
    /// Rolling 12 calendar months ending today
    Last12Months,
    /// From the first of the current month
    MonthToDate,
    /// From January 1st of the current year
    YearToDate,
}

/// A resolved half-open `[from, to)` interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    /// Start, inclusive
    pub from: NaiveDateTime,
    /// End, exclusive
    pub to: NaiveDateTime,
}

impl TimeRange {
    /// Resolve into a concrete interval
    ///
    /// `now` is the current wall-clock datetime in the caller's timezone.
    pub fn resolve(&self, now: NaiveDateTime) -> Result<ResolvedRange> {
        let today = now.date();
        let tomorrow_start = start_of_day(today + Duration::days(1));

        let range = match self {
            TimeRange::Explicit { from, to } => {
                if to < from {
                    return Err(InsightError::InvalidTimeRange(
                        "end must not be before start".to_string(),
                    ));
                }
                ResolvedRange {
                    from: start_of_day(*from),
                    to: start_of_day(*to + Duration::days(1)),
                }
            }
            TimeRange::Today => ResolvedRange {
                from: start_of_day(today),
                to: tomorrow_start,
            },
            TimeRange::Yesterday => ResolvedRange {
                from: start_of_day(today - Duration::days(1)),
                to: start_of_day(today),
            },
            TimeRange::Last7Days => rolling_days(today, 7),
            TimeRange::Last30Days => rolling_days(today, 30),
            TimeRange::Last90Days => rolling_days(today, 90),
            TimeRange::Last6Months => ResolvedRange {
                from: start_of_day(shift_months(today, -6)),
                to: tomorrow_start,
            },
            TimeRange::Last12Months => ResolvedRange {
                from: start_of_day(shift_months(today, -12)),
                to: tomorrow_start,
            },
            TimeRange::MonthToDate => ResolvedRange {
                from: start_of_day(today.with_day(1).unwrap_or(today)),
                to: tomorrow_start,
            },
            TimeRange::YearToDate => ResolvedRange {
                from: start_of_day(
                    NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
                ),
                to: tomorrow_start,
            },
        };

        Ok(range)
    }
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).expect("midnight is always valid")
}

/// Rolling window of `days` calendar days, today included
fn rolling_days(today: NaiveDate, days: i64) -> ResolvedRange {
    ResolvedRange {
        from: start_of_day(today - Duration::days(days - 1)),
        to: start_of_day(today + Duration::days(1)),
    }
}

/// Shift a date by calendar months, clamping to the last day of the month
/// when the target day does not exist
fn shift_months(date: NaiveDate, months: i32) -> NaiveDate {
    let total_months = date.month() as i32 + months;
    let year_delta = if total_months <= 0 {
        (total_months - 12) / 12
    } else {
        (total_months - 1) / 12
    };

    let new_year = date.year() + year_delta;
    let new_month = ((total_months - 1).rem_euclid(12) + 1) as u32;

    NaiveDate::from_ymd_opt(new_year, new_month, date.day())
        .or_else(|| last_day_of_month(new_year, new_month))
        .unwrap_or(date)
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next_month.map(|d| d - Duration::days(1))
}
