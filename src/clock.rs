//! Time-metric resolution.
//!
//! A sentence's time metric (`2 days`, `3 weeks`, `1 month`) names an instant
//! in the past relative to the run's reference time. Second through week are
//! exact offsets; month and year are calendar arithmetic with the day of
//! month clamped, so `March 31st - 1 month` lands on the last day of
//! February.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

use crate::elements::{TimeMetric, TimeUnit};

/// Resolve `metric` to the past instant it names, measured back from `now`.
///
/// The degenerate `time` unit resolves to `now` itself, whatever the
/// coefficient: `every time` means every run.
pub(crate) fn resolve(metric: &TimeMetric, now: NaiveDateTime) -> NaiveDateTime {
    let amount = i64::from(metric.coefficient);
    match metric.unit {
        TimeUnit::Time => now,
        TimeUnit::Second => now - Duration::seconds(amount),
        TimeUnit::Minute => now - Duration::minutes(amount),
        TimeUnit::Hour => now - Duration::hours(amount),
        TimeUnit::Day => now - Duration::days(amount),
        TimeUnit::Week => now - Duration::weeks(amount),
        TimeUnit::Fortnight => now - Duration::weeks(2 * amount),
        TimeUnit::Month => add_months(now, -(metric.coefficient as i32)),
        TimeUnit::Year => add_months(now, -(metric.coefficient as i32) * 12),
    }
}

fn add_months(dt: NaiveDateTime, months: i32) -> NaiveDateTime {
    let base_year = dt.date().year();
    let base_month = dt.date().month() as i32;
    let zero_based = base_month - 1 + months;
    let year = base_year + zero_based.div_euclid(12);
    let month = (zero_based.rem_euclid(12) + 1) as u32;
    let day = dt.date().day().min(days_in_month(year, month));
    let date = NaiveDate::from_ymd_opt(year, month, day).unwrap_or_else(|| dt.date());
    NaiveDateTime::new(date, dt.time())
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    match NaiveDate::from_ymd_opt(next_year, next_month, 1) {
        Some(first_of_next) => (first_of_next - Duration::days(1)).day(),
        None => 31,
    }
}
