//! Pattern evaluators: one pure `next_candidate` function per pattern type.
//!
//! Every evaluator is total. Dates that do not exist in the target month or
//! year are resolved by clamping (see each submodule), and arithmetic that
//! would leave chrono's representable range saturates to [`NaiveDate::MAX`].

use chrono::{Datelike, NaiveDate};

use crate::models::{Interval, MonthlyPattern, Pattern, RecurrenceRule};

pub mod daily;
pub mod monthly;
pub mod weekly;
pub mod yearly;

impl Pattern {
    /// The first date strictly after `anchor` produced by this pattern.
    ///
    /// Strictly-after holds only while that date is representable: when the
    /// step would pass `NaiveDate::MAX` the result saturates to `NaiveDate::MAX`,
    /// which equals the anchor once the anchor is `NaiveDate::MAX` itself.
    pub fn next_candidate(&self, anchor: NaiveDate, interval: Interval) -> NaiveDate {
        match self {
            Pattern::Daily => daily::next_candidate(anchor, interval),
            Pattern::Weekly { days } => weekly::next_candidate(anchor, days, interval),
            Pattern::Monthly(MonthlyPattern::DayOfMonth { day }) => {
                monthly::next_on_day(anchor, *day, interval)
            }
            Pattern::Monthly(MonthlyPattern::NthWeekday { nth, weekday }) => {
                monthly::next_nth_weekday(anchor, *nth, *weekday, interval)
            }
            Pattern::Yearly(month_day) => yearly::next_candidate(anchor, *month_day, interval),
        }
    }
}

/// Evaluates `rule`'s pattern from `anchor`.
#[inline]
pub fn next_candidate(anchor: NaiveDate, rule: &RecurrenceRule) -> NaiveDate {
    rule.pattern().next_candidate(anchor, rule.interval())
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` (1-12) of `year`.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// `(year, month)` of the month `months` after `date`'s month.
pub(crate) fn shift_month(date: NaiveDate, months: u32) -> Option<(i32, u32)> {
    let index = date.year() as i64 * 12 + date.month0() as i64 + months as i64;
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = index.rem_euclid(12) as u32 + 1;
    Some((year, month))
}

/// `year-month-day`, with `day` clamped to the last day of that month.
pub(crate) fn clamped_date(year: i32, month: u32, day: u32) -> NaiveDate {
    let day = day.min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MAX)
}
