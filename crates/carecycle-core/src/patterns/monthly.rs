//! Monthly evaluation, in both day-of-month and nth-weekday form.
//!
//! The target month is always the anchor's month plus `interval`, whatever
//! day of the month the anchor falls on.
//!
//! Clamp policy:
//! - a day-of-month the target month lacks (the 31st in April, the 30th in
//!   February) resolves to that month's last day;
//! - an nth weekday the target month lacks (a 5th Monday) resolves to the
//!   last instance of that weekday in the month.
//!
//! Neither case rolls into the following month.

use chrono::{Datelike, NaiveDate, Weekday};

use super::{clamped_date, days_in_month, shift_month};
use crate::models::{DayOfMonth, Interval, NthOccurrence};

pub fn next_on_day(anchor: NaiveDate, day: DayOfMonth, interval: Interval) -> NaiveDate {
    match shift_month(anchor, interval.get()) {
        Some((year, month)) => clamped_date(year, month, day.get() as u32),
        None => NaiveDate::MAX,
    }
}

pub fn next_nth_weekday(
    anchor: NaiveDate,
    nth: NthOccurrence,
    weekday: Weekday,
    interval: Interval,
) -> NaiveDate {
    match shift_month(anchor, interval.get()) {
        Some((year, month)) => nth_weekday_of_month(year, month, nth, weekday),
        None => NaiveDate::MAX,
    }
}

/// The `nth` `weekday` of the month, or its last instance when the month has
/// fewer than `nth`.
pub fn nth_weekday_of_month(year: i32, month: u32, nth: NthOccurrence, weekday: Weekday) -> NaiveDate {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return NaiveDate::MAX;
    };
    let lead = (7 + weekday.num_days_from_sunday() - first.weekday().num_days_from_sunday()) % 7;
    let mut day = 1 + lead + 7 * (nth.get() as u32 - 1);
    if day > days_in_month(year, month) {
        // Every month has at least four of each weekday.
        day -= 7;
    }
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dom(day: u8) -> DayOfMonth {
        DayOfMonth::new(day).unwrap()
    }

    fn nth(n: u8) -> NthOccurrence {
        NthOccurrence::new(n).unwrap()
    }

    mod day_of_month_tests {
        use super::*;

        #[test]
        fn test_31st_clamps_to_leap_february() {
            assert_eq!(next_on_day(ymd(2024, 1, 31), dom(31), Interval::ONE), ymd(2024, 2, 29));
        }

        #[rstest]
        #[case(ymd(2023, 1, 31), 31, 1, ymd(2023, 2, 28))]
        #[case(ymd(2024, 3, 31), 31, 1, ymd(2024, 4, 30))]
        #[case(ymd(2024, 2, 29), 31, 1, ymd(2024, 3, 31))]
        #[case(ymd(2024, 1, 15), 30, 1, ymd(2024, 2, 29))]
        #[case(ymd(2024, 1, 15), 15, 3, ymd(2024, 4, 15))]
        #[case(ymd(2024, 11, 5), 5, 2, ymd(2025, 1, 5))]
        fn test_day_of_month_cases(
            #[case] anchor: NaiveDate,
            #[case] day: u8,
            #[case] interval: u32,
            #[case] expected: NaiveDate,
        ) {
            assert_eq!(next_on_day(anchor, dom(day), Interval::new(interval).unwrap()), expected);
        }

        #[test]
        fn test_clamp_does_not_stick_after_short_month() {
            // Feb's clamped 29th does not carry into March.
            let interval = Interval::ONE;
            let feb = next_on_day(ymd(2024, 1, 31), dom(31), interval);
            let mar = next_on_day(feb, dom(31), interval);
            assert_eq!(mar, ymd(2024, 3, 31));
        }

        #[test]
        fn test_anchor_day_is_ignored_in_favor_of_rule_day() {
            // Anchored on the 3rd of a 10th-of-month rule: still next month.
            assert_eq!(next_on_day(ymd(2024, 5, 3), dom(10), Interval::ONE), ymd(2024, 6, 10));
        }
    }

    mod nth_weekday_tests {
        use super::*;

        #[test]
        fn test_second_tuesday() {
            // February 2024 starts on a Thursday; 2nd Tuesday is the 13th.
            assert_eq!(
                next_nth_weekday(ymd(2024, 1, 9), nth(2), Weekday::Tue, Interval::ONE),
                ymd(2024, 2, 13)
            );
        }

        #[test]
        fn test_first_weekday_when_month_starts_on_it() {
            // September 2024 starts on a Sunday.
            assert_eq!(nth_weekday_of_month(2024, 9, nth(1), Weekday::Sun), ymd(2024, 9, 1));
        }

        #[test]
        fn test_fifth_monday_exists() {
            // April 2024 has Mondays 1, 8, 15, 22, 29.
            assert_eq!(nth_weekday_of_month(2024, 4, nth(5), Weekday::Mon), ymd(2024, 4, 29));
        }

        #[test]
        fn test_missing_fifth_monday_falls_back_to_last() {
            // February 2024 Mondays: 5, 12, 19, 26.
            assert_eq!(
                next_nth_weekday(ymd(2024, 1, 29), nth(5), Weekday::Mon, Interval::ONE),
                ymd(2024, 2, 26)
            );
        }

        #[test]
        fn test_interval_spans_year() {
            // 3rd Friday, every 6 months from October 2024 -> April 2025 (Apr 18).
            assert_eq!(
                next_nth_weekday(ymd(2024, 10, 18), nth(3), Weekday::Fri, Interval::new(6).unwrap()),
                ymd(2025, 4, 18)
            );
        }
    }
}
