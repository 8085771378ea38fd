//! Weekly evaluation.
//!
//! Weeks run Sunday through Saturday. The next candidate is the earliest
//! selected weekday later in the anchor's own week; once the week is used up
//! the series jumps `interval` whole weeks and restarts at the earliest
//! selected weekday. With `{Mon, Fri}` every 2 weeks that gives
//! Mon, Fri, (skip a week), Mon, Fri, ...: interval counts weeks, not gaps
//! between individual selected days.

use chrono::{Datelike, Days, NaiveDate};

use crate::models::{Interval, WeekdaySet};

pub fn next_candidate(anchor: NaiveDate, days: &WeekdaySet, interval: Interval) -> NaiveDate {
    let offset = anchor.weekday().num_days_from_sunday();

    let later_this_week = days
        .iter()
        .map(|weekday| weekday.num_days_from_sunday())
        .find(|&ordinal| ordinal > offset);

    let ahead = match later_this_week {
        Some(ordinal) => (ordinal - offset) as u64,
        None => {
            let first = days.first().num_days_from_sunday() as u64;
            7 * interval.get() as u64 - offset as u64 + first
        }
    };

    anchor
        .checked_add_days(Days::new(ahead))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn set(days: &[Weekday]) -> WeekdaySet {
        WeekdaySet::from_weekdays(days.iter().copied()).unwrap()
    }

    #[test]
    fn test_next_selected_day_in_same_week() {
        // 2024-01-01 is a Monday.
        let days = set(&[Weekday::Mon, Weekday::Wed, Weekday::Fri]);
        assert_eq!(next_candidate(ymd(2024, 1, 1), &days, Interval::ONE), ymd(2024, 1, 3));
        assert_eq!(next_candidate(ymd(2024, 1, 3), &days, Interval::ONE), ymd(2024, 1, 5));
    }

    #[test]
    fn test_wraps_to_next_week() {
        let days = set(&[Weekday::Mon, Weekday::Wed, Weekday::Fri]);
        // Friday -> following Monday
        assert_eq!(next_candidate(ymd(2024, 1, 5), &days, Interval::ONE), ymd(2024, 1, 8));
        // Saturday, nothing left this week
        assert_eq!(next_candidate(ymd(2024, 1, 6), &days, Interval::ONE), ymd(2024, 1, 8));
    }

    #[test]
    fn test_interval_skips_whole_weeks() {
        let days = set(&[Weekday::Mon, Weekday::Fri]);
        let every_two = Interval::new(2).unwrap();

        // Mon -> Fri of the same week, interval does not apply inside a week
        assert_eq!(next_candidate(ymd(2024, 1, 1), &days, every_two), ymd(2024, 1, 5));
        // Fri -> Mon two weeks after the week start
        assert_eq!(next_candidate(ymd(2024, 1, 5), &days, every_two), ymd(2024, 1, 15));
    }

    #[test]
    fn test_single_day_same_weekday_as_anchor() {
        let days = set(&[Weekday::Tue]);
        // 2024-01-02 is a Tuesday
        assert_eq!(next_candidate(ymd(2024, 1, 2), &days, Interval::ONE), ymd(2024, 1, 9));
        assert_eq!(
            next_candidate(ymd(2024, 1, 2), &days, Interval::new(3).unwrap()),
            ymd(2024, 1, 23)
        );
    }

    #[test]
    fn test_sunday_is_start_of_week() {
        let days = set(&[Weekday::Sun, Weekday::Sat]);
        // Sunday 2024-01-07 -> Saturday of the same week
        assert_eq!(next_candidate(ymd(2024, 1, 7), &days, Interval::ONE), ymd(2024, 1, 13));
        // Saturday -> Sunday starting the next week
        assert_eq!(next_candidate(ymd(2024, 1, 13), &days, Interval::ONE), ymd(2024, 1, 14));
    }

    #[test]
    fn test_anchor_off_pattern_day() {
        let days = set(&[Weekday::Mon]);
        // Wednesday anchor, next Monday
        assert_eq!(next_candidate(ymd(2024, 1, 3), &days, Interval::ONE), ymd(2024, 1, 8));
    }
}
