use chrono::{Days, NaiveDate};

use crate::models::Interval;

/// `anchor + interval` days.
pub fn next_candidate(anchor: NaiveDate, interval: Interval) -> NaiveDate {
    anchor
        .checked_add_days(Days::new(interval.get() as u64))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_every_other_day_sequence() {
        let interval = Interval::new(2).unwrap();
        let first = next_candidate(ymd(2024, 1, 1), interval);
        let second = next_candidate(first, interval);
        let third = next_candidate(second, interval);

        assert_eq!(first, ymd(2024, 1, 3));
        assert_eq!(second, ymd(2024, 1, 5));
        assert_eq!(third, ymd(2024, 1, 7));
    }

    #[test]
    fn test_crosses_month_and_leap_day() {
        assert_eq!(next_candidate(ymd(2024, 2, 28), Interval::ONE), ymd(2024, 2, 29));
        assert_eq!(next_candidate(ymd(2023, 2, 28), Interval::ONE), ymd(2023, 3, 1));
        assert_eq!(next_candidate(ymd(2024, 12, 31), Interval::ONE), ymd(2025, 1, 1));
    }

    #[test]
    fn test_saturates_at_calendar_end() {
        // Not strictly after: the calendar has no later date.
        assert_eq!(next_candidate(NaiveDate::MAX, Interval::ONE), NaiveDate::MAX);
    }
}
