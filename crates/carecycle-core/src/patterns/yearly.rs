//! Yearly evaluation. A Feb 29 rule lands on Feb 28 in common years; it
//! never rolls forward to Mar 1.

use chrono::{Datelike, NaiveDate};

use super::clamped_date;
use crate::models::{Interval, MonthDay};

pub fn next_candidate(anchor: NaiveDate, month_day: MonthDay, interval: Interval) -> NaiveDate {
    let Some(year) = i32::try_from(interval.get())
        .ok()
        .and_then(|step| anchor.year().checked_add(step))
    else {
        return NaiveDate::MAX;
    };
    clamped_date(year, month_day.month() as u32, month_day.day() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_leap_day_clamps_to_feb_28() {
        let leap_day = MonthDay::new(2, 29).unwrap();
        assert_eq!(next_candidate(ymd(2024, 2, 29), leap_day, Interval::ONE), ymd(2025, 2, 28));
    }

    #[test]
    fn test_leap_day_restored_in_next_leap_year() {
        let leap_day = MonthDay::new(2, 29).unwrap();
        let mut date = ymd(2024, 2, 29);
        for _ in 0..4 {
            date = next_candidate(date, leap_day, Interval::ONE);
        }
        assert_eq!(date, ymd(2028, 2, 29));
    }

    #[test]
    fn test_every_four_years_keeps_leap_day() {
        let leap_day = MonthDay::new(2, 29).unwrap();
        assert_eq!(
            next_candidate(ymd(2024, 2, 29), leap_day, Interval::new(4).unwrap()),
            ymd(2028, 2, 29)
        );
        // 2100 is not a leap year.
        assert_eq!(
            next_candidate(ymd(2096, 2, 29), leap_day, Interval::new(4).unwrap()),
            ymd(2100, 2, 28)
        );
    }

    #[test]
    fn test_ordinary_date() {
        let birthday = MonthDay::new(7, 14).unwrap();
        assert_eq!(next_candidate(ymd(2024, 7, 14), birthday, Interval::ONE), ymd(2025, 7, 14));
        // Anchor before the date in its own year still moves a full year.
        assert_eq!(next_candidate(ymd(2024, 3, 1), birthday, Interval::ONE), ymd(2025, 7, 14));
    }
}
