//! End-condition checking.
//!
//! `AfterOccurrences(n)` counts materialized occurrences only: the item the
//! rule was attached to is not one of the `n`. `UntilDate` is inclusive, so an
//! occurrence may fall on the limit date itself.

use chrono::NaiveDate;

use crate::models::{EndCondition, RecurrenceRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndCheck {
    Continue,
    Ended,
}

impl EndCondition {
    /// Whether a series that has produced `created_occurrences` so far may
    /// produce one more, due on `candidate`.
    pub fn check(&self, candidate: NaiveDate, created_occurrences: u32) -> EndCheck {
        let keep_going = match self {
            EndCondition::Never => true,
            EndCondition::AfterOccurrences(limit) => created_occurrences < limit.get(),
            EndCondition::UntilDate(limit) => candidate <= *limit,
        };
        if keep_going {
            EndCheck::Continue
        } else {
            EndCheck::Ended
        }
    }
}

/// Checks `candidate` against `rule`'s end condition and current counters.
/// A counter already at `u32::MAX` cannot record another occurrence, so the
/// series ends there whatever the end condition says.
#[inline]
pub fn check(candidate: NaiveDate, rule: &RecurrenceRule) -> EndCheck {
    if rule.created_occurrences == u32::MAX {
        return EndCheck::Ended;
    }
    rule.end_condition().check(candidate, rule.created_occurrences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_never_always_continues() {
        let end = EndCondition::Never;
        assert_eq!(end.check(ymd(9999, 12, 31), u32::MAX), EndCheck::Continue);
    }

    #[test]
    fn test_after_occurrences_allows_exactly_n() {
        let end = EndCondition::AfterOccurrences(NonZeroU32::new(3).unwrap());
        let candidate = ymd(2024, 1, 1);
        assert_eq!(end.check(candidate, 0), EndCheck::Continue);
        assert_eq!(end.check(candidate, 1), EndCheck::Continue);
        assert_eq!(end.check(candidate, 2), EndCheck::Continue);
        assert_eq!(end.check(candidate, 3), EndCheck::Ended);
        assert_eq!(end.check(candidate, 10), EndCheck::Ended);
    }

    #[test]
    fn test_after_occurrences_at_counter_limit() {
        let end = EndCondition::AfterOccurrences(NonZeroU32::MAX);
        assert_eq!(end.check(ymd(2024, 1, 1), u32::MAX - 1), EndCheck::Continue);
        assert_eq!(end.check(ymd(2024, 1, 1), u32::MAX), EndCheck::Ended);
    }

    #[test]
    fn test_until_date_is_inclusive() {
        let end = EndCondition::UntilDate(ymd(2024, 3, 31));
        assert_eq!(end.check(ymd(2024, 3, 30), 0), EndCheck::Continue);
        assert_eq!(end.check(ymd(2024, 3, 31), 0), EndCheck::Continue);
        assert_eq!(end.check(ymd(2024, 4, 1), 0), EndCheck::Ended);
    }
}
