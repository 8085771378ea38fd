//! Validation of submitted recurrence rules.
//!
//! The editing form submits a flat record of optional fields. [`validate`]
//! turns it into a [`RuleDefinition`], whose pattern and end condition are
//! tagged unions, or reports every offending field at once.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

use crate::error::FieldError;
use crate::models::{
    weekday_from_ordinal, AnchorPolicy, DayOfMonth, EndCondition, Interval, MonthDay,
    MonthlyPattern, NthOccurrence, Pattern, PatternType, RuleDefinition, WeekdaySet,
};

/// A rule as submitted, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecurrenceRule {
    pub pattern_type: Option<String>,
    pub interval_value: Option<i64>,
    #[serde(default)]
    pub weekly_days: Option<Vec<i64>>,
    pub day_of_month: Option<i64>,
    pub nth_occurrence: Option<i64>,
    pub weekday: Option<i64>,
    pub month: Option<i64>,
    pub day: Option<i64>,
    /// `never`, `after_occurrences` or `until_date`
    pub end_type: Option<String>,
    pub end_count: Option<i64>,
    pub end_date: Option<NaiveDate>,
    pub anchor_policy: Option<String>,
    /// Date the rule is being created on; `UntilDate` must be after it.
    pub created_on: NaiveDate,
}

impl RawRecurrenceRule {
    /// An empty submission created on `created_on`.
    pub fn new(created_on: NaiveDate) -> Self {
        Self {
            pattern_type: None,
            interval_value: None,
            weekly_days: None,
            day_of_month: None,
            nth_occurrence: None,
            weekday: None,
            month: None,
            day: None,
            end_type: None,
            end_count: None,
            end_date: None,
            anchor_policy: None,
            created_on,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndType {
    Never,
    AfterOccurrences,
    UntilDate,
}

fn parse_end_type(s: &str) -> Option<EndType> {
    match s.to_lowercase().as_str() {
        "never" => Some(EndType::Never),
        "after_occurrences" | "after" | "count" => Some(EndType::AfterOccurrences),
        "until_date" | "until" => Some(EndType::UntilDate),
        _ => None,
    }
}

/// Validates a submitted rule. Has no side effects.
pub fn validate(raw: &RawRecurrenceRule) -> Result<RuleDefinition, Vec<FieldError>> {
    let mut errors = Vec::new();

    let interval = validate_interval(raw.interval_value, &mut errors);

    let pattern = match raw.pattern_type.as_deref() {
        None => {
            errors.push(FieldError::new("pattern_type", "is required"));
            None
        }
        Some(name) => match name.parse::<PatternType>() {
            Ok(pattern_type) => validate_pattern(pattern_type, raw, &mut errors),
            Err(_) => {
                errors.push(FieldError::new(
                    "pattern_type",
                    format!("'{}' is not one of daily, weekly, monthly, yearly", name),
                ));
                None
            }
        },
    };

    let end_condition = validate_end_condition(raw, &mut errors);

    let anchor_policy = match raw.anchor_policy.as_deref() {
        None => Some(AnchorPolicy::default()),
        Some(name) => match name.parse::<AnchorPolicy>() {
            Ok(policy) => Some(policy),
            Err(_) => {
                errors.push(FieldError::new(
                    "anchor_policy",
                    format!("'{}' is not one of due_date, completion_date", name),
                ));
                None
            }
        },
    };

    match (interval, pattern, end_condition, anchor_policy) {
        (Some(interval), Some(pattern), Some(end_condition), Some(anchor_policy))
            if errors.is_empty() =>
        {
            Ok(RuleDefinition {
                pattern,
                interval,
                end_condition,
                anchor_policy,
                created_on: raw.created_on,
            })
        }
        _ => Err(errors),
    }
}

fn validate_interval(value: Option<i64>, errors: &mut Vec<FieldError>) -> Option<Interval> {
    match value {
        None => {
            errors.push(FieldError::new("interval_value", "is required"));
            None
        }
        Some(v) if v < 1 => {
            errors.push(FieldError::new("interval_value", "must be at least 1"));
            None
        }
        Some(v) => {
            let interval = u32::try_from(v).ok().and_then(Interval::new);
            if interval.is_none() {
                errors.push(FieldError::new("interval_value", "is too large"));
            }
            interval
        }
    }
}

/// Checks `value` lies in `min..=max`, recording an error otherwise.
fn ranged(
    field: &str,
    value: i64,
    min: i64,
    max: i64,
    errors: &mut Vec<FieldError>,
) -> Option<u8> {
    if (min..=max).contains(&value) {
        Some(value as u8)
    } else {
        errors.push(FieldError::new(
            field,
            format!("{} is out of range {}-{}", value, min, max),
        ));
        None
    }
}

fn reject_stray(
    field: &str,
    present: bool,
    pattern_type: PatternType,
    errors: &mut Vec<FieldError>,
) {
    if present {
        errors.push(FieldError::new(
            field,
            format!("is not used by {} rules", pattern_type),
        ));
    }
}

fn validate_pattern(
    pattern_type: PatternType,
    raw: &RawRecurrenceRule,
    errors: &mut Vec<FieldError>,
) -> Option<Pattern> {
    let has_weekly_days = raw.weekly_days.as_ref().is_some_and(|days| !days.is_empty());

    match pattern_type {
        PatternType::Daily => {
            reject_stray("weekly_days", has_weekly_days, pattern_type, errors);
            reject_stray("day_of_month", raw.day_of_month.is_some(), pattern_type, errors);
            reject_stray("nth_occurrence", raw.nth_occurrence.is_some(), pattern_type, errors);
            reject_stray("weekday", raw.weekday.is_some(), pattern_type, errors);
            reject_stray("month", raw.month.is_some(), pattern_type, errors);
            reject_stray("day", raw.day.is_some(), pattern_type, errors);
            Some(Pattern::Daily)
        }
        PatternType::Weekly => {
            reject_stray("day_of_month", raw.day_of_month.is_some(), pattern_type, errors);
            reject_stray("nth_occurrence", raw.nth_occurrence.is_some(), pattern_type, errors);
            reject_stray("weekday", raw.weekday.is_some(), pattern_type, errors);
            reject_stray("month", raw.month.is_some(), pattern_type, errors);
            reject_stray("day", raw.day.is_some(), pattern_type, errors);
            validate_weekly(raw.weekly_days.as_deref(), errors)
        }
        PatternType::Monthly => {
            reject_stray("weekly_days", has_weekly_days, pattern_type, errors);
            reject_stray("month", raw.month.is_some(), pattern_type, errors);
            reject_stray("day", raw.day.is_some(), pattern_type, errors);
            validate_monthly(raw, errors)
        }
        PatternType::Yearly => {
            reject_stray("weekly_days", has_weekly_days, pattern_type, errors);
            reject_stray("day_of_month", raw.day_of_month.is_some(), pattern_type, errors);
            reject_stray("nth_occurrence", raw.nth_occurrence.is_some(), pattern_type, errors);
            reject_stray("weekday", raw.weekday.is_some(), pattern_type, errors);
            validate_yearly(raw.month, raw.day, errors)
        }
    }
}

fn validate_weekly(days: Option<&[i64]>, errors: &mut Vec<FieldError>) -> Option<Pattern> {
    let days = days.unwrap_or_default();
    if days.is_empty() {
        errors.push(FieldError::new(
            "weekly_days",
            "at least one weekday must be selected",
        ));
        return None;
    }

    let mut ordinals = Vec::with_capacity(days.len());
    for &day in days {
        ordinals.push(ranged("weekly_days", day, 0, 6, errors)?);
    }
    // Non-empty and in range, checked above.
    WeekdaySet::from_ordinals(ordinals)
        .ok()
        .map(|days| Pattern::Weekly { days })
}

fn validate_monthly(raw: &RawRecurrenceRule, errors: &mut Vec<FieldError>) -> Option<Pattern> {
    let nth_form = raw.nth_occurrence.is_some() || raw.weekday.is_some();

    match (raw.day_of_month, nth_form) {
        (Some(_), true) => {
            errors.push(FieldError::new(
                "day_of_month",
                "cannot be combined with nth_occurrence/weekday",
            ));
            None
        }
        (None, false) => {
            errors.push(FieldError::new(
                "day_of_month",
                "either day_of_month or nth_occurrence with weekday is required",
            ));
            None
        }
        (Some(day), false) => {
            let day = ranged("day_of_month", day, 1, 31, errors)?;
            DayOfMonth::new(day).map(|day| Pattern::Monthly(MonthlyPattern::DayOfMonth { day }))
        }
        (None, true) => {
            let nth = match raw.nth_occurrence {
                Some(n) => ranged("nth_occurrence", n, 1, 5, errors).and_then(NthOccurrence::new),
                None => {
                    errors.push(FieldError::new(
                        "nth_occurrence",
                        "is required when weekday is set",
                    ));
                    None
                }
            };
            let weekday = match raw.weekday {
                Some(w) => ranged("weekday", w, 0, 6, errors).and_then(weekday_from_ordinal),
                None => {
                    errors.push(FieldError::new(
                        "weekday",
                        "is required when nth_occurrence is set",
                    ));
                    None
                }
            };
            Some(Pattern::Monthly(MonthlyPattern::NthWeekday {
                nth: nth?,
                weekday: weekday?,
            }))
        }
    }
}

fn validate_yearly(
    month: Option<i64>,
    day: Option<i64>,
    errors: &mut Vec<FieldError>,
) -> Option<Pattern> {
    let month = match month {
        Some(m) => ranged("month", m, 1, 12, errors),
        None => {
            errors.push(FieldError::new("month", "is required"));
            None
        }
    };
    let day = match day {
        Some(d) => ranged("day", d, 1, 31, errors),
        None => {
            errors.push(FieldError::new("day", "is required"));
            None
        }
    };
    let (month, day) = (month?, day?);
    match MonthDay::new(month, day) {
        Some(month_day) => Some(Pattern::Yearly(month_day)),
        None => {
            errors.push(FieldError::new(
                "day",
                format!("{} is not a valid day in month {}", day, month),
            ));
            None
        }
    }
}

fn validate_end_condition(
    raw: &RawRecurrenceRule,
    errors: &mut Vec<FieldError>,
) -> Option<EndCondition> {
    let Some(name) = raw.end_type.as_deref() else {
        errors.push(FieldError::new("end_type", "is required"));
        return None;
    };
    let Some(end_type) = parse_end_type(name) else {
        errors.push(FieldError::new(
            "end_type",
            format!("'{}' is not one of never, after_occurrences, until_date", name),
        ));
        return None;
    };

    if end_type != EndType::AfterOccurrences && raw.end_count.is_some() {
        errors.push(FieldError::new("end_count", "is only used with after_occurrences"));
    }
    if end_type != EndType::UntilDate && raw.end_date.is_some() {
        errors.push(FieldError::new("end_date", "is only used with until_date"));
    }

    match end_type {
        EndType::Never => Some(EndCondition::Never),
        EndType::AfterOccurrences => match raw.end_count {
            None => {
                errors.push(FieldError::new("end_count", "is required"));
                None
            }
            Some(count) => {
                let count = u32::try_from(count).ok().and_then(NonZeroU32::new);
                if count.is_none() {
                    errors.push(FieldError::new("end_count", "must be a positive number"));
                }
                count.map(EndCondition::AfterOccurrences)
            }
        },
        EndType::UntilDate => match raw.end_date {
            None => {
                errors.push(FieldError::new("end_date", "is required"));
                None
            }
            Some(limit) if limit <= raw.created_on => {
                errors.push(FieldError::new(
                    "end_date",
                    format!("must be after the rule's creation date {}", raw.created_on),
                ));
                None
            }
            Some(limit) => Some(EndCondition::UntilDate(limit)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use rstest::rstest;

    fn created_on() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn raw(pattern_type: &str) -> RawRecurrenceRule {
        RawRecurrenceRule {
            pattern_type: Some(pattern_type.to_string()),
            interval_value: Some(1),
            end_type: Some("never".to_string()),
            ..RawRecurrenceRule::new(created_on())
        }
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    mod accepted {
        use super::*;

        #[test]
        fn test_daily() {
            let def = validate(&raw("daily")).unwrap();
            assert_eq!(def.pattern, Pattern::Daily);
            assert_eq!(def.interval, Interval::ONE);
            assert_eq!(def.end_condition, EndCondition::Never);
            assert_eq!(def.anchor_policy, AnchorPolicy::DueDate);
        }

        #[test]
        fn test_weekly_with_duplicates() {
            let input = RawRecurrenceRule {
                weekly_days: Some(vec![1, 3, 5, 3]),
                ..raw("weekly")
            };
            let def = validate(&input).unwrap();
            match def.pattern {
                Pattern::Weekly { days } => {
                    assert_eq!(days.iter().collect::<Vec<_>>(), vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]);
                }
                other => panic!("expected weekly, got {:?}", other),
            }
        }

        #[test]
        fn test_monthly_nth_weekday() {
            let input = RawRecurrenceRule {
                nth_occurrence: Some(2),
                weekday: Some(2),
                ..raw("monthly")
            };
            let def = validate(&input).unwrap();
            assert_eq!(
                def.pattern,
                Pattern::Monthly(MonthlyPattern::NthWeekday {
                    nth: NthOccurrence::new(2).unwrap(),
                    weekday: Weekday::Tue,
                })
            );
        }

        #[test]
        fn test_yearly_leap_day_accepted() {
            let input = RawRecurrenceRule {
                month: Some(2),
                day: Some(29),
                ..raw("yearly")
            };
            let def = validate(&input).unwrap();
            assert_eq!(def.pattern, Pattern::Yearly(MonthDay::new(2, 29).unwrap()));
        }

        #[test]
        fn test_end_conditions() {
            let after = RawRecurrenceRule {
                end_type: Some("after_occurrences".to_string()),
                end_count: Some(4),
                ..raw("daily")
            };
            assert_eq!(
                validate(&after).unwrap().end_condition,
                EndCondition::AfterOccurrences(NonZeroU32::new(4).unwrap())
            );

            let limit = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
            let until = RawRecurrenceRule {
                end_type: Some("until_date".to_string()),
                end_date: Some(limit),
                anchor_policy: Some("completion".to_string()),
                ..raw("daily")
            };
            let def = validate(&until).unwrap();
            assert_eq!(def.end_condition, EndCondition::UntilDate(limit));
            assert_eq!(def.anchor_policy, AnchorPolicy::CompletionDate);
        }
    }

    mod rejected {
        use super::*;

        #[rstest]
        #[case(Some(0))]
        #[case(Some(-3))]
        #[case(None)]
        fn test_bad_interval(#[case] interval: Option<i64>) {
            let input = RawRecurrenceRule {
                interval_value: interval,
                ..raw("daily")
            };
            assert_eq!(fields(&validate(&input).unwrap_err()), vec!["interval_value"]);
        }

        #[rstest]
        #[case(None)]
        #[case(Some(vec![]))]
        fn test_weekly_without_days(#[case] days: Option<Vec<i64>>) {
            let input = RawRecurrenceRule {
                weekly_days: days,
                ..raw("weekly")
            };
            assert_eq!(fields(&validate(&input).unwrap_err()), vec!["weekly_days"]);
        }

        #[test]
        fn test_weekly_day_out_of_range() {
            let input = RawRecurrenceRule {
                weekly_days: Some(vec![1, 7]),
                ..raw("weekly")
            };
            assert_eq!(fields(&validate(&input).unwrap_err()), vec!["weekly_days"]);
        }

        #[test]
        fn test_monthly_both_forms() {
            let input = RawRecurrenceRule {
                day_of_month: Some(15),
                nth_occurrence: Some(1),
                weekday: Some(1),
                ..raw("monthly")
            };
            assert_eq!(fields(&validate(&input).unwrap_err()), vec!["day_of_month"]);
        }

        #[test]
        fn test_monthly_neither_form() {
            assert_eq!(fields(&validate(&raw("monthly")).unwrap_err()), vec!["day_of_month"]);
        }

        #[test]
        fn test_monthly_half_nth_pair() {
            let input = RawRecurrenceRule {
                nth_occurrence: Some(6),
                ..raw("monthly")
            };
            assert_eq!(
                fields(&validate(&input).unwrap_err()),
                vec!["nth_occurrence", "weekday"]
            );
        }

        #[test]
        fn test_yearly_impossible_day() {
            let input = RawRecurrenceRule {
                month: Some(4),
                day: Some(31),
                ..raw("yearly")
            };
            assert_eq!(fields(&validate(&input).unwrap_err()), vec!["day"]);
        }

        #[test]
        fn test_payload_of_other_pattern() {
            let input = RawRecurrenceRule {
                weekly_days: Some(vec![1]),
                month: Some(3),
                ..raw("daily")
            };
            assert_eq!(
                fields(&validate(&input).unwrap_err()),
                vec!["weekly_days", "month"]
            );
        }

        #[rstest]
        #[case(Some(0))]
        #[case(Some(-1))]
        #[case(None)]
        fn test_after_occurrences_needs_positive_count(#[case] count: Option<i64>) {
            let input = RawRecurrenceRule {
                end_type: Some("after_occurrences".to_string()),
                end_count: count,
                ..raw("daily")
            };
            assert_eq!(fields(&validate(&input).unwrap_err()), vec!["end_count"]);
        }

        #[rstest]
        #[case(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())]
        #[case(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap())]
        fn test_until_date_not_after_creation(#[case] limit: NaiveDate) {
            let input = RawRecurrenceRule {
                end_type: Some("until_date".to_string()),
                end_date: Some(limit),
                ..raw("daily")
            };
            assert_eq!(fields(&validate(&input).unwrap_err()), vec!["end_date"]);
        }

        #[test]
        fn test_end_parameter_for_never() {
            let input = RawRecurrenceRule {
                end_count: Some(3),
                ..raw("daily")
            };
            assert_eq!(fields(&validate(&input).unwrap_err()), vec!["end_count"]);
        }

        #[test]
        fn test_collects_all_errors() {
            let input = RawRecurrenceRule {
                pattern_type: Some("fortnightly".to_string()),
                interval_value: Some(0),
                end_type: None,
                ..RawRecurrenceRule::new(created_on())
            };
            let errors = validate(&input).unwrap_err();
            assert_eq!(fields(&errors), vec!["interval_value", "pattern_type", "end_type"]);
        }
    }
}
