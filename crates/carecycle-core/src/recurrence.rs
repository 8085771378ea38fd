use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::end_condition::{self, EndCheck};
use crate::error::FieldError;
use crate::models::{RecurrenceRule, RuleCounters};
use crate::patterns;

/// What the scheduler decided for one anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    NextOccurrence(NaiveDate),
    SeriesEnded,
}

impl ScheduleOutcome {
    pub fn next_date(&self) -> Option<NaiveDate> {
        match self {
            ScheduleOutcome::NextOccurrence(date) => Some(*date),
            ScheduleOutcome::SeriesEnded => None,
        }
    }

    /// Pairs a scheduled date with the anchor that produced it, the form the
    /// materializer consumes.
    pub fn for_anchor(self, anchor_date: NaiveDate) -> Option<NextOccurrence> {
        self.next_date().map(|due_date| NextOccurrence {
            anchor_date,
            due_date,
        })
    }

    /// Renders the outcome in the wire shape handed to persistence, with the
    /// counters `rule` would carry once the occurrence is written.
    pub fn into_response(self, rule: &RecurrenceRule) -> ScheduleResponse {
        match self {
            ScheduleOutcome::NextOccurrence(date) => match rule.advanced(date) {
                Some(updated_rule) => ScheduleResponse::Scheduled {
                    next_due_date: date,
                    updated_rule,
                },
                None => ScheduleResponse::Ended,
            },
            ScheduleOutcome::SeriesEnded => ScheduleResponse::Ended,
        }
    }
}

/// An occurrence to write. `anchor_date` together with the parent item id
/// is the idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextOccurrence {
    pub anchor_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// Output record of the engine, tagged by `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScheduleResponse {
    Scheduled {
        next_due_date: NaiveDate,
        updated_rule: RuleCounters,
    },
    Ended,
    Rejected {
        field_errors: Vec<FieldError>,
    },
}

/// RecurrenceScheduler: pure next-occurrence decisions for one rule.
///
/// Picks the pattern evaluator for the rule, computes the candidate and runs
/// it past the end condition. It never mutates the rule; whether a series is
/// active or ended is always re-derived from the current counters.
#[derive(Debug, Clone, Copy)]
pub struct RecurrenceScheduler<'a> {
    rule: &'a RecurrenceRule,
}

impl<'a> RecurrenceScheduler<'a> {
    pub fn new(rule: &'a RecurrenceRule) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> &RecurrenceRule {
        self.rule
    }

    /// Decides the occurrence following the one anchored on `anchor`.
    pub fn schedule(&self, anchor: NaiveDate) -> ScheduleOutcome {
        let candidate = patterns::next_candidate(anchor, self.rule);
        let verdict = end_condition::check(candidate, self.rule);
        tracing::debug!(
            rule_id = %self.rule.id,
            %anchor,
            %candidate,
            ?verdict,
            "evaluated recurrence rule"
        );
        match verdict {
            EndCheck::Continue => ScheduleOutcome::NextOccurrence(candidate),
            EndCheck::Ended => ScheduleOutcome::SeriesEnded,
        }
    }

    /// Up to `count` upcoming due dates, as successive completions on each
    /// due date would produce them. The first entry always equals
    /// `schedule(anchor)`.
    pub fn preview(&self, anchor: NaiveDate, count: usize) -> Vec<NaiveDate> {
        let mut simulated = self.rule.clone();
        let mut dates = Vec::with_capacity(count.min(64));
        let mut anchor = anchor;

        while dates.len() < count {
            match RecurrenceScheduler::new(&simulated).schedule(anchor) {
                ScheduleOutcome::NextOccurrence(date) => {
                    if date <= anchor {
                        // Saturated at the end of the calendar.
                        break;
                    }
                    let Some(counters) = simulated.advanced(date) else {
                        break;
                    };
                    dates.push(date);
                    simulated.created_occurrences = counters.created_occurrences;
                    simulated.last_occurrence_date = counters.last_occurrence_date;
                    anchor = date;
                }
                ScheduleOutcome::SeriesEnded => break,
            }
        }

        dates
    }
}

/// Decides the occurrence following `anchor` for `rule`.
#[inline]
pub fn schedule(anchor: NaiveDate, rule: &RecurrenceRule) -> ScheduleOutcome {
    RecurrenceScheduler::new(rule).schedule(anchor)
}
