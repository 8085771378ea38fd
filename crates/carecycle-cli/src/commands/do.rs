use anyhow::Result;
use carecycle_core::models::{CareItem, EventResolution, FollowUp, RecurrenceRule};
use carecycle_core::recurrence::ScheduleResponse;
use carecycle_core::repository::Repository;
use chrono::Utc;
use owo_colors::{OwoColorize, Style};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::cli::DoCommand;
use crate::commands::Context;
use crate::util::{load_item, print_json};
use crate::views::table::short_id;

/// What happened after the completion itself.
enum NextStep {
    NotRecurring,
    AlreadyDone,
    Scheduled { item: CareItem, rule: RecurrenceRule },
    Duplicate(Option<Uuid>),
    Ended,
    /// Processing failed; the event stays queued.
    Deferred(String),
}

impl NextStep {
    fn from_resolution(resolution: EventResolution) -> Self {
        match resolution {
            EventResolution::Scheduled { item, rule } => NextStep::Scheduled { item, rule },
            EventResolution::Duplicate { existing_item_id } => NextStep::Duplicate(existing_item_id),
            EventResolution::SeriesEnded | EventResolution::RuleRemoved => NextStep::Ended,
            EventResolution::Retrying { error, .. } | EventResolution::Exhausted { error, .. } => {
                NextStep::Deferred(error)
            }
        }
    }

    fn to_json(&self) -> Value {
        match self {
            NextStep::NotRecurring => Value::Null,
            NextStep::AlreadyDone => json!({ "already_done": true }),
            NextStep::Scheduled { item, rule } => json!({
                "response": ScheduleResponse::Scheduled {
                    next_due_date: item.due_date.unwrap_or_default(),
                    updated_rule: rule.counters(),
                },
                "item": item,
            }),
            NextStep::Duplicate(existing) => json!({ "duplicate_of": existing }),
            NextStep::Ended => json!({ "response": ScheduleResponse::Ended }),
            NextStep::Deferred(error) => json!({ "warning": error }),
        }
    }
}

/// Completes an item, then processes its completion event right away.
/// A failure to create the next occurrence only warns: the completion stands
/// and `carecycle process` retries the event.
pub async fn do_item(repo: &impl Repository, command: DoCommand, ctx: &Context) -> Result<()> {
    let item = load_item(repo, &command.id).await?;
    let result = repo.complete_item(item.id, Utc::now(), ctx.today).await?;
    let completed = result.completed;

    let next = match result.follow_up {
        FollowUp::None => NextStep::NotRecurring,
        FollowUp::AlreadyDone => NextStep::AlreadyDone,
        FollowUp::Enqueued(event) => match repo.process_event(&event).await {
            Ok(resolution) => NextStep::from_resolution(resolution),
            Err(e) => NextStep::Deferred(e.to_string()),
        },
    };

    if ctx.json {
        return print_json(&json!({
            "completed": completed,
            "next": next.to_json(),
        }));
    }

    let success_style = Style::new().green().bold();
    match next {
        NextStep::AlreadyDone => {
            println!("'{}' was already done.", completed.title);
        }
        NextStep::NotRecurring => {
            println!("{} Completed: '{}'", "✓".style(success_style), completed.title);
        }
        NextStep::Scheduled { item, .. } => {
            println!("{} Completed: '{}'", "✓".style(success_style), completed.title);
            let due = item
                .due_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "no date".to_string());
            println!(
                "  {} Next occurrence due {} ({})",
                "→".blue(),
                due.cyan(),
                short_id(&item.id).yellow()
            );
        }
        NextStep::Duplicate(_) => {
            println!("{} Completed: '{}'", "✓".style(success_style), completed.title);
            println!("  {} Next occurrence already exists", "→".blue());
        }
        NextStep::Ended => {
            println!("{} Completed: '{}'", "✓".style(success_style), completed.title);
            println!("  {} The series has ended", "→".blue());
        }
        NextStep::Deferred(error) => {
            println!("{} Completed: '{}'", "✓".style(success_style), completed.title);
            let warn_style = Style::new().yellow().bold();
            eprintln!(
                "{} The next occurrence could not be created automatically ({}). Run 'carecycle process' to retry.",
                "Warning:".style(warn_style),
                error
            );
        }
    }
    Ok(())
}
