use anyhow::{anyhow, Result};
use carecycle_core::error::CoreError;
use carecycle_core::models::{AnchorPolicy, CareItem, PatternType, RecurrenceRule};
use carecycle_core::recurrence::{RecurrenceScheduler, ScheduleResponse};
use carecycle_core::repository::Repository;
use carecycle_core::validation::{validate, RawRecurrenceRule};
use chrono::NaiveDate;
use owo_colors::{OwoColorize, Style};
use serde_json::json;

use crate::cli::{PreviewCommand, RecurCommand, RecurSubcommand, RuleArgs, RuleTargetCommand, SetRuleCommand};
use crate::commands::Context;
use crate::parser::{parse_date, parse_weekday, parse_weekday_list};
use crate::util::{load_item, print_json};
use crate::views::table::{describe_pattern, display_preview, display_rule, short_id};

pub async fn recur_command(repo: &impl Repository, command: RecurCommand, ctx: &Context) -> Result<()> {
    match command.command {
        RecurSubcommand::Set(cmd) => set_rule(repo, cmd, ctx).await,
        RecurSubcommand::Show(cmd) => show_rule(repo, cmd, ctx).await,
        RecurSubcommand::Clear(cmd) => clear_rule(repo, cmd, ctx).await,
        RecurSubcommand::Preview(cmd) => preview_rule(repo, cmd, ctx).await,
    }
}

/// Maps command-line flags onto the submitted rule shape.
pub fn raw_rule_from_args(args: &RuleArgs, created_on: NaiveDate, today: NaiveDate) -> Result<RawRecurrenceRule> {
    let mut raw = RawRecurrenceRule::new(created_on);
    raw.pattern_type = Some(PatternType::from(args.every).to_string());
    raw.interval_value = Some(args.interval);
    raw.weekly_days = args.on.as_deref().map(parse_weekday_list).transpose()?;
    raw.day_of_month = args.day_of_month;
    raw.nth_occurrence = args.nth;
    raw.weekday = args.weekday.as_deref().map(parse_weekday).transpose()?;
    raw.month = args.month;
    raw.day = args.day;

    if let Some(count) = args.count {
        raw.end_type = Some("after_occurrences".to_string());
        raw.end_count = Some(count);
    } else if let Some(until) = args.until.as_deref() {
        raw.end_type = Some("until_date".to_string());
        raw.end_date = Some(parse_date(until, today)?);
    } else {
        raw.end_type = Some("never".to_string());
    }

    raw.anchor_policy = Some(AnchorPolicy::from(args.anchor).to_string());
    Ok(raw)
}

/// Rules live on the first item of a series; occurrences point back to it.
async fn series_owner(repo: &impl Repository, short_id: &str) -> Result<CareItem> {
    let item = load_item(repo, short_id).await?;
    match item.series_parent_id {
        None => Ok(item),
        Some(owner) => repo
            .find_item_by_id(owner)
            .await?
            .ok_or_else(|| anyhow!(CoreError::NotFound(format!("Series item {} no longer exists", owner)))),
    }
}

async fn set_rule(repo: &impl Repository, command: SetRuleCommand, ctx: &Context) -> Result<()> {
    let owner = series_owner(repo, &command.id).await?;
    let existing = repo.find_rule_for_item(owner.id).await?;

    // Edits keep the original creation date for the until-date check.
    let created_on = existing
        .as_ref()
        .map(|rule| rule.definition.created_on)
        .unwrap_or(ctx.today);
    let raw = raw_rule_from_args(&command.rule, created_on, ctx.today)?;

    let definition = match validate(&raw) {
        Ok(definition) => definition,
        Err(field_errors) => {
            if ctx.json {
                print_json(&ScheduleResponse::Rejected {
                    field_errors: field_errors.clone(),
                })?;
            }
            return Err(CoreError::Validation(field_errors).into());
        }
    };

    let rule = match existing {
        Some(_) => repo.update_rule(owner.id, definition).await?,
        None => repo.attach_rule(owner.id, definition).await?,
    };

    if ctx.json {
        return print_json(&rule);
    }

    let success_style = Style::new().green().bold();
    println!(
        "{} '{}' repeats {} ({})",
        "✓".style(success_style),
        owner.title.bright_white().bold(),
        describe_pattern(&rule).green(),
        rule.end_condition()
    );
    if let Some(due) = owner.due_date {
        let upcoming = RecurrenceScheduler::new(&rule).preview(due, ctx.config.queue.preview_count);
        if !upcoming.is_empty() {
            let dates: Vec<String> = upcoming.iter().map(|d| d.to_string()).collect();
            println!("  {} Upcoming: {}", "→".blue(), dates.join(", ").cyan());
        }
    }
    Ok(())
}

async fn find_rule(repo: &impl Repository, item: &CareItem) -> Result<RecurrenceRule> {
    repo.find_rule_for_item(item.rule_owner_id())
        .await?
        .ok_or_else(|| {
            anyhow!(CoreError::NotFound(format!(
                "Item {} does not repeat",
                short_id(&item.id)
            )))
        })
}

async fn show_rule(repo: &impl Repository, command: RuleTargetCommand, ctx: &Context) -> Result<()> {
    let item = load_item(repo, &command.id).await?;
    let rule = find_rule(repo, &item).await?;

    if ctx.json {
        return print_json(&rule);
    }
    display_rule(&rule);
    Ok(())
}

async fn clear_rule(repo: &impl Repository, command: RuleTargetCommand, ctx: &Context) -> Result<()> {
    let owner = series_owner(repo, &command.id).await?;
    repo.delete_rule(owner.id).await?;

    if ctx.json {
        return print_json(&json!({ "cleared": owner.id }));
    }
    println!("'{}' no longer repeats. Existing occurrences were kept.", owner.title);
    Ok(())
}

async fn preview_rule(repo: &impl Repository, command: PreviewCommand, ctx: &Context) -> Result<()> {
    let item = load_item(repo, &command.id).await?;
    let rule = find_rule(repo, &item).await?;

    let anchor = match command.from.as_deref() {
        Some(from) => parse_date(from, ctx.today)?,
        None => item.due_date.unwrap_or(ctx.today),
    };
    let count = command.count.unwrap_or(ctx.config.queue.preview_count);
    let scheduler = RecurrenceScheduler::new(&rule);

    if ctx.json {
        return print_json(&json!({
            "anchor_date": anchor,
            "next": scheduler.schedule(anchor).into_response(&rule),
            "upcoming": scheduler.preview(anchor, count),
        }));
    }

    println!(
        "{} from {} ({})",
        describe_pattern(&rule).green(),
        anchor,
        rule.end_condition()
    );
    display_preview(&scheduler.preview(anchor, count), ctx.today);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{AnchorArg, EveryArg};

    fn args(every: EveryArg) -> RuleArgs {
        RuleArgs {
            every,
            interval: 1,
            on: None,
            day_of_month: None,
            nth: None,
            weekday: None,
            month: None,
            day: None,
            count: None,
            until: None,
            anchor: AnchorArg::Due,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekly_flags_validate() {
        let mut weekly = args(EveryArg::Weekly);
        weekly.on = Some("mon,wed,fri".to_string());
        weekly.count = Some(3);

        let raw = raw_rule_from_args(&weekly, day(2024, 1, 1), day(2024, 1, 1)).unwrap();
        assert_eq!(raw.weekly_days, Some(vec![1, 3, 5]));
        assert_eq!(raw.end_type.as_deref(), Some("after_occurrences"));
        assert!(validate(&raw).is_ok());
    }

    #[test]
    fn nth_weekday_flags_validate() {
        let mut monthly = args(EveryArg::Monthly);
        monthly.nth = Some(2);
        monthly.weekday = Some("tue".to_string());
        monthly.anchor = AnchorArg::Completion;

        let raw = raw_rule_from_args(&monthly, day(2024, 1, 1), day(2024, 1, 1)).unwrap();
        assert_eq!(raw.weekday, Some(2));
        assert_eq!(raw.anchor_policy.as_deref(), Some("completion_date"));
        assert!(validate(&raw).is_ok());
    }

    #[test]
    fn until_in_the_past_is_rejected() {
        let mut daily = args(EveryArg::Daily);
        daily.until = Some("2023-12-01".to_string());

        let raw = raw_rule_from_args(&daily, day(2024, 1, 1), day(2024, 1, 1)).unwrap();
        let errors = validate(&raw).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "end_date"));
    }

    #[test]
    fn bad_weekday_name_fails_before_validation() {
        let mut weekly = args(EveryArg::Weekly);
        weekly.on = Some("mon,someday".to_string());
        assert!(raw_rule_from_args(&weekly, day(2024, 1, 1), day(2024, 1, 1)).is_err());
    }
}
