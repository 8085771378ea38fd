use carecycle_core::models::{
    AnchorPolicy, CareItem, CompletionEvent, EventStatus, ItemKind, ItemStatus, MonthlyPattern,
    Pattern, RecurrenceRule,
};
use chrono::{Duration, NaiveDate};
use chrono_humanize::HumanTime;
use comfy_table::{Attribute, Cell, Color, Row, Table};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ViewItem {
    pub item: CareItem,
    /// Whether the item owns a recurrence rule
    pub has_rule: bool,
}

pub fn short_id(id: &Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

fn relative_due(due: NaiveDate, today: NaiveDate) -> String {
    if due == today {
        "today".to_string()
    } else {
        HumanTime::from(Duration::days((due - today).num_days())).to_string()
    }
}

pub fn display_items(items: &[ViewItem], today: NaiveDate) {
    if items.is_empty() {
        println!("No items found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Kind", "Status", "Due", "Category", "Assignees"]);

    for view in items {
        let item = &view.item;
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id(&item.id)));

        let mut title = String::new();
        if view.has_rule || item.series_parent_id.is_some() {
            title.push('↻');
            title.push(' ');
        }
        title.push_str(&item.title);

        let mut title_cell = Cell::new(title);
        if item.status == ItemStatus::Done {
            title_cell = title_cell
                .add_attribute(Attribute::CrossedOut)
                .fg(Color::DarkGrey);
        } else if item.kind == ItemKind::Appointment {
            title_cell = title_cell.fg(Color::Cyan);
        }
        row.add_cell(title_cell);

        row.add_cell(Cell::new(item.kind.to_string()));

        let status_cell = match item.status {
            ItemStatus::Done => Cell::new("done").fg(Color::Green),
            ItemStatus::Open => Cell::new("open"),
        };
        row.add_cell(status_cell);

        let due_cell = match item.due_date {
            Some(due) => {
                let mut text = format!("{} ({})", due, relative_due(due, today));
                if let Some(time) = item.due_time {
                    text = format!("{} {}", time.format("%H:%M"), text);
                }
                let cell = Cell::new(text);
                if item.status == ItemStatus::Open && due < today {
                    cell.fg(Color::Red) // Overdue
                } else if item.status == ItemStatus::Open && due == today {
                    cell.fg(Color::Yellow)
                } else {
                    cell
                }
            }
            None => Cell::new("None"),
        };
        row.add_cell(due_cell);

        row.add_cell(Cell::new(item.category.as_deref().unwrap_or("None")));
        row.add_cell(Cell::new(if item.assignees.is_empty() {
            "None".to_string()
        } else {
            item.assignees.join(", ")
        }));
        table.add_row(row);
    }

    println!("{table}");
}

/// One-line, human readable description of a rule's pattern and interval.
pub fn describe_pattern(rule: &RecurrenceRule) -> String {
    let n = rule.interval().get();
    let every = |unit: &str| {
        if n == 1 {
            format!("every {}", unit)
        } else {
            format!("every {} {}s", n, unit)
        }
    };

    match rule.pattern() {
        Pattern::Daily => every("day"),
        Pattern::Weekly { days } => {
            let names: Vec<String> = days.iter().map(|d| d.to_string()).collect();
            format!("{} on {}", every("week"), names.join(", "))
        }
        Pattern::Monthly(MonthlyPattern::DayOfMonth { day }) => {
            format!("{} on day {}", every("month"), day.get())
        }
        Pattern::Monthly(MonthlyPattern::NthWeekday { nth, weekday }) => {
            let ordinal = match nth.get() {
                1 => "1st",
                2 => "2nd",
                3 => "3rd",
                4 => "4th",
                _ => "5th (or last)",
            };
            format!("{} on the {} {}", every("month"), ordinal, weekday)
        }
        Pattern::Yearly(month_day) => {
            format!("{} on {:02}-{:02}", every("year"), month_day.month(), month_day.day())
        }
    }
}

pub fn display_rule(rule: &RecurrenceRule) {
    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);

    let anchor = match rule.definition.anchor_policy {
        AnchorPolicy::DueDate => "due date",
        AnchorPolicy::CompletionDate => "completion date",
    };
    let last = rule
        .last_occurrence_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "None".to_string());

    table.add_row(vec![Cell::new("Rule ID"), Cell::new(rule.id.to_string())]);
    table.add_row(vec![Cell::new("Item"), Cell::new(short_id(&rule.parent_item_id))]);
    table.add_row(vec![
        Cell::new("Pattern"),
        Cell::new(describe_pattern(rule)).fg(Color::Green),
    ]);
    table.add_row(vec![Cell::new("Ends"), Cell::new(rule.end_condition().to_string())]);
    table.add_row(vec![Cell::new("Anchored on"), Cell::new(anchor)]);
    table.add_row(vec![
        Cell::new("Created occurrences"),
        Cell::new(rule.created_occurrences.to_string()),
    ]);
    table.add_row(vec![Cell::new("Last occurrence"), Cell::new(last)]);

    println!("{table}");
}

pub fn display_preview(dates: &[NaiveDate], today: NaiveDate) {
    if dates.is_empty() {
        println!("No upcoming occurrences; the series has ended.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Due", "Weekday", "When"]);
    for (i, date) in dates.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(date.to_string()),
            Cell::new(date.format("%A").to_string()),
            Cell::new(relative_due(*date, today)),
        ]);
    }
    println!("{table}");
}

pub fn display_events(events: &[CompletionEvent]) {
    if events.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Item", "Anchor", "Status", "Attempts", "Last error"]);
    for event in events {
        let status = match event.status {
            EventStatus::Failed => Cell::new("failed").fg(Color::Red),
            EventStatus::Pending => Cell::new("pending").fg(Color::Yellow),
            EventStatus::Processed => Cell::new("processed").fg(Color::Green),
        };
        table.add_row(vec![
            Cell::new(short_id(&event.parent_item_id)),
            Cell::new(event.anchor_date.to_string()),
            status,
            Cell::new(event.attempts),
            Cell::new(event.last_error.as_deref().unwrap_or("")),
        ]);
    }
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use carecycle_core::validation::{validate, RawRecurrenceRule};

    fn rule_from(configure: impl FnOnce(&mut RawRecurrenceRule)) -> RecurrenceRule {
        let mut raw = RawRecurrenceRule::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        raw.interval_value = Some(1);
        raw.end_type = Some("never".to_string());
        configure(&mut raw);
        RecurrenceRule::new(Uuid::nil(), Uuid::nil(), validate(&raw).unwrap())
    }

    #[test]
    fn describes_weekly_rule() {
        let rule = rule_from(|raw| {
            raw.pattern_type = Some("weekly".to_string());
            raw.weekly_days = Some(vec![5, 1]);
            raw.interval_value = Some(2);
        });
        assert_eq!(describe_pattern(&rule), "every 2 weeks on Mon, Fri");
    }

    #[test]
    fn describes_nth_weekday_rule() {
        let rule = rule_from(|raw| {
            raw.pattern_type = Some("monthly".to_string());
            raw.nth_occurrence = Some(2);
            raw.weekday = Some(2);
        });
        assert_eq!(describe_pattern(&rule), "every month on the 2nd Tue");
    }

    #[test]
    fn describes_yearly_rule() {
        let rule = rule_from(|raw| {
            raw.pattern_type = Some("yearly".to_string());
            raw.month = Some(2);
            raw.day = Some(29);
        });
        assert_eq!(describe_pattern(&rule), "every year on 02-29");
    }

    #[test]
    fn short_ids_are_eight_hex_chars() {
        let id = Uuid::parse_str("0190aaaa-bbbb-7ccc-8ddd-eeeeffff0000").unwrap();
        assert_eq!(short_id(&id), "0190aaaa");
    }

    #[test]
    fn relative_due_today() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(relative_due(today, today), "today");
    }
}
