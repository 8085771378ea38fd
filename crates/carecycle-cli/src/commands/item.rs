use anyhow::{anyhow, Result};
use carecycle_core::models::NewItemData;
use carecycle_core::repository::Repository;
use dialoguer::Confirm;
use owo_colors::{OwoColorize, Style};
use serde_json::json;
use uuid::Uuid;

use crate::cli::{
    AddItemCommand, DeleteItemCommand, ItemCommand, ItemSubcommand, ListItemsCommand,
    ShowItemCommand,
};
use crate::commands::Context;
use crate::parser::{parse_date, parse_time};
use crate::util::{load_item, print_json};
use crate::views::table::{describe_pattern, display_items, short_id, ViewItem};

pub async fn item_command(repo: &impl Repository, command: ItemCommand, ctx: &Context) -> Result<()> {
    match command.command {
        ItemSubcommand::Add(cmd) => add_item(repo, cmd, ctx).await,
        ItemSubcommand::List(cmd) => list_items(repo, cmd, ctx).await,
        ItemSubcommand::Show(cmd) => show_item(repo, cmd, ctx).await,
        ItemSubcommand::Delete(cmd) => delete_item(repo, cmd, ctx).await,
    }
}

async fn add_item(repo: &impl Repository, command: AddItemCommand, ctx: &Context) -> Result<()> {
    let due_date = command
        .due
        .as_deref()
        .map(|d| parse_date(d, ctx.today))
        .transpose()?;
    let due_time = command.time.as_deref().map(parse_time).transpose()?;
    let group_id = match command.group.as_deref() {
        Some(group) => Uuid::parse_str(group).map_err(|e| anyhow!("Invalid group id '{}': {}", group, e))?,
        None => ctx.config.group_id(),
    };

    let item = repo
        .add_item(NewItemData {
            group_id,
            kind: command.kind.into(),
            title: command.title,
            description: command.description,
            category: command.category,
            assignees: command.assignees,
            due_date,
            due_time,
        })
        .await?;

    if ctx.json {
        return print_json(&item);
    }

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();
    println!(
        "{} Created {}: {}",
        "✓".style(success_style),
        item.kind,
        item.title.bright_white().bold()
    );
    println!("  {} ID: {}", "→".style(info_style), item.id.to_string().yellow());
    if let Some(due) = item.due_date {
        println!("  {} Due: {}", "→".style(info_style), due.to_string().cyan());
    }
    println!(
        "  {} Make it recurring: carecycle recur set {} --every weekly --on mon",
        "→".style(info_style),
        short_id(&item.id).yellow()
    );
    Ok(())
}

async fn list_items(repo: &impl Repository, command: ListItemsCommand, ctx: &Context) -> Result<()> {
    let items = repo.list_items(command.all).await?;

    if ctx.json {
        return print_json(&items);
    }

    let mut views = Vec::with_capacity(items.len());
    for item in items {
        let has_rule = item.series_parent_id.is_none() && repo.find_rule_for_item(item.id).await?.is_some();
        views.push(ViewItem { item, has_rule });
    }
    display_items(&views, ctx.today);
    Ok(())
}

async fn show_item(repo: &impl Repository, command: ShowItemCommand, ctx: &Context) -> Result<()> {
    let item = load_item(repo, &command.id).await?;
    let owner = item.rule_owner_id();
    let rule = repo.find_rule_for_item(owner).await?;
    let series = repo.find_series_items(owner).await?;

    if ctx.json {
        return print_json(&json!({
            "item": item,
            "rule": rule,
            "series": series,
        }));
    }

    println!("{}", item.title.bright_white().bold());
    println!("ID: {}", item.id.to_string().yellow());
    println!("Kind: {}", item.kind);
    println!("Status: {}", item.status);
    if let Some(due) = item.due_date {
        match item.due_time {
            Some(time) => println!("Due: {} {}", due, time.format("%H:%M")),
            None => println!("Due: {}", due),
        }
    }
    if let Some(description) = &item.description {
        println!("Description: {}", description);
    }
    if let Some(category) = &item.category {
        println!("Category: {}", category);
    }
    if !item.assignees.is_empty() {
        println!("Assignees: {}", item.assignees.join(", "));
    }
    if let Some(parent) = item.series_parent_id {
        println!("Occurrence of: {}", short_id(&parent).yellow());
    }

    match &rule {
        Some(rule) => {
            println!(
                "Repeats: {} ({})",
                describe_pattern(rule).green(),
                rule.end_condition()
            );
            let views: Vec<ViewItem> = series
                .into_iter()
                .map(|item| ViewItem { item, has_rule: false })
                .collect();
            println!("\n{}", "Series".blue().bold());
            display_items(&views, ctx.today);
        }
        None => println!("Repeats: {}", "no".bright_black()),
    }
    Ok(())
}

async fn delete_item(repo: &impl Repository, command: DeleteItemCommand, ctx: &Context) -> Result<()> {
    let item = load_item(repo, &command.id).await?;

    if !command.force {
        let confirmation = Confirm::new()
            .with_prompt(format!("Are you sure you want to delete '{}'?", item.title))
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirmation {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    repo.delete_item(item.id).await?;
    if ctx.json {
        return print_json(&json!({ "deleted": item.id }));
    }
    println!("Item deleted successfully.");
    Ok(())
}
