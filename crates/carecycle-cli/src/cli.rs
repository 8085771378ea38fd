use clap::{Args, Parser, Subcommand, ValueEnum};
use carecycle_core::models::{AnchorPolicy, ItemKind, PatternType};

/// Recurring tasks and appointments for a care group
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Manage tasks and appointments
    Item(ItemCommand),
    /// Manage the recurrence rule of an item
    Recur(RecurCommand),
    /// Mark an item as done and schedule its next occurrence
    Do(DoCommand),
    /// Process queued completion events
    Process(ProcessCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct ItemCommand {
    #[command(subcommand)]
    pub command: ItemSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ItemSubcommand {
    /// Add a new task or appointment
    Add(AddItemCommand),
    /// List items
    List(ListItemsCommand),
    /// Show an item, its rule and its series
    Show(ShowItemCommand),
    /// Delete an item (and its rule)
    Delete(DeleteItemCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct AddItemCommand {
    /// The title of the item
    pub title: String,
    /// Task or appointment
    #[clap(short, long, value_enum, default_value_t = KindArg::Task)]
    pub kind: KindArg,
    /// Due date (YYYY-MM-DD or an expression like 'tomorrow' or 'friday')
    #[clap(short, long)]
    pub due: Option<String>,
    /// Time of day (HH:MM)
    #[clap(short, long)]
    pub time: Option<String>,
    #[clap(short, long)]
    pub category: Option<String>,
    /// Group member responsible; repeat for several
    #[clap(short, long = "assignee")]
    pub assignees: Vec<String>,
    #[clap(long)]
    pub description: Option<String>,
    /// Care group id (defaults to the configured group)
    #[clap(short, long)]
    pub group: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    Task,
    Appointment,
}

impl From<KindArg> for ItemKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Task => ItemKind::Task,
            KindArg::Appointment => ItemKind::Appointment,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct ListItemsCommand {
    /// Include completed items
    #[clap(short, long)]
    pub all: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ShowItemCommand {
    /// The ID (or unique prefix) of the item
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteItemCommand {
    /// The ID (or unique prefix) of the item to delete
    pub id: String,
    /// Force deletion without confirmation
    #[clap(short, long)]
    pub force: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RecurCommand {
    #[command(subcommand)]
    pub command: RecurSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RecurSubcommand {
    /// Attach or replace the recurrence rule of an item
    Set(SetRuleCommand),
    /// Show the rule and its counters
    Show(RuleTargetCommand),
    /// Remove the rule; existing occurrences are kept
    Clear(RuleTargetCommand),
    /// Show upcoming due dates without writing anything
    Preview(PreviewCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct SetRuleCommand {
    /// The ID (or unique prefix) of the item
    pub id: String,
    #[command(flatten)]
    pub rule: RuleArgs,
}

/// Flags describing a recurrence rule.
#[derive(Args, Debug, Clone)]
pub struct RuleArgs {
    /// Pattern type
    #[clap(long, value_enum)]
    pub every: EveryArg,
    /// Repeat every N days/weeks/months/years
    #[clap(long, default_value_t = 1)]
    pub interval: i64,
    /// Weekdays for weekly rules (e.g. 'mon,wed,fri')
    #[clap(long)]
    pub on: Option<String>,
    /// Day of month for monthly rules (1-31)
    #[clap(long)]
    pub day_of_month: Option<i64>,
    /// Which weekday of the month for monthly rules (1-5)
    #[clap(long, requires = "weekday")]
    pub nth: Option<i64>,
    /// Weekday for monthly rules with --nth
    #[clap(long)]
    pub weekday: Option<String>,
    /// Month for yearly rules (1-12)
    #[clap(long)]
    pub month: Option<i64>,
    /// Day for yearly rules (1-31)
    #[clap(long)]
    pub day: Option<i64>,
    /// Stop after this many new occurrences
    #[clap(long, conflicts_with = "until")]
    pub count: Option<i64>,
    /// Last date an occurrence may fall on (inclusive)
    #[clap(long)]
    pub until: Option<String>,
    /// Date the next occurrence counts from
    #[clap(long, value_enum, default_value_t = AnchorArg::Due)]
    pub anchor: AnchorArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EveryArg {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl From<EveryArg> for PatternType {
    fn from(every: EveryArg) -> Self {
        match every {
            EveryArg::Daily => PatternType::Daily,
            EveryArg::Weekly => PatternType::Weekly,
            EveryArg::Monthly => PatternType::Monthly,
            EveryArg::Yearly => PatternType::Yearly,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorArg {
    /// The completed item's due date
    Due,
    /// The day the item was marked done
    Completion,
}

impl From<AnchorArg> for AnchorPolicy {
    fn from(anchor: AnchorArg) -> Self {
        match anchor {
            AnchorArg::Due => AnchorPolicy::DueDate,
            AnchorArg::Completion => AnchorPolicy::CompletionDate,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct RuleTargetCommand {
    /// The ID (or unique prefix) of the item
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct PreviewCommand {
    /// The ID (or unique prefix) of the item
    pub id: String,
    /// Number of occurrences to show (defaults to the configured preview count)
    #[clap(long, short)]
    pub count: Option<usize>,
    /// Anchor date to preview from (defaults to the item's due date)
    #[clap(long)]
    pub from: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct DoCommand {
    /// The ID (or unique prefix) of the item to mark as done
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct ProcessCommand {
    /// Keep polling the queue until interrupted
    #[clap(long)]
    pub watch: bool,
    /// Put failed events back in the queue before processing
    #[clap(long)]
    pub retry_failed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_weekly_rule_flags() {
        let cli = Cli::parse_from([
            "carecycle", "recur", "set", "ab12", "--every", "weekly", "--on", "mon,wed", "--count", "4",
        ]);
        let Commands::Recur(RecurCommand {
            command: RecurSubcommand::Set(set),
        }) = cli.command
        else {
            panic!("expected recur set");
        };
        assert_eq!(set.id, "ab12");
        assert_eq!(set.rule.every, EveryArg::Weekly);
        assert_eq!(set.rule.interval, 1);
        assert_eq!(set.rule.on.as_deref(), Some("mon,wed"));
        assert_eq!(set.rule.count, Some(4));
        assert_eq!(set.rule.anchor, AnchorArg::Due);
    }

    #[test]
    fn count_and_until_conflict() {
        let result = Cli::try_parse_from([
            "carecycle", "recur", "set", "ab12", "--every", "daily", "--count", "3", "--until", "2025-01-01",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn json_flag_is_global() {
        let cli = Cli::parse_from(["carecycle", "item", "list", "--json"]);
        assert!(cli.json);
    }
}
