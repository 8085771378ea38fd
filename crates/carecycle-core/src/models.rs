use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Care items
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Task,
    Appointment,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid item kind: {0}")]
pub struct ParseItemKindError(String);

impl FromStr for ItemKind {
    type Err = ParseItemKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "task" => Ok(ItemKind::Task),
            "appointment" | "appt" => Ok(ItemKind::Appointment),
            _ => Err(ParseItemKindError(s.to_string())),
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Task => write!(f, "task"),
            ItemKind::Appointment => write!(f, "appointment"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Open,
    Done,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Open => write!(f, "open"),
            ItemStatus::Done => write!(f, "done"),
        }
    }
}

/// A task or appointment belonging to a care group.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CareItem {
    pub id: Uuid,
    pub group_id: Uuid,
    pub kind: ItemKind,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub assignees: Json<Vec<String>>,
    pub due_date: Option<NaiveDate>,
    /// Start time for appointments; copied verbatim into each occurrence.
    pub due_time: Option<NaiveTime>,
    pub status: ItemStatus,
    pub completed_at: Option<DateTime<Utc>>,
    /// The item owning the recurrence rule. `None` on the owner itself and on
    /// non-recurring items.
    pub series_parent_id: Option<Uuid>,
    /// Anchor date of the completion that produced this occurrence.
    pub source_anchor_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CareItem {
    /// Id of the item whose rule governs this item's series.
    #[inline]
    pub fn rule_owner_id(&self) -> Uuid {
        self.series_parent_id.unwrap_or(self.id)
    }
}

impl Default for CareItem {
    fn default() -> Self {
        Self {
            id: Uuid::now_v7(),
            group_id: Uuid::nil(),
            kind: ItemKind::Task,
            title: String::new(),
            description: None,
            category: None,
            assignees: Json(Vec::new()),
            due_date: None,
            due_time: None,
            status: ItemStatus::Open,
            completed_at: None,
            series_parent_id: None,
            source_anchor_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewItemData {
    pub group_id: Uuid,
    pub kind: ItemKind,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub assignees: Vec<String>,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
}

impl Default for NewItemData {
    fn default() -> Self {
        Self {
            group_id: Uuid::nil(),
            kind: ItemKind::Task,
            title: String::new(),
            description: None,
            category: None,
            assignees: Vec::new(),
            due_date: None,
            due_time: None,
        }
    }
}

// ============================================================================
// Recurrence rule model
// ============================================================================

/// "Every N days/weeks/months/years". Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Interval(NonZeroU32);

impl Interval {
    pub const ONE: Interval = Interval(NonZeroU32::MIN);

    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Interval)
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maps a weekday ordinal (0 = Sunday .. 6 = Saturday) to a [`Weekday`].
pub fn weekday_from_ordinal(ordinal: u8) -> Option<Weekday> {
    match ordinal {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

#[inline]
pub fn weekday_ordinal(weekday: Weekday) -> u8 {
    weekday.num_days_from_sunday() as u8
}

/// Non-empty set of weekdays, stored as a bitmask indexed by Sunday-based ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct WeekdaySet(u8);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WeekdaySetError {
    #[error("at least one weekday must be selected")]
    Empty,
    #[error("weekday ordinal {0} is out of range 0-6")]
    OutOfRange(u8),
}

impl WeekdaySet {
    pub fn from_ordinals<I>(ordinals: I) -> Result<Self, WeekdaySetError>
    where
        I: IntoIterator<Item = u8>,
    {
        let mut mask = 0u8;
        for ordinal in ordinals {
            if ordinal > 6 {
                return Err(WeekdaySetError::OutOfRange(ordinal));
            }
            mask |= 1 << ordinal;
        }
        if mask == 0 {
            return Err(WeekdaySetError::Empty);
        }
        Ok(WeekdaySet(mask))
    }

    pub fn from_weekdays<I>(weekdays: I) -> Result<Self, WeekdaySetError>
    where
        I: IntoIterator<Item = Weekday>,
    {
        Self::from_ordinals(weekdays.into_iter().map(weekday_ordinal))
    }

    #[inline]
    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0 & (1 << weekday_ordinal(weekday)) != 0
    }

    /// Selected weekdays in week order, Sunday first.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        (0u8..7)
            .filter(move |ordinal| self.0 & (1 << ordinal) != 0)
            .filter_map(weekday_from_ordinal)
    }

    /// The earliest selected weekday of a Sunday-based week.
    pub fn first(&self) -> Weekday {
        // Non-empty by construction.
        weekday_from_ordinal(self.0.trailing_zeros() as u8).unwrap_or(Weekday::Sun)
    }

    pub fn ordinals(&self) -> Vec<u8> {
        (0u8..7).filter(|ordinal| self.0 & (1 << ordinal) != 0).collect()
    }
}

impl TryFrom<Vec<u8>> for WeekdaySet {
    type Error = WeekdaySetError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        WeekdaySet::from_ordinals(value)
    }
}

impl From<WeekdaySet> for Vec<u8> {
    fn from(set: WeekdaySet) -> Self {
        set.ordinals()
    }
}

/// Day of month, 1-31. Clamped to the target month when evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DayOfMonth(u8);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{what} {value} is out of range {min}-{max}")]
pub struct RangeError {
    pub what: &'static str,
    pub value: u32,
    pub min: u32,
    pub max: u32,
}

impl DayOfMonth {
    pub fn new(day: u8) -> Option<Self> {
        (1..=31).contains(&day).then_some(DayOfMonth(day))
    }

    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for DayOfMonth {
    type Error = RangeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        DayOfMonth::new(value).ok_or(RangeError {
            what: "day of month",
            value: value as u32,
            min: 1,
            max: 31,
        })
    }
}

impl From<DayOfMonth> for u8 {
    fn from(day: DayOfMonth) -> Self {
        day.0
    }
}

/// Which instance of a weekday within a month, 1-5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct NthOccurrence(u8);

impl NthOccurrence {
    pub fn new(nth: u8) -> Option<Self> {
        (1..=5).contains(&nth).then_some(NthOccurrence(nth))
    }

    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for NthOccurrence {
    type Error = RangeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        NthOccurrence::new(value).ok_or(RangeError {
            what: "nth occurrence",
            value: value as u32,
            min: 1,
            max: 5,
        })
    }
}

impl From<NthOccurrence> for u8 {
    fn from(nth: NthOccurrence) -> Self {
        nth.0
    }
}

/// A month/day pair that exists in at least a leap year (Feb 29 is accepted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "MonthDayRepr", into = "MonthDayRepr")]
pub struct MonthDay {
    month: u8,
    day: u8,
}

#[derive(Serialize, Deserialize)]
struct MonthDayRepr {
    month: u8,
    day: u8,
}

impl MonthDay {
    pub fn new(month: u8, day: u8) -> Option<Self> {
        if !(1..=12).contains(&month) || day == 0 {
            return None;
        }
        // Leap year 2000 gives every month its longest length.
        let longest = crate::patterns::days_in_month(2000, month as u32);
        (day as u32 <= longest).then_some(MonthDay { month, day })
    }

    #[inline]
    pub fn month(self) -> u8 {
        self.month
    }

    #[inline]
    pub fn day(self) -> u8 {
        self.day
    }
}

impl TryFrom<MonthDayRepr> for MonthDay {
    type Error = String;

    fn try_from(repr: MonthDayRepr) -> Result<Self, Self::Error> {
        MonthDay::new(repr.month, repr.day)
            .ok_or_else(|| format!("{}/{} is not a valid month/day", repr.month, repr.day))
    }
}

impl From<MonthDay> for MonthDayRepr {
    fn from(md: MonthDay) -> Self {
        MonthDayRepr {
            month: md.month,
            day: md.day,
        }
    }
}

/// The two mutually exclusive forms of a monthly rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum MonthlyPattern {
    DayOfMonth { day: DayOfMonth },
    NthWeekday { nth: NthOccurrence, weekday: Weekday },
}

/// Recurrence pattern; each variant carries only its own parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum Pattern {
    Daily,
    Weekly { days: WeekdaySet },
    Monthly(MonthlyPattern),
    Yearly(MonthDay),
}

impl Pattern {
    pub fn pattern_type(&self) -> PatternType {
        match self {
            Pattern::Daily => PatternType::Daily,
            Pattern::Weekly { .. } => PatternType::Weekly,
            Pattern::Monthly(_) => PatternType::Monthly,
            Pattern::Yearly(_) => PatternType::Yearly,
        }
    }
}

/// Discriminant of [`Pattern`], as submitted by the rule-editing form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid pattern type: {0}")]
pub struct ParsePatternTypeError(String);

impl FromStr for PatternType {
    type Err = ParsePatternTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" | "day" => Ok(PatternType::Daily),
            "weekly" | "week" => Ok(PatternType::Weekly),
            "monthly" | "month" => Ok(PatternType::Monthly),
            "yearly" | "year" | "annually" => Ok(PatternType::Yearly),
            _ => Err(ParsePatternTypeError(s.to_string())),
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternType::Daily => write!(f, "daily"),
            PatternType::Weekly => write!(f, "weekly"),
            PatternType::Monthly => write!(f, "monthly"),
            PatternType::Yearly => write!(f, "yearly"),
        }
    }
}

/// When a series stops producing occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum EndCondition {
    Never,
    AfterOccurrences(NonZeroU32),
    UntilDate(NaiveDate),
}

impl fmt::Display for EndCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndCondition::Never => write!(f, "never ends"),
            EndCondition::AfterOccurrences(n) => write!(f, "ends after {} occurrence(s)", n),
            EndCondition::UntilDate(date) => write!(f, "ends on {}", date),
        }
    }
}

/// Which date of a completed occurrence anchors the next one.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AnchorPolicy {
    #[default]
    DueDate,
    CompletionDate,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid anchor policy: {0}")]
pub struct ParseAnchorPolicyError(String);

impl FromStr for AnchorPolicy {
    type Err = ParseAnchorPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "due" | "due_date" => Ok(AnchorPolicy::DueDate),
            "completion" | "completed" | "completion_date" => Ok(AnchorPolicy::CompletionDate),
            _ => Err(ParseAnchorPolicyError(s.to_string())),
        }
    }
}

impl fmt::Display for AnchorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorPolicy::DueDate => write!(f, "due_date"),
            AnchorPolicy::CompletionDate => write!(f, "completion_date"),
        }
    }
}

impl AnchorPolicy {
    /// Picks the anchor for a completed occurrence.
    pub fn anchor_for(&self, due_date: Option<NaiveDate>, completed_on: NaiveDate) -> NaiveDate {
        match self {
            AnchorPolicy::DueDate => due_date.unwrap_or(completed_on),
            AnchorPolicy::CompletionDate => completed_on,
        }
    }
}

/// A validated recurrence definition, not yet attached to an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub pattern: Pattern,
    pub interval: Interval,
    pub end_condition: EndCondition,
    #[serde(default)]
    pub anchor_policy: AnchorPolicy,
    pub created_on: NaiveDate,
}

/// A recurrence rule attached to exactly one parent item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub id: Uuid,
    pub parent_item_id: Uuid,
    pub group_id: Uuid,
    #[serde(flatten)]
    pub definition: RuleDefinition,
    pub created_occurrences: u32,
    pub last_occurrence_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurrenceRule {
    /// A fresh rule with zeroed counters.
    pub fn new(parent_item_id: Uuid, group_id: Uuid, definition: RuleDefinition) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            parent_item_id,
            group_id,
            definition,
            created_occurrences: 0,
            last_occurrence_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn pattern(&self) -> &Pattern {
        &self.definition.pattern
    }

    #[inline]
    pub fn interval(&self) -> Interval {
        self.definition.interval
    }

    #[inline]
    pub fn end_condition(&self) -> &EndCondition {
        &self.definition.end_condition
    }

    /// Counters as they would be after materializing an occurrence on `date`,
    /// or `None` once the occurrence counter is exhausted.
    pub fn advanced(&self, date: NaiveDate) -> Option<RuleCounters> {
        Some(RuleCounters {
            created_occurrences: self.created_occurrences.checked_add(1)?,
            last_occurrence_date: Some(date),
        })
    }

    pub fn counters(&self) -> RuleCounters {
        RuleCounters {
            created_occurrences: self.created_occurrences,
            last_occurrence_date: self.last_occurrence_date,
        }
    }
}

/// The mutable part of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCounters {
    pub created_occurrences: u32,
    pub last_occurrence_date: Option<NaiveDate>,
}

// ============================================================================
// Completion and materialization results
// ============================================================================

/// Result of writing a next occurrence.
#[derive(Debug, Clone)]
pub enum MaterializeOutcome {
    Created { item: CareItem, rule: RecurrenceRule },
    /// The idempotency key was already consumed or the rule moved on; nothing was written.
    AlreadyProcessed { existing_item_id: Option<Uuid> },
}

impl MaterializeOutcome {
    pub fn item_id(&self) -> Option<Uuid> {
        match self {
            MaterializeOutcome::Created { item, .. } => Some(item.id),
            MaterializeOutcome::AlreadyProcessed { existing_item_id } => *existing_item_id,
        }
    }
}

/// What happened to the follow-up of a completion.
#[derive(Debug, Clone)]
pub enum FollowUp {
    /// The item is not part of a recurring series.
    None,
    /// The item was already done; nothing was enqueued.
    AlreadyDone,
    /// A completion event was enqueued for the next occurrence.
    Enqueued(CompletionEvent),
}

#[derive(Debug)]
pub struct CompletionResult {
    pub completed: CareItem,
    pub follow_up: FollowUp,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Processed,
    Failed,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventStatus::Pending => write!(f, "pending"),
            EventStatus::Processed => write!(f, "processed"),
            EventStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A queued request to produce the occurrence after `anchor_date`.
/// `(parent_item_id, anchor_date)` is the idempotency key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompletionEvent {
    pub id: Uuid,
    pub parent_item_id: Uuid,
    pub anchor_date: NaiveDate,
    pub completed_item_id: Uuid,
    pub status: EventStatus,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub result_item_id: Option<Uuid>,
    pub enqueued_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// How a single event was resolved by the consumer.
#[derive(Debug, Clone)]
pub enum EventResolution {
    Scheduled { item: CareItem, rule: RecurrenceRule },
    Duplicate { existing_item_id: Option<Uuid> },
    SeriesEnded,
    /// The rule was removed between completion and processing.
    RuleRemoved,
    /// Processing failed; the event stays pending until attempts run out.
    Retrying { attempts: u32, error: String },
    Exhausted { attempts: u32, error: String },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DrainSummary {
    pub processed: usize,
    pub created: usize,
    pub ended: usize,
    pub duplicates: usize,
    pub retrying: usize,
    pub exhausted: usize,
}

impl DrainSummary {
    /// Adds the counters of another drain to this one.
    pub fn absorb(&mut self, other: &DrainSummary) {
        self.processed += other.processed;
        self.created += other.created;
        self.ended += other.ended;
        self.duplicates += other.duplicates;
        self.retrying += other.retrying;
        self.exhausted += other.exhausted;
    }
}

/// Retry and polling policy for the completion event consumer.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Attempts before an event is marked failed
    pub max_attempts: u32,
    /// Events fetched per drain
    pub batch_size: u32,
    /// Seconds between worker polls
    pub poll_interval_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            batch_size: 50,
            poll_interval_secs: 30,
        }
    }
}
