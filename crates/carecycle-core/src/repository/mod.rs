use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{
    CareItem, CompletionEvent, CompletionResult, DrainSummary, EventResolution,
    MaterializeOutcome, NewItemData, QueueConfig, RecurrenceRule, RuleDefinition,
};
use crate::recurrence::NextOccurrence;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

pub mod events;
pub mod items;
pub mod materialization;
pub mod rules;

/// Domain-specific trait for care item operations
#[async_trait]
pub trait ItemRepository {
    async fn add_item(&self, data: NewItemData) -> Result<CareItem, CoreError>;
    async fn find_item_by_id(&self, id: Uuid) -> Result<Option<CareItem>, CoreError>;
    async fn find_items_by_short_id_prefix(&self, short_id: &str) -> Result<Vec<CareItem>, CoreError>;
    async fn list_items(&self, include_done: bool) -> Result<Vec<CareItem>, CoreError>;
    async fn find_series_items(&self, parent_item_id: Uuid) -> Result<Vec<CareItem>, CoreError>;
    async fn delete_item(&self, id: Uuid) -> Result<(), CoreError>;
    /// Marks an item done and, for recurring items, enqueues the completion
    /// event in the same transaction. Never waits on materialization.
    ///
    /// `completed_on` is the completion day in the group's local calendar;
    /// completion-anchored rules count from it, not from the UTC date of
    /// `completed_at`.
    async fn complete_item(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
        completed_on: NaiveDate,
    ) -> Result<CompletionResult, CoreError>;
}

/// Domain-specific trait for recurrence rule operations
#[async_trait]
pub trait RuleRepository {
    async fn attach_rule(&self, parent_item_id: Uuid, definition: RuleDefinition) -> Result<RecurrenceRule, CoreError>;
    /// Replaces the definition of an existing rule, keeping its counters.
    async fn update_rule(&self, parent_item_id: Uuid, definition: RuleDefinition) -> Result<RecurrenceRule, CoreError>;
    async fn find_rule_for_item(&self, parent_item_id: Uuid) -> Result<Option<RecurrenceRule>, CoreError>;
    async fn delete_rule(&self, parent_item_id: Uuid) -> Result<(), CoreError>;
}

/// Domain-specific trait for writing next occurrences
#[async_trait]
pub trait MaterializationRepository {
    /// Writes the next occurrence and advances the rule's counters in one
    /// conditional transaction keyed on the rule's `last_occurrence_date`.
    async fn materialize(
        &self,
        next: NextOccurrence,
        parent_item: &CareItem,
        rule: &RecurrenceRule,
    ) -> Result<MaterializeOutcome, CoreError>;
    async fn find_occurrence_by_key(&self, parent_item_id: Uuid, anchor_date: NaiveDate) -> Result<Option<CareItem>, CoreError>;
}

/// Domain-specific trait for the completion event queue
#[async_trait]
pub trait EventRepository {
    async fn find_event(&self, parent_item_id: Uuid, anchor_date: NaiveDate) -> Result<Option<CompletionEvent>, CoreError>;
    async fn find_pending_events(&self, limit: u32) -> Result<Vec<CompletionEvent>, CoreError>;
    async fn find_failed_events(&self) -> Result<Vec<CompletionEvent>, CoreError>;
    /// Puts failed events back in the queue with a fresh attempt budget.
    async fn requeue_failed_events(&self) -> Result<u64, CoreError>;
    async fn process_event(&self, event: &CompletionEvent) -> Result<EventResolution, CoreError>;
    async fn drain_pending_events(&self) -> Result<DrainSummary, CoreError>;
}

/// Main repository trait that composes all domain traits
#[async_trait]
pub trait Repository:
    ItemRepository +
    RuleRepository +
    MaterializationRepository +
    EventRepository +
    Send +
    Sync
{
    // This trait automatically composes all domain-specific repositories
}

/// SQLite implementation of the repository pattern
pub struct SqliteRepository {
    pool: DbPool,
    queue_config: QueueConfig,
}

impl SqliteRepository {
    pub fn new(pool: DbPool, queue_config: QueueConfig) -> Self {
        Self { pool, queue_config }
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn queue_config(&self) -> &QueueConfig {
        &self.queue_config
    }
}

impl Repository for SqliteRepository {}
