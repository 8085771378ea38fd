use crate::error::CoreError;
use crate::models::{
    CareItem, CompletionEvent, CompletionResult, EventStatus, FollowUp, ItemStatus, NewItemData,
};
use crate::repository::rules::RuleRow;
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

#[async_trait]
impl super::ItemRepository for SqliteRepository {
    async fn add_item(&self, data: NewItemData) -> Result<CareItem, CoreError> {
        if data.title.trim().is_empty() {
            return Err(CoreError::InvalidInput("Item title cannot be empty".to_string()));
        }

        let now = Utc::now();
        let item = CareItem {
            id: Uuid::now_v7(),
            group_id: data.group_id,
            kind: data.kind,
            title: data.title,
            description: data.description,
            category: data.category,
            assignees: Json(data.assignees),
            due_date: data.due_date,
            due_time: data.due_time,
            status: ItemStatus::Open,
            completed_at: None,
            series_parent_id: None,
            source_anchor_date: None,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool().begin().await?;
        Self::insert_item_in_transaction(&mut tx, &item).await?;
        tx.commit().await?;
        Ok(item)
    }

    async fn find_item_by_id(&self, id: Uuid) -> Result<Option<CareItem>, CoreError> {
        let item = sqlx::query_as("SELECT * FROM care_items WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(item)
    }

    async fn find_items_by_short_id_prefix(&self, short_id: &str) -> Result<Vec<CareItem>, CoreError> {
        // Ids are stored as 16-byte blobs; match against their hex form.
        let mut pattern: String = short_id
            .chars()
            .filter(|c| *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        pattern.push('%');

        let items: Vec<CareItem> = sqlx::query_as("SELECT * FROM care_items WHERE lower(hex(id)) LIKE ?")
            .bind(pattern)
            .fetch_all(self.pool())
            .await?;
        Ok(items)
    }

    async fn list_items(&self, include_done: bool) -> Result<Vec<CareItem>, CoreError> {
        let sql = if include_done {
            "SELECT * FROM care_items ORDER BY due_date IS NULL, due_date, created_at"
        } else {
            "SELECT * FROM care_items WHERE status = 'open' ORDER BY due_date IS NULL, due_date, created_at"
        };
        let items = sqlx::query_as(sql).fetch_all(self.pool()).await?;
        Ok(items)
    }

    async fn find_series_items(&self, parent_item_id: Uuid) -> Result<Vec<CareItem>, CoreError> {
        let items = sqlx::query_as(
            r#"SELECT * FROM care_items
            WHERE id = $1 OR series_parent_id = $1
            ORDER BY due_date IS NULL, due_date, created_at"#,
        )
        .bind(parent_item_id)
        .fetch_all(self.pool())
        .await?;
        Ok(items)
    }

    async fn delete_item(&self, id: Uuid) -> Result<(), CoreError> {
        // The rule (if any) goes with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM care_items WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn complete_item(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
        completed_on: NaiveDate,
    ) -> Result<CompletionResult, CoreError> {
        let mut tx = self.pool().begin().await?;

        let item: CareItem = sqlx::query_as("SELECT * FROM care_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

        if item.status == ItemStatus::Done {
            // Repeated trigger for the same completion.
            tx.commit().await?;
            return Ok(CompletionResult {
                completed: item,
                follow_up: FollowUp::AlreadyDone,
            });
        }

        let completed: CareItem = sqlx::query_as(
            r#"UPDATE care_items
            SET status = $1, completed_at = $2, updated_at = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(ItemStatus::Done)
        .bind(completed_at)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let rule_row: Option<RuleRow> = sqlx::query_as("SELECT * FROM recurrence_rules WHERE parent_item_id = $1")
            .bind(completed.rule_owner_id())
            .fetch_optional(&mut *tx)
            .await?;

        let follow_up = match rule_row {
            Some(row) => {
                let rule = row.into_rule()?;
                let anchor = rule
                    .definition
                    .anchor_policy
                    .anchor_for(completed.due_date, completed_on);
                let event = Self::enqueue_event_in_transaction(&mut tx, rule.parent_item_id, anchor, completed.id).await?;
                tracing::debug!(
                    item_id = %completed.id,
                    parent_item_id = %rule.parent_item_id,
                    %anchor,
                    "enqueued completion event"
                );
                FollowUp::Enqueued(event)
            }
            None => FollowUp::None,
        };

        tx.commit().await?;
        Ok(CompletionResult { completed, follow_up })
    }
}

impl SqliteRepository {
    pub(crate) async fn insert_item_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        item: &CareItem,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO care_items (id, group_id, kind, title, description, category, assignees, due_date, due_time, status, completed_at, series_parent_id, source_anchor_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"#,
        )
        .bind(item.id)
        .bind(item.group_id)
        .bind(item.kind)
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.category)
        .bind(&item.assignees)
        .bind(item.due_date)
        .bind(item.due_time)
        .bind(item.status)
        .bind(item.completed_at)
        .bind(item.series_parent_id)
        .bind(item.source_anchor_date)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Inserts the event for `(parent_item_id, anchor_date)` unless one
    /// already exists, and returns whichever is stored.
    pub(crate) async fn enqueue_event_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        parent_item_id: Uuid,
        anchor_date: chrono::NaiveDate,
        completed_item_id: Uuid,
    ) -> Result<CompletionEvent, CoreError> {
        sqlx::query(
            r#"INSERT INTO completion_events (id, parent_item_id, anchor_date, completed_item_id, status, attempts, enqueued_at)
            VALUES ($1, $2, $3, $4, $5, 0, $6)
            ON CONFLICT (parent_item_id, anchor_date) DO NOTHING"#,
        )
        .bind(Uuid::now_v7())
        .bind(parent_item_id)
        .bind(anchor_date)
        .bind(completed_item_id)
        .bind(EventStatus::Pending)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

        let event = sqlx::query_as(
            "SELECT * FROM completion_events WHERE parent_item_id = $1 AND anchor_date = $2",
        )
        .bind(parent_item_id)
        .bind(anchor_date)
        .fetch_one(&mut **tx)
        .await?;
        Ok(event)
    }
}
