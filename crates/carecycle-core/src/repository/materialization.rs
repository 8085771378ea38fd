use crate::error::CoreError;
use crate::models::{CareItem, ItemStatus, MaterializeOutcome, RecurrenceRule};
use crate::recurrence::NextOccurrence;
use crate::repository::rules::RuleRow;
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

#[async_trait]
impl super::MaterializationRepository for SqliteRepository {
    async fn materialize(
        &self,
        next: NextOccurrence,
        parent_item: &CareItem,
        rule: &RecurrenceRule,
    ) -> Result<MaterializeOutcome, CoreError> {
        if rule.parent_item_id != parent_item.id {
            return Err(CoreError::InvalidInput(format!(
                "Rule {} does not belong to item {}",
                rule.id, parent_item.id
            )));
        }
        if rule.advanced(next.due_date).is_none() {
            return Err(CoreError::InvalidInput(format!(
                "Rule {} cannot record more occurrences",
                rule.id
            )));
        }

        let mut tx = self.pool().begin().await?;

        // Idempotency key already consumed: report the earlier result.
        let existing: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM care_items WHERE series_parent_id = $1 AND source_anchor_date = $2",
        )
        .bind(parent_item.id)
        .bind(next.anchor_date)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some((existing_item_id,)) = existing {
            tracing::debug!(
                parent_item_id = %parent_item.id,
                anchor = %next.anchor_date,
                %existing_item_id,
                "occurrence already materialized"
            );
            return Ok(MaterializeOutcome::AlreadyProcessed {
                existing_item_id: Some(existing_item_id),
            });
        }

        let now = Utc::now();
        let advanced: Option<RuleRow> = sqlx::query_as(
            r#"UPDATE recurrence_rules
            SET created_occurrences = created_occurrences + 1, last_occurrence_date = $1, updated_at = $2
            WHERE id = $3 AND last_occurrence_date IS $4
            RETURNING *
            "#,
        )
        .bind(next.due_date)
        .bind(now)
        .bind(rule.id)
        .bind(rule.last_occurrence_date)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(advanced) = advanced else {
            // Someone else moved the rule on since it was read.
            tracing::warn!(
                rule_id = %rule.id,
                expected_last = ?rule.last_occurrence_date,
                anchor = %next.anchor_date,
                "stale recurrence rule, skipping materialization"
            );
            return Ok(MaterializeOutcome::AlreadyProcessed { existing_item_id: None });
        };

        let item = CareItem {
            id: Uuid::now_v7(),
            group_id: parent_item.group_id,
            kind: parent_item.kind,
            title: parent_item.title.clone(),
            description: parent_item.description.clone(),
            category: parent_item.category.clone(),
            assignees: parent_item.assignees.clone(),
            due_date: Some(next.due_date),
            due_time: parent_item.due_time,
            status: ItemStatus::Open,
            completed_at: None,
            series_parent_id: Some(parent_item.id),
            source_anchor_date: Some(next.anchor_date),
            created_at: now,
            updated_at: now,
        };

        match Self::insert_item_in_transaction(&mut tx, &item).await {
            Ok(()) => {}
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                // Lost a race on the idempotency key; the transaction rolls back on drop.
                tracing::warn!(
                    parent_item_id = %parent_item.id,
                    anchor = %next.anchor_date,
                    "concurrent materialization won the idempotency key"
                );
                return Ok(MaterializeOutcome::AlreadyProcessed { existing_item_id: None });
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;

        let rule = advanced.into_rule()?;
        tracing::info!(
            item_id = %item.id,
            parent_item_id = %parent_item.id,
            due_date = %next.due_date,
            created_occurrences = rule.created_occurrences,
            "materialized next occurrence"
        );
        Ok(MaterializeOutcome::Created { item, rule })
    }

    async fn find_occurrence_by_key(&self, parent_item_id: Uuid, anchor_date: NaiveDate) -> Result<Option<CareItem>, CoreError> {
        let item = sqlx::query_as(
            "SELECT * FROM care_items WHERE series_parent_id = $1 AND source_anchor_date = $2",
        )
        .bind(parent_item_id)
        .bind(anchor_date)
        .fetch_optional(self.pool())
        .await?;
        Ok(item)
    }
}
