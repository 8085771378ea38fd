use crate::error::CoreError;
use crate::models::{
    AnchorPolicy, CareItem, EndCondition, Interval, Pattern, RecurrenceRule, RuleDefinition,
};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Storage shape of a rule; the unions are kept as JSON documents.
#[derive(Debug, FromRow)]
pub(crate) struct RuleRow {
    pub id: Uuid,
    pub parent_item_id: Uuid,
    pub group_id: Uuid,
    pub pattern: Json<Pattern>,
    pub interval_value: i64,
    pub end_condition: Json<EndCondition>,
    pub anchor_policy: AnchorPolicy,
    pub created_on: NaiveDate,
    pub created_occurrences: i64,
    pub last_occurrence_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RuleRow {
    pub(crate) fn into_rule(self) -> Result<RecurrenceRule, CoreError> {
        let interval = u32::try_from(self.interval_value)
            .ok()
            .and_then(Interval::new)
            .ok_or_else(|| {
                CoreError::InvalidInput(format!(
                    "Stored rule {} has invalid interval {}",
                    self.id, self.interval_value
                ))
            })?;
        let created_occurrences = u32::try_from(self.created_occurrences).map_err(|_| {
            CoreError::InvalidInput(format!(
                "Stored rule {} has invalid occurrence count {}",
                self.id, self.created_occurrences
            ))
        })?;

        Ok(RecurrenceRule {
            id: self.id,
            parent_item_id: self.parent_item_id,
            group_id: self.group_id,
            definition: RuleDefinition {
                pattern: self.pattern.0,
                interval,
                end_condition: self.end_condition.0,
                anchor_policy: self.anchor_policy,
                created_on: self.created_on,
            },
            created_occurrences,
            last_occurrence_date: self.last_occurrence_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl super::RuleRepository for SqliteRepository {
    async fn attach_rule(&self, parent_item_id: Uuid, definition: RuleDefinition) -> Result<RecurrenceRule, CoreError> {
        let mut tx = self.pool().begin().await?;

        let parent: CareItem = sqlx::query_as("SELECT * FROM care_items WHERE id = $1")
            .bind(parent_item_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::NotFound(parent_item_id.to_string()))?;

        if let Some(owner) = parent.series_parent_id {
            return Err(CoreError::InvalidInput(format!(
                "Item is an occurrence of series {}; edit the rule on that item instead",
                owner
            )));
        }

        let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM recurrence_rules WHERE parent_item_id = $1")
            .bind(parent_item_id)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(CoreError::RuleAlreadyExists(parent_item_id.to_string()));
        }

        let rule = RecurrenceRule::new(parent.id, parent.group_id, definition);

        sqlx::query(
            r#"INSERT INTO recurrence_rules (id, parent_item_id, group_id, pattern, interval_value, end_condition, anchor_policy, created_on, created_occurrences, last_occurrence_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"#,
        )
        .bind(rule.id)
        .bind(rule.parent_item_id)
        .bind(rule.group_id)
        .bind(Json(rule.definition.pattern))
        .bind(rule.definition.interval.get() as i64)
        .bind(Json(rule.definition.end_condition))
        .bind(rule.definition.anchor_policy)
        .bind(rule.definition.created_on)
        .bind(rule.created_occurrences as i64)
        .bind(rule.last_occurrence_date)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(rule_id = %rule.id, %parent_item_id, "attached recurrence rule");
        Ok(rule)
    }

    async fn update_rule(&self, parent_item_id: Uuid, definition: RuleDefinition) -> Result<RecurrenceRule, CoreError> {
        let row: Option<RuleRow> = sqlx::query_as(
            r#"UPDATE recurrence_rules
            SET pattern = $1, interval_value = $2, end_condition = $3, anchor_policy = $4, updated_at = $5
            WHERE parent_item_id = $6
            RETURNING *
            "#,
        )
        .bind(Json(definition.pattern))
        .bind(definition.interval.get() as i64)
        .bind(Json(definition.end_condition))
        .bind(definition.anchor_policy)
        .bind(Utc::now())
        .bind(parent_item_id)
        .fetch_optional(self.pool())
        .await?;

        row.ok_or_else(|| CoreError::NotFound(format!("No recurrence rule on item {}", parent_item_id)))?
            .into_rule()
    }

    async fn find_rule_for_item(&self, parent_item_id: Uuid) -> Result<Option<RecurrenceRule>, CoreError> {
        let row: Option<RuleRow> = sqlx::query_as("SELECT * FROM recurrence_rules WHERE parent_item_id = $1")
            .bind(parent_item_id)
            .fetch_optional(self.pool())
            .await?;
        row.map(RuleRow::into_rule).transpose()
    }

    async fn delete_rule(&self, parent_item_id: Uuid) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM recurrence_rules WHERE parent_item_id = $1")
            .bind(parent_item_id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("No recurrence rule on item {}", parent_item_id)));
        }
        tracing::info!(%parent_item_id, "removed recurrence rule");
        Ok(())
    }
}
