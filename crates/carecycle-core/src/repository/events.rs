use crate::error::CoreError;
use crate::models::{
    CareItem, CompletionEvent, DrainSummary, EventResolution, EventStatus, MaterializeOutcome,
};
use crate::recurrence;
use crate::repository::{ItemRepository, MaterializationRepository, RuleRepository, SqliteRepository};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

#[async_trait]
impl super::EventRepository for SqliteRepository {
    async fn find_event(&self, parent_item_id: Uuid, anchor_date: NaiveDate) -> Result<Option<CompletionEvent>, CoreError> {
        let event = sqlx::query_as(
            "SELECT * FROM completion_events WHERE parent_item_id = $1 AND anchor_date = $2",
        )
        .bind(parent_item_id)
        .bind(anchor_date)
        .fetch_optional(self.pool())
        .await?;
        Ok(event)
    }

    async fn find_pending_events(&self, limit: u32) -> Result<Vec<CompletionEvent>, CoreError> {
        let events = sqlx::query_as(
            "SELECT * FROM completion_events WHERE status = $1 ORDER BY enqueued_at, anchor_date LIMIT $2",
        )
        .bind(EventStatus::Pending)
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;
        Ok(events)
    }

    async fn find_failed_events(&self) -> Result<Vec<CompletionEvent>, CoreError> {
        let events = sqlx::query_as(
            "SELECT * FROM completion_events WHERE status = $1 ORDER BY enqueued_at",
        )
        .bind(EventStatus::Failed)
        .fetch_all(self.pool())
        .await?;
        Ok(events)
    }

    async fn requeue_failed_events(&self) -> Result<u64, CoreError> {
        let result = sqlx::query(
            "UPDATE completion_events SET status = $1, attempts = 0, last_error = NULL WHERE status = $2",
        )
        .bind(EventStatus::Pending)
        .bind(EventStatus::Failed)
        .execute(self.pool())
        .await?;

        let requeued = result.rows_affected();
        if requeued > 0 {
            tracing::info!(requeued, "requeued failed completion events");
        }
        Ok(requeued)
    }

    async fn process_event(&self, event: &CompletionEvent) -> Result<EventResolution, CoreError> {
        match self.resolve_event(event).await {
            Ok(resolution) => {
                let result_item_id = match &resolution {
                    EventResolution::Scheduled { item, .. } => Some(item.id),
                    EventResolution::Duplicate { existing_item_id } => *existing_item_id,
                    _ => None,
                };
                self.mark_event_processed(event.id, result_item_id).await?;
                Ok(resolution)
            }
            Err(err) => self.record_event_failure(event, &err).await,
        }
    }

    async fn drain_pending_events(&self) -> Result<DrainSummary, CoreError> {
        let events = self.find_pending_events(self.queue_config().batch_size).await?;
        let mut summary = DrainSummary::default();

        for event in &events {
            let resolution = self.process_event(event).await?;
            summary.processed += 1;
            match resolution {
                EventResolution::Scheduled { .. } => summary.created += 1,
                EventResolution::Duplicate { .. } => summary.duplicates += 1,
                EventResolution::SeriesEnded | EventResolution::RuleRemoved => summary.ended += 1,
                EventResolution::Retrying { .. } => summary.retrying += 1,
                EventResolution::Exhausted { .. } => summary.exhausted += 1,
            }
        }

        if summary.processed > 0 {
            tracing::info!(
                processed = summary.processed,
                created = summary.created,
                ended = summary.ended,
                duplicates = summary.duplicates,
                retrying = summary.retrying,
                exhausted = summary.exhausted,
                "drained completion events"
            );
        }
        Ok(summary)
    }
}

impl SqliteRepository {
    /// Runs one event through the scheduler and materializer without
    /// touching the event row.
    async fn resolve_event(&self, event: &CompletionEvent) -> Result<EventResolution, CoreError> {
        // Redelivery after a crash between commit and acknowledgement.
        if let Some(existing) = self
            .find_occurrence_by_key(event.parent_item_id, event.anchor_date)
            .await?
        {
            return Ok(EventResolution::Duplicate {
                existing_item_id: Some(existing.id),
            });
        }

        let parent: Option<CareItem> = self.find_item_by_id(event.parent_item_id).await?;
        let rule = self.find_rule_for_item(event.parent_item_id).await?;
        let (Some(parent), Some(rule)) = (parent, rule) else {
            tracing::debug!(
                event_id = %event.id,
                parent_item_id = %event.parent_item_id,
                "recurrence removed before the event was processed"
            );
            return Ok(EventResolution::RuleRemoved);
        };

        let Some(next) = recurrence::schedule(event.anchor_date, &rule).for_anchor(event.anchor_date) else {
            tracing::info!(
                rule_id = %rule.id,
                created_occurrences = rule.created_occurrences,
                "recurring series has ended"
            );
            return Ok(EventResolution::SeriesEnded);
        };

        match self.materialize(next, &parent, &rule).await? {
            MaterializeOutcome::Created { item, rule } => Ok(EventResolution::Scheduled { item, rule }),
            MaterializeOutcome::AlreadyProcessed { existing_item_id } => {
                Ok(EventResolution::Duplicate { existing_item_id })
            }
        }
    }

    async fn mark_event_processed(&self, event_id: Uuid, result_item_id: Option<Uuid>) -> Result<(), CoreError> {
        sqlx::query(
            r#"UPDATE completion_events
            SET status = $1, result_item_id = $2, processed_at = $3, last_error = NULL
            WHERE id = $4
            "#,
        )
        .bind(EventStatus::Processed)
        .bind(result_item_id)
        .bind(Utc::now())
        .bind(event_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn record_event_failure(&self, event: &CompletionEvent, err: &CoreError) -> Result<EventResolution, CoreError> {
        let attempts = u32::try_from(event.attempts).unwrap_or(0).saturating_add(1);
        let exhausted = attempts >= self.queue_config().max_attempts;
        let status = if exhausted {
            EventStatus::Failed
        } else {
            EventStatus::Pending
        };
        let error = err.to_string();

        sqlx::query(
            "UPDATE completion_events SET status = $1, attempts = $2, last_error = $3 WHERE id = $4",
        )
        .bind(status)
        .bind(attempts as i64)
        .bind(&error)
        .bind(event.id)
        .execute(self.pool())
        .await?;

        if exhausted {
            tracing::warn!(
                event_id = %event.id,
                parent_item_id = %event.parent_item_id,
                anchor = %event.anchor_date,
                attempts,
                %error,
                "the next occurrence could not be created automatically"
            );
            Ok(EventResolution::Exhausted { attempts, error })
        } else {
            tracing::debug!(event_id = %event.id, attempts, %error, "completion event failed, will retry");
            Ok(EventResolution::Retrying { attempts, error })
        }
    }
}
