//! Background consumer for the completion event queue.
//!
//! Completing an item only enqueues an event; this loop drains the queue on a
//! fixed interval until the shutdown signal flips to `true`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::models::DrainSummary;
use crate::repository::Repository;

/// Spawns the queue consumer. Each tick drains one batch of pending events;
/// a failed drain is logged and retried on the next tick.
pub fn spawn_event_worker<R>(
    repo: Arc<R>,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<DrainSummary>
where
    R: Repository + 'static,
{
    tokio::spawn(async move {
        tracing::info!(poll_secs = poll_interval.as_secs(), "completion event worker started");
        let mut ticker = tokio::time::interval(poll_interval);
        let mut total = DrainSummary::default();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match repo.drain_pending_events().await {
                        Ok(summary) => total.absorb(&summary),
                        Err(e) => tracing::error!(error = %e, "failed to drain completion events"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!(processed = total.processed, created = total.created, "completion event worker stopped");
        total
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorb_adds_every_counter() {
        let mut total = DrainSummary {
            processed: 2,
            created: 1,
            ended: 1,
            ..Default::default()
        };
        let batch = DrainSummary {
            processed: 3,
            created: 1,
            duplicates: 1,
            exhausted: 1,
            ..Default::default()
        };

        total.absorb(&batch);

        assert_eq!(total.processed, 5);
        assert_eq!(total.created, 2);
        assert_eq!(total.ended, 1);
        assert_eq!(total.duplicates, 1);
        assert_eq!(total.retrying, 0);
        assert_eq!(total.exhausted, 1);
    }
}
