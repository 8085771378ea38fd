use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use carecycle_core::models::DrainSummary;
use carecycle_core::repository::Repository;
use carecycle_core::worker::spawn_event_worker;
use owo_colors::{OwoColorize, Style};
use serde_json::json;
use tokio::sync::watch;

use crate::cli::ProcessCommand;
use crate::commands::Context;
use crate::util::print_json;
use crate::views::table::display_events;

pub async fn process_events<R>(repo: Arc<R>, command: ProcessCommand, ctx: &Context) -> Result<()>
where
    R: Repository + 'static,
{
    let requeued = if command.retry_failed {
        repo.requeue_failed_events().await?
    } else {
        0
    };

    let summary = if command.watch {
        watch_queue(Arc::clone(&repo), ctx).await?
    } else {
        drain_until_empty(repo.as_ref()).await?
    };
    let failed = repo.find_failed_events().await?;

    if ctx.json {
        return print_json(&json!({
            "requeued": requeued,
            "summary": summary,
            "failed": failed,
        }));
    }

    let success_style = Style::new().green().bold();
    if requeued > 0 {
        println!("Requeued {} failed event(s).", requeued);
    }
    println!(
        "{} Processed {} event(s): {} created, {} ended, {} duplicate(s)",
        "✓".style(success_style),
        summary.processed,
        summary.created,
        summary.ended,
        summary.duplicates
    );
    if !failed.is_empty() {
        let warn_style = Style::new().yellow().bold();
        eprintln!(
            "{} {} event(s) could not be processed; rerun with --retry-failed once the cause is fixed.",
            "Warning:".style(warn_style),
            failed.len()
        );
        display_events(&failed);
    }
    Ok(())
}

/// Drains batches until a pass makes no progress beyond failed attempts.
/// Events still retrying are left for the next run.
async fn drain_until_empty(repo: &impl Repository) -> Result<DrainSummary> {
    let mut total = DrainSummary::default();
    loop {
        let batch = repo.drain_pending_events().await?;
        let stalled = batch.processed == batch.retrying;
        total.absorb(&batch);
        if stalled {
            break;
        }
    }
    Ok(total)
}

async fn watch_queue<R>(repo: Arc<R>, ctx: &Context) -> Result<DrainSummary>
where
    R: Repository + 'static,
{
    let queue = ctx.config.queue_config();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = spawn_event_worker(repo, Duration::from_secs(queue.poll_interval_secs), shutdown_rx);

    if !ctx.json {
        println!(
            "Watching the completion queue every {}s. Press Ctrl-C to stop.",
            queue.poll_interval_secs
        );
    }
    tokio::signal::ctrl_c().await?;
    shutdown_tx.send(true)?;
    Ok(handle.await?)
}
