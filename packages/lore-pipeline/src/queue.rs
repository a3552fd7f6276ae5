use tracing::warn;
use uuid::Uuid;

use lore_storage::queries;

use crate::{PipelineService, ServiceError, ServiceResult};

/// One claimed queue entry plus the originating message body, everything a
/// worker needs to run the enrichment.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
	pub resource_id: Uuid,
	pub user_id: Uuid,
	pub message: Option<String>,
}

/// Inserts a pending entry and raises the advisory dispatch flag. The flag is
/// a fast-path hint only; a lost flag costs one poll interval, nothing more.
pub async fn enqueue(
	svc: &PipelineService,
	resource_id: Uuid,
	user_id: Uuid,
	priority: Option<i32>,
) -> ServiceResult<()> {
	if queries::get_resource(&svc.db, resource_id).await?.is_none() {
		return Err(ServiceError::NotFound { message: format!("Resource {resource_id}.") });
	}

	let priority = priority.unwrap_or(svc.cfg.queue.default_priority);

	queries::enqueue(&svc.db, resource_id, user_id, priority).await?;

	if let Err(err) = svc.status_tracker().set_pending_flag().await {
		warn!(error = %err, "Failed to raise the pending flag; dispatch falls back to polling.");
	}

	Ok(())
}

/// One dispatch tick: claims up to the configured batch, highest priority
/// first, and resolves each entry's originating message. An empty claim
/// clears the advisory flag.
pub async fn dispatch_once(svc: &PipelineService) -> ServiceResult<Vec<ClaimedJob>> {
	let claimed =
		queries::claim_pending_batch(&svc.db, svc.cfg.queue.batch_size as i64).await?;

	if claimed.is_empty() {
		if let Err(err) = svc.status_tracker().clear_pending_flag().await {
			warn!(error = %err, "Failed to clear the pending flag.");
		}

		return Ok(Vec::new());
	}

	let mut jobs = Vec::with_capacity(claimed.len());

	for entry in claimed {
		let message = queries::message_body_for_resource(&svc.db, entry.resource_id).await?;

		jobs.push(ClaimedJob { resource_id: entry.resource_id, user_id: entry.user_id, message });
	}

	Ok(jobs)
}

/// Requeues entries stuck in `processing` past the configured deadline,
/// covering workers that died mid-run.
pub async fn sweep_stale(svc: &PipelineService) -> ServiceResult<u64> {
	let requeued = queries::requeue_stale(&svc.db, svc.cfg.queue.stale_after_secs).await?;

	if requeued > 0 {
		warn!(requeued, "Requeued stale processing entries.");

		if let Err(err) = svc.status_tracker().set_pending_flag().await {
			warn!(error = %err, "Failed to raise the pending flag after the stale sweep.");
		}
	}

	Ok(requeued)
}
