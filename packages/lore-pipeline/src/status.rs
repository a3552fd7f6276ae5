use uuid::Uuid;

use lore_cache::status::{StatusReport, queue_status};
use lore_storage::queries;

use crate::{PipelineService, ServiceResult};

/// Queue snapshot for one user. Counts come from Postgres, never the cache;
/// the ETA is the pending count times the configured per-item estimate.
pub async fn get_status(svc: &PipelineService, user_id: Uuid) -> ServiceResult<StatusReport> {
	let (pending, processing) = queries::queue_counts_for_user(&svc.db, user_id).await?;

	Ok(queue_status(pending, processing, svc.cfg.pipeline.per_item_estimate_secs))
}
