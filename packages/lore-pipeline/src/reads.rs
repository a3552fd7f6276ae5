use tracing::warn;
use uuid::Uuid;

use lore_storage::{
	models::{Enrichment, Resource},
	queries,
};

use crate::{PipelineService, ServiceResult};

pub async fn get_latest_processed(
	svc: &PipelineService,
	user_id: Uuid,
	limit: i64,
) -> ServiceResult<Vec<Resource>> {
	Ok(queries::latest_processed(&svc.db, user_id, limit).await?)
}

/// Newest enrichment for a resource. Reading one marks the resource viewed;
/// the mark is best effort and never fails the read.
pub async fn get_enrichment(
	svc: &PipelineService,
	resource_id: Uuid,
) -> ServiceResult<Option<Enrichment>> {
	let enrichment = queries::latest_enrichment(&svc.db, resource_id).await?;

	if enrichment.is_some()
		&& let Err(err) = queries::mark_viewed(&svc.db, resource_id).await
	{
		warn!(resource_id = %resource_id, error = %err, "Failed to mark the resource viewed.");
	}

	Ok(enrichment)
}
