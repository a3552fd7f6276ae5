use uuid::Uuid;

use lore_storage::queries;

use crate::{PipelineService, ServiceError, ServiceResult};

/// Returns the artifact URL for a processed resource, rendering and storing
/// it on first request. `pdf_url` is written at most once; a concurrent
/// render loses the conditional write and returns the winner's URL.
pub async fn render_pdf_if_absent(
	svc: &PipelineService,
	resource_id: Uuid,
) -> ServiceResult<String> {
	let resource = queries::get_resource(&svc.db, resource_id)
		.await?
		.ok_or_else(|| ServiceError::NotFound { message: format!("Resource {resource_id}.") })?;

	if let Some(url) = resource.pdf_url {
		return Ok(url);
	}

	let enrichment = queries::latest_enrichment(&svc.db, resource_id).await?.ok_or_else(|| {
		ServiceError::InvalidRequest {
			message: format!("Resource {resource_id} has no enrichment to render."),
		}
	})?;
	let bytes = svc.providers.renderer.render(&enrichment.dynamic_enrichment_data).await?;
	let url = svc.providers.renderer.store(resource.user_id, resource_id, bytes).await?;

	if queries::set_pdf_url_once(&svc.db, resource_id, &url).await? {
		return Ok(url);
	}

	// Lost the race; somebody else rendered first. Their URL is canonical.
	let resource = queries::get_resource(&svc.db, resource_id)
		.await?
		.ok_or_else(|| ServiceError::NotFound { message: format!("Resource {resource_id}.") })?;

	resource.pdf_url.ok_or_else(|| ServiceError::Storage {
		message: format!("Resource {resource_id} lost the render race but has no pdf_url."),
	})
}
