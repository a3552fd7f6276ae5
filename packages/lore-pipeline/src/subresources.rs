use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use lore_domain::{resource_type::ResourceType, urls};
use lore_providers::retry::with_retry;

use crate::{PipelineService, ServiceError, ServiceResult, classify::truncate_chars, degrade_policy};

const MAX_SUBRESOURCE_CHARS: usize = 6_000;

/// What one expansion pass produced. Failures are counted, not propagated;
/// one dead link never aborts its siblings.
#[derive(Debug, Default)]
pub struct ExpansionReport {
	pub created: Vec<Uuid>,
	pub failed: usize,
}

#[derive(Debug, Deserialize)]
struct SubresourceDigest {
	title: Option<String>,
	summary: String,
	resource_type: Option<String>,
}

/// Expands every URL embedded in `content` into a subresource row under
/// `parent_id`. Each call rescans and re-expands from scratch; running it
/// twice yields two independent sets of rows.
pub async fn expand(
	svc: &PipelineService,
	parent_id: Uuid,
	content: &str,
) -> ServiceResult<ExpansionReport> {
	let mut report = ExpansionReport::default();

	for url in urls::extract_urls(content) {
		match expand_one(svc, parent_id, &url).await {
			Ok(subresource_id) => report.created.push(subresource_id),
			Err(err) => {
				warn!(resource_id = %parent_id, url = %url, error = %err, "Subresource expansion failed.");

				report.failed += 1;
			},
		}
	}

	Ok(report)
}

async fn expand_one(svc: &PipelineService, parent_id: Uuid, url: &str) -> ServiceResult<Uuid> {
	let content = with_retry(degrade_policy(&svc.cfg), "subresource_extract", || {
		svc.providers.extractor.extract(&svc.cfg.providers.extractor, url)
	})
	.await
	.map_err(|err| ServiceError::ExtractionFailed { message: err.to_string() })?;
	let digest = digest_content(svc, &content).await?;
	let resource_type =
		digest.resource_type.as_deref().map(ResourceType::parse).map(|t| t.as_str());
	let subresource_id = lore_storage::queries::insert_subresource(
		&svc.db,
		parent_id,
		url,
		digest.title.as_deref(),
		&digest.summary,
		resource_type,
	)
	.await?;

	Ok(subresource_id)
}

/// One oracle call per subresource: title, summary, and a type guess in a
/// single JSON object.
async fn digest_content(svc: &PipelineService, content: &str) -> ServiceResult<SubresourceDigest> {
	let system = "You summarize a linked resource. Reply with a JSON object holding \
		`title` (string or null), `summary` (a short paragraph), and \
		`resource_type` (a single lowercase label).";
	let excerpt = truncate_chars(content, MAX_SUBRESOURCE_CHARS);
	let raw = with_retry(degrade_policy(&svc.cfg), "subresource_digest", || {
		svc.providers.oracle.complete_json(&svc.cfg.providers.oracle, system, excerpt)
	})
	.await
	.map_err(|err| ServiceError::OracleFailed { message: err.to_string() })?;

	serde_json::from_str(&raw)
		.map_err(|err| ServiceError::OracleFailed { message: format!("Bad digest payload: {err}.") })
}
