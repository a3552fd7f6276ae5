use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use lore_domain::{
	enrichment::{self, FieldBag},
	source_kind::SourceKind,
};
use lore_providers::retry::with_retry;
use lore_storage::queries;

use crate::{
	PipelineService, ServiceError, ServiceResult, classify, degrade_policy, fatal_policy, schema,
	subresources, tldr,
};

const MAX_ENRICH_CHARS: usize = 12_000;

/// Research prose is folded into the bag under this key, ahead of `sources`.
const RESEARCH_KEY: &str = "research_findings";

#[derive(Debug)]
pub struct EnrichmentOutcome {
	pub enrichment_id: Uuid,
	pub subresources_created: usize,
	pub subresources_failed: usize,
}

#[derive(Debug, Deserialize)]
struct TitleSummary {
	title: Option<String>,
	summary: String,
}

/// The full enrichment run for one claimed resource. Extraction, the primary
/// pass, and TL;DR generation are fatal; the other stages degrade. Nothing is
/// persisted as completed until the single commit transaction at the end, so
/// a failed run leaves the resource and its queue entry in their pre-run state.
pub async fn run_enrichment(
	svc: &PipelineService,
	resource_id: Uuid,
	message: Option<&str>,
) -> ServiceResult<EnrichmentOutcome> {
	let resource = queries::get_resource(&svc.db, resource_id)
		.await?
		.ok_or_else(|| ServiceError::NotFound { message: format!("Resource {resource_id}.") })?;
	let url = resource.source_url.clone().ok_or_else(|| ServiceError::InvalidRequest {
		message: format!("Resource {resource_id} has no source URL."),
	})?;
	// The stored caption is the user's own framing; it wins over the raw
	// message body the dispatcher passed along.
	let instruction = resource.raw_caption.clone().or_else(|| message.map(str::to_string));

	// Stage 1: extract and classify. Documents and images hold a stored file
	// URL in `source_url` and are read through OCR instead of the extractor.
	let kind = SourceKind::parse(&resource.source_kind);
	let content = with_retry(degrade_policy(&svc.cfg), "extract", || match kind {
		SourceKind::Link => svc.providers.extractor.extract(&svc.cfg.providers.extractor, &url),
		SourceKind::Document | SourceKind::Image =>
			svc.providers.ocr.read(&svc.cfg.providers.ocr, &url),
	})
	.await
	.map_err(|err| ServiceError::ExtractionFailed { message: err.to_string() })?;
	let resource_type = classify::classify(svc, &content).await;

	queries::set_classification(&svc.db, resource_id, resource_type.as_str()).await?;

	let summary = summarize(svc, resource_id, &content).await;

	// Stage 2: expand embedded links, isolated per URL.
	let report = subresources::expand(svc, resource_id, &content).await?;

	info!(
		resource_id = %resource_id,
		created = report.created.len(),
		failed = report.failed,
		"Subresource expansion finished."
	);

	// Stage 3: primary pass against a generated schema. Fatal on failure.
	let schema_description =
		schema::generate_schema(svc, resource_type, instruction.as_deref(), &content).await?;
	let mut bag = primary_pass(svc, &schema_description, &content).await?;

	// Stage 4: secondary refinement over subresource context. Degrades.
	if !report.created.is_empty() {
		bag = secondary_pass(svc, bag, resource_id, instruction.as_deref()).await?;
	}

	// Stage 5: online research. Degrades to no findings, empty citations.
	let citations = research_pass(svc, &mut bag, instruction.as_deref(), summary.as_deref()).await;

	enrichment::ensure_sources(&mut bag);

	// Stage 6: personalization.
	let profile = match queries::get_user(&svc.db, resource.user_id).await? {
		Some(user) => user.profile,
		None => None,
	};
	let tldr = tldr::generate_tldr(svc, profile.as_deref(), &bag).await?;

	// Stage 7: the commit point.
	let enrichment_id = queries::mark_enriched(
		&svc.db,
		resource_id,
		&Value::Object(bag),
		&Value::Array(citations.into_iter().map(Value::String).collect()),
		&tldr,
	)
	.await?;

	info!(resource_id = %resource_id, enrichment_id = %enrichment_id, "Enrichment committed.");

	Ok(EnrichmentOutcome {
		enrichment_id,
		subresources_created: report.created.len(),
		subresources_failed: report.failed,
	})
}

/// Title + summary pass, persisted on the resource row. Degrades: a missing
/// summary weakens later fallbacks but never fails the run.
async fn summarize(svc: &PipelineService, resource_id: Uuid, content: &str) -> Option<String> {
	let system = "You summarize a learning resource. Reply with a JSON object holding \
		`title` (string or null) and `summary` (a short paragraph).";
	let excerpt = classify::truncate_chars(content, MAX_ENRICH_CHARS);
	let raw = with_retry(degrade_policy(&svc.cfg), "summarize", || {
		svc.providers.oracle.complete_json(&svc.cfg.providers.oracle, system, excerpt)
	})
	.await;
	let parsed = raw.map(|raw| serde_json::from_str::<TitleSummary>(&raw));

	match parsed {
		Ok(Ok(digest)) => {
			if let Err(err) = queries::set_title_and_summary(
				&svc.db,
				resource_id,
				digest.title.as_deref(),
				&digest.summary,
			)
			.await
			{
				warn!(resource_id = %resource_id, error = %err, "Failed to persist the summary.");
			}

			Some(digest.summary)
		},
		Ok(Err(err)) => {
			warn!(resource_id = %resource_id, error = %err, "Summary payload was malformed.");

			None
		},
		Err(err) => {
			warn!(resource_id = %resource_id, error = %err, "Summary pass failed.");

			None
		},
	}
}

async fn primary_pass(
	svc: &PipelineService,
	schema_description: &str,
	content: &str,
) -> ServiceResult<FieldBag> {
	let system = format!(
		"You enrich a learning resource into a JSON object with exactly these fields:\n\
		{schema_description}\n\
		Reply with the JSON object only."
	);
	let excerpt = classify::truncate_chars(content, MAX_ENRICH_CHARS);
	let raw = with_retry(fatal_policy(&svc.cfg), "primary_pass", || {
		svc.providers.oracle.complete_json(&svc.cfg.providers.oracle, &system, excerpt)
	})
	.await
	.map_err(|err| ServiceError::OracleFailed { message: err.to_string() })?;
	let mut bag = enrichment::parse_field_bag(&raw)
		.map_err(|err| ServiceError::OracleFailed { message: err.to_string() })?;

	enrichment::ensure_sources(&mut bag);

	Ok(bag)
}

/// Refines the primary bag with subresource context. The refinement must keep
/// every primary field; a violating or failing refinement degrades to the
/// primary bag unchanged.
async fn secondary_pass(
	svc: &PipelineService,
	primary: FieldBag,
	resource_id: Uuid,
	instruction: Option<&str>,
) -> ServiceResult<FieldBag> {
	let subresources = queries::subresources_for(&svc.db, resource_id).await?;
	let context = subresources
		.iter()
		.map(|sub| format!("- {}: {}", sub.url, sub.summary.as_deref().unwrap_or("(no summary)")))
		.collect::<Vec<_>>()
		.join("\n");
	let system = "You refine an enrichment JSON object using context from its linked \
		resources. Keep every existing field, improving values and adding fields \
		where the context supports it. Reply with the JSON object only.";
	let user = match instruction {
		Some(instruction) => format!(
			"Current enrichment:\n{}\n\nLinked resources:\n{context}\n\nReader instruction: {instruction}",
			serde_json::to_string(&primary).unwrap_or_default()
		),
		None => format!(
			"Current enrichment:\n{}\n\nLinked resources:\n{context}",
			serde_json::to_string(&primary).unwrap_or_default()
		),
	};
	let raw = with_retry(degrade_policy(&svc.cfg), "secondary_pass", || {
		svc.providers.oracle.complete_json(&svc.cfg.providers.oracle, system, &user)
	})
	.await;
	let refined = match raw {
		Ok(raw) => match enrichment::parse_field_bag(&raw) {
			Ok(refined) => refined,
			Err(err) => {
				warn!(resource_id = %resource_id, error = %err, "Secondary pass payload was malformed; keeping the primary bag.");

				return Ok(primary);
			},
		},
		Err(err) => {
			warn!(resource_id = %resource_id, error = %err, "Secondary pass failed; keeping the primary bag.");

			return Ok(primary);
		},
	};

	if !enrichment::preserves_fields(&primary, &refined) {
		warn!(
			resource_id = %resource_id,
			dropped = ?enrichment::missing_fields(&primary, &refined),
			"Secondary pass dropped fields; keeping the primary bag."
		);

		return Ok(primary);
	}

	Ok(refined)
}

/// Research pass over the user's own framing. Degraded runs leave the bag
/// untouched and cite nothing.
async fn research_pass(
	svc: &PipelineService,
	bag: &mut FieldBag,
	instruction: Option<&str>,
	summary: Option<&str>,
) -> Vec<String> {
	let Some(query) = instruction.or(summary) else {
		return Vec::new();
	};
	let findings = with_retry(degrade_policy(&svc.cfg), "research_pass", || {
		svc.providers.research.research(&svc.cfg.providers.research, query)
	})
	.await;

	match findings {
		Ok(findings) if !findings.text.trim().is_empty() => {
			bag.insert(RESEARCH_KEY.to_string(), Value::String(findings.text));

			findings.citations
		},
		Ok(_) => Vec::new(),
		Err(err) => {
			warn!(error = %err, "Research pass unavailable; continuing without findings.");

			Vec::new()
		},
	}
}
