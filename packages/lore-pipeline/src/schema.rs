use lore_domain::{
	enrichment::{NO_SOURCE_SENTINEL, SOURCES_KEY},
	resource_type::ResourceType,
};
use lore_providers::retry::with_retry;

use crate::{PipelineService, ServiceError, ServiceResult, classify::truncate_chars, fatal_policy};

const MAX_SCHEMA_CHARS: usize = 8_000;

/// Asks the oracle to describe which enrichment fields fit this resource.
/// The output is a prose schema description fed into the primary pass, not a
/// validated JSON Schema. Fatal on failure: without a schema there is nothing
/// to enrich against.
pub async fn generate_schema(
	svc: &PipelineService,
	resource_type: ResourceType,
	user_instruction: Option<&str>,
	content: &str,
) -> ServiceResult<String> {
	let system = schema_prompt(resource_type);
	let user = match user_instruction {
		Some(instruction) => format!(
			"Reader instruction: {instruction}\n\nContent:\n{}",
			truncate_chars(content, MAX_SCHEMA_CHARS)
		),
		None => format!("Content:\n{}", truncate_chars(content, MAX_SCHEMA_CHARS)),
	};

	with_retry(fatal_policy(&svc.cfg), "generate_schema", || {
		svc.providers.oracle.complete(&svc.cfg.providers.oracle, &system, &user)
	})
	.await
	.map_err(|err| ServiceError::OracleFailed { message: err.to_string() })
}

fn schema_prompt(resource_type: ResourceType) -> String {
	format!(
		"You design an enrichment schema for a {resource_type} learning resource. \
		Describe the fields a structured summary of this specific content should \
		carry, one per line, with a short note on what each holds. \
		The final field must always be `{SOURCES_KEY}`: a list of source URLs, or \
		the single entry \"{NO_SOURCE_SENTINEL}\" when the content cites none."
	)
}
