use lore_domain::enrichment::FieldBag;
use lore_providers::retry::with_retry;

use crate::{PipelineService, ServiceError, ServiceResult, fatal_policy};

/// Profile used when neither the user row nor config carries one.
pub const FALLBACK_PROFILE: &str =
	"A curious professional who wants the practical takeaway without jargon.";

/// Produces the personalized TL;DR for a finished enrichment. Like the primary
/// pass, this is fatal on oracle exhaustion; a committed resource must never
/// carry an empty TL;DR.
pub async fn generate_tldr(
	svc: &PipelineService,
	profile: Option<&str>,
	bag: &FieldBag,
) -> ServiceResult<String> {
	let max_lines = svc.cfg.pipeline.tldr_max_lines;
	let profile = resolve_profile(profile, svc.cfg.pipeline.default_profile.as_deref());
	let system = tldr_prompt(&profile, max_lines);
	let user = serde_json::to_string(bag).unwrap_or_default();
	let completion = with_retry(fatal_policy(&svc.cfg), "generate_tldr", || {
		svc.providers.oracle.complete(&svc.cfg.providers.oracle, &system, &user)
	})
	.await
	.map_err(|err| ServiceError::OracleFailed { message: err.to_string() })?;

	Ok(bound_lines(&completion, max_lines))
}

pub fn resolve_profile(user_profile: Option<&str>, default_profile: Option<&str>) -> String {
	user_profile
		.filter(|profile| !profile.trim().is_empty())
		.or(default_profile)
		.unwrap_or(FALLBACK_PROFILE)
		.to_string()
}

fn tldr_prompt(profile: &str, max_lines: u32) -> String {
	format!(
		"You write a TL;DR of an enriched learning resource for this reader: \
		{profile} \
		At most {max_lines} lines, each a complete sentence, no preamble."
	)
}

/// Hard bound on line count; the oracle is asked politely, this enforces it.
pub fn bound_lines(text: &str, max_lines: u32) -> String {
	text.lines()
		.map(str::trim_end)
		.filter(|line| !line.is_empty())
		.take(max_lines as usize)
		.collect::<Vec<_>>()
		.join("\n")
}
