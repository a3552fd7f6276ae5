use tracing::warn;

use lore_domain::resource_type::ResourceType;
use lore_providers::retry::with_retry;

use crate::{PipelineService, degrade_policy};

/// Oracles get a bounded slice of the content; classification does not need
/// the whole document.
const MAX_CLASSIFY_CHARS: usize = 6_000;

/// Classifies extracted content into the closed taxonomy. Never fatal: an
/// oracle failure or an off-taxonomy answer both normalize to `Unknown`.
pub async fn classify(svc: &PipelineService, content: &str) -> ResourceType {
	let system = classify_prompt();
	let excerpt = truncate_chars(content, MAX_CLASSIFY_CHARS);
	let completion = with_retry(degrade_policy(&svc.cfg), "classify", || {
		svc.providers.oracle.complete(&svc.cfg.providers.oracle, &system, excerpt)
	})
	.await;

	match completion {
		Ok(label) => ResourceType::parse(&label),
		Err(err) => {
			warn!(error = %err, "Classification failed; falling back to unknown_resource.");

			ResourceType::Unknown
		},
	}
}

fn classify_prompt() -> String {
	let labels =
		ResourceType::ALL.iter().map(ResourceType::as_str).collect::<Vec<_>>().join(", ");

	format!(
		"You classify a learning resource into exactly one type. \
		Valid types: {labels}. \
		Reply with the single type label and nothing else."
	)
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
	match text.char_indices().nth(max_chars) {
		Some((offset, _)) => &text[..offset],
		None => text,
	}
}
