use serde_json::{Map, Value};

/// Enrichment content is a schema-less bag of fields keyed by name. Insertion
/// order is preserved (serde_json `preserve_order`) so rendering stays
/// deterministic across reads.
pub type FieldBag = Map<String, Value>;

/// The one mandatory key every enrichment bag carries.
pub const SOURCES_KEY: &str = "sources";

/// Sentinel used when the oracle found no concrete source links.
pub const NO_SOURCE_SENTINEL: &str = "No specific source provided";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BagError {
	NotJson,
	NotObject,
}

impl std::fmt::Display for BagError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::NotJson => f.write_str("Enrichment content is not valid JSON."),
			Self::NotObject => f.write_str("Enrichment content is not a JSON object."),
		}
	}
}

/// Parses a raw oracle completion into a field bag. Oracles occasionally wrap
/// JSON in markdown fences despite instructions; strip them before parsing.
pub fn parse_field_bag(raw: &str) -> Result<FieldBag, BagError> {
	let stripped = strip_fences(raw);
	let value: Value = serde_json::from_str(stripped).map_err(|_| BagError::NotJson)?;

	match value {
		Value::Object(map) => Ok(map),
		_ => Err(BagError::NotObject),
	}
}

/// Guarantees the trailing `sources` contract: a missing, empty, or malformed
/// `sources` field is replaced with the sentinel list. The key is re-inserted
/// last so it stays at the bottom of the bag.
pub fn ensure_sources(bag: &mut FieldBag) {
	let sources = bag.remove(SOURCES_KEY);
	let valid = match &sources {
		Some(Value::Array(items)) if !items.is_empty() =>
			items.iter().all(|item| item.is_string()),
		_ => false,
	};

	if valid {
		bag.insert(SOURCES_KEY.to_string(), sources.unwrap_or(Value::Null));
	} else {
		bag.insert(
			SOURCES_KEY.to_string(),
			Value::Array(vec![Value::String(NO_SOURCE_SENTINEL.to_string())]),
		);
	}
}

/// Extracts the `sources` entries as plain strings.
pub fn sources_of(bag: &FieldBag) -> Vec<String> {
	bag.get(SOURCES_KEY)
		.and_then(Value::as_array)
		.map(|items| {
			items.iter().filter_map(Value::as_str).map(str::to_string).collect::<Vec<_>>()
		})
		.unwrap_or_default()
}

/// Superset-preserving merge contract: a refinement may add fields but must
/// keep every field name the base bag already has.
pub fn preserves_fields(base: &FieldBag, refined: &FieldBag) -> bool {
	missing_fields(base, refined).is_empty()
}

/// Field names present in `base` but absent from `refined`.
pub fn missing_fields(base: &FieldBag, refined: &FieldBag) -> Vec<String> {
	base.keys().filter(|key| !refined.contains_key(*key)).cloned().collect()
}

fn strip_fences(raw: &str) -> &str {
	let trimmed = raw.trim();
	let Some(rest) = trimmed.strip_prefix("```") else {
		return trimmed;
	};
	// Drop an optional language tag on the opening fence line.
	let rest = rest.strip_prefix("json").unwrap_or(rest);
	let rest = rest.strip_suffix("```").unwrap_or(rest);

	rest.trim()
}
