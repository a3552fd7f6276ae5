use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Result, oracle};

/// Research output: prose plus whatever citation URLs the backend surfaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Findings {
	pub text: String,
	pub citations: Vec<String>,
}

/// One research query against the online-search oracle. The response is
/// chat-completions shaped with a top-level `citations` array; backends that
/// omit it yield an empty list, which downstream treats as "no findings
/// worth citing", not an error.
pub async fn research(cfg: &lore_config::ResearchProviderConfig, query: &str) -> Result<Findings> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let endpoint = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"messages": [
			{ "role": "user", "content": query },
		],
	});
	let res = client
		.post(&endpoint)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;
	let text = oracle::parse_completion(&json)?;

	Ok(Findings { text, citations: parse_citations(&json) })
}

fn parse_citations(json: &Value) -> Vec<String> {
	json.get("citations")
		.and_then(Value::as_array)
		.map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
		.unwrap_or_default()
}
