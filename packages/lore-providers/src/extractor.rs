use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Sentinel body some extraction backends return instead of an empty string.
const NO_TEXT_SENTINEL: &str = "No text found";

/// Fetches the readable text of `url` through the extraction service. The
/// service is Diffbot-shaped: text lives at `objects[0].text`. No internal
/// retry; callers wrap this with the shared retry helper.
pub async fn extract(cfg: &lore_config::ExtractorProviderConfig, url: &str) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let endpoint = format!("{}{}", cfg.api_base, cfg.path);
	let res = client
		.get(&endpoint)
		.query(&[("url", url), ("token", cfg.token.as_str())])
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_extracted_text(&json)
}

fn parse_extracted_text(json: &Value) -> Result<String> {
	let text = json
		.get("objects")
		.and_then(Value::as_array)
		.and_then(|objects| objects.first())
		.and_then(|object| object.get("text"))
		.and_then(Value::as_str)
		.map(str::trim)
		.unwrap_or_default();

	if text.is_empty() || text == NO_TEXT_SENTINEL {
		return Err(Error::NoContent);
	}

	Ok(text.to_string())
}
