use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// One chat completion. `system` frames the task, `user` carries the payload.
pub async fn complete(
	cfg: &lore_config::OracleProviderConfig,
	system: &str,
	user: &str,
) -> Result<String> {
	request(cfg, system, user, false).await
}

/// Same call in JSON mode; the oracle is constrained to emit a JSON object.
pub async fn complete_json(
	cfg: &lore_config::OracleProviderConfig,
	system: &str,
	user: &str,
) -> Result<String> {
	request(cfg, system, user, true).await
}

async fn request(
	cfg: &lore_config::OracleProviderConfig,
	system: &str,
	user: &str,
	json_mode: bool,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let endpoint = format!("{}{}", cfg.api_base, cfg.path);
	let mut body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": [
			{ "role": "system", "content": system },
			{ "role": "user", "content": user },
		],
	});

	if json_mode {
		body["response_format"] = serde_json::json!({ "type": "json_object" });
	}

	let res = client
		.post(&endpoint)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_completion(&json)
}

pub(crate) fn parse_completion(json: &Value) -> Result<String> {
	let content = json
		.get("choices")
		.and_then(Value::as_array)
		.and_then(|choices| choices.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|message| message.get("content"))
		.and_then(Value::as_str)
		.map(str::trim)
		.unwrap_or_default();

	if content.is_empty() {
		return Err(Error::NoChoices);
	}

	Ok(content.to_string())
}
