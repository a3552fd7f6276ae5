use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result, oracle};

const READ_INSTRUCTION: &str = "Extract all the text and images from the screenshot.";

/// Reads the text out of a document or image at `file_url` through a
/// vision-capable chat completion. No internal retry; callers wrap this with
/// the shared retry helper.
pub async fn read(cfg: &lore_config::OcrProviderConfig, file_url: &str) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let endpoint = format!("{}{}", cfg.api_base, cfg.path);
	let res = client
		.post(&endpoint)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&vision_body(&cfg.model, file_url))
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	// An empty completion means an unreadable file, not a broken oracle.
	oracle::parse_completion(&json).map_err(|err| match err {
		Error::NoChoices => Error::NoContent,
		other => other,
	})
}

fn vision_body(model: &str, file_url: &str) -> Value {
	serde_json::json!({
		"model": model,
		"messages": [{
			"role": "user",
			"content": [
				{ "type": "text", "text": READ_INSTRUCTION },
				{ "type": "image_url", "image_url": { "url": file_url } },
			],
		}],
	})
}
