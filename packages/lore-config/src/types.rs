use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub cache: Cache,
	pub providers: Providers,
	#[serde(default)]
	pub retry: Retry,
	#[serde(default)]
	pub queue: Queue,
	#[serde(default)]
	pub pipeline: Pipeline,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Cache {
	pub redis: Redis,
}

#[derive(Debug, Deserialize)]
pub struct Redis {
	pub url: String,
	#[serde(default = "default_key_prefix")]
	pub key_prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub extractor: ExtractorProviderConfig,
	pub ocr: OcrProviderConfig,
	pub oracle: OracleProviderConfig,
	pub research: ResearchProviderConfig,
}

/// Web-content extraction service (Diffbot-shaped: GET with `url` and `token`
/// query parameters, text at `objects[0].text`).
#[derive(Debug, Deserialize)]
pub struct ExtractorProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub path: String,
	pub token: String,
	pub timeout_ms: u64,
}

/// Vision-capable reader for document and image submissions (chat-completions
/// shape with an image part in the user message).
#[derive(Debug, Deserialize)]
pub struct OcrProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub path: String,
	pub api_key: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Enrichment oracle (chat-completions shape).
#[derive(Debug, Deserialize)]
pub struct OracleProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub path: String,
	pub api_key: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// External research oracle (chat-completions shape plus a `citations` list).
#[derive(Debug, Deserialize)]
pub struct ResearchProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub path: String,
	pub api_key: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Retry policy per external-call class. Fatal classes (extraction, primary
/// enrichment) fail the run after `fatal_attempts`; degradeable classes
/// (secondary, tertiary) fall back to the previous stage's result.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Retry {
	pub fatal_attempts: u32,
	pub degrade_attempts: u32,
	pub base_delay_ms: u64,
	pub max_delay_ms: u64,
}
impl Default for Retry {
	fn default() -> Self {
		Self { fatal_attempts: 1, degrade_attempts: 2, base_delay_ms: 500, max_delay_ms: 30_000 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Queue {
	pub batch_size: u32,
	pub poll_interval_ms: u64,
	pub worker_concurrency: u32,
	pub default_priority: i32,
	pub stale_after_secs: i64,
	pub stale_sweep_interval_secs: i64,
}
impl Default for Queue {
	fn default() -> Self {
		Self {
			batch_size: 3,
			poll_interval_ms: 2_000,
			worker_concurrency: 4,
			default_priority: 0,
			stale_after_secs: 600,
			stale_sweep_interval_secs: 60,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pipeline {
	pub per_item_estimate_secs: u64,
	pub merge_window_secs: u64,
	pub tldr_max_lines: u32,
	pub default_profile: Option<String>,
}
impl Default for Pipeline {
	fn default() -> Self {
		Self {
			per_item_estimate_secs: 45,
			merge_window_secs: 5,
			tldr_max_lines: 5,
			default_profile: None,
		}
	}
}

fn default_key_prefix() -> String {
	"lore:".to_string()
}
