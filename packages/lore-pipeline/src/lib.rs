pub mod classify;
pub mod enrich;
pub mod intake;
pub mod queue;
pub mod reads;
pub mod render;
pub mod schema;
pub mod status;
pub mod subresources;
pub mod tldr;

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;
use uuid::Uuid;

pub use enrich::EnrichmentOutcome;
pub use intake::SubmitOutcome;
pub use queue::ClaimedJob;
pub use subresources::ExpansionReport;

use lore_cache::{CacheStore, buffer::MergeBuffer, status::StatusTracker};
use lore_config::{
	Config, ExtractorProviderConfig, OcrProviderConfig, OracleProviderConfig,
	ResearchProviderConfig,
};
use lore_providers::{extractor, ocr, oracle, research, research::Findings, retry::RetryPolicy};
use lore_storage::db::Db;

pub type ServiceResult<T> = Result<T, ServiceError>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait ExtractorProvider
where
	Self: Send + Sync,
{
	fn extract<'a>(
		&'a self,
		cfg: &'a ExtractorProviderConfig,
		url: &'a str,
	) -> BoxFuture<'a, lore_providers::Result<String>>;
}

pub trait OcrProvider
where
	Self: Send + Sync,
{
	fn read<'a>(
		&'a self,
		cfg: &'a OcrProviderConfig,
		file_url: &'a str,
	) -> BoxFuture<'a, lore_providers::Result<String>>;
}

pub trait OracleProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a OracleProviderConfig,
		system: &'a str,
		user: &'a str,
	) -> BoxFuture<'a, lore_providers::Result<String>>;

	fn complete_json<'a>(
		&'a self,
		cfg: &'a OracleProviderConfig,
		system: &'a str,
		user: &'a str,
	) -> BoxFuture<'a, lore_providers::Result<String>>;
}

pub trait ResearchProvider
where
	Self: Send + Sync,
{
	fn research<'a>(
		&'a self,
		cfg: &'a ResearchProviderConfig,
		query: &'a str,
	) -> BoxFuture<'a, lore_providers::Result<Findings>>;
}

/// Rendering and storage of the human-readable artifact. Internals are host
/// concerns; the pipeline only needs bytes in, a stable URL out.
pub trait RendererProvider
where
	Self: Send + Sync,
{
	fn render<'a>(&'a self, enrichment: &'a Value) -> BoxFuture<'a, ServiceResult<Vec<u8>>>;

	fn store<'a>(
		&'a self,
		user_id: Uuid,
		resource_id: Uuid,
		bytes: Vec<u8>,
	) -> BoxFuture<'a, ServiceResult<String>>;
}

#[derive(Debug)]
pub enum ServiceError {
	ExtractionFailed { message: String },
	OracleFailed { message: String },
	ResearchUnavailable { message: String },
	InvalidRequest { message: String },
	NotFound { message: String },
	Storage { message: String },
	Cache { message: String },
}

impl std::fmt::Display for ServiceError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::ExtractionFailed { message } => write!(f, "Extraction failed: {message}"),
			Self::OracleFailed { message } => write!(f, "Oracle failed: {message}"),
			Self::ResearchUnavailable { message } => {
				write!(f, "Research unavailable: {message}")
			},
			Self::InvalidRequest { message } => write!(f, "Invalid request: {message}"),
			Self::NotFound { message } => write!(f, "Not found: {message}"),
			Self::Storage { message } => write!(f, "Storage error: {message}"),
			Self::Cache { message } => write!(f, "Cache error: {message}"),
		}
	}
}

impl std::error::Error for ServiceError {}

impl From<lore_storage::Error> for ServiceError {
	fn from(err: lore_storage::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<lore_cache::Error> for ServiceError {
	fn from(err: lore_cache::Error) -> Self {
		Self::Cache { message: err.to_string() }
	}
}

#[derive(Clone)]
pub struct Providers {
	pub extractor: Arc<dyn ExtractorProvider>,
	pub ocr: Arc<dyn OcrProvider>,
	pub oracle: Arc<dyn OracleProvider>,
	pub research: Arc<dyn ResearchProvider>,
	pub renderer: Arc<dyn RendererProvider>,
}

pub struct PipelineService {
	pub cfg: Config,
	pub db: Db,
	pub cache: Arc<dyn CacheStore>,
	pub providers: Providers,
}

struct DefaultProviders;

/// Placeholder wired until a host installs a real renderer. Keeps every other
/// operation usable on deployments without an artifact store.
struct UnconfiguredRenderer;

impl ExtractorProvider for DefaultProviders {
	fn extract<'a>(
		&'a self,
		cfg: &'a ExtractorProviderConfig,
		url: &'a str,
	) -> BoxFuture<'a, lore_providers::Result<String>> {
		Box::pin(extractor::extract(cfg, url))
	}
}

impl OcrProvider for DefaultProviders {
	fn read<'a>(
		&'a self,
		cfg: &'a OcrProviderConfig,
		file_url: &'a str,
	) -> BoxFuture<'a, lore_providers::Result<String>> {
		Box::pin(ocr::read(cfg, file_url))
	}
}

impl OracleProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a OracleProviderConfig,
		system: &'a str,
		user: &'a str,
	) -> BoxFuture<'a, lore_providers::Result<String>> {
		Box::pin(oracle::complete(cfg, system, user))
	}

	fn complete_json<'a>(
		&'a self,
		cfg: &'a OracleProviderConfig,
		system: &'a str,
		user: &'a str,
	) -> BoxFuture<'a, lore_providers::Result<String>> {
		Box::pin(oracle::complete_json(cfg, system, user))
	}
}

impl ResearchProvider for DefaultProviders {
	fn research<'a>(
		&'a self,
		cfg: &'a ResearchProviderConfig,
		query: &'a str,
	) -> BoxFuture<'a, lore_providers::Result<Findings>> {
		Box::pin(research::research(cfg, query))
	}
}

impl RendererProvider for UnconfiguredRenderer {
	fn render<'a>(&'a self, _enrichment: &'a Value) -> BoxFuture<'a, ServiceResult<Vec<u8>>> {
		Box::pin(async {
			Err(ServiceError::InvalidRequest { message: "No renderer configured.".to_string() })
		})
	}

	fn store<'a>(
		&'a self,
		_user_id: Uuid,
		_resource_id: Uuid,
		_bytes: Vec<u8>,
	) -> BoxFuture<'a, ServiceResult<String>> {
		Box::pin(async {
			Err(ServiceError::InvalidRequest { message: "No renderer configured.".to_string() })
		})
	}
}

impl Providers {
	pub fn new(
		extractor: Arc<dyn ExtractorProvider>,
		ocr: Arc<dyn OcrProvider>,
		oracle: Arc<dyn OracleProvider>,
		research: Arc<dyn ResearchProvider>,
		renderer: Arc<dyn RendererProvider>,
	) -> Self {
		Self { extractor, ocr, oracle, research, renderer }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);
		Self {
			extractor: provider.clone(),
			ocr: provider.clone(),
			oracle: provider.clone(),
			research: provider,
			renderer: Arc::new(UnconfiguredRenderer),
		}
	}
}

impl PipelineService {
	pub fn new(cfg: Config, db: Db, cache: Arc<dyn CacheStore>) -> Self {
		Self { cfg, db, cache, providers: Providers::default() }
	}

	pub fn with_providers(
		cfg: Config,
		db: Db,
		cache: Arc<dyn CacheStore>,
		providers: Providers,
	) -> Self {
		Self { cfg, db, cache, providers }
	}

	pub fn status_tracker(&self) -> StatusTracker {
		StatusTracker::new(self.cache.clone())
	}

	pub fn merge_buffer(&self) -> MergeBuffer {
		MergeBuffer::new(self.cache.clone(), self.cfg.pipeline.merge_window_secs)
	}
}

/// Retry schedule for call classes that are fatal on exhaustion.
pub(crate) fn fatal_policy(cfg: &Config) -> RetryPolicy {
	RetryPolicy {
		attempts: cfg.retry.fatal_attempts,
		base_delay_ms: cfg.retry.base_delay_ms,
		max_delay_ms: cfg.retry.max_delay_ms,
	}
}

/// Retry schedule for call classes that degrade on exhaustion.
pub(crate) fn degrade_policy(cfg: &Config) -> RetryPolicy {
	RetryPolicy {
		attempts: cfg.retry.degrade_attempts,
		base_delay_ms: cfg.retry.base_delay_ms,
		max_delay_ms: cfg.retry.max_delay_ms,
	}
}
