use std::sync::Arc;

use lore_cache::redis_store::RedisCache;
use lore_pipeline::PipelineService;
use lore_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<PipelineService>,
}
impl AppState {
	pub async fn new(config: lore_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let cache = RedisCache::connect(&config.cache.redis).await?;
		let service = PipelineService::new(config, db, Arc::new(cache));

		Ok(Self { service: Arc::new(service) })
	}
}
