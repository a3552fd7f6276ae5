use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::info;

use crate::{BoxFuture, CacheStore, Result};

/// Redis-backed store. [`ConnectionManager`] multiplexes and reconnects
/// internally, so cloning per call is cheap and the handle is shared freely.
#[derive(Clone)]
pub struct RedisCache {
	connection: ConnectionManager,
	prefix: String,
}
impl RedisCache {
	pub async fn connect(cfg: &lore_config::Redis) -> Result<Self> {
		let client = Client::open(cfg.url.as_str())?;
		let connection = ConnectionManager::new(client).await?;

		info!("Redis connection established.");

		Ok(Self { connection, prefix: cfg.key_prefix.clone() })
	}

	fn full_key(&self, key: &str) -> String {
		format!("{}{key}", self.prefix)
	}
}
impl CacheStore for RedisCache {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
		Box::pin(async move {
			let mut conn = self.connection.clone();
			let value: Option<String> = conn.get(self.full_key(key)).await?;

			Ok(value)
		})
	}

	fn set<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut conn = self.connection.clone();
			let _: () = conn.set(self.full_key(key), value).await?;

			Ok(())
		})
	}

	fn set_ex<'a>(
		&'a self,
		key: &'a str,
		value: &'a str,
		ttl_secs: u64,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut conn = self.connection.clone();
			let _: () = conn.set_ex(self.full_key(key), value, ttl_secs).await?;

			Ok(())
		})
	}

	fn incr<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<i64>> {
		Box::pin(async move {
			let mut conn = self.connection.clone();
			let value: i64 = conn.incr(self.full_key(key), 1).await?;

			Ok(value)
		})
	}

	fn decr<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<i64>> {
		Box::pin(async move {
			let mut conn = self.connection.clone();
			let value: i64 = conn.decr(self.full_key(key), 1).await?;

			Ok(value)
		})
	}

	fn del<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut conn = self.connection.clone();
			let _: () = conn.del(self.full_key(key)).await?;

			Ok(())
		})
	}
}
