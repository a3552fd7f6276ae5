use std::sync::Arc;

use uuid::Uuid;

use crate::{CacheStore, Result};

/// Per-user intake buffer with the merge window as its TTL. The payload is an
/// opaque JSON string; the caller owns the shape. Expiry is simply the key
/// vanishing, so a lapsed window needs no flush step.
#[derive(Clone)]
pub struct MergeBuffer {
	store: Arc<dyn CacheStore>,
	window_secs: u64,
}
impl MergeBuffer {
	pub fn new(store: Arc<dyn CacheStore>, window_secs: u64) -> Self {
		Self { store, window_secs }
	}

	pub async fn get(&self, user_id: Uuid) -> Result<Option<String>> {
		self.store.get(&buffer_key(user_id)).await
	}

	pub async fn put(&self, user_id: Uuid, payload: &str) -> Result<()> {
		self.store.set_ex(&buffer_key(user_id), payload, self.window_secs).await
	}

	pub async fn clear(&self, user_id: Uuid) -> Result<()> {
		self.store.del(&buffer_key(user_id)).await
	}
}

fn buffer_key(user_id: Uuid) -> String {
	format!("intake:buffer:{user_id}")
}
