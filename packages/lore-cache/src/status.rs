use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::{CacheStore, Result};

const INFLIGHT_KEY: &str = "worker:inflight";
const PENDING_FLAG_KEY: &str = "queue:has_pending";

/// Queue snapshot reported to users. `estimated_seconds` is a heuristic
/// (pending count times a configured per-item estimate), not a measurement.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusReport {
	pub pending: i64,
	pub processing: i64,
	pub estimated_seconds: u64,
}

pub fn queue_status(pending: i64, processing: i64, per_item_estimate_secs: u64) -> StatusReport {
	StatusReport {
		pending,
		processing,
		estimated_seconds: pending.max(0) as u64 * per_item_estimate_secs,
	}
}

/// Advisory per-user and global progress markers. Counts in Postgres stay
/// authoritative; these exist so status reads never touch the worker.
#[derive(Clone)]
pub struct StatusTracker {
	store: Arc<dyn CacheStore>,
}
impl StatusTracker {
	pub fn new(store: Arc<dyn CacheStore>) -> Self {
		Self { store }
	}

	pub async fn mark_processing(&self, user_id: Uuid) -> Result<()> {
		self.store.set(&user_status_key(user_id), "processing").await
	}

	pub async fn mark_completed(&self, user_id: Uuid) -> Result<()> {
		self.store.set(&user_status_key(user_id), "completed").await
	}

	pub async fn user_status(&self, user_id: Uuid) -> Result<Option<String>> {
		self.store.get(&user_status_key(user_id)).await
	}

	pub async fn incr_inflight(&self) -> Result<i64> {
		self.store.incr(INFLIGHT_KEY).await
	}

	pub async fn decr_inflight(&self) -> Result<i64> {
		self.store.decr(INFLIGHT_KEY).await
	}

	/// Fast-path hint for the dispatcher. Never authoritative; the queue
	/// table is.
	pub async fn set_pending_flag(&self) -> Result<()> {
		self.store.set(PENDING_FLAG_KEY, "1").await
	}

	pub async fn clear_pending_flag(&self) -> Result<()> {
		self.store.del(PENDING_FLAG_KEY).await
	}

	pub async fn pending_flag(&self) -> Result<bool> {
		Ok(self.store.get(PENDING_FLAG_KEY).await?.is_some())
	}
}

fn user_status_key(user_id: Uuid) -> String {
	format!("status:user:{user_id}")
}
