use std::{
	collections::HashMap,
	sync::Mutex,
	time::{Duration, Instant},
};

use crate::{BoxFuture, CacheStore, Error, Result};

#[derive(Debug)]
struct Entry {
	value: String,
	expires_at: Option<Instant>,
}
impl Entry {
	fn live(&self) -> bool {
		self.expires_at.is_none_or(|deadline| Instant::now() < deadline)
	}
}

/// In-process store for tests and single-node setups without Redis.
#[derive(Debug, Default)]
pub struct MemoryCache {
	entries: Mutex<HashMap<String, Entry>>,
}
impl MemoryCache {
	pub fn new() -> Self {
		Self::default()
	}

	fn read(&self, key: &str) -> Option<String> {
		let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

		match entries.get(key) {
			Some(entry) if entry.live() => Some(entry.value.clone()),
			Some(_) => {
				entries.remove(key);

				None
			},
			None => None,
		}
	}

	fn write(&self, key: &str, value: String, ttl: Option<Duration>) {
		let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

		entries.insert(
			key.to_string(),
			Entry { value, expires_at: ttl.map(|ttl| Instant::now() + ttl) },
		);
	}

	fn adjust(&self, key: &str, delta: i64) -> Result<i64> {
		let current = self.read(key).unwrap_or_default();
		let current: i64 = if current.is_empty() {
			0
		} else {
			current
				.parse()
				.map_err(|_| Error::Message(format!("Key {key:?} does not hold a counter.")))?
		};
		let next = current + delta;

		self.write(key, next.to_string(), None);

		Ok(next)
	}
}
impl CacheStore for MemoryCache {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
		Box::pin(async move { Ok(self.read(key)) })
	}

	fn set<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.write(key, value.to_string(), None);

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
			self.write(key, value.to_string(), Some(Duration::from_secs(ttl_secs)));

			Ok(())
		})
	}

	fn incr<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<i64>> {
		Box::pin(async move { self.adjust(key, 1) })
	}

	fn decr<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<i64>> {
		Box::pin(async move { self.adjust(key, -1) })
	}

	fn del<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

			entries.remove(key);

			Ok(())
		})
	}
}
