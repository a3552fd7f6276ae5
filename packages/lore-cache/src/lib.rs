//! Transient state only. Everything kept here is reconstructable from
//! Postgres; a flushed cache degrades behavior (slower dispatch, reset
//! counters) but never loses data.

pub mod buffer;
pub mod memory;
pub mod redis_store;
pub mod status;

mod error;

pub use error::{Error, Result};

use std::{future::Future, pin::Pin};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Atomic string/counter primitives, the full surface this crate needs from
/// Redis. Implemented by [`redis_store::RedisCache`] in production and
/// [`memory::MemoryCache`] in tests.
pub trait CacheStore: Send + Sync {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>>;
	fn set<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<()>>;
	fn set_ex<'a>(&'a self, key: &'a str, value: &'a str, ttl_secs: u64)
	-> BoxFuture<'a, Result<()>>;
	fn incr<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<i64>>;
	fn decr<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<i64>>;
	fn del<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>>;
}
