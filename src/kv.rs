//! Generic TTL key-value capability backing the single-flight lock and the renewal cache.
//!
//! The coordinator only needs four primitives; any store with an atomic set-if-absent can back
//! them. Use [`MemoryKv`] for a single process and tests, and `RedisKv` (feature `redis`) when
//! the service runs as multiple replicas.

pub mod memory;
#[cfg(feature = "redis")] pub mod redis;

pub use memory::MemoryKv;
#[cfg(feature = "redis")] pub use self::redis::RedisKv;

// self
use crate::{_prelude::*, store::StoreError};

/// Boxed future returned by [`SharedKv`] operations.
pub type KvFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Shared TTL key-value store visible to every worker and replica.
pub trait SharedKv
where
	Self: Send + Sync,
{
	/// Reads a live value.
	fn get<'a>(&'a self, key: &'a str) -> KvFuture<'a, Option<String>>;

	/// Unconditionally writes a value that expires after `ttl`.
	fn set_with_ttl<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> KvFuture<'a, ()>;

	/// Atomically writes a value only if no live value exists; returns whether it was written.
	fn set_if_absent_with_ttl<'a>(
		&'a self,
		key: &'a str,
		value: String,
		ttl: Duration,
	) -> KvFuture<'a, bool>;

	/// Atomically deletes the key only while it still holds `expected`.
	fn delete_if_equals<'a>(&'a self, key: &'a str, expected: &'a str) -> KvFuture<'a, bool>;
}

/// Namespaced key builder shared by the lock and the cache.
pub(crate) fn namespaced(prefix: &str, principal: &str) -> String {
	format!("{prefix}:{principal}")
}
