//! Redis-backed [`SharedKv`] for multi-replica deployments.

// crates.io
use redis::{AsyncCommands, Script, aio::ConnectionManager};
// self
use crate::{
	_prelude::*,
	kv::{KvFuture, SharedKv},
	store::StoreError,
};

const DELETE_IF_EQUALS: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
	return redis.call("DEL", KEYS[1])
end
return 0
"#;

/// Shared KV over a multiplexed Redis connection.
///
/// Set-if-absent maps to `SET NX PX`; compare-and-delete runs as a Lua script so the owner check
/// and the delete are one atomic step on the server.
#[derive(Clone)]
pub struct RedisKv {
	conn: ConnectionManager,
	delete_if_equals: Script,
}
impl RedisKv {
	/// Wraps an established connection manager.
	pub fn new(conn: ConnectionManager) -> Self {
		Self { conn, delete_if_equals: Script::new(DELETE_IF_EQUALS) }
	}
}
impl Debug for RedisKv {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("RedisKv(..)")
	}
}
impl SharedKv for RedisKv {
	fn get<'a>(&'a self, key: &'a str) -> KvFuture<'a, Option<String>> {
		let mut conn = self.conn.clone();

		Box::pin(async move { conn.get::<_, Option<String>>(key).await.map_err(backend) })
	}

	fn set_with_ttl<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> KvFuture<'a, ()> {
		let mut conn = self.conn.clone();

		Box::pin(async move {
			conn.pset_ex::<_, _, ()>(key, value, ttl_millis(ttl)).await.map_err(backend)
		})
	}

	fn set_if_absent_with_ttl<'a>(
		&'a self,
		key: &'a str,
		value: String,
		ttl: Duration,
	) -> KvFuture<'a, bool> {
		let mut conn = self.conn.clone();

		Box::pin(async move {
			let reply = redis::cmd("SET")
				.arg(key)
				.arg(value)
				.arg("NX")
				.arg("PX")
				.arg(ttl_millis(ttl))
				.query_async::<Option<String>>(&mut conn)
				.await
				.map_err(backend)?;

			Ok(reply.is_some())
		})
	}

	fn delete_if_equals<'a>(&'a self, key: &'a str, expected: &'a str) -> KvFuture<'a, bool> {
		let mut conn = self.conn.clone();

		Box::pin(async move {
			let deleted = self
				.delete_if_equals
				.key(key)
				.arg(expected)
				.invoke_async::<i64>(&mut conn)
				.await
				.map_err(backend)?;

			Ok(deleted == 1)
		})
	}
}

fn backend(e: redis::RedisError) -> StoreError {
	StoreError::Backend { message: format!("Redis command failed: {e}") }
}

// `PX` rejects zero and negative values.
fn ttl_millis(ttl: Duration) -> u64 {
	u64::try_from(ttl.whole_milliseconds()).unwrap_or(0).max(1)
}
