//! Process-local [`SharedKv`] with clock-driven expiry.

// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	kv::{KvFuture, SharedKv},
};

#[derive(Clone, Debug)]
struct Entry {
	value: String,
	expires_at: OffsetDateTime,
}

/// In-memory KV; expired entries are invisible immediately and dropped lazily or via
/// [`MemoryKv::purge_expired`].
#[derive(Clone)]
pub struct MemoryKv {
	entries: Arc<Mutex<HashMap<String, Entry>>>,
	clock: Arc<dyn Clock>,
}
impl MemoryKv {
	/// Creates an empty store that reads time from `clock`.
	pub fn new(clock: Arc<dyn Clock>) -> Self {
		Self { entries: Default::default(), clock }
	}

	/// Drops every expired entry, returning how many were removed.
	pub fn purge_expired(&self) -> usize {
		let now = self.clock.now();
		let mut entries = self.entries.lock();
		let before = entries.len();

		entries.retain(|_, entry| entry.expires_at > now);

		before - entries.len()
	}

	/// Number of live entries.
	pub fn live_len(&self) -> usize {
		let now = self.clock.now();

		self.entries.lock().values().filter(|entry| entry.expires_at > now).count()
	}

	fn get_now(&self, key: &str) -> Option<String> {
		let now = self.clock.now();
		let mut entries = self.entries.lock();

		match entries.get(key) {
			Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
			Some(_) => {
				entries.remove(key);

				None
			},
			None => None,
		}
	}

	fn set_now(&self, key: &str, value: String, ttl: Duration, only_if_absent: bool) -> bool {
		let now = self.clock.now();
		let mut entries = self.entries.lock();

		if only_if_absent && entries.get(key).is_some_and(|entry| entry.expires_at > now) {
			return false;
		}

		entries.insert(key.to_owned(), Entry { value, expires_at: now + ttl });

		true
	}

	fn delete_if_equals_now(&self, key: &str, expected: &str) -> bool {
		let now = self.clock.now();
		let mut entries = self.entries.lock();
		let matches =
			entries.get(key).is_some_and(|entry| entry.expires_at > now && entry.value == expected);

		if matches {
			entries.remove(key);
		}

		matches
	}
}
impl Default for MemoryKv {
	fn default() -> Self {
		Self::new(Arc::new(SystemClock))
	}
}
impl Debug for MemoryKv {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MemoryKv").field("entries", &self.entries.lock().len()).finish()
	}
}
impl SharedKv for MemoryKv {
	fn get<'a>(&'a self, key: &'a str) -> KvFuture<'a, Option<String>> {
		Box::pin(async move { Ok(self.get_now(key)) })
	}

	fn set_with_ttl<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> KvFuture<'a, ()> {
		Box::pin(async move {
			self.set_now(key, value, ttl, false);

			Ok(())
		})
	}

	fn set_if_absent_with_ttl<'a>(
		&'a self,
		key: &'a str,
		value: String,
		ttl: Duration,
	) -> KvFuture<'a, bool> {
		Box::pin(async move { Ok(self.set_now(key, value, ttl, true)) })
	}

	fn delete_if_equals<'a>(&'a self, key: &'a str, expected: &'a str) -> KvFuture<'a, bool> {
		Box::pin(async move { Ok(self.delete_if_equals_now(key, expected)) })
	}
}
