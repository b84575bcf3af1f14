//! Per-principal single-flight lock over [`SharedKv`].
//!
//! Acquisition is a single non-blocking set-if-absent. Holding the lock is what makes a caller
//! the renewer; everyone else becomes a waiter on the renewal cache.

// self
use crate::{
	_prelude::*,
	auth::{PrincipalId, TokenSecret},
	kv::{self, SharedKv},
	store::StoreError,
};

/// Owner token proving which caller holds a lock entry.
#[derive(Clone, PartialEq, Eq)]
pub struct LockToken(TokenSecret);
impl LockToken {
	fn generate() -> Self {
		Self(TokenSecret::generate())
	}

	fn expose(&self) -> &str {
		self.0.expose()
	}
}
impl Debug for LockToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("LockToken").field(&self.0.fingerprint()).finish()
	}
}

/// Result of a single acquisition attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockAttempt {
	/// The caller now owns the lock until it releases it or the TTL lapses.
	Acquired(LockToken),
	/// Another caller holds the lock.
	Busy,
}

/// Mutual exclusion keyed by principal with a bounded hold time.
#[derive(Clone)]
pub struct SingleFlightLock {
	kv: Arc<dyn SharedKv>,
	prefix: String,
}
impl SingleFlightLock {
	/// Default key namespace.
	pub const DEFAULT_PREFIX: &str = "refresh:lock";

	/// Creates a lock using the default key namespace.
	pub fn new(kv: Arc<dyn SharedKv>) -> Self {
		Self { kv, prefix: Self::DEFAULT_PREFIX.into() }
	}

	/// Overrides the key namespace.
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = prefix.into();

		self
	}

	/// Makes one attempt to take the lock for `ttl`.
	pub async fn try_acquire(
		&self,
		principal: &PrincipalId,
		ttl: Duration,
	) -> Result<LockAttempt, StoreError> {
		let key = kv::namespaced(&self.prefix, principal);
		let token = LockToken::generate();
		let acquired = self.kv.set_if_absent_with_ttl(&key, token.expose().to_owned(), ttl).await?;

		Ok(if acquired { LockAttempt::Acquired(token) } else { LockAttempt::Busy })
	}

	/// Releases the lock if `token` still owns it; returns whether an entry was removed.
	pub async fn release(
		&self,
		principal: &PrincipalId,
		token: &LockToken,
	) -> Result<bool, StoreError> {
		let key = kv::namespaced(&self.prefix, principal);

		self.kv.delete_if_equals(&key, token.expose()).await
	}
}
impl Debug for SingleFlightLock {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SingleFlightLock").field("prefix", &self.prefix).finish()
	}
}
