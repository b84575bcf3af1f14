//! Thread-safe in-memory [`RefreshTokenStore`] implementation for single-process deployments
//! and tests.

// self
use crate::{
	_prelude::*,
	auth::{PrincipalId, RecordLifetime, RefreshRecord, RoleSet},
	store::{RefreshLedger, RefreshTokenStore, RotateOutcome, StoreFuture},
};

type SharedLedger = Arc<RwLock<RefreshLedger>>;

/// Storage backend that keeps records in-process; every mutation runs under one write lock.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(SharedLedger);
impl MemoryStore {
	/// Number of stored records, including superseded and revoked ones.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` if nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Number of records indexed under a principal.
	pub fn outstanding(&self, principal: &PrincipalId) -> usize {
		self.0.read().outstanding(principal)
	}
}
impl RefreshTokenStore for MemoryStore {
	fn create<'a>(
		&'a self,
		principal: &'a PrincipalId,
		roles: &'a RoleSet,
		lifetime: RecordLifetime,
		grace_expires_at: OffsetDateTime,
	) -> StoreFuture<'a, RefreshRecord> {
		let ledger = self.0.clone();

		Box::pin(async move {
			Ok(ledger.write().create(principal, roles, lifetime, grace_expires_at))
		})
	}

	fn lookup<'a>(&'a self, value: &'a str) -> StoreFuture<'a, Option<RefreshRecord>> {
		let ledger = self.0.clone();

		Box::pin(async move { Ok(ledger.read().lookup(value)) })
	}

	fn current<'a>(&'a self, principal: &'a PrincipalId) -> StoreFuture<'a, Option<RefreshRecord>> {
		let ledger = self.0.clone();

		Box::pin(async move { Ok(ledger.read().current(principal)) })
	}

	fn rotate<'a>(
		&'a self,
		old_value: &'a str,
		lifetime: RecordLifetime,
		grace_expires_at: OffsetDateTime,
	) -> StoreFuture<'a, RotateOutcome> {
		let ledger = self.0.clone();

		Box::pin(async move { Ok(ledger.write().rotate(old_value, lifetime, grace_expires_at)) })
	}

	fn revoke<'a>(
		&'a self,
		principal: &'a PrincipalId,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, usize> {
		let ledger = self.0.clone();

		Box::pin(async move { Ok(ledger.write().revoke(principal, instant)) })
	}

	fn purge_expired(&self, instant: OffsetDateTime) -> StoreFuture<'_, usize> {
		let ledger = self.0.clone();

		Box::pin(async move { Ok(ledger.write().purge_expired(instant)) })
	}
}
