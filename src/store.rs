//! Storage contracts and built-in store implementations for refresh records.

pub mod file;
pub mod ledger;
pub mod memory;

pub use file::FileStore;
pub use ledger::RefreshLedger;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{PrincipalId, RecordLifetime, RefreshRecord, RoleSet},
};

/// Boxed future returned by every store operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable, TTL-bearing mapping from refresh values to their records, with a reverse index from
/// principal to outstanding values.
///
/// Instants are supplied by the caller so backends never read a clock of their own.
pub trait RefreshTokenStore
where
	Self: Send + Sync,
{
	/// Mints and persists a new current record for `principal`.
	///
	/// An existing current record for the principal is superseded by the new one, with its grace
	/// window ending at `grace_expires_at`, so at most one current record exists per principal.
	fn create<'a>(
		&'a self,
		principal: &'a PrincipalId,
		roles: &'a RoleSet,
		lifetime: RecordLifetime,
		grace_expires_at: OffsetDateTime,
	) -> StoreFuture<'a, RefreshRecord>;

	/// Fetches the record for a presented value, if present.
	fn lookup<'a>(&'a self, value: &'a str) -> StoreFuture<'a, Option<RefreshRecord>>;

	/// Resolves the principal's current (lineage head) record, if any.
	fn current<'a>(&'a self, principal: &'a PrincipalId) -> StoreFuture<'a, Option<RefreshRecord>>;

	/// Atomically supersedes `old_value` and mints its successor.
	///
	/// Concurrent callers presenting the same old value observe exactly one
	/// [`RotateOutcome::Rotated`]; everyone else gets [`RotateOutcome::AlreadyRotated`] with the
	/// existing head, so no second lineage is ever created.
	fn rotate<'a>(
		&'a self,
		old_value: &'a str,
		lifetime: RecordLifetime,
		grace_expires_at: OffsetDateTime,
	) -> StoreFuture<'a, RotateOutcome>;

	/// Revokes every outstanding record of the principal, returning how many were affected.
	fn revoke<'a>(
		&'a self,
		principal: &'a PrincipalId,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, usize>;

	/// Drops records that can no longer be redeemed, returning how many were removed.
	fn purge_expired(&self, instant: OffsetDateTime) -> StoreFuture<'_, usize>;
}

/// Result of a rotation attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RotateOutcome {
	/// The old record was current; this is its freshly minted successor.
	Rotated(RefreshRecord),
	/// The old record had already been superseded; this is the principal's current head.
	AlreadyRotated(RefreshRecord),
	/// The old record (or the lineage head) has been revoked.
	Revoked,
	/// No record matched the old value, or the lineage has no head.
	Missing,
}

/// Error type produced by [`RefreshTokenStore`] and [`crate::kv::SharedKv`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn store_error_messages_carry_payload() {
		let err = StoreError::Serialization { message: "bad json".into() };

		assert_eq!(err.to_string(), "Serialization error: bad json.");
	}
}
