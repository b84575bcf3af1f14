//! Backend-agnostic record bookkeeping shared by the in-process stores.
//!
//! The ledger owns the value -> record map and the principal -> values reverse index and applies
//! every lineage transition. Callers wrap it in whatever lock and persistence they need; each
//! method must run under a single exclusive borrow to stay atomic.

// self
use crate::{
	_prelude::*,
	auth::{PrincipalId, RecordLifetime, RefreshRecord, RefreshState, RoleSet},
	store::RotateOutcome,
};

/// Refresh records keyed by value, plus the per-principal reverse index.
#[derive(Clone, Debug, Default)]
pub struct RefreshLedger {
	records: HashMap<String, RefreshRecord>,
	by_principal: HashMap<PrincipalId, HashSet<String>>,
}
impl RefreshLedger {
	/// Rebuilds a ledger (and its index) from persisted records.
	pub fn from_records(records: impl IntoIterator<Item = RefreshRecord>) -> Self {
		let mut ledger = Self::default();

		for record in records {
			ledger.insert(record);
		}

		ledger
	}

	/// Number of stored records.
	pub fn len(&self) -> usize {
		self.records.len()
	}

	/// Returns `true` if nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// Iterates over every stored record.
	pub fn records(&self) -> impl Iterator<Item = &RefreshRecord> {
		self.records.values()
	}

	/// Values indexed under a principal.
	pub fn outstanding(&self, principal: &PrincipalId) -> usize {
		self.by_principal.get(principal).map_or(0, HashSet::len)
	}

	/// Mints a new head for `principal`, superseding any existing head.
	pub fn create(
		&mut self,
		principal: &PrincipalId,
		roles: &RoleSet,
		lifetime: RecordLifetime,
		grace_expires_at: OffsetDateTime,
	) -> RefreshRecord {
		let previous = self.current(principal).map(|head| head.value);
		let record = RefreshRecord::mint(principal.clone(), roles.clone(), lifetime, previous);

		if let Some(head) =
			record.supersedes.as_ref().and_then(|value| self.records.get_mut(value.expose()))
		{
			// Head was read as current under the same borrow.
			let _ = head.supersede(record.value.clone(), grace_expires_at);
		}

		self.insert(record.clone());

		record
	}

	/// Fetches a record by value.
	pub fn lookup(&self, value: &str) -> Option<RefreshRecord> {
		self.records.get(value).cloned()
	}

	/// Resolves the principal's current record.
	pub fn current(&self, principal: &PrincipalId) -> Option<RefreshRecord> {
		self.by_principal
			.get(principal)?
			.iter()
			.filter_map(|value| self.records.get(value))
			.find(|record| record.is_current())
			.cloned()
	}

	/// Supersedes `old_value` and mints its successor, or reports why it cannot.
	pub fn rotate(
		&mut self,
		old_value: &str,
		lifetime: RecordLifetime,
		grace_expires_at: OffsetDateTime,
	) -> RotateOutcome {
		let Some(old) = self.records.get(old_value) else {
			return RotateOutcome::Missing;
		};

		match old.state {
			RefreshState::Revoked { .. } => RotateOutcome::Revoked,
			RefreshState::Superseded { .. } => match self.current(&old.principal) {
				Some(head) => RotateOutcome::AlreadyRotated(head),
				None => RotateOutcome::Missing,
			},
			RefreshState::Current => {
				let successor = RefreshRecord::mint(
					old.principal.clone(),
					old.roles.clone(),
					lifetime,
					Some(old.value.clone()),
				);
				let superseded = self.records.get_mut(old_value).is_some_and(|old| {
					old.supersede(successor.value.clone(), grace_expires_at).is_ok()
				});

				if !superseded {
					return RotateOutcome::Missing;
				}

				self.insert(successor.clone());

				RotateOutcome::Rotated(successor)
			},
		}
	}

	/// Revokes every outstanding record of `principal`.
	pub fn revoke(&mut self, principal: &PrincipalId, instant: OffsetDateTime) -> usize {
		let Some(values) = self.by_principal.get(principal) else {
			return 0;
		};
		let mut revoked = 0;

		for value in values {
			match self.records.get_mut(value) {
				Some(record) if !record.is_revoked() => {
					record.revoke(instant);

					revoked += 1;
				},
				_ => {},
			}
		}

		revoked
	}

	/// Removes records that can no longer be redeemed.
	pub fn purge_expired(&mut self, instant: OffsetDateTime) -> usize {
		let doomed = self
			.records
			.values()
			.filter(|record| record.is_purgeable_at(instant))
			.map(|record| (record.value.expose().to_owned(), record.principal.clone()))
			.collect::<Vec<_>>();

		for (value, principal) in &doomed {
			self.records.remove(value);

			if let Some(values) = self.by_principal.get_mut(principal) {
				values.remove(value);

				if values.is_empty() {
					self.by_principal.remove(principal);
				}
			}
		}

		doomed.len()
	}

	fn insert(&mut self, record: RefreshRecord) {
		let value = record.value.expose().to_owned();

		self.by_principal.entry(record.principal.clone()).or_default().insert(value.clone());
		self.records.insert(value, record);
	}
}
