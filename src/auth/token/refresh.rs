//! Refresh records, their rotation lineage, and lifecycle helpers.
//!
//! A record moves `Current -> Superseded { grace } -> purged`, or to `Revoked` from either live
//! state. All transitions go through [`RefreshRecord::supersede`] and [`RefreshRecord::revoke`]
//! so legality is checked in one place.

// self
use crate::{
	_prelude::*,
	auth::{PrincipalId, RoleSet, TokenSecret},
	clock,
};

/// Lineage state of a refresh record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshState {
	/// Head of the principal's lineage.
	Current,
	/// Replaced by `successor`; still redeemable until `grace_expires_at`.
	Superseded {
		/// End of the grace window (exclusive).
		grace_expires_at: OffsetDateTime,
		/// Value of the record that replaced this one.
		successor: TokenSecret,
	},
	/// Explicitly invalidated; never redeemable again.
	Revoked {
		/// Instant the revocation was recorded.
		revoked_at: OffsetDateTime,
	},
}

/// Lifecycle status of a record at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshStatus {
	/// Lineage head, unexpired.
	Current,
	/// Superseded but inside its grace window.
	Graced,
	/// Superseded and the grace window has elapsed.
	GraceElapsed,
	/// Past the absolute expiry.
	Expired,
	/// Revoked.
	Revoked,
}
impl RefreshStatus {
	/// Returns a stable label suitable for log fields and rejection reasons.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshStatus::Current => "current",
			RefreshStatus::Graced => "graced",
			RefreshStatus::GraceElapsed => "grace_elapsed",
			RefreshStatus::Expired => "expired",
			RefreshStatus::Revoked => "revoked",
		}
	}
}

/// Rejected state transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum TransitionError {
	/// Only the lineage head can be superseded.
	#[error("Refresh record is no longer the current record.")]
	NotCurrent,
	/// Revoked records are terminal.
	#[error("Refresh record has been revoked.")]
	Revoked,
}

/// Issuance window for a new record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordLifetime {
	/// Issued-at instant.
	pub issued_at: OffsetDateTime,
	/// Absolute expiry instant.
	pub expires_at: OffsetDateTime,
}
impl RecordLifetime {
	/// Lifetime that starts at `issued_at` and lasts `ttl`, saturating at the latest
	/// representable instant.
	pub fn starting_at(issued_at: OffsetDateTime, ttl: Duration) -> Self {
		Self { issued_at, expires_at: clock::saturating_add(issued_at, ttl) }
	}
}

/// One outstanding refresh credential and its lineage metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRecord {
	/// Opaque, unguessable value; callers must avoid logging it.
	pub value: TokenSecret,
	/// Owner of the record.
	pub principal: PrincipalId,
	/// Roles re-issued on every renewal.
	pub roles: RoleSet,
	/// Issued-at instant.
	pub issued_at: OffsetDateTime,
	/// Absolute expiry instant.
	pub expires_at: OffsetDateTime,
	/// Value of the record this one replaced, if any.
	pub supersedes: Option<TokenSecret>,
	/// Lineage state.
	pub state: RefreshState,
}
impl RefreshRecord {
	/// Mints a fresh current record with a newly generated value.
	pub fn mint(
		principal: PrincipalId,
		roles: RoleSet,
		lifetime: RecordLifetime,
		supersedes: Option<TokenSecret>,
	) -> Self {
		Self {
			value: TokenSecret::generate(),
			principal,
			roles,
			issued_at: lifetime.issued_at,
			expires_at: lifetime.expires_at,
			supersedes,
			state: RefreshState::Current,
		}
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> RefreshStatus {
		match &self.state {
			RefreshState::Revoked { .. } => RefreshStatus::Revoked,
			_ if instant >= self.expires_at => RefreshStatus::Expired,
			RefreshState::Current => RefreshStatus::Current,
			RefreshState::Superseded { grace_expires_at, .. } if instant < *grace_expires_at =>
				RefreshStatus::Graced,
			RefreshState::Superseded { .. } => RefreshStatus::GraceElapsed,
		}
	}

	/// A record is redeemable while it is the unexpired head, or superseded within its grace
	/// window. Revocation wins over grace.
	pub fn is_redeemable_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), RefreshStatus::Current | RefreshStatus::Graced)
	}

	/// Returns `true` while the record heads its lineage (ignores expiry).
	pub fn is_current(&self) -> bool {
		matches!(self.state, RefreshState::Current)
	}

	/// Returns `true` once the record has been revoked.
	pub fn is_revoked(&self) -> bool {
		matches!(self.state, RefreshState::Revoked { .. })
	}

	/// Records that can be dropped from storage at `instant`.
	pub fn is_purgeable_at(&self, instant: OffsetDateTime) -> bool {
		match self.status_at(instant) {
			RefreshStatus::Expired | RefreshStatus::GraceElapsed => true,
			RefreshStatus::Revoked => instant >= self.expires_at,
			RefreshStatus::Current | RefreshStatus::Graced => false,
		}
	}

	/// End of the grace window for superseded records.
	pub fn grace_expires_at(&self) -> Option<OffsetDateTime> {
		match &self.state {
			RefreshState::Superseded { grace_expires_at, .. } => Some(*grace_expires_at),
			_ => None,
		}
	}

	/// Value of the record that replaced this one.
	pub fn successor(&self) -> Option<&TokenSecret> {
		match &self.state {
			RefreshState::Superseded { successor, .. } => Some(successor),
			_ => None,
		}
	}

	/// Demotes the head of a lineage, opening its grace window.
	pub fn supersede(
		&mut self,
		successor: TokenSecret,
		grace_expires_at: OffsetDateTime,
	) -> Result<(), TransitionError> {
		match self.state {
			RefreshState::Current => {
				self.state = RefreshState::Superseded { grace_expires_at, successor };

				Ok(())
			},
			RefreshState::Superseded { .. } => Err(TransitionError::NotCurrent),
			RefreshState::Revoked { .. } => Err(TransitionError::Revoked),
		}
	}

	/// Marks the record as revoked. Repeated revocations keep the first instant.
	pub fn revoke(&mut self, instant: OffsetDateTime) {
		if !self.is_revoked() {
			self.state = RefreshState::Revoked { revoked_at: instant };
		}
	}
}
