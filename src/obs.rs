//! Optional observability helpers for coordinator operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (default) to emit structured spans named `refresh_coordinator.op` with the
//!   `op` (operation) and `stage` (call site) fields, plus the storage-fault events below.
//! - Enable `metrics` to increment the `refresh_coordinator_op_total` counter for every
//!   attempt/success/failure/coalesced/timeout, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use self::{metrics::*, tracing::*};

// self
use crate::_prelude::*;

/// Coordinator operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Login hand-off minting the first pair.
	Establish,
	/// Stateless access credential check.
	Verify,
	/// Refresh credential redemption.
	Renew,
	/// Revocation of a principal's records.
	Logout,
	/// Removal of records that can no longer be redeemed.
	Purge,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::Establish => "establish",
			OpKind::Verify => "verify",
			OpKind::Renew => "renew",
			OpKind::Logout => "logout",
			OpKind::Purge => "purge",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// A waiter adopted another caller's renewal outcome.
	Coalesced,
	/// A waiter exhausted its poll budget.
	Timeout,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
			OpOutcome::Coalesced => "coalesced",
			OpOutcome::Timeout => "timeout",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
