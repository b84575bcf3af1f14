//! Coordinator-level error types shared across the codec, stores, and the inbound gate.

// self
use crate::_prelude::*;

/// Coordinator-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Access credential failed its signature, shape, or expiry check.
	#[error("Access credential is invalid or expired.")]
	AccessInvalid,
	/// Refresh credential is unknown, revoked, or outside its redeemable window.
	#[error("Refresh credential is not redeemable: {reason}.")]
	RefreshInvalid {
		/// Why the credential was rejected.
		reason: String,
	},
	/// A renewal is in flight elsewhere and did not publish an outcome within the poll budget.
	#[error("Renewal did not complete after {attempts} polls.")]
	RefreshTimeout {
		/// Number of cache polls performed before giving up.
		attempts: u32,
	},
	/// Backing store or lock provider failure.
	#[error("Storage unavailable: {0}")]
	StorageUnavailable(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// No principal is present where one was required.
	#[error("Request is not authenticated.")]
	Unauthenticated,
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl Error {
	pub(crate) fn refresh_invalid(reason: impl Into<String>) -> Self {
		Self::RefreshInvalid { reason: reason.into() }
	}

	/// Classifies the error into the action the inbound gate should take.
	pub fn disposition(&self) -> Disposition {
		match self {
			Self::AccessInvalid => Disposition::Renew,
			Self::RefreshInvalid { .. } | Self::Unauthenticated => Disposition::Reauthenticate,
			Self::RefreshTimeout { .. } | Self::StorageUnavailable(_) => Disposition::RetryShortly,
			Self::Config(_) => Disposition::Reject,
		}
	}
}

/// Protocol-independent handling hint derived from an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Disposition {
	/// Present the refresh credential and renew.
	Renew,
	/// Credentials are terminally unusable; log in again.
	Reauthenticate,
	/// Transient condition; retry after a short backoff without discarding credentials.
	RetryShortly,
	/// Server-side misconfiguration; not actionable by the client.
	Reject,
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A duration that must be positive was zero or negative.
	#[error("The `{field}` duration must be positive.")]
	NonPositiveDuration {
		/// Offending configuration field.
		field: &'static str,
	},
	/// A duration exceeds the supported range.
	#[error("The `{field}` duration must not exceed {max}.")]
	DurationOutOfRange {
		/// Offending configuration field.
		field: &'static str,
		/// Largest accepted value.
		max: Duration,
	},
	/// Access credentials carry whole-second expiries.
	#[error("The access TTL must be at least one second.")]
	SubSecondAccessTtl,
	/// Waiters must be allowed at least one poll.
	#[error("The poll attempt count must be positive.")]
	ZeroPollAttempts,
	/// Waiters would outlive the renewer they wait on.
	#[error("Poll budget {budget} exceeds the lock timeout {lock_timeout}.")]
	PollBudgetExceedsLock {
		/// `poll_interval * poll_attempts`.
		budget: Duration,
		/// Configured lock TTL.
		lock_timeout: Duration,
	},
	/// Signing secret is too short for HS256.
	#[error("Signing key must be at least {min} bytes, got {len}.")]
	WeakSigningKey {
		/// Minimum accepted length.
		min: usize,
		/// Supplied length.
		len: usize,
	},
	/// Header or cookie name is empty or contains separators.
	#[error("The `{field}` name is not a valid token: {value:?}.")]
	InvalidName {
		/// Offending configuration field.
		field: &'static str,
		/// Supplied value.
		value: String,
	},
	/// Settings document could not be parsed.
	#[error("Settings are malformed at `{path}`: {message}.")]
	Settings {
		/// Path of the offending field.
		path: String,
		/// Parser message.
		message: String,
	},
	/// Access credential could not be signed.
	#[error("Access credential could not be signed.")]
	Signing(#[source] jsonwebtoken::errors::Error),
	/// Principal identifier failed validation.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),
	/// Role set failed validation.
	#[error(transparent)]
	Roles(#[from] crate::auth::RoleValidationError),
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn store_error_converts_into_storage_unavailable_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::StorageUnavailable(_)));
		assert!(error.to_string().contains("database unreachable"));

		let source = StdError::source(&error)
			.expect("Storage errors should expose the original store error as their source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn dispositions_separate_client_and_infrastructure_faults() {
		assert_eq!(Error::AccessInvalid.disposition(), Disposition::Renew);
		assert_eq!(Error::refresh_invalid("revoked").disposition(), Disposition::Reauthenticate);
		assert_eq!(Error::Unauthenticated.disposition(), Disposition::Reauthenticate);
		assert_eq!(Error::RefreshTimeout { attempts: 50 }.disposition(), Disposition::RetryShortly);
		assert_eq!(
			Error::from(StoreError::Backend { message: "down".into() }).disposition(),
			Disposition::RetryShortly
		);
		assert_eq!(
			Error::from(ConfigError::ZeroPollAttempts).disposition(),
			Disposition::Reject
		);
	}
}
