//! The access/refresh pair handed back to clients after login or renewal.

// self
use crate::{
	_prelude::*,
	auth::{AccessCredential, RefreshRecord, TokenSecret},
};

/// Client-facing view of a refresh record: the opaque value and when it stops being redeemable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshCredential {
	/// Opaque refresh value; callers must avoid logging it.
	pub value: TokenSecret,
	/// Absolute expiry of the underlying record.
	pub expires_at: OffsetDateTime,
}
impl From<&RefreshRecord> for RefreshCredential {
	fn from(record: &RefreshRecord) -> Self {
		Self { value: record.value.clone(), expires_at: record.expires_at }
	}
}

/// Credentials a client must store so its next request already carries the rotated pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
	/// Freshly issued access credential.
	pub access: AccessCredential,
	/// Refresh credential to present on the next renewal.
	pub refresh: RefreshCredential,
}
impl TokenPair {
	/// Pairs an access credential with the refresh record it was derived from.
	pub fn new(access: AccessCredential, refresh: &RefreshRecord) -> Self {
		Self { access, refresh: refresh.into() }
	}
}
