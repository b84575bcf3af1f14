//! Signed, self-contained access credentials and the claims recovered from them.

// self
use crate::{
	_prelude::*,
	auth::{PrincipalId, RoleSet, TokenSecret},
};

/// Short-lived signed credential proving identity for a single request window.
///
/// Immutable once issued. Verification is stateless; see [`crate::codec::TokenCodec::verify`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCredential {
	/// Serialized, signed token; callers must avoid logging it.
	pub token: TokenSecret,
	/// Principal the credential was issued to.
	pub principal: PrincipalId,
	/// Roles granted to the principal.
	pub roles: RoleSet,
	/// Issuer stamped into the credential.
	pub issuer: String,
	/// Issued-at instant (whole seconds).
	pub issued_at: OffsetDateTime,
	/// Expiry instant (whole seconds); the credential is invalid at and after this instant.
	pub expires_at: OffsetDateTime,
}
impl AccessCredential {
	/// Returns `true` once `instant` reaches the expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Remaining lifetime at `instant`, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}

/// Claims recovered from a successfully verified access credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedClaims {
	/// Authenticated principal.
	pub principal: PrincipalId,
	/// Roles granted to the principal.
	pub roles: RoleSet,
	/// Issuer the credential was minted by.
	pub issuer: String,
	/// Unique credential identifier.
	pub credential_id: String,
	/// Issued-at instant.
	pub issued_at: OffsetDateTime,
	/// Expiry instant.
	pub expires_at: OffsetDateTime,
}
