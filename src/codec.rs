//! Stateless signing and verification of access credentials.
//!
//! Credentials are HS256 JWTs. Expiry is checked against the injected [`Clock`] rather than
//! `jsonwebtoken`'s own system-time check, so tests can move time deterministically.

// crates.io
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
// self
use crate::{
	_prelude::*,
	auth::{AccessCredential, PrincipalId, RoleSet, TokenSecret, VerifiedClaims},
	clock::{self, Clock},
	config::SigningKey,
	error::ConfigError,
};

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
	sub: PrincipalId,
	iss: String,
	iat: i64,
	exp: i64,
	jti: String,
	#[serde(default)]
	roles: RoleSet,
}

/// Signs and verifies access credentials; a pure function of the signing key and the clock.
#[derive(Clone)]
pub struct TokenCodec {
	encoding: EncodingKey,
	decoding: DecodingKey,
	validation: Validation,
	issuer: String,
	access_ttl: Duration,
	clock: Arc<dyn Clock>,
}
impl TokenCodec {
	/// Creates a codec for the given key, issuer, and access TTL.
	pub fn new(
		key: &SigningKey,
		issuer: impl Into<String>,
		access_ttl: Duration,
		clock: Arc<dyn Clock>,
	) -> Self {
		let issuer = issuer.into();
		let mut validation = Validation::new(Algorithm::HS256);

		validation.validate_exp = false;
		validation.leeway = 0;
		validation.required_spec_claims =
			["exp", "iat", "iss", "sub"].into_iter().map(String::from).collect();
		validation.set_issuer(&[issuer.as_str()]);

		Self {
			encoding: EncodingKey::from_secret(key.expose()),
			decoding: DecodingKey::from_secret(key.expose()),
			validation,
			issuer,
			access_ttl,
			clock,
		}
	}

	/// Issuer stamped into every credential.
	pub fn issuer(&self) -> &str {
		&self.issuer
	}

	/// Issues a credential valid from now until `now + access_ttl`.
	///
	/// JWT expiries are whole seconds, so `exp` is rounded up and never falls short of the TTL.
	pub fn issue(&self, principal: &PrincipalId, roles: &RoleSet) -> Result<AccessCredential> {
		let now = self.clock.now();
		let iat = now.unix_timestamp();
		let exp = ceil_unix(clock::saturating_add(now, self.access_ttl));
		let claims = AccessClaims {
			sub: principal.clone(),
			iss: self.issuer.clone(),
			iat,
			exp,
			jti: TokenSecret::generate().expose().to_owned(),
			roles: roles.clone(),
		};
		let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
			.map_err(ConfigError::Signing)?;

		Ok(AccessCredential {
			token: TokenSecret::new(token),
			principal: claims.sub,
			roles: claims.roles,
			issuer: claims.iss,
			issued_at: from_unix(iat),
			expires_at: from_unix(exp),
		})
	}

	/// Verifies signature, shape, issuer, and expiry. Any failure is [`Error::AccessInvalid`].
	pub fn verify(&self, raw: &str) -> Result<VerifiedClaims> {
		let data = jsonwebtoken::decode::<AccessClaims>(raw, &self.decoding, &self.validation)
			.map_err(|_| Error::AccessInvalid)?;
		let claims = data.claims;

		if claims.exp <= self.clock.now().unix_timestamp() {
			return Err(Error::AccessInvalid);
		}

		Ok(VerifiedClaims {
			principal: claims.sub,
			roles: claims.roles,
			issuer: claims.iss,
			credential_id: claims.jti,
			issued_at: from_unix(claims.iat),
			expires_at: from_unix(claims.exp),
		})
	}
}
impl Debug for TokenCodec {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCodec")
			.field("issuer", &self.issuer)
			.field("access_ttl", &self.access_ttl)
			.finish()
	}
}

fn ceil_unix(instant: OffsetDateTime) -> i64 {
	instant.unix_timestamp() + i64::from(instant.nanosecond() > 0)
}

fn from_unix(seconds: i64) -> OffsetDateTime {
	OffsetDateTime::from_unix_timestamp(seconds).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::clock::ManualClock;

	fn codec(clock: &ManualClock, ttl: Duration) -> TokenCodec {
		let key = SigningKey::new([42_u8; 32]).expect("Signing key fixture should be valid.");

		TokenCodec::new(&key, "issuer-test", ttl, Arc::new(clock.clone()))
	}

	fn principal() -> PrincipalId {
		PrincipalId::new("user-1").expect("Principal fixture should be valid.")
	}

	#[test]
	fn issue_then_verify_recovers_claims() {
		let clock = ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC));
		let codec = codec(&clock, Duration::minutes(15));
		let roles = RoleSet::new(["admin"]).expect("Role fixture should be valid.");
		let credential = codec.issue(&principal(), &roles).expect("Issuing should succeed.");

		assert_eq!(credential.expires_at, macros::datetime!(2025-01-01 00:15 UTC));

		let claims = codec.verify(credential.token.expose()).expect("Fresh credential verifies.");

		assert_eq!(claims.principal, principal());
		assert_eq!(claims.roles, roles);
		assert_eq!(claims.issuer, "issuer-test");
		assert_eq!(claims.expires_at, credential.expires_at);
		assert!(!claims.credential_id.is_empty());
	}

	#[test]
	fn credentials_expire_at_the_deadline() {
		let clock = ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC));
		let codec = codec(&clock, Duration::seconds(1));
		let credential =
			codec.issue(&principal(), &RoleSet::default()).expect("Issuing should succeed.");

		clock.advance(Duration::milliseconds(999));

		assert!(codec.verify(credential.token.expose()).is_ok());

		clock.advance(Duration::milliseconds(1));

		assert!(matches!(codec.verify(credential.token.expose()), Err(Error::AccessInvalid)));
	}

	#[test]
	fn sub_second_issue_instants_round_the_expiry_up() {
		let t0 = macros::datetime!(2025-01-01 00:00 UTC);
		let clock = ManualClock::new(t0 + Duration::milliseconds(700));
		let codec = codec(&clock, Duration::seconds(2));
		let credential =
			codec.issue(&principal(), &RoleSet::default()).expect("Issuing should succeed.");

		assert_eq!(credential.issued_at, t0);
		assert_eq!(credential.expires_at, t0 + Duration::seconds(3));

		clock.set(t0 + Duration::milliseconds(2_500));

		assert!(codec.verify(credential.token.expose()).is_ok());

		clock.set(t0 + Duration::milliseconds(2_700));

		assert!(codec.verify(credential.token.expose()).is_ok(), "Full TTL must be honored.");

		clock.set(t0 + Duration::seconds(3));

		assert!(matches!(codec.verify(credential.token.expose()), Err(Error::AccessInvalid)));
	}

	#[test]
	fn tampered_foreign_and_malformed_tokens_are_rejected() {
		let clock = ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC));
		let codec = codec(&clock, Duration::minutes(5));
		let credential =
			codec.issue(&principal(), &RoleSet::default()).expect("Issuing should succeed.");
		let mut tampered = credential.token.expose().to_owned();

		tampered.push('x');

		assert!(matches!(codec.verify(&tampered), Err(Error::AccessInvalid)));
		assert!(matches!(codec.verify("not-a-jwt"), Err(Error::AccessInvalid)));

		let other_key = SigningKey::new([1_u8; 32]).expect("Signing key fixture should be valid.");
		let foreign = TokenCodec::new(&other_key, "issuer-test", Duration::minutes(5), Arc::new(clock));

		assert!(matches!(foreign.verify(credential.token.expose()), Err(Error::AccessInvalid)));
	}

	#[test]
	fn issuer_mismatch_is_rejected() {
		let clock = ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC));
		let key = SigningKey::new([42_u8; 32]).expect("Signing key fixture should be valid.");
		let minted = TokenCodec::new(&key, "other-issuer", Duration::minutes(5), Arc::new(clock.clone()))
			.issue(&principal(), &RoleSet::default())
			.expect("Issuing should succeed.");

		assert!(matches!(
			codec(&clock, Duration::minutes(5)).verify(minted.token.expose()),
			Err(Error::AccessInvalid)
		));
	}
}
