//! Short-TTL shared cache of renewal outcomes.
//!
//! Entries are keyed by principal and by the fingerprint of the refresh record an episode
//! redeemed, so a later episode for the same principal never reads an earlier one's pair. The
//! first outcome published within a TTL window wins; later publishers and every poller read that
//! same outcome back.

// self
use crate::{
	_prelude::*,
	auth::{PrincipalId, TokenPair, TokenSecret},
	kv::{self, SharedKv},
	store::StoreError,
};

/// Outcome of one renewal episode as seen by every caller in it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "pair", rename_all = "snake_case")]
pub enum CachedRenewal {
	/// The renewer produced this pair.
	Renewed(TokenPair),
	/// The renewer found the presented credential unredeemable.
	Rejected,
}
impl CachedRenewal {
	/// Drops a renewed pair whose access credential is already dead at `instant`.
	pub fn live_at(self, instant: OffsetDateTime) -> Option<Self> {
		let dead = matches!(&self, Self::Renewed(pair) if pair.access.is_expired_at(instant));

		if dead { None } else { Some(self) }
	}
}

/// Typed view over [`SharedKv`] for renewal outcomes.
#[derive(Clone)]
pub struct RenewalResultCache {
	kv: Arc<dyn SharedKv>,
	prefix: String,
}
impl RenewalResultCache {
	/// Default key namespace.
	pub const DEFAULT_PREFIX: &str = "refresh:renewal";

	/// Creates a cache using the default key namespace.
	pub fn new(kv: Arc<dyn SharedKv>) -> Self {
		Self { kv, prefix: Self::DEFAULT_PREFIX.into() }
	}

	/// Overrides the key namespace.
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = prefix.into();

		self
	}

	/// Reads the live outcome of the episode that redeemed `redeemed`, if any.
	pub async fn get(
		&self,
		principal: &PrincipalId,
		redeemed: &TokenSecret,
	) -> Result<Option<CachedRenewal>, StoreError> {
		let key = self.key(principal, redeemed);

		self.kv.get(&key).await?.map(|raw| decode(&raw)).transpose()
	}

	/// Publishes `outcome` unless one already exists; returns whichever outcome is now cached.
	pub async fn publish(
		&self,
		principal: &PrincipalId,
		redeemed: &TokenSecret,
		outcome: CachedRenewal,
		ttl: Duration,
	) -> Result<CachedRenewal, StoreError> {
		let key = self.key(principal, redeemed);
		let raw = serde_json::to_string(&outcome).map_err(|e| StoreError::Serialization {
			message: format!("Failed to encode renewal outcome: {e}"),
		})?;

		if self.kv.set_if_absent_with_ttl(&key, raw, ttl).await? {
			return Ok(outcome);
		}

		match self.kv.get(&key).await? {
			Some(existing) => decode(&existing),
			// Lapsed between the two calls; the caller's own outcome stands.
			None => Ok(outcome),
		}
	}

	fn key(&self, principal: &PrincipalId, redeemed: &TokenSecret) -> String {
		format!("{}:{}", kv::namespaced(&self.prefix, principal), redeemed.fingerprint())
	}
}
impl Debug for RenewalResultCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RenewalResultCache").field("prefix", &self.prefix).finish()
	}
}

fn decode(raw: &str) -> Result<CachedRenewal, StoreError> {
	serde_json::from_str(raw).map_err(|e| StoreError::Serialization {
		message: format!("Failed to decode renewal outcome: {e}"),
	})
}
