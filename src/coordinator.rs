//! Refresh rotation with single-flight guards, grace-window lineage, and metrics.
//!
//! [`RefreshCoordinator::renew`] turns a presented refresh credential into a fresh
//! [`TokenPair`] such that at most one rotation happens per principal per renewal episode:
//!
//! - A *current* record is rotated by whichever caller wins the [`SingleFlightLock`]. The winner
//!   publishes the pair to the [`RenewalResultCache`]; losers poll the cache for a bounded number
//!   of attempts and return the published pair verbatim, or [`Error::RefreshTimeout`].
//! - A *graced* (superseded, inside its grace window) record never rotates again. If the episode
//!   that superseded it is still cached, the cached pair is returned; otherwise a pair is derived
//!   from the lineage head (fresh access credential, the head's refresh value).
//! - Anything else is [`Error::RefreshInvalid`]. Storage faults surface as
//!   [`Error::StorageUnavailable`] and are logged apart from client faults.

mod metrics;

pub use self::metrics::RenewalMetrics;

// self
use crate::{
	_prelude::*,
	auth::{
		self, PrincipalId, RecordLifetime, RefreshRecord, RefreshStatus, RoleSet, TokenPair,
		TokenSecret, VerifiedClaims,
	},
	cache::{CachedRenewal, RenewalResultCache},
	clock::{self, Clock},
	codec::TokenCodec,
	config::{RotationConfig, SigningKey},
	kv::SharedKv,
	lock::{LockAttempt, SingleFlightLock},
	obs::{self, OpKind, OpOutcome, OpSpan},
	store::{RefreshTokenStore, RotateOutcome, StoreError},
};

/// How a renewal episode resolved for one caller.
enum Resolution {
	/// This caller rotated the record.
	Rotated(TokenPair),
	/// A graced record was answered from the lineage head.
	Derived(TokenPair),
	/// Another caller's published outcome was adopted.
	Coalesced(TokenPair),
}
impl Resolution {
	fn outcome(&self) -> OpOutcome {
		match self {
			Self::Rotated(_) | Self::Derived(_) => OpOutcome::Success,
			Self::Coalesced(_) => OpOutcome::Coalesced,
		}
	}

	fn into_pair(self) -> TokenPair {
		match self {
			Self::Rotated(pair) | Self::Derived(pair) | Self::Coalesced(pair) => pair,
		}
	}
}

/// Orchestrates the codec, the refresh store, and the lock/cache pair into the rotation protocol.
#[derive(Clone)]
pub struct RefreshCoordinator {
	/// Refresh record persistence.
	pub store: Arc<dyn RefreshTokenStore>,
	/// Shared counters for renewal outcomes.
	pub renewal_metrics: Arc<RenewalMetrics>,
	codec: TokenCodec,
	lock: SingleFlightLock,
	cache: RenewalResultCache,
	clock: Arc<dyn Clock>,
	config: RotationConfig,
}
impl RefreshCoordinator {
	/// Validates `config` and wires the coordinator.
	///
	/// `kv` backs both the single-flight lock and the renewal cache; it must be visible to every
	/// replica that can renew for the same principals.
	pub fn new(
		config: RotationConfig,
		key: &SigningKey,
		store: Arc<dyn RefreshTokenStore>,
		kv: Arc<dyn SharedKv>,
		clock: Arc<dyn Clock>,
	) -> Result<Self> {
		config.validate()?;

		let codec = TokenCodec::new(key, config.issuer.clone(), config.access_ttl, clock.clone());

		Ok(Self {
			store,
			renewal_metrics: Default::default(),
			codec,
			lock: SingleFlightLock::new(kv.clone()),
			cache: RenewalResultCache::new(kv),
			clock,
			config,
		})
	}

	/// Replaces the single-flight lock (e.g. to change its key namespace).
	pub fn with_lock(mut self, lock: SingleFlightLock) -> Self {
		self.lock = lock;

		self
	}

	/// Replaces the renewal cache (e.g. to change its key namespace).
	pub fn with_cache(mut self, cache: RenewalResultCache) -> Self {
		self.cache = cache;

		self
	}

	/// Validated configuration in effect.
	pub fn config(&self) -> &RotationConfig {
		&self.config
	}

	/// Codec used for access credentials.
	pub fn codec(&self) -> &TokenCodec {
		&self.codec
	}

	/// Login hand-off: mints a current refresh record and its first access credential.
	pub async fn establish(&self, principal: &PrincipalId, roles: &RoleSet) -> Result<TokenPair> {
		const KIND: OpKind = OpKind::Establish;

		let span = OpSpan::new(KIND, "establish");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let now = self.clock.now();
				let record = self
					.store
					.create(principal, roles, self.lifetime(now), self.grace_deadline(now))
					.await
					.map_err(storage_error(KIND, "create"))?;
				let access = self.codec.issue(principal, &record.roles)?;

				Ok(TokenPair::new(access, &record))
			})
			.await;

		record_finish(KIND, &result);

		result
	}

	/// Stateless check of a presented access credential.
	pub fn verify(&self, raw: &str) -> Result<VerifiedClaims> {
		const KIND: OpKind = OpKind::Verify;

		let _span = OpSpan::new(KIND, "verify").entered();

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = self.codec.verify(raw);

		record_finish(KIND, &result);

		result
	}

	/// Redeems `presented` on behalf of `principal`.
	///
	/// Fails with [`Error::RefreshInvalid`] if the record belongs to someone else.
	pub async fn renew(&self, principal: &PrincipalId, presented: &str) -> Result<TokenPair> {
		self.run_renewal(Some(principal), presented, "renew").await
	}

	/// Redeems `presented`, resolving the principal from its record.
	///
	/// This is the inbound path when the access credential is missing or unreadable.
	pub async fn renew_presented(&self, presented: &str) -> Result<TokenPair> {
		self.run_renewal(None, presented, "renew_presented").await
	}

	/// Revokes every outstanding record of `principal`; grace windows no longer apply.
	pub async fn logout(&self, principal: &PrincipalId) -> Result<usize> {
		const KIND: OpKind = OpKind::Logout;

		let span = OpSpan::new(KIND, "logout");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.store
					.revoke(principal, self.clock.now())
					.await
					.map_err(storage_error(KIND, "revoke"))
			})
			.await;

		record_finish(KIND, &result);

		result
	}

	/// Drops records that can no longer be redeemed.
	pub async fn purge_expired(&self) -> Result<usize> {
		const KIND: OpKind = OpKind::Purge;

		let span = OpSpan::new(KIND, "purge_expired");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.store
					.purge_expired(self.clock.now())
					.await
					.map_err(storage_error(KIND, "purge_expired"))
			})
			.await;

		record_finish(KIND, &result);

		result
	}

	async fn run_renewal(
		&self,
		expected: Option<&PrincipalId>,
		presented: &str,
		stage: &'static str,
	) -> Result<TokenPair> {
		const KIND: OpKind = OpKind::Renew;

		let span = OpSpan::new(KIND, stage);

		obs::record_op_outcome(KIND, OpOutcome::Attempt);
		self.renewal_metrics.record_attempt();

		let result = span.instrument(self.redeem(expected, presented)).await;

		match &result {
			Ok(resolution) => {
				match resolution {
					Resolution::Rotated(_) => self.renewal_metrics.record_rotation(),
					Resolution::Derived(_) => self.renewal_metrics.record_derived(),
					Resolution::Coalesced(_) => self.renewal_metrics.record_coalesced(),
				}

				self.renewal_metrics.record_success();
				obs::record_op_outcome(KIND, resolution.outcome());
			},
			Err(Error::RefreshTimeout { .. }) => {
				self.renewal_metrics.record_timeout();
				obs::record_op_outcome(KIND, OpOutcome::Timeout);
			},
			Err(_) => {
				self.renewal_metrics.record_failure();
				obs::record_op_outcome(KIND, OpOutcome::Failure);
			},
		}

		result.map(Resolution::into_pair)
	}

	async fn redeem(&self, expected: Option<&PrincipalId>, presented: &str) -> Result<Resolution> {
		let fingerprint = auth::fingerprint(presented);
		let record = self
			.store
			.lookup(presented)
			.await
			.map_err(storage_error(OpKind::Renew, "lookup"))?
			.ok_or_else(|| reject(&fingerprint, "unknown"))?;

		if expected.is_some_and(|principal| *principal != record.principal) {
			return Err(reject(&fingerprint, "principal_mismatch"));
		}

		match record.status_at(self.clock.now()) {
			RefreshStatus::Current => self.redeem_current(&record, &fingerprint).await,
			RefreshStatus::Graced => self.redeem_graced(&record, &fingerprint).await,
			status => Err(reject(&fingerprint, status.as_str())),
		}
	}

	async fn redeem_graced(&self, record: &RefreshRecord, fingerprint: &str) -> Result<Resolution> {
		if let Some(outcome) = self.cached(&record.principal, &record.value).await? {
			return adopt(outcome, fingerprint).map(Resolution::Coalesced);
		}

		self.derive(&record.principal, fingerprint).await.map(Resolution::Derived)
	}

	async fn redeem_current(&self, record: &RefreshRecord, fingerprint: &str) -> Result<Resolution> {
		if let Some(outcome) = self.cached(&record.principal, &record.value).await? {
			return adopt(outcome, fingerprint).map(Resolution::Coalesced);
		}

		let attempt = self
			.lock
			.try_acquire(&record.principal, self.config.lock_timeout)
			.await
			.map_err(storage_error(OpKind::Renew, "lock_acquire"))?;
		let token = match attempt {
			LockAttempt::Acquired(token) => token,
			LockAttempt::Busy => {
				obs::renewal_step("wait", &record.principal, fingerprint);

				return self.await_outcome(record, fingerprint).await.map(Resolution::Coalesced);
			},
		};
		let result = self.rotate_locked(record, fingerprint).await;

		// The TTL reclaims the lock if this fails.
		if let Err(e) = self.lock.release(&record.principal, &token).await {
			obs::storage_fault(OpKind::Renew, "lock_release", &e);
		}

		result
	}

	async fn rotate_locked(&self, record: &RefreshRecord, fingerprint: &str) -> Result<Resolution> {
		if let Some(outcome) = self.cached(&record.principal, &record.value).await? {
			return adopt(outcome, fingerprint).map(Resolution::Coalesced);
		}

		let now = self.clock.now();
		let latest = self
			.store
			.lookup(record.value.expose())
			.await
			.map_err(storage_error(OpKind::Renew, "relookup"))?;

		match latest.map(|latest| latest.status_at(now)) {
			Some(RefreshStatus::Current) => {},
			Some(RefreshStatus::Graced) =>
				return self.derive_and_publish(record, fingerprint).await,
			Some(status) =>
				return self.publish_rejection(record, fingerprint, status.as_str()).await,
			None => return self.publish_rejection(record, fingerprint, "unknown").await,
		}

		let outcome = self
			.store
			.rotate(record.value.expose(), self.lifetime(now), self.grace_deadline(now))
			.await
			.map_err(storage_error(OpKind::Renew, "rotate"))?;
		let successor = match outcome {
			RotateOutcome::Rotated(successor) => successor,
			RotateOutcome::AlreadyRotated(_) =>
				return self.derive_and_publish(record, fingerprint).await,
			RotateOutcome::Revoked =>
				return self.publish_rejection(record, fingerprint, "revoked").await,
			RotateOutcome::Missing =>
				return self.publish_rejection(record, fingerprint, "unknown").await,
		};
		let pair = TokenPair::new(self.codec.issue(&successor.principal, &successor.roles)?, &successor);

		obs::renewal_step("rotated", &record.principal, fingerprint);

		match self
			.cache
			.publish(
				&record.principal,
				&record.value,
				CachedRenewal::Renewed(pair.clone()),
				self.config.cache_ttl,
			)
			.await
		{
			Ok(published) => adopt(published, fingerprint).map(Resolution::Rotated),
			// The rotation is durable; waiters time out and retry through the grace window.
			Err(e) => {
				obs::storage_fault(OpKind::Renew, "publish", &e);

				Ok(Resolution::Rotated(pair))
			},
		}
	}

	/// Lock-holder path when another replica already rotated `record`: the derived pair is
	/// published so waiters on this lock converge on it.
	async fn derive_and_publish(
		&self,
		record: &RefreshRecord,
		fingerprint: &str,
	) -> Result<Resolution> {
		let pair = self.derive(&record.principal, fingerprint).await?;

		match self
			.cache
			.publish(
				&record.principal,
				&record.value,
				CachedRenewal::Renewed(pair.clone()),
				self.config.cache_ttl,
			)
			.await
		{
			Ok(published) => adopt(published, fingerprint).map(Resolution::Derived),
			Err(e) => {
				obs::storage_fault(OpKind::Renew, "publish", &e);

				Ok(Resolution::Derived(pair))
			},
		}
	}

	async fn derive(&self, principal: &PrincipalId, fingerprint: &str) -> Result<TokenPair> {
		let head = self
			.store
			.current(principal)
			.await
			.map_err(storage_error(OpKind::Renew, "current"))?
			.ok_or_else(|| reject(fingerprint, "no_current_record"))?;
		let status = head.status_at(self.clock.now());

		if status != RefreshStatus::Current {
			return Err(reject(fingerprint, status.as_str()));
		}

		obs::renewal_step("derived", principal, fingerprint);

		Ok(TokenPair::new(self.codec.issue(&head.principal, &head.roles)?, &head))
	}

	async fn await_outcome(&self, record: &RefreshRecord, fingerprint: &str) -> Result<TokenPair> {
		let attempts = self.config.poll_attempts;

		for _ in 0..attempts {
			self.clock.sleep(self.config.poll_interval).await;

			match self.cache.get(&record.principal, &record.value).await {
				Ok(Some(outcome)) => {
					if let Some(outcome) = outcome.live_at(self.clock.now()) {
						return adopt(outcome, fingerprint);
					}
				},
				Ok(None) => {},
				Err(e) => obs::storage_fault(OpKind::Renew, "poll", &e),
			}
		}

		Err(Error::RefreshTimeout { attempts })
	}

	async fn publish_rejection(
		&self,
		record: &RefreshRecord,
		fingerprint: &str,
		reason: &str,
	) -> Result<Resolution> {
		if let Err(e) = self
			.cache
			.publish(&record.principal, &record.value, CachedRenewal::Rejected, self.config.cache_ttl)
			.await
		{
			obs::storage_fault(OpKind::Renew, "publish", &e);
		}

		Err(reject(fingerprint, reason))
	}

	async fn cached(
		&self,
		principal: &PrincipalId,
		redeemed: &TokenSecret,
	) -> Result<Option<CachedRenewal>> {
		let outcome = self
			.cache
			.get(principal, redeemed)
			.await
			.map_err(storage_error(OpKind::Renew, "cache_read"))?;

		Ok(outcome.and_then(|outcome| outcome.live_at(self.clock.now())))
	}

	fn lifetime(&self, now: OffsetDateTime) -> RecordLifetime {
		RecordLifetime::starting_at(now, self.config.refresh_ttl)
	}

	fn grace_deadline(&self, now: OffsetDateTime) -> OffsetDateTime {
		clock::saturating_add(now, self.config.grace_period)
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("codec", &self.codec)
			.field("lock", &self.lock)
			.field("cache", &self.cache)
			.field("config", &self.config)
			.finish()
	}
}

fn adopt(outcome: CachedRenewal, fingerprint: &str) -> Result<TokenPair> {
	match outcome {
		CachedRenewal::Renewed(pair) => Ok(pair),
		CachedRenewal::Rejected => Err(reject(fingerprint, "rejected_by_renewer")),
	}
}

fn reject(fingerprint: &str, reason: &str) -> Error {
	obs::client_fault(OpKind::Renew, "redeem", fingerprint, reason);

	Error::refresh_invalid(reason)
}

fn storage_error(kind: OpKind, stage: &'static str) -> impl FnOnce(StoreError) -> Error {
	move |e| {
		obs::storage_fault(kind, stage, &e);

		e.into()
	}
}

fn record_finish<T>(kind: OpKind, result: &Result<T>) {
	match result {
		Ok(_) => obs::record_op_outcome(kind, OpOutcome::Success),
		Err(_) => obs::record_op_outcome(kind, OpOutcome::Failure),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{clock::ManualClock, error::ConfigError, kv::MemoryKv, store::MemoryStore};

	fn coordinator(config: RotationConfig) -> Result<RefreshCoordinator> {
		let clock = ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC));
		let key = SigningKey::new([7_u8; 32]).expect("Signing key fixture should be valid.");

		RefreshCoordinator::new(
			config,
			&key,
			Arc::new(MemoryStore::default()),
			Arc::new(MemoryKv::default()),
			Arc::new(clock),
		)
	}

	#[test]
	fn construction_validates_config() {
		let err = coordinator(RotationConfig::default().with_polling(Duration::seconds(1), 10))
			.expect_err("A poll budget beyond the lock TTL should be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::PollBudgetExceedsLock { .. })));
		assert!(coordinator(RotationConfig::default()).is_ok());
	}

	#[test]
	fn resolution_outcomes_map_to_labels() {
		let coordinator = coordinator(RotationConfig::default()).expect("Default config is valid.");
		let principal = PrincipalId::new("user-1").expect("Principal fixture should be valid.");
		let record = RefreshRecord::mint(
			principal.clone(),
			RoleSet::default(),
			coordinator.lifetime(macros::datetime!(2025-01-01 00:00 UTC)),
			None,
		);
		let access = coordinator
			.codec()
			.issue(&principal, &RoleSet::default())
			.expect("Issuing should succeed.");
		let pair = TokenPair::new(access, &record);

		assert_eq!(Resolution::Rotated(pair.clone()).outcome(), OpOutcome::Success);
		assert_eq!(Resolution::Derived(pair.clone()).outcome(), OpOutcome::Success);
		assert_eq!(Resolution::Coalesced(pair.clone()).outcome(), OpOutcome::Coalesced);
		assert_eq!(Resolution::Coalesced(pair.clone()).into_pair(), pair);
	}

	#[cfg(feature = "metrics")]
	#[test]
	fn verify_records_attempt_before_outcome() {
		// crates.io
		use ::metrics::{
			Counter, CounterFn, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString,
			Unit,
		};

		type Log = Arc<Mutex<Vec<(String, String)>>>;

		#[derive(Default)]
		struct Capture(Log);
		impl Recorder for Capture {
			fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

			fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

			fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

			fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
				let label = |name: &str| {
					key.labels()
						.find(|label| label.key() == name)
						.map(|label| label.value().to_owned())
						.unwrap_or_default()
				};

				Counter::from_arc(Arc::new(Hit {
					labels: (label("op"), label("outcome")),
					log: self.0.clone(),
				}))
			}

			fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
				Gauge::noop()
			}

			fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
				Histogram::noop()
			}
		}

		struct Hit {
			labels: (String, String),
			log: Log,
		}
		impl CounterFn for Hit {
			fn increment(&self, _: u64) {
				self.log.lock().push(self.labels.clone());
			}

			fn absolute(&self, _: u64) {}
		}

		let capture = Capture::default();
		let coordinator = coordinator(RotationConfig::default()).expect("Default config is valid.");

		::metrics::with_local_recorder(&capture, || {
			assert!(coordinator.verify("not-a-jwt").is_err());
		});

		assert_eq!(
			*capture.0.lock(),
			vec![("verify".to_owned(), "attempt".to_owned()), ("verify".into(), "failure".into())]
		);
	}

	#[tokio::test]
	async fn rejected_outcome_fails_as_refresh_invalid() {
		let err = adopt(CachedRenewal::Rejected, "fp").expect_err("Rejected is terminal.");

		assert!(matches!(err, Error::RefreshInvalid { .. }));
	}
}
