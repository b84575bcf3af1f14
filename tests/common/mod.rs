#![allow(dead_code)]

// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime, macros};
// self
use refresh_coordinator::{
	auth::{PrincipalId, RecordLifetime, RefreshRecord, RoleSet},
	clock::ManualClock,
	config::{RotationConfig, SigningKey},
	coordinator::RefreshCoordinator,
	kv::{MemoryKv, SharedKv},
	store::{MemoryStore, RefreshTokenStore, RotateOutcome, StoreError, StoreFuture},
};

pub const T0: OffsetDateTime = macros::datetime!(2025-01-01 00:00 UTC);

/// Memory store that counts rotations and can stall or fail on demand.
#[derive(Clone, Debug, Default)]
pub struct InstrumentedStore {
	pub inner: MemoryStore,
	rotations: Arc<AtomicUsize>,
	rotate_delay: Arc<Mutex<Option<StdDuration>>>,
	failing: Arc<AtomicBool>,
}
impl InstrumentedStore {
	pub fn rotations(&self) -> usize {
		self.rotations.load(Ordering::SeqCst)
	}

	pub fn stall_rotations(&self, delay: StdDuration) {
		*self.rotate_delay.lock() = Some(delay);
	}

	pub fn fail(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}

	fn check(&self) -> Result<(), StoreError> {
		if self.failing.load(Ordering::SeqCst) {
			Err(StoreError::Backend { message: "injected outage".into() })
		} else {
			Ok(())
		}
	}
}
impl RefreshTokenStore for InstrumentedStore {
	fn create<'a>(
		&'a self,
		principal: &'a PrincipalId,
		roles: &'a RoleSet,
		lifetime: RecordLifetime,
		grace_expires_at: OffsetDateTime,
	) -> StoreFuture<'a, RefreshRecord> {
		Box::pin(async move {
			self.check()?;
			self.inner.create(principal, roles, lifetime, grace_expires_at).await
		})
	}

	fn lookup<'a>(&'a self, value: &'a str) -> StoreFuture<'a, Option<RefreshRecord>> {
		Box::pin(async move {
			self.check()?;
			self.inner.lookup(value).await
		})
	}

	fn current<'a>(&'a self, principal: &'a PrincipalId) -> StoreFuture<'a, Option<RefreshRecord>> {
		Box::pin(async move {
			self.check()?;
			self.inner.current(principal).await
		})
	}

	fn rotate<'a>(
		&'a self,
		old_value: &'a str,
		lifetime: RecordLifetime,
		grace_expires_at: OffsetDateTime,
	) -> StoreFuture<'a, RotateOutcome> {
		Box::pin(async move {
			self.check()?;
			self.rotations.fetch_add(1, Ordering::SeqCst);

			let delay = *self.rotate_delay.lock();

			if let Some(delay) = delay {
				tokio::time::sleep(delay).await;
			}

			self.inner.rotate(old_value, lifetime, grace_expires_at).await
		})
	}

	fn revoke<'a>(
		&'a self,
		principal: &'a PrincipalId,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, usize> {
		Box::pin(async move {
			self.check()?;
			self.inner.revoke(principal, instant).await
		})
	}

	fn purge_expired(&self, instant: OffsetDateTime) -> StoreFuture<'_, usize> {
		Box::pin(async move {
			self.check()?;
			self.inner.purge_expired(instant).await
		})
	}
}

/// One coordinator plus handles on everything it was built from.
pub struct Fixture {
	pub coordinator: Arc<RefreshCoordinator>,
	pub store: InstrumentedStore,
	pub kv: Arc<MemoryKv>,
	pub clock: ManualClock,
}
impl Fixture {
	pub fn new(config: RotationConfig) -> Self {
		let clock = ManualClock::new(T0);
		let store = InstrumentedStore::default();
		let kv = Arc::new(MemoryKv::new(Arc::new(clock.clone())));
		let coordinator =
			Arc::new(build_coordinator(config, Arc::new(store.clone()), kv.clone(), &clock));

		Self { coordinator, store, kv, clock }
	}

	/// Another replica over the same store and clock but with its own lock/cache backend.
	pub fn partitioned_replica(&self) -> Arc<RefreshCoordinator> {
		let kv = Arc::new(MemoryKv::new(Arc::new(self.clock.clone())));

		Arc::new(build_coordinator(
			self.coordinator.config().clone(),
			Arc::new(self.store.clone()),
			kv,
			&self.clock,
		))
	}
}

pub fn build_coordinator(
	config: RotationConfig,
	store: Arc<dyn RefreshTokenStore>,
	kv: Arc<dyn SharedKv>,
	clock: &ManualClock,
) -> RefreshCoordinator {
	RefreshCoordinator::new(config, &signing_key(), store, kv, Arc::new(clock.clone()))
		.expect("Coordinator fixture config should be valid.")
}

pub fn signing_key() -> SigningKey {
	SigningKey::new(b"integration-test-signing-key-0123456789")
		.expect("Signing key fixture should be valid.")
}

/// Short-lived access credentials matching the documented rotation scenario.
pub fn scenario_config() -> RotationConfig {
	RotationConfig::default()
		.with_access_ttl(Duration::seconds(2))
		.with_refresh_ttl(Duration::days(7))
		.with_lock_timeout(Duration::seconds(5))
		.with_cache_ttl(Duration::seconds(5))
		.with_grace_period(Duration::seconds(20))
}

pub fn principal(name: &str) -> PrincipalId {
	PrincipalId::new(name).expect("Principal fixture should be valid.")
}

pub fn roles() -> RoleSet {
	RoleSet::new(["reader", "writer"]).expect("Role fixture should be valid.")
}
