// std
use std::sync::Arc;
// crates.io
use time::{Duration, OffsetDateTime, macros};
use tokio::task::JoinSet;
// self
use refresh_coordinator::{
	auth::{PrincipalId, RecordLifetime, RefreshStatus, RoleSet},
	store::{MemoryStore, RefreshTokenStore, RotateOutcome},
};

const T0: OffsetDateTime = macros::datetime!(2025-11-10 12:00 UTC);
const GRACE: Duration = Duration::seconds(20);

fn make_principal() -> PrincipalId {
	PrincipalId::new("principal-456")
		.expect("Failed to build principal identifier for memory store tests.")
}

fn make_roles() -> RoleSet {
	RoleSet::new(["email", "profile"]).expect("Failed to build default role set for tests.")
}

fn lifetime() -> RecordLifetime {
	RecordLifetime::starting_at(T0, Duration::days(7))
}

#[tokio::test]
async fn create_lookup_and_current_round_trip() {
	let store = MemoryStore::default();
	let principal = make_principal();
	let record = store
		.create(&principal, &make_roles(), lifetime(), T0 + GRACE)
		.await
		.expect("Creating a record in the memory store should succeed.");
	let fetched = store
		.lookup(record.value.expose())
		.await
		.expect("Looking up a record should succeed.")
		.expect("Stored record should remain present.");
	let head = store
		.current(&principal)
		.await
		.expect("Resolving the current record should succeed.")
		.expect("The created record should be the lineage head.");

	assert_eq!(fetched, record);
	assert_eq!(head, record);
	assert_eq!(record.expires_at, T0 + Duration::days(7));
	assert_eq!(record.status_at(T0), RefreshStatus::Current);
	assert!(
		store.lookup("missing").await.expect("Looking up a missing value should succeed.").is_none()
	);
}

#[tokio::test]
async fn rotation_outcomes_cover_every_state() {
	let store = MemoryStore::default();
	let principal = make_principal();
	let record = store
		.create(&principal, &make_roles(), lifetime(), T0 + GRACE)
		.await
		.expect("Creating a record in the memory store should succeed.");
	let RotateOutcome::Rotated(successor) = store
		.rotate(record.value.expose(), lifetime(), T0 + GRACE)
		.await
		.expect("Rotating the current record should succeed.")
	else {
		panic!("Rotating the current record should mint a successor.");
	};

	assert_eq!(successor.supersedes.as_ref(), Some(&record.value));
	assert_eq!(successor.roles, make_roles());
	assert_eq!(
		store
			.rotate(record.value.expose(), lifetime(), T0 + GRACE)
			.await
			.expect("Re-rotating should succeed."),
		RotateOutcome::AlreadyRotated(successor.clone())
	);
	assert_eq!(
		store.rotate("missing", lifetime(), T0 + GRACE).await.expect("Rotating should succeed."),
		RotateOutcome::Missing
	);

	store.revoke(&principal, T0).await.expect("Revoking should succeed.");

	assert_eq!(
		store
			.rotate(successor.value.expose(), lifetime(), T0 + GRACE)
			.await
			.expect("Rotating a revoked record should succeed."),
		RotateOutcome::Revoked
	);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_rotation_allows_single_successor() {
	let store = Arc::new(MemoryStore::default());
	let principal = make_principal();
	let base = store
		.create(&principal, &make_roles(), lifetime(), T0 + GRACE)
		.await
		.expect("Creating the base record should succeed.");
	let mut tasks = JoinSet::new();

	for _ in 0..16 {
		let store = store.clone();
		let value = base.value.expose().to_owned();

		tasks.spawn(async move {
			store
				.rotate(&value, lifetime(), T0 + GRACE)
				.await
				.expect("Rotation task should complete successfully.")
		});
	}

	let mut outcomes = Vec::new();

	while let Some(joined) = tasks.join_next().await {
		outcomes.push(joined.expect("Rotation task should not panic."));
	}

	let rotated = outcomes
		.iter()
		.filter_map(|outcome| match outcome {
			RotateOutcome::Rotated(record) => Some(record.clone()),
			_ => None,
		})
		.collect::<Vec<_>>();

	assert_eq!(rotated.len(), 1, "only one rotation may mint a successor");
	assert!(outcomes.iter().all(|outcome| match outcome {
		RotateOutcome::Rotated(record) | RotateOutcome::AlreadyRotated(record) =>
			*record == rotated[0],
		_ => false,
	}));
	assert_eq!(store.len(), 2);
	assert_eq!(
		store.current(&principal).await.expect("Resolving the head should succeed."),
		Some(rotated[0].clone())
	);
}

#[tokio::test]
async fn revoke_marks_every_outstanding_record() {
	let store = MemoryStore::default();
	let principal = make_principal();
	let other = PrincipalId::new("principal-789").expect("Failed to build second principal.");
	let record = store
		.create(&principal, &make_roles(), lifetime(), T0 + GRACE)
		.await
		.expect("Creating a record should succeed.");

	store
		.rotate(record.value.expose(), lifetime(), T0 + GRACE)
		.await
		.expect("Rotating should succeed.");
	store
		.create(&other, &make_roles(), lifetime(), T0 + GRACE)
		.await
		.expect("Creating an unrelated record should succeed.");

	assert_eq!(store.revoke(&principal, T0).await.expect("Revoking should succeed."), 2);
	assert!(store.current(&principal).await.expect("Resolving should succeed.").is_none());
	assert!(store.current(&other).await.expect("Resolving should succeed.").is_some());

	let revoked = store
		.lookup(record.value.expose())
		.await
		.expect("Lookup should succeed.")
		.expect("Revoked record should remain until purged.");

	assert_eq!(revoked.status_at(T0 + Duration::seconds(1)), RefreshStatus::Revoked);
}

#[tokio::test]
async fn purge_respects_grace_and_expiry() {
	let store = MemoryStore::default();
	let principal = make_principal();
	let record = store
		.create(&principal, &make_roles(), lifetime(), T0 + GRACE)
		.await
		.expect("Creating a record should succeed.");

	store
		.rotate(record.value.expose(), lifetime(), T0 + GRACE)
		.await
		.expect("Rotating should succeed.");

	assert_eq!(store.purge_expired(T0 + Duration::seconds(5)).await.expect("Purge."), 0);
	assert_eq!(store.purge_expired(T0 + GRACE).await.expect("Purge."), 1);
	assert_eq!(store.outstanding(&principal), 1);
	assert_eq!(store.purge_expired(T0 + Duration::days(7)).await.expect("Purge."), 1);
	assert!(store.is_empty());
}
