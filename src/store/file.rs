//! File-backed [`RefreshTokenStore`] for single-node deployments that must survive restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{PrincipalId, RecordLifetime, RefreshRecord, RoleSet},
	store::{RefreshLedger, RefreshTokenStore, RotateOutcome, StoreError, StoreFuture},
};

/// Persists the ledger to a JSON snapshot after each mutation (tmp file + rename).
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<RefreshLedger>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing records.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let ledger = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(ledger)) })
	}

	fn load_snapshot(path: &Path) -> Result<RefreshLedger, StoreError> {
		if !path.exists() {
			return Ok(RefreshLedger::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(RefreshLedger::default());
		}

		let records: Vec<RefreshRecord> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(RefreshLedger::from_records(records))
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, ledger: &RefreshLedger) -> Result<(), StoreError> {
		let snapshot: Vec<_> = ledger.records().collect();
		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	/// Applies `mutate` and persists the result, rolling the in-memory ledger back if the
	/// snapshot cannot be written so memory never runs ahead of disk.
	fn mutate<T>(&self, mutate: impl FnOnce(&mut RefreshLedger) -> T) -> Result<T, StoreError> {
		let mut guard = self.inner.write();
		let before = (*guard).clone();
		let output = mutate(&mut *guard);

		if let Err(e) = self.persist_locked(&guard) {
			*guard = before;

			return Err(e);
		}

		Ok(output)
	}
}
impl RefreshTokenStore for FileStore {
	fn create<'a>(
		&'a self,
		principal: &'a PrincipalId,
		roles: &'a RoleSet,
		lifetime: RecordLifetime,
		grace_expires_at: OffsetDateTime,
	) -> StoreFuture<'a, RefreshRecord> {
		Box::pin(async move {
			self.mutate(|ledger| ledger.create(principal, roles, lifetime, grace_expires_at))
		})
	}

	fn lookup<'a>(&'a self, value: &'a str) -> StoreFuture<'a, Option<RefreshRecord>> {
		Box::pin(async move { Ok(self.inner.read().lookup(value)) })
	}

	fn current<'a>(&'a self, principal: &'a PrincipalId) -> StoreFuture<'a, Option<RefreshRecord>> {
		Box::pin(async move { Ok(self.inner.read().current(principal)) })
	}

	fn rotate<'a>(
		&'a self,
		old_value: &'a str,
		lifetime: RecordLifetime,
		grace_expires_at: OffsetDateTime,
	) -> StoreFuture<'a, RotateOutcome> {
		Box::pin(async move {
			self.mutate(|ledger| ledger.rotate(old_value, lifetime, grace_expires_at))
		})
	}

	fn revoke<'a>(
		&'a self,
		principal: &'a PrincipalId,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, usize> {
		Box::pin(async move { self.mutate(|ledger| ledger.revoke(principal, instant)) })
	}

	fn purge_expired(&self, instant: OffsetDateTime) -> StoreFuture<'_, usize> {
		Box::pin(async move { self.mutate(|ledger| ledger.purge_expired(instant)) })
	}
}
