//! Request-scoped holder of the authenticated principal.
//!
//! One [`AuthContext`] is created per logical request and passed explicitly down the call
//! chain; nothing is stored in thread-locals. [`AuthContext::enter`] returns a guard that clears
//! the context when dropped, so every exit path (early return, error, panic unwind, or a
//! cancelled future) leaves it empty.
//!
//! Reading an empty context is never a panic: [`AuthContext::require`] returns
//! [`Error::Unauthenticated`]. Call sites that consider a missing principal a programming error
//! should still go through `require` and decide what to do with the error themselves.

// std
use std::ops::Deref;
// self
use crate::{
	_prelude::*,
	auth::{AccessCredential, PrincipalId, RoleSet, VerifiedClaims},
};

/// Identity established for the current request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedPrincipal {
	/// Authenticated principal.
	pub principal: PrincipalId,
	/// Roles carried by the access credential.
	pub roles: RoleSet,
	/// Expiry of the access credential that authenticated the request.
	pub expires_at: OffsetDateTime,
}
impl From<VerifiedClaims> for AuthenticatedPrincipal {
	fn from(claims: VerifiedClaims) -> Self {
		Self { principal: claims.principal, roles: claims.roles, expires_at: claims.expires_at }
	}
}
impl From<&AccessCredential> for AuthenticatedPrincipal {
	fn from(access: &AccessCredential) -> Self {
		Self {
			principal: access.principal.clone(),
			roles: access.roles.clone(),
			expires_at: access.expires_at,
		}
	}
}

/// Per-request principal slot.
#[derive(Debug, Default)]
pub struct AuthContext {
	slot: Mutex<Option<AuthenticatedPrincipal>>,
}
impl AuthContext {
	/// Creates an empty context.
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores the principal for this request, replacing any previous one.
	pub fn set(&self, principal: AuthenticatedPrincipal) {
		*self.slot.lock() = Some(principal);
	}

	/// Returns the principal, if one is set.
	pub fn get(&self) -> Option<AuthenticatedPrincipal> {
		self.slot.lock().clone()
	}

	/// Empties the context.
	pub fn clear(&self) {
		self.slot.lock().take();
	}

	/// Returns the principal or [`Error::Unauthenticated`].
	pub fn require(&self) -> Result<AuthenticatedPrincipal> {
		self.get().ok_or(Error::Unauthenticated)
	}

	/// Returns `true` if a principal is set.
	pub fn is_authenticated(&self) -> bool {
		self.slot.lock().is_some()
	}

	/// Sets `principal` and returns a guard that clears the context on drop.
	pub fn enter(&self, principal: AuthenticatedPrincipal) -> ContextGuard<'_> {
		self.set(principal);

		ContextGuard { context: self }
	}
}

/// Clears its [`AuthContext`] when dropped.
#[derive(Debug)]
pub struct ContextGuard<'a> {
	context: &'a AuthContext,
}
impl Deref for ContextGuard<'_> {
	type Target = AuthContext;

	fn deref(&self) -> &Self::Target {
		self.context
	}
}
impl Drop for ContextGuard<'_> {
	fn drop(&mut self) {
		self.context.clear();
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::panic::{self, AssertUnwindSafe};
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn alice() -> AuthenticatedPrincipal {
		AuthenticatedPrincipal {
			principal: PrincipalId::new("alice").expect("Principal fixture should be valid."),
			roles: RoleSet::new(["reader"]).expect("Role fixture should be valid."),
			expires_at: macros::datetime!(2025-01-01 00:15 UTC),
		}
	}

	#[test]
	fn empty_context_is_unauthenticated() {
		let ctx = AuthContext::new();

		assert!(ctx.get().is_none());
		assert!(matches!(ctx.require(), Err(Error::Unauthenticated)));
	}

	#[test]
	fn set_get_clear_round_trip() {
		let ctx = AuthContext::new();

		ctx.set(alice());

		assert_eq!(ctx.require().expect("Principal should be set."), alice());

		ctx.clear();

		assert!(!ctx.is_authenticated());
	}

	#[test]
	fn guard_clears_on_drop() {
		let ctx = AuthContext::new();

		{
			let guard = ctx.enter(alice());

			assert_eq!(guard.get(), Some(alice()));
		}

		assert!(ctx.get().is_none());
	}

	#[test]
	fn guard_clears_on_panic_unwind() {
		let ctx = AuthContext::new();
		let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
			let _guard = ctx.enter(alice());

			panic!("handler blew up");
		}));

		assert!(outcome.is_err());
		assert!(ctx.get().is_none());
	}
}
