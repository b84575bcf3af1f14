//! Spans and fault events for coordinator operations.
//!
//! Each public coordinator call opens one `refresh_coordinator.op` span whose `stage` is the
//! entry point (`establish`, `verify`, `renew`, `renew_presented`, `logout`, `purge_expired`).
//! Events inside it name the step that produced them:
//!
//! - storage faults: `create`, `lookup`, `cache_read`, `lock_acquire`, `relookup`, `rotate`,
//!   `current`, `publish`, `poll`, `lock_release`, `revoke`, `purge_expired`;
//! - renewal steps: `wait` (lock busy, polling the cache), `rotated` (this caller minted the
//!   successor), `derived` (pair built from the lineage head without rotating);
//! - client faults carry the rejection reason, e.g. `unknown`, `principal_mismatch`,
//!   `grace_elapsed`, `revoked`, `rejected_by_renewer`.

// self
use crate::{_prelude::*, obs::OpKind, store::StoreError};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// Span wrapping one coordinator operation.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a span tagged with the operation kind and stage.
	pub fn new(kind: OpKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("refresh_coordinator.op", op = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> OpSpanGuard {
		#[cfg(feature = "tracing")]
		{
			OpSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			OpSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`OpSpan::entered`].
pub struct OpSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for OpSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("OpSpanGuard(..)")
	}
}

/// Logs an infrastructure fault, kept apart from client-caused failures.
pub fn storage_fault(kind: OpKind, stage: &'static str, error: &StoreError) {
	#[cfg(feature = "tracing")]
	{
		tracing::error!(
			op = kind.as_str(),
			stage,
			fault = "storage",
			%error,
			"Storage backend failed."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, stage, error);
	}
}

/// Logs a client-caused rejection. Only the credential fingerprint is recorded.
pub fn client_fault(kind: OpKind, stage: &'static str, fingerprint: &str, reason: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			op = kind.as_str(),
			stage,
			fault = "client",
			fingerprint,
			reason,
			"Credential rejected."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, stage, fingerprint, reason);
	}
}

/// Records a step of a renewal episode at debug level.
pub fn renewal_step(stage: &'static str, principal: &str, fingerprint: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(op = OpKind::Renew.as_str(), stage, principal, fingerprint, "Renewal step.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (stage, principal, fingerprint);
	}
}
