// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for renewal episodes.
#[derive(Debug, Default)]
pub struct RenewalMetrics {
	attempts: AtomicU64,
	rotations: AtomicU64,
	derived: AtomicU64,
	coalesced: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	timeout: AtomicU64,
}
impl RenewalMetrics {
	/// Returns the total number of renewal attempts.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns how many renewals rotated a record.
	pub fn rotations(&self) -> u64 {
		self.rotations.load(Ordering::Relaxed)
	}

	/// Returns how many graced presentations were answered from the current head.
	pub fn derived(&self) -> u64 {
		self.derived.load(Ordering::Relaxed)
	}

	/// Returns how many renewals adopted an already published outcome.
	pub fn coalesced(&self) -> u64 {
		self.coalesced.load(Ordering::Relaxed)
	}

	/// Returns the number of successful renewals (rotated, derived, or coalesced).
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of failed renewals, excluding poll timeouts.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns the number of waiters that exhausted their poll budget.
	pub fn timeouts(&self) -> u64 {
		self.timeout.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_rotation(&self) {
		self.rotations.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_derived(&self) {
		self.derived.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_coalesced(&self) {
		self.coalesced.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_timeout(&self) {
		self.timeout.fetch_add(1, Ordering::Relaxed);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn counters_are_independent() {
		let metrics = RenewalMetrics::default();

		metrics.record_attempt();
		metrics.record_attempt();
		metrics.record_rotation();
		metrics.record_coalesced();
		metrics.record_success();
		metrics.record_success();

		assert_eq!(metrics.attempts(), 2);
		assert_eq!(metrics.rotations(), 1);
		assert_eq!(metrics.coalesced(), 1);
		assert_eq!(metrics.successes(), 2);
		assert_eq!(metrics.derived(), 0);
		assert_eq!(metrics.failures(), 0);
		assert_eq!(metrics.timeouts(), 0);
	}
}
