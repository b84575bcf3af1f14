//! Time sources injected into the codec, coordinator, and in-memory backends.

// std
use std::time::Duration as StdDuration;
// crates.io
use time::PrimitiveDateTime;
// self
use crate::_prelude::*;

/// Boxed sleep future returned by [`Clock::sleep`].
pub type SleepFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Wall-clock source plus the suspension primitive used between cache polls.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Current instant.
	fn now(&self) -> OffsetDateTime;

	/// Suspends the caller for `duration` without blocking the worker thread.
	fn sleep(&self, duration: Duration) -> SleepFuture;
}

/// Production clock backed by the system time and the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}

	fn sleep(&self, duration: Duration) -> SleepFuture {
		Box::pin(tokio::time::sleep(to_std(duration)))
	}
}

/// Settable clock for tests.
///
/// `now` only moves through [`ManualClock::advance`]/[`ManualClock::set`]; `sleep` still
/// suspends on the tokio timer so paused-time tests drive the poll loop deterministically.
#[derive(Clone, Debug)]
pub struct ManualClock(Arc<Mutex<OffsetDateTime>>);
impl ManualClock {
	/// Creates a clock frozen at `start`.
	pub fn new(start: OffsetDateTime) -> Self {
		Self(Arc::new(Mutex::new(start)))
	}

	/// Moves the clock forward.
	pub fn advance(&self, by: Duration) {
		*self.0.lock() += by;
	}

	/// Jumps to an absolute instant.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}

	fn sleep(&self, duration: Duration) -> SleepFuture {
		Box::pin(tokio::time::sleep(to_std(duration)))
	}
}

/// `instant + duration`, clamped to the representable range.
pub(crate) fn saturating_add(instant: OffsetDateTime, duration: Duration) -> OffsetDateTime {
	instant.checked_add(duration).unwrap_or(if duration.is_negative() {
		PrimitiveDateTime::MIN.assume_utc()
	} else {
		PrimitiveDateTime::MAX.assume_utc()
	})
}

/// Converts to a std duration, clamping negatives to zero.
pub(crate) fn to_std(duration: Duration) -> StdDuration {
	StdDuration::try_from(duration).unwrap_or(StdDuration::ZERO)
}
