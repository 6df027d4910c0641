//! Time source used by the rate limiter and the token expiry checks.

// self
use crate::_prelude::*;

/// Boxed future returned by [`Clock::sleep`].
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// Wall clock plus delay primitive.
///
/// The rate limiter reads the current instant and sleeps through this trait so tests can
/// substitute [`ManualClock`] and never wait in real time.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Current UTC instant.
	fn now(&self) -> OffsetDateTime;

	/// Suspends the caller for `duration`; non-positive durations return immediately.
	fn sleep(&self, duration: Duration) -> SleepFuture<'_>;
}

/// [`Clock`] backed by the system time and the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}

	fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
		let wait = std::time::Duration::try_from(duration).unwrap_or_default();

		Box::pin(tokio::time::sleep(wait))
	}
}

/// Deterministic [`Clock`] whose sleeps advance the reported time instantly.
///
/// Every requested sleep is recorded so callers can assert on the waits a component
/// performed.
#[derive(Clone, Debug)]
pub struct ManualClock {
	inner: Arc<Mutex<ManualClockState>>,
}
impl ManualClock {
	/// Starts the clock at `start`.
	pub fn new(start: OffsetDateTime) -> Self {
		Self { inner: Arc::new(Mutex::new(ManualClockState { now: start, sleeps: Vec::new() })) }
	}

	/// Moves the clock forward without recording a sleep.
	pub fn advance(&self, by: Duration) {
		self.inner.lock().now += by;
	}

	/// Jumps the clock to `instant`.
	pub fn set(&self, instant: OffsetDateTime) {
		self.inner.lock().now = instant;
	}

	/// Every sleep requested so far, in order.
	pub fn sleeps(&self) -> Vec<Duration> {
		self.inner.lock().sleeps.clone()
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		self.inner.lock().now
	}

	fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
		{
			let mut state = self.inner.lock();

			state.sleeps.push(duration);

			if duration.is_positive() {
				state.now += duration;
			}
		}

		Box::pin(async {})
	}
}

#[derive(Debug)]
struct ManualClockState {
	now: OffsetDateTime,
	sleeps: Vec<Duration>,
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[tokio::test]
	async fn manual_clock_sleep_advances_time() {
		let clock = ManualClock::new(macros::datetime!(2024-01-01 00:00 UTC));

		clock.sleep(Duration::seconds(5)).await;
		clock.advance(Duration::milliseconds(250));

		assert_eq!(clock.now(), macros::datetime!(2024-01-01 00:00:05.25 UTC));
		assert_eq!(clock.sleeps(), vec![Duration::seconds(5)]);
	}

	#[tokio::test]
	async fn manual_clock_ignores_negative_sleeps() {
		let start = macros::datetime!(2024-01-01 00:00 UTC);
		let clock = ManualClock::new(start);

		clock.sleep(Duration::seconds(-3)).await;

		assert_eq!(clock.now(), start);
		assert_eq!(clock.sleeps().len(), 1);
	}

	#[tokio::test]
	async fn system_clock_treats_negative_sleep_as_zero() {
		SystemClock.sleep(Duration::seconds(-1)).await;
	}
}
