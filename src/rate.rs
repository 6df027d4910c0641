//! Persisted rate limiter spacing every outbound vendor call.
//!
//! The timestamp of the last granted call lives in `session.last_api_request_timestamp_utc`, so
//! the spacing survives restarts. Acquisitions inside one process are serialized; separate
//! processes sharing a store are not, and can both pass the check against a stale timestamp.

// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	error::ConfigError,
	obs,
	store::{SessionStore, StoreKey, StoreValue},
};

/// Default ceiling of 150 calls per hour, in calls per second.
pub const DEFAULT_FREQUENCY: f64 = 150. / 3600.;
/// Added to every computed wait so the clock is past the boundary on wake-up.
pub const SAFETY_MARGIN: Duration = Duration::milliseconds(10);

/// Result of the spacing check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
	/// The call may proceed immediately.
	Allow,
	/// The call should be delayed.
	Delay(RetryDirective),
}

/// Advises callers when to retry after a [`RateLimitDecision::Delay`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryDirective {
	/// Instant when the spacing interval has elapsed.
	pub earliest_retry_at: OffsetDateTime,
	/// Sleep duration including [`SAFETY_MARGIN`].
	pub recommended_backoff: Duration,
}
impl RetryDirective {
	/// Creates a new directive with the provided timing metadata.
	pub fn new(earliest_retry_at: OffsetDateTime, recommended_backoff: Duration) -> Self {
		Self { earliest_retry_at, recommended_backoff }
	}
}

/// Proof that a call slot was granted; the grant time is already persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RatePermit {
	granted_at: OffsetDateTime,
}
impl RatePermit {
	/// Instant the slot was granted.
	pub fn granted_at(&self) -> OffsetDateTime {
		self.granted_at
	}

	/// Ends the scope of the permit. Nothing is written; the slot was consumed on grant.
	pub fn release(self) {}
}

/// Gate ensuring consecutive vendor calls are at least `1 / frequency` seconds apart.
pub struct RateLimiter {
	store: Arc<dyn SessionStore>,
	clock: Arc<dyn Clock>,
	frequency: f64,
	interval: Duration,
	gate: AsyncMutex<()>,
}
impl RateLimiter {
	/// Creates a limiter driven by the system clock.
	///
	/// `frequency` is in calls per second and must be positive and finite.
	pub fn new(store: Arc<dyn SessionStore>, frequency: f64) -> Result<Self> {
		Self::with_clock(store, Arc::new(SystemClock), frequency)
	}

	/// Creates a limiter driven by the provided clock.
	pub fn with_clock(
		store: Arc<dyn SessionStore>,
		clock: Arc<dyn Clock>,
		frequency: f64,
	) -> Result<Self> {
		let interval = (frequency.is_finite() && frequency > 0.)
			.then(|| Duration::checked_seconds_f64(1. / frequency))
			.flatten()
			.ok_or(ConfigError::InvalidFrequency { frequency })?;

		Ok(Self { store, clock, frequency, interval, gate: AsyncMutex::new(()) })
	}

	/// Minimum spacing between two granted calls.
	pub fn interval(&self) -> Duration {
		self.interval
	}

	/// Clock the limiter reads and sleeps on.
	pub fn clock(&self) -> Arc<dyn Clock> {
		self.clock.clone()
	}

	/// Pure spacing check against the previous grant.
	pub fn evaluate(
		&self,
		last_call: Option<OffsetDateTime>,
		now: OffsetDateTime,
	) -> RateLimitDecision {
		let Some(last_call) = last_call else {
			return RateLimitDecision::Allow;
		};
		let earliest = last_call + self.interval;

		if now >= earliest {
			RateLimitDecision::Allow
		} else {
			RateLimitDecision::Delay(RetryDirective::new(earliest, earliest - now + SAFETY_MARGIN))
		}
	}

	/// Waits until the spacing interval has elapsed, then persists the grant time.
	///
	/// The grant is recorded before this returns, so a failing call still consumes its slot.
	pub async fn acquire(&self) -> Result<RatePermit> {
		let _serialized = self.gate.lock().await;

		loop {
			let last_call = self
				.store
				.fetch(&StoreKey::LAST_API_REQUEST)
				.await?
				.and_then(|value| value.as_timestamp());

			match self.evaluate(last_call, self.clock.now()) {
				RateLimitDecision::Allow => break,
				RateLimitDecision::Delay(directive) => {
					tracing::info!(
						"Waiting {:.1} seconds to not exceed API rate limit.",
						directive.recommended_backoff.as_seconds_f64()
					);
					obs::record_rate_limit_wait();

					self.clock.sleep(directive.recommended_backoff).await;
				},
			}
		}

		let granted_at = self.clock.now();

		self.store.save(StoreKey::LAST_API_REQUEST, StoreValue::timestamp(granted_at)).await?;

		Ok(RatePermit { granted_at })
	}

	/// Acquires a permit, then runs `call`.
	pub async fn run<F, T>(&self, call: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		let permit = self.acquire().await?;
		let outcome = call.await;

		permit.release();

		outcome
	}
}
impl Debug for RateLimiter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RateLimiter")
			.field("frequency", &self.frequency)
			.field("interval", &self.interval)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::store::MemoryStore;

	fn limiter(frequency: f64) -> Result<RateLimiter> {
		RateLimiter::new(Arc::new(MemoryStore::default()), frequency)
	}

	#[test]
	fn default_frequency_spaces_calls_24_seconds_apart() {
		let limiter = limiter(DEFAULT_FREQUENCY).expect("Default frequency should be valid.");

		assert_eq!(limiter.interval(), Duration::seconds(24));
	}

	#[test]
	fn evaluate_delays_until_interval_plus_margin() {
		let limiter = limiter(DEFAULT_FREQUENCY).expect("Default frequency should be valid.");
		let t0 = macros::datetime!(2024-03-01 12:00 UTC);

		assert_eq!(limiter.evaluate(None, t0), RateLimitDecision::Allow);
		assert_eq!(
			limiter.evaluate(Some(t0), t0 + Duration::seconds(24)),
			RateLimitDecision::Allow
		);
		assert_eq!(
			limiter.evaluate(Some(t0), t0 + Duration::seconds(5)),
			RateLimitDecision::Delay(RetryDirective::new(
				t0 + Duration::seconds(24),
				Duration::milliseconds(19_010),
			))
		);
	}

	#[test]
	fn rejects_non_positive_or_non_finite_frequency() {
		for frequency in [0., -1., f64::NAN, f64::INFINITY, f64::MIN_POSITIVE] {
			let err = limiter(frequency).expect_err("Invalid frequency should be rejected.");

			assert!(matches!(err, Error::Config(ConfigError::InvalidFrequency { .. })));
		}
	}
}
