//! Observability helpers shared by the authenticator, rate limiter, and API client.
//!
//! Every flow runs through [`observe`], inside a `fitbit_scraper.flow` span carrying `flow`,
//! `stage`, and (once finished) `outcome` fields.
//!
//! # Feature Flags
//!
//! - Enable `metrics` to increment `fitbit_scraper_flow_total` for every attempt, success, and
//!   failure (labeled by `flow` + `outcome`) and `fitbit_scraper_rate_limit_wait_total` each time
//!   the rate limiter has to sleep.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Authorization Code + PKCE against the local callback listener.
	AuthorizationCode,
	/// Refresh token exchange.
	Refresh,
	/// Resource API fetch.
	Resource,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::AuthorizationCode => "authorization_code",
			FlowKind::Refresh => "refresh",
			FlowKind::Resource => "resource",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}

	/// Maps a flow result onto its terminal outcome.
	pub fn of<T, E>(result: &std::result::Result<T, E>) -> Self {
		if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure }
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `flow` inside a [`FlowSpan`], counting the attempt and its terminal outcome.
pub async fn observe<F, T>(kind: FlowKind, stage: &'static str, flow: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(kind, stage);

	record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = span.instrument(flow).await;
	let outcome = FlowOutcome::of(&result);

	match &result {
		Ok(_) => span.record_outcome(outcome),
		Err(e) => span.record_failure(e),
	}

	record_flow_outcome(kind, outcome);

	result
}
