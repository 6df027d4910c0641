// crates.io
use tracing::{Span, field, instrument::Instrumented};
// self
use crate::{
	_prelude::*,
	obs::{FlowKind, FlowOutcome},
};

/// `fitbit_scraper.flow` span; `outcome` stays empty until the flow finishes.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	span: Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		Self {
			span: tracing::info_span!(
				"fitbit_scraper.flow",
				flow = kind.as_str(),
				stage,
				outcome = field::Empty,
			),
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		// crates.io
		use tracing::Instrument;

		fut.instrument(self.span.clone())
	}

	/// Fills the `outcome` field.
	pub fn record_outcome(&self, outcome: FlowOutcome) {
		self.span.record("outcome", outcome.as_str());
	}

	/// Marks the span failed and logs the error inside it.
	pub fn record_failure(&self, error: &Error) {
		self.record_outcome(FlowOutcome::Failure);
		self.span.in_scope(|| tracing::warn!(error = %error, "Flow failed."));
	}
}
