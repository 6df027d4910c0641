// self
use crate::obs::{FlowKind, FlowOutcome};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"fitbit_scraper_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records one rate-limiter sleep via the global metrics recorder (when enabled).
pub fn record_rate_limit_wait() {
	#[cfg(feature = "metrics")]
	metrics::counter!("fitbit_scraper_rate_limit_wait_total").increment(1);
}
