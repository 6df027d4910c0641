//! Per-day time-series metrics exposed by the vendor API.

// crates.io
use time::Date;
// self
use crate::_prelude::*;

/// Raised when a metric short name is unknown.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown metric `{name}`; expected one of hr, hrv, br, spo2, sleep, steps.")]
pub struct MetricParseError {
	/// The rejected name.
	pub name: String,
}

/// Health metric fetched one day at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
	/// Intraday heart rate at one-second resolution.
	HeartRate,
	/// Nightly heart-rate variability.
	HeartRateVariability,
	/// Nightly breathing rate.
	BreathingRate,
	/// Nightly blood-oxygen saturation.
	OxygenSaturation,
	/// Sleep log with stages.
	Sleep,
	/// Intraday step counts at one-minute resolution.
	Steps,
}
impl Metric {
	/// Every metric.
	pub const ALL: [Metric; 6] = [
		Metric::HeartRate,
		Metric::HeartRateVariability,
		Metric::BreathingRate,
		Metric::OxygenSaturation,
		Metric::Sleep,
		Metric::Steps,
	];
	/// Metrics a backfill scrapes when none are selected.
	pub const DEFAULT_SCRAPE: [Metric; 4] = [
		Metric::HeartRate,
		Metric::HeartRateVariability,
		Metric::BreathingRate,
		Metric::OxygenSaturation,
	];

	/// Short name used on the command line and as the output directory.
	pub const fn short_name(self) -> &'static str {
		match self {
			Metric::HeartRate => "hr",
			Metric::HeartRateVariability => "hrv",
			Metric::BreathingRate => "br",
			Metric::OxygenSaturation => "spo2",
			Metric::Sleep => "sleep",
			Metric::Steps => "steps",
		}
	}

	/// API version segment of the resource URL.
	pub const fn api_version(self) -> &'static str {
		match self {
			Metric::Sleep => "1.2",
			_ => "1",
		}
	}

	/// Endpoint path below `/user/-/` for `day`.
	pub fn endpoint(self, day: Date) -> String {
		let day = format_day(day);

		match self {
			Metric::HeartRate => format!("activities/heart/date/{day}/1d/1sec.json"),
			Metric::HeartRateVariability => format!("hrv/date/{day}/all.json"),
			Metric::BreathingRate => format!("br/date/{day}/all.json"),
			Metric::OxygenSaturation => format!("spo2/date/{day}/all.json"),
			Metric::Sleep => format!("sleep/date/{day}.json"),
			Metric::Steps => format!("activities/steps/date/{day}/1d/1min.json"),
		}
	}
}
impl Display for Metric {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.short_name())
	}
}
impl FromStr for Metric {
	type Err = MetricParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Metric::ALL
			.into_iter()
			.find(|metric| metric.short_name() == s)
			.ok_or_else(|| MetricParseError { name: s.to_owned() })
	}
}

/// Renders `day` as `YYYY-MM-DD`.
pub fn format_day(day: Date) -> String {
	format!("{:04}-{:02}-{:02}", day.year(), u8::from(day.month()), day.day())
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn endpoints_render_vendor_paths() {
		let day = macros::date!(2024-03-01);

		assert_eq!(
			Metric::HeartRate.endpoint(day),
			"activities/heart/date/2024-03-01/1d/1sec.json"
		);
		assert_eq!(Metric::OxygenSaturation.endpoint(day), "spo2/date/2024-03-01/all.json");
		assert_eq!(Metric::Sleep.endpoint(day), "sleep/date/2024-03-01.json");
		assert_eq!(Metric::Sleep.api_version(), "1.2");
		assert_eq!(Metric::Steps.api_version(), "1");
	}

	#[test]
	fn short_names_round_trip_through_from_str() {
		for metric in Metric::ALL {
			assert_eq!(metric.short_name().parse::<Metric>(), Ok(metric));
		}

		assert_eq!(
			"calories".parse::<Metric>(),
			Err(MetricParseError { name: "calories".into() })
		);
	}

	#[test]
	fn days_are_zero_padded() {
		assert_eq!(format_day(macros::date!(2024-01-05)), "2024-01-05");
	}
}
