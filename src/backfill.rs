//! Day-by-day scrape loop writing one JSON document per metric and day.
//!
//! The walk starts at yesterday (today's data is still accumulating) and moves backwards.
//! "Yesterday" is taken at the configured UTC offset, so it can follow the user's local day.
//! Files that already exist are left alone, so an interrupted backfill resumes where it
//! stopped.

// std
use std::{
	fs,
	path::{Path, PathBuf},
};
// crates.io
use serde_json::Value;
use time::{Date, UtcOffset};
// self
use crate::{
	_prelude::*,
	api::{FitbitClient, Metric, format_day},
	clock::Clock,
};

/// Boxed future returned by [`MetricSource::fetch_day`].
pub type MetricFuture<'a> = Pin<Box<dyn Future<Output = Result<Value>> + 'a + Send>>;

/// Anything that can produce the raw document for one metric and day.
pub trait MetricSource
where
	Self: Send + Sync,
{
	/// Fetches `metric` for `day`.
	fn fetch_day(&self, metric: Metric, day: Date) -> MetricFuture<'_>;
}
impl MetricSource for FitbitClient {
	fn fetch_day(&self, metric: Metric, day: Date) -> MetricFuture<'_> {
		Box::pin(self.fetch(metric, day))
	}
}

/// The calendar day before `now` as seen at `offset`.
pub fn yesterday(now: OffsetDateTime, offset: UtcOffset) -> Option<Date> {
	now.to_offset(offset).date().previous_day()
}

/// Counts reported after a backfill finishes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BackfillReport {
	/// Days visited.
	pub days: u32,
	/// Documents fetched and written.
	pub written: usize,
	/// Documents skipped because the output file already existed.
	pub skipped: usize,
}

/// Output layout and stopping rule for a backfill.
#[derive(Clone, Debug)]
pub struct Backfill {
	out_dir: PathBuf,
	metrics: Vec<Metric>,
	days: Option<u32>,
	offset: UtcOffset,
}
impl Backfill {
	/// Scrapes [`Metric::DEFAULT_SCRAPE`] into `out_dir` with no day limit.
	pub fn new(out_dir: impl Into<PathBuf>) -> Self {
		Self {
			out_dir: out_dir.into(),
			metrics: Metric::DEFAULT_SCRAPE.to_vec(),
			days: None,
			offset: UtcOffset::UTC,
		}
	}

	/// Replaces the metric selection; an empty selection keeps the default.
	pub fn with_metrics(mut self, metrics: impl IntoIterator<Item = Metric>) -> Self {
		let mut metrics = metrics.into_iter().collect::<Vec<_>>();

		metrics.sort_unstable();
		metrics.dedup();

		if !metrics.is_empty() {
			self.metrics = metrics;
		}

		self
	}

	/// Stops after `days` days instead of walking back until an error.
	pub fn with_day_limit(mut self, days: u32) -> Self {
		self.days = Some(days);

		self
	}

	/// Offset whose calendar decides where yesterday begins (defaults to UTC).
	pub fn with_utc_offset(mut self, offset: UtcOffset) -> Self {
		self.offset = offset;

		self
	}

	/// Output directory root.
	pub fn out_dir(&self) -> &Path {
		&self.out_dir
	}

	/// Selected metrics.
	pub fn metrics(&self) -> &[Metric] {
		&self.metrics
	}

	/// Destination of the document for `metric` on `day`.
	pub fn path_for(&self, metric: Metric, day: Date) -> PathBuf {
		self.out_dir.join(metric.short_name()).join(format!("{}.json", format_day(day)))
	}

	/// Walks backwards from yesterday at the configured offset until the day limit or the first
	/// error.
	pub async fn run(
		&self,
		source: &dyn MetricSource,
		clock: &dyn Clock,
	) -> Result<BackfillReport> {
		let mut report = BackfillReport::default();
		let mut day = yesterday(clock.now(), self.offset);

		for metric in &self.metrics {
			let dir = self.out_dir.join(metric.short_name());

			fs::create_dir_all(&dir).map_err(|source| Error::Output { path: dir, source })?;
		}

		while let Some(current) = day {
			if self.days.is_some_and(|limit| report.days >= limit) {
				break;
			}

			tracing::info!(day = %format_day(current), "Scraping day.");

			for &metric in &self.metrics {
				let path = self.path_for(metric, current);

				if path.exists() {
					tracing::debug!(path = %path.display(), "Skipping existing document.");

					report.skipped += 1;

					continue;
				}

				let document = source.fetch_day(metric, current).await?;

				write_document(&path, &document)?;
				tracing::info!(%metric, path = %path.display(), "Wrote document.");

				report.written += 1;
			}

			report.days += 1;
			day = current.previous_day();
		}

		Ok(report)
	}
}

fn write_document(path: &Path, document: &Value) -> Result<()> {
	let output_error = |source: std::io::Error| Error::Output { path: path.to_path_buf(), source };
	let bytes = serde_json::to_vec_pretty(document)
		.map_err(|e| output_error(std::io::Error::other(e)))?;

	fs::write(path, bytes).map_err(output_error)
}
