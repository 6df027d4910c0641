//! Command-line entry point: token upkeep, single fetches, and backfills.

// std
use std::{path::PathBuf, sync::Arc};
// crates.io
use clap::{Parser, Subcommand};
use color_eyre::Result;
use time::{Date, OffsetDateTime, UtcOffset, macros::format_description};
use tracing_subscriber::EnvFilter;
// self
use fitbit_scraper::{
	api::{FitbitClient, Metric},
	auth::ClientCredentials,
	backfill::{self, Backfill},
	clock::SystemClock,
	flows::{Authenticator, CallbackConfig, CtrlC, DEFAULT_CALLBACK_PORT, until_interrupted},
	provider::ProviderDescriptor,
	rate::RateLimiter,
	store::{FileStore, SessionStore},
};

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
	/// TOML config store holding the app credentials and the session.
	#[arg(long, global = true, env = "FITBIT_SCRAPER_CONFIG", default_value = "config.toml")]
	config: PathBuf,
	/// PEM file with the certificate chain and private key for the callback listener.
	#[arg(long, global = true, default_value = "server.pem")]
	certificate: PathBuf,
	/// Callback listener port; must match the app's registered redirect URL.
	#[arg(long, global = true, default_value_t = DEFAULT_CALLBACK_PORT)]
	port: u16,
	/// Ceiling on vendor API calls per hour.
	#[arg(long, global = true, default_value_t = 150.)]
	calls_per_hour: f64,
	/// Offset (e.g. `-05:00`) whose calendar decides which day is yesterday.
	#[arg(long, global = true, value_parser = parse_offset, default_value = "+00:00")]
	utc_offset: UtcOffset,
	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Ensure a valid access token exists and print its expiry.
	Token,
	/// Fetch one metric for one day and print the raw JSON.
	Fetch {
		/// Metric short name (hr, hrv, br, spo2, sleep, steps).
		metric: Metric,
		/// Day to fetch as YYYY-MM-DD; defaults to yesterday at `--utc-offset`.
		#[arg(long, value_parser = parse_day)]
		date: Option<Date>,
	},
	/// Walk backwards from yesterday writing `<out>/<metric>/<day>.json`.
	Scrape {
		/// Output directory root.
		#[arg(long, default_value = "output")]
		out: PathBuf,
		/// Stop after this many days.
		#[arg(long)]
		days: Option<u32>,
		/// Metrics to scrape; repeat or comma-separate. Defaults to hr, hrv, br, spo2.
		#[arg(long = "metric", value_delimiter = ',')]
		metrics: Vec<Metric>,
	},
}

fn parse_day(raw: &str) -> Result<Date, time::error::Parse> {
	Date::parse(raw, format_description!("[year]-[month]-[day]"))
}

fn parse_offset(raw: &str) -> Result<UtcOffset, time::error::Parse> {
	UtcOffset::parse(raw, format_description!("[offset_hour sign:mandatory]:[offset_minute]"))
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let cli = Cli::parse();

	// Ctrl-C stays fatal after the callback wait has claimed the signal.
	until_interrupted(&CtrlC, run(cli)).await
}

async fn run(cli: Cli) -> Result<()> {
	let store: Arc<dyn SessionStore> = Arc::new(FileStore::open(&cli.config)?);
	let credentials = ClientCredentials::load(store.as_ref()).await?;
	let callback = CallbackConfig::load(&cli.certificate, cli.port)?;
	let rate_limiter = Arc::new(RateLimiter::new(store.clone(), cli.calls_per_hour / 3600.)?);
	let authenticator = Arc::new(Authenticator::new(
		store,
		ProviderDescriptor::fitbit()?,
		credentials,
		rate_limiter,
		callback,
	)?);

	match cli.command {
		Command::Token => {
			let record = authenticator.get_credential().await?;

			println!("Access token valid until {}.", record.expires_at);
		},
		Command::Fetch { metric, date } => {
			let day = match date {
				Some(day) => day,
				None => yesterday(cli.utc_offset)?,
			};
			let document = FitbitClient::new(authenticator).fetch(metric, day).await?;

			println!("{}", serde_json::to_string_pretty(&document)?);
		},
		Command::Scrape { out, days, metrics } => {
			let mut backfill =
				Backfill::new(out).with_metrics(metrics).with_utc_offset(cli.utc_offset);

			if let Some(days) = days {
				backfill = backfill.with_day_limit(days);
			}

			let client = FitbitClient::new(authenticator);
			let report = backfill.run(&client, &SystemClock).await?;

			tracing::info!(
				days = report.days,
				written = report.written,
				skipped = report.skipped,
				"Backfill finished."
			);
		},
	}

	Ok(())
}

fn yesterday(offset: UtcOffset) -> Result<Date> {
	backfill::yesterday(OffsetDateTime::now_utc(), offset)
		.ok_or_else(|| color_eyre::eyre::eyre!("No day precedes the current date."))
}
