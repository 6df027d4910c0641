//! Shared fixtures for the integration tests.

#![allow(dead_code)]

// std
use std::{
	env, fs,
	net::TcpListener,
	path::PathBuf,
	process,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use httpmock::MockServer;
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};
// self
use fitbit_scraper::{
	auth::{ClientCredentials, CredentialRecord},
	clock::ManualClock,
	flows::{Authenticator, AuthorizationPrompt, CallbackConfig, InterruptFuture, InterruptSignal},
	http::ReqwestHttpClient,
	provider::ProviderDescriptor,
	rate::{DEFAULT_FREQUENCY, RateLimiter},
	reqwest::Client as ReqwestClient,
	store::{MemoryStore, SessionStore},
	url::Url,
};

pub const CLIENT_ID: &str = "23ABCD";
pub const CLIENT_SECRET: &str = "s3cret";

static UNIQUE: AtomicUsize = AtomicUsize::new(0);

/// Path under the temp directory that no other test uses.
pub fn temp_path(label: &str, extension: &str) -> PathBuf {
	env::temp_dir().join(format!(
		"fitbit_scraper_it_{label}_{}_{}.{extension}",
		process::id(),
		UNIQUE.fetch_add(1, Ordering::Relaxed),
	))
}

/// Reqwest client that accepts the self-signed certificates used by `httpmock` and the
/// callback listener.
pub fn insecure_reqwest_client() -> ReqwestClient {
	ReqwestClient::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.")
}

/// Writes a throwaway certificate chain plus private key into one PEM file.
pub fn write_self_signed_pem() -> PathBuf {
	let rcgen::CertifiedKey { cert, key_pair } =
		rcgen::generate_simple_self_signed(vec!["localhost".into()])
			.expect("Self-signed certificate generation should succeed.");
	let path = temp_path("server", "pem");

	fs::write(&path, format!("{}{}", cert.pem(), key_pair.serialize_pem()))
		.expect("Failed to write the PEM fixture.");

	path
}

/// Asks the OS for a port that is free right now.
pub fn free_port() -> u16 {
	TcpListener::bind("127.0.0.1:0")
		.and_then(|listener| listener.local_addr())
		.expect("Binding an ephemeral port should succeed.")
		.port()
}

pub fn descriptor(server: &MockServer) -> ProviderDescriptor {
	let url = |path: &str| Url::parse(&server.url(path)).expect("Mock URL should parse.");

	ProviderDescriptor::builder()
		.authorization_endpoint(url("/oauth2/authorize"))
		.token_endpoint(url("/oauth2/token"))
		.api_endpoint(url("/"))
		.build()
		.expect("Mock provider descriptor should build successfully.")
}

/// Browser stand-in that follows the redirect by calling the callback listener directly.
///
/// It first sends a request without `code`, which the listener must answer and ignore. The
/// `code_challenge` of the presented URL is kept in `challenge`.
#[derive(Debug)]
pub struct RedirectingPrompt {
	pub port: u16,
	pub code: &'static str,
	pub presented: Arc<AtomicUsize>,
	pub challenge: Arc<Mutex<Option<String>>>,
}
impl RedirectingPrompt {
	pub fn new(port: u16, code: &'static str) -> Self {
		Self { port, code, presented: Default::default(), challenge: Default::default() }
	}
}
impl AuthorizationPrompt for RedirectingPrompt {
	fn present(&self, authorize_url: &Url) {
		let challenge = authorize_url
			.query_pairs()
			.find(|(key, _)| key == "code_challenge")
			.map(|(_, value)| value.into_owned())
			.expect("The authorize URL should carry a code challenge.");

		*self.challenge.lock() = Some(challenge);
		self.presented.fetch_add(1, Ordering::SeqCst);

		let base = format!("https://127.0.0.1:{}/", self.port);
		let code = self.code;

		tokio::spawn(async move {
			let client = insecure_reqwest_client();
			let missing = client
				.get(format!("{base}?state=none"))
				.send()
				.await
				.expect("Callback listener should answer a request without a code.");

			assert!(
				missing
					.text()
					.await
					.expect("Missing-code page should be readable.")
					.contains("Did not receive the code")
			);

			client
				.get(format!("{base}?code={code}"))
				.send()
				.await
				.expect("Callback listener should answer the redirect.");
		});
	}
}

/// Prompt that only counts how often it was used.
#[derive(Debug, Default)]
pub struct CountingPrompt(pub Arc<AtomicUsize>);
impl AuthorizationPrompt for CountingPrompt {
	fn present(&self, _: &Url) {
		self.0.fetch_add(1, Ordering::SeqCst);
	}
}

/// Interrupt that never fires.
#[derive(Debug)]
pub struct NeverInterrupt;
impl InterruptSignal for NeverInterrupt {
	fn interrupted(&self) -> InterruptFuture {
		Box::pin(std::future::pending())
	}
}

/// Interrupt that fires immediately.
#[derive(Debug)]
pub struct ImmediateInterrupt;
impl InterruptSignal for ImmediateInterrupt {
	fn interrupted(&self) -> InterruptFuture {
		Box::pin(async {})
	}
}

/// Everything a flow test needs, wired to one mock server and one manual clock.
pub struct Harness {
	pub store: Arc<MemoryStore>,
	pub clock: ManualClock,
	pub port: u16,
	pub authenticator: Authenticator,
}

pub fn harness(
	server: &MockServer,
	port: u16,
	prompt: Arc<dyn AuthorizationPrompt>,
	interrupt: Arc<dyn InterruptSignal>,
) -> Harness {
	let store = Arc::new(MemoryStore::default());
	let clock = ManualClock::new(whole_second_now());
	let dyn_store: Arc<dyn SessionStore> = store.clone();
	let rate_limiter = RateLimiter::with_clock(
		dyn_store.clone(),
		Arc::new(clock.clone()),
		DEFAULT_FREQUENCY,
	)
	.expect("Default frequency should be valid.");
	let callback = CallbackConfig::load(write_self_signed_pem(), port)
		.expect("Generated PEM fixture should load.");
	let authenticator = Authenticator::new(
		dyn_store,
		descriptor(server),
		ClientCredentials::new(CLIENT_ID, CLIENT_SECRET),
		Arc::new(rate_limiter),
		callback,
	)
	.expect("Authenticator should build.")
	.with_http_client(ReqwestHttpClient::with_client(insecure_reqwest_client()))
	.with_prompt(prompt)
	.with_interrupt(interrupt);

	Harness { store, clock, port, authenticator }
}

/// Harness whose prompt only counts calls and whose wait is never interrupted.
pub fn counting_harness(server: &MockServer) -> (Harness, Arc<AtomicUsize>) {
	let presented = Arc::new(AtomicUsize::new(0));
	let harness = harness(
		server,
		free_port(),
		Arc::new(CountingPrompt(presented.clone())),
		Arc::new(NeverInterrupt),
	);

	(harness, presented)
}

/// Current time truncated to whole seconds so persisted float timestamps stay exact.
pub fn whole_second_now() -> OffsetDateTime {
	OffsetDateTime::from_unix_timestamp(OffsetDateTime::now_utc().unix_timestamp())
		.expect("The current time should be representable.")
}

/// Seeds a session record expiring `expires_in` after the harness clock's current time.
pub async fn seed_record(harness: &Harness, access: &str, refresh: &str, expires_in: Duration) {
	use fitbit_scraper::clock::Clock;

	CredentialRecord::builder()
		.access_token(access)
		.refresh_token(refresh)
		.expires_at(harness.clock.now() + expires_in)
		.build()
		.expect("Credential record fixture should build.")
		.save(harness.store.as_ref())
		.await
		.expect("Seeding the session record should succeed.");
}

pub fn basic_auth_header() -> String {
	// crates.io
	use base64::{Engine as _, engine::general_purpose::STANDARD};

	format!("Basic {}", STANDARD.encode(format!("{CLIENT_ID}:{CLIENT_SECRET}")))
}

/// Whether the form body's `code_verifier` hashes to `challenge` under S256.
pub fn verifier_matches_challenge(body: &[u8], challenge: &str) -> bool {
	// crates.io
	use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
	use sha2::{Digest, Sha256};

	url::form_urlencoded::parse(body)
		.find(|(key, _)| key == "code_verifier")
		.is_some_and(|(_, verifier)| {
			URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes())) == challenge
		})
}
