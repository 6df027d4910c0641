// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::ScopeSet, provider::ProviderDescriptor};

/// Number of decimal digits in a generated PKCE verifier.
pub const PKCE_VERIFIER_LEN: usize = 60;

/// Supported PKCE challenge methods surfaced via [`AuthorizationSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// Verifier and its derived S256 challenge; generated per attempt and used once.
#[derive(Clone)]
pub struct PkcePair {
	verifier: String,
	challenge: String,
	method: PkceCodeChallengeMethod,
}
impl PkcePair {
	/// Generates a fresh random digit verifier.
	pub fn generate() -> Self {
		let mut rng = rand::rng();
		let verifier = (0..PKCE_VERIFIER_LEN)
			.map(|_| char::from(b'0' + rng.random_range(0..10_u8)))
			.collect::<String>();

		Self::from_verifier(verifier)
	}

	/// Derives the challenge for an existing verifier.
	pub fn from_verifier(verifier: impl Into<String>) -> Self {
		let verifier = verifier.into();
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier, challenge, method: PkceCodeChallengeMethod::S256 }
	}

	/// Unhashed verifier sent with the code exchange.
	pub fn verifier(&self) -> &str {
		&self.verifier
	}

	/// Padding-free URL-safe base64 of the verifier's SHA-256 digest.
	pub fn challenge(&self) -> &str {
		&self.challenge
	}

	/// Challenge method (currently always `S256`).
	pub fn method(&self) -> PkceCodeChallengeMethod {
		self.method
	}
}
impl Debug for PkcePair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PkcePair")
			.field("verifier", &"<redacted>")
			.field("challenge", &self.challenge)
			.field("method", &self.method)
			.finish()
	}
}

/// Authorization Code + PKCE handshake metadata for one attempt.
#[derive(Clone, Debug)]
pub struct AuthorizationSession {
	/// Requested scope set.
	pub scope: ScopeSet,
	/// Fully-formed HTTPS authorize URL that the user opens in a browser.
	pub authorize_url: Url,
	pkce: PkcePair,
}
impl AuthorizationSession {
	/// Starts a session with a freshly generated PKCE pair.
	pub fn new(descriptor: &ProviderDescriptor, client_id: &str, scope: ScopeSet) -> Self {
		Self::with_pkce(descriptor, client_id, scope, PkcePair::generate())
	}

	/// Starts a session with a caller-provided PKCE pair.
	pub fn with_pkce(
		descriptor: &ProviderDescriptor,
		client_id: &str,
		scope: ScopeSet,
		pkce: PkcePair,
	) -> Self {
		let authorize_url = build_authorize_url(descriptor, client_id, &scope, &pkce);

		Self { scope, authorize_url, pkce }
	}

	/// PKCE code challenge derived from the secret verifier.
	pub fn code_challenge(&self) -> &str {
		self.pkce.challenge()
	}

	/// PKCE challenge method (currently always `S256`).
	pub fn code_challenge_method(&self) -> PkceCodeChallengeMethod {
		self.pkce.method()
	}

	pub(crate) fn verifier(&self) -> &str {
		self.pkce.verifier()
	}
}

fn build_authorize_url(
	descriptor: &ProviderDescriptor,
	client_id: &str,
	scope: &ScopeSet,
	pkce: &PkcePair,
) -> Url {
	let mut url = descriptor.endpoints.authorization.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("client_id", client_id);
	pairs.append_pair("response_type", "code");
	pairs.append_pair("code_challenge", pkce.challenge());
	pairs.append_pair("code_challenge_method", pkce.method().as_str());

	if scope.iter().next().is_some() {
		pairs.append_pair("scope", &scope.normalized());
	}

	drop(pairs);

	// Form encoding turns spaces into `+`; the vendor expects `%20` between scopes. A literal
	// `+` was already escaped as `%2B`, so every remaining `+` is a space.
	let query = url.query().map(|query| query.replace('+', "%20"));

	url.set_query(query.as_deref());

	url
}

fn compute_pkce_challenge(verifier: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(hasher.finalize())
}
