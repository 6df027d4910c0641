//! Token flows driven by the [`Authenticator`].

pub mod auth_code_pkce;
pub mod common;
pub mod refresh;

pub use auth_code_pkce::*;
pub use common::*;

// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, CredentialRecord, ScopeSet, TokenSecret},
	clock::Clock,
	http::ReqwestHttpClient,
	oauth::TokenFacade,
	provider::ProviderDescriptor,
	rate::RateLimiter,
	store::SessionStore,
};

/// Produces a currently valid bearer token, authorizing or refreshing as needed.
///
/// The authenticator owns every collaborator a flow needs; the store and rate limiter are
/// injected so several components can share them. Token flows inside one authenticator are
/// serialized, so concurrent callers never refresh the same record twice.
pub struct Authenticator {
	/// Persisted config store holding credentials and the session record.
	pub store: Arc<dyn SessionStore>,
	/// Vendor endpoints.
	pub descriptor: ProviderDescriptor,
	/// Vendor application credentials.
	pub credentials: ClientCredentials,
	/// HTTP client for token exchanges.
	pub http_client: ReqwestHttpClient,
	/// Gate every token POST and the browser launch pass through.
	pub rate_limiter: Arc<RateLimiter>,
	/// Time source for expiry checks.
	pub clock: Arc<dyn Clock>,
	/// Callback listener settings.
	pub callback: CallbackConfig,
	/// Presents the authorize URL to the user.
	pub prompt: Arc<dyn AuthorizationPrompt>,
	/// Cancels the callback wait.
	pub interrupt: Arc<dyn InterruptSignal>,
	/// Scopes requested during authorization.
	pub scope: ScopeSet,
	flow_guard: AsyncMutex<()>,
}
impl Authenticator {
	/// Creates an authenticator with the system browser, Ctrl-C cancellation, every vendor
	/// scope, and the rate limiter's clock.
	pub fn new(
		store: Arc<dyn SessionStore>,
		descriptor: ProviderDescriptor,
		credentials: ClientCredentials,
		rate_limiter: Arc<RateLimiter>,
		callback: CallbackConfig,
	) -> Result<Self> {
		Ok(Self {
			store,
			descriptor,
			credentials,
			http_client: ReqwestHttpClient::new()?,
			clock: rate_limiter.clock(),
			rate_limiter,
			callback,
			prompt: Arc::new(SystemBrowser),
			interrupt: Arc::new(CtrlC),
			scope: ScopeSet::all(),
			flow_guard: AsyncMutex::new(()),
		})
	}

	/// Replaces the HTTP client used for token exchanges.
	pub fn with_http_client(mut self, http_client: ReqwestHttpClient) -> Self {
		self.http_client = http_client;

		self
	}

	/// Replaces the clock used for expiry checks and expiry stamping.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Replaces the way the authorize URL reaches the user.
	pub fn with_prompt(mut self, prompt: Arc<dyn AuthorizationPrompt>) -> Self {
		self.prompt = prompt;

		self
	}

	/// Replaces the cancellation source for the callback wait.
	pub fn with_interrupt(mut self, interrupt: Arc<dyn InterruptSignal>) -> Self {
		self.interrupt = interrupt;

		self
	}

	/// Returns the current access token, authorizing or refreshing first when needed.
	pub async fn get_token(&self) -> Result<TokenSecret> {
		Ok(self.get_credential().await?.access_token)
	}

	/// Same as [`get_token`](Self::get_token) but returns the whole record.
	pub async fn get_credential(&self) -> Result<CredentialRecord> {
		let _serialized = self.flow_guard.lock().await;
		let record = CredentialRecord::load(self.store.as_ref()).await?;

		match TokenAction::decide(record, self.clock.now())? {
			TokenAction::Authorize => self.run_authorization().await,
			TokenAction::Refresh(refresh) => self.run_refresh(&refresh).await,
			TokenAction::Reuse(record) => Ok(record),
		}
	}

	fn facade(&self) -> Result<TokenFacade> {
		TokenFacade::from_descriptor(&self.descriptor, &self.credentials, self.http_client.clone())
	}
}
impl Debug for Authenticator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Authenticator")
			.field("descriptor", &self.descriptor)
			.field("client_id", &self.credentials.client_id)
			.field("rate_limiter", &self.rate_limiter)
			.field("callback", &self.callback)
			.field("scope", &self.scope)
			.finish()
	}
}
