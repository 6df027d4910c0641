//! OAuth client facade over the `oauth2` crate's basic client.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, PkceCodeVerifier, RefreshToken, RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, CredentialRecord, TokenSecret},
	clock::Clock,
	error::{ConfigError, TransportError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
	provider::ProviderDescriptor,
};

/// Endpoint label used in errors raised by the token facade.
pub const TOKEN_ENDPOINT: &str = "token";

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Drives the token endpoint with HTTP Basic client authentication.
pub(crate) struct TokenFacade {
	oauth_client: ConfiguredBasicClient,
	http_client: ReqwestHttpClient,
	client_id: String,
}
impl TokenFacade {
	pub(crate) fn from_descriptor(
		descriptor: &ProviderDescriptor,
		credentials: &ClientCredentials,
		http_client: ReqwestHttpClient,
	) -> Result<Self> {
		let auth_url = AuthUrl::from_url(descriptor.endpoints.authorization.clone());
		let token_url = TokenUrl::from_url(descriptor.endpoints.token.clone());
		let oauth_client = BasicClient::new(ClientId::new(credentials.client_id.clone()))
			.set_client_secret(ClientSecret::new(credentials.client_secret.expose().to_owned()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url)
			.set_auth_type(AuthType::BasicAuth);

		Ok(Self { oauth_client, http_client, client_id: credentials.client_id.clone() })
	}

	/// Exchanges an authorization code plus its PKCE verifier.
	///
	/// The body carries `client_id` next to `code`, `code_verifier`, and `grant_type`.
	pub(crate) async fn exchange_authorization_code(
		&self,
		clock: &dyn Clock,
		code: &str,
		pkce_verifier: &str,
	) -> Result<CredentialRecord> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let response = self
			.oauth_client
			.exchange_code(AuthorizationCode::new(code.to_owned()))
			.set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_owned()))
			.add_extra_param("client_id", self.client_id.clone())
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err))?;

		map_token_response(clock, response, None)
	}

	/// Exchanges a refresh token; a response without a new refresh token keeps `refresh_token`.
	pub(crate) async fn refresh_token(
		&self,
		clock: &dyn Clock,
		refresh_token: &TokenSecret,
	) -> Result<CredentialRecord> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let refresh_secret = RefreshToken::new(refresh_token.expose().to_owned());
		let response = self
			.oauth_client
			.exchange_refresh_token(&refresh_secret)
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err))?;

		map_token_response(clock, response, Some(refresh_token))
	}
}

fn map_token_response(
	clock: &dyn Clock,
	response: BasicTokenResponse,
	previous_refresh: Option<&TokenSecret>,
) -> Result<CredentialRecord> {
	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	let refresh = response
		.refresh_token()
		.map(|token| TokenSecret::new(token.secret().to_owned()))
		.or_else(|| previous_refresh.cloned());

	CredentialRecord::builder()
		.access_token(response.access_token().secret().to_owned())
		.refresh_secret(refresh)
		.issued_at(clock.now())
		.expires_in(Duration::seconds(expires_in))
		.build()
		.map_err(|err| ConfigError::from(err).into())
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> Error {
	if let Some(meta) = meta.filter(|meta| !meta.is_success()) {
		return Error::Http { endpoint: TOKEN_ENDPOINT, status: meta.status, body: meta.body };
	}

	match err {
		RequestTokenError::ServerResponse(response) => Error::UnexpectedResponse {
			endpoint: TOKEN_ENDPOINT,
			message: format!("OAuth error `{}`", response.error().as_ref()),
		},
		RequestTokenError::Request(error) => map_transport_error(error),
		RequestTokenError::Parse(source, _body) =>
			Error::MalformedResponse { endpoint: TOKEN_ENDPOINT, source },
		RequestTokenError::Other(message) =>
			Error::UnexpectedResponse { endpoint: TOKEN_ENDPOINT, message },
	}
}

fn map_transport_error(err: HttpClientError<ReqwestError>) -> Error {
	match err {
		HttpClientError::Reqwest(inner) => TransportError::from(*inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) =>
			Error::UnexpectedResponse { endpoint: TOKEN_ENDPOINT, message },
		_ => Error::UnexpectedResponse {
			endpoint: TOKEN_ENDPOINT,
			message: "HTTP client error occurred while calling the token endpoint".into(),
		},
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::clock::ManualClock;

	fn response(json: &str) -> BasicTokenResponse {
		serde_json::from_str(json).expect("Token response fixture should deserialize.")
	}

	#[test]
	fn builds_basic_auth_client() {
		let descriptor = ProviderDescriptor::fitbit().expect("Vendor defaults should be valid.");
		let facade = TokenFacade::from_descriptor(
			&descriptor,
			&ClientCredentials::new("client", "secret"),
			ReqwestHttpClient::with_client(ReqwestClient::new()),
		);

		assert!(facade.is_ok());
	}

	#[test]
	fn token_response_expiry_is_stamped_with_clock() {
		let clock = ManualClock::new(macros::datetime!(2024-03-01 12:00 UTC));
		let record = map_token_response(
			&clock,
			response(r#"{"access_token":"a","token_type":"Bearer","expires_in":28800}"#),
			Some(&TokenSecret::new("kept")),
		)
		.expect("Complete token response should map.");

		assert_eq!(record.expires_at, macros::datetime!(2024-03-01 20:00 UTC));
		assert_eq!(record.refresh_token, Some(TokenSecret::new("kept")));
	}

	#[test]
	fn token_response_requires_positive_expiry() {
		let clock = ManualClock::new(macros::datetime!(2024-03-01 12:00 UTC));
		let missing = map_token_response(
			&clock,
			response(r#"{"access_token":"a","token_type":"Bearer"}"#),
			None,
		)
		.expect_err("Missing expires_in should be rejected.");
		let zero = map_token_response(
			&clock,
			response(r#"{"access_token":"a","token_type":"Bearer","expires_in":0}"#),
			None,
		)
		.expect_err("Zero expires_in should be rejected.");

		assert!(matches!(missing, Error::Config(ConfigError::MissingExpiresIn)));
		assert!(matches!(zero, Error::Config(ConfigError::NonPositiveExpiresIn)));
	}

	#[test]
	fn non_success_metadata_wins_over_oauth_error() {
		let err = map_request_error(
			Some(ResponseMetadata { status: 400, body: "{\"errors\":[]}".into() }),
			RequestTokenError::Other("ignored".into()),
		);

		assert!(matches!(err, Error::Http { endpoint: "token", status: 400, .. }));
	}
}
