//! Resource API client returning raw per-day JSON documents.

pub mod metric;

pub use metric::*;

// crates.io
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use time::Date;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::TransportError,
	flows::Authenticator,
	obs::{self, FlowKind},
};

/// Endpoint label used in errors raised by the resource client.
pub const RESOURCE_ENDPOINT: &str = "resource";

/// Authenticated, rate-limited GET client for `/{version}/user/-/{endpoint}` resources.
#[derive(Clone, Debug)]
pub struct FitbitClient {
	authenticator: Arc<Authenticator>,
	http_client: ReqwestClient,
}
impl FitbitClient {
	/// Creates a client sharing the authenticator's HTTP client and rate limiter.
	pub fn new(authenticator: Arc<Authenticator>) -> Self {
		let http_client = authenticator.http_client.0.clone();

		Self { authenticator, http_client }
	}

	/// Authenticator supplying bearer tokens.
	pub fn authenticator(&self) -> &Authenticator {
		&self.authenticator
	}

	/// Fetches `metric` for `day`.
	pub async fn fetch(&self, metric: Metric, day: Date) -> Result<Value> {
		self.get(metric.api_version(), &metric.endpoint(day)).await
	}

	/// Fetches an arbitrary endpoint below `/{version}/user/-/`.
	///
	/// The bearer token is obtained first, so any authorization or refresh traffic is spaced
	/// by the rate limiter before the resource call itself acquires its slot.
	pub async fn get(&self, version: &str, endpoint: &str) -> Result<Value> {
		obs::observe(FlowKind::Resource, "get", async move {
			let token = self.authenticator.get_token().await?;
			let url = self.authenticator.descriptor.resource_url(version, endpoint)?;
			let (status, content_type, body) =
				self.authenticator.rate_limiter.run(self.send(&url, &token)).await?;

			tracing::debug!(%url, status, "Resource call completed.");

			parse_resource_body(status, content_type.as_deref(), body)
		})
		.await
	}

	async fn send(&self, url: &Url, token: &TokenSecret) -> Result<(u16, Option<String>, String)> {
		let response = self
			.http_client
			.get(url.clone())
			.bearer_auth(token.expose())
			.header(ACCEPT, "application/json")
			.send()
			.await
			.map_err(TransportError::from)?;
		let status = response.status().as_u16();
		let content_type = response
			.headers()
			.get(CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.map(str::to_owned);
		let body = response.text().await.map_err(TransportError::from)?;

		Ok((status, content_type, body))
	}
}

fn parse_resource_body(status: u16, content_type: Option<&str>, body: String) -> Result<Value> {
	if !(200..300).contains(&status) {
		return Err(Error::Http { endpoint: RESOURCE_ENDPOINT, status, body });
	}
	if body.trim().is_empty() {
		return Err(Error::UnexpectedResponse {
			endpoint: RESOURCE_ENDPOINT,
			message: format!("HTTP {status} with an empty body"),
		});
	}
	if let Some(content_type) = content_type.filter(|value| !value.contains("json")) {
		return Err(Error::UnexpectedResponse {
			endpoint: RESOURCE_ENDPOINT,
			message: format!("Content-Type `{content_type}` is not JSON"),
		});
	}

	let mut deserializer = serde_json::Deserializer::from_str(&body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::MalformedResponse { endpoint: RESOURCE_ENDPOINT, source })
}
