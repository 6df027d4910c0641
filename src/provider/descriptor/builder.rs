// self
use crate::{
	_prelude::*,
	provider::{ProviderDescriptor, ProviderEndpoints},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ProviderDescriptorError {
	/// Authorization endpoint is required to start a grant.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Token endpoint is mandatory for exchanges and refreshes.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Resource API base is mandatory for data fetches.
	#[error("Missing API endpoint.")]
	MissingApiEndpoint,
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug, Default)]
pub struct ProviderDescriptorBuilder {
	/// Authorization page.
	pub authorization_endpoint: Option<Url>,
	/// Token endpoint used for exchanges and refreshes.
	pub token_endpoint: Option<Url>,
	/// Resource API base.
	pub api_endpoint: Option<Url>,
}
impl ProviderDescriptorBuilder {
	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the resource API base; a missing trailing `/` is added.
	pub fn api_endpoint(mut self, mut url: Url) -> Self {
		if !url.path().ends_with('/') {
			let path = format!("{}/", url.path());

			url.set_path(&path);
		}

		self.api_endpoint = Some(url);

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let authorization = self
			.authorization_endpoint
			.ok_or(ProviderDescriptorError::MissingAuthorizationEndpoint)?;
		let token = self.token_endpoint.ok_or(ProviderDescriptorError::MissingTokenEndpoint)?;
		let api = self.api_endpoint.ok_or(ProviderDescriptorError::MissingApiEndpoint)?;

		validate_endpoint("authorization", &authorization)?;
		validate_endpoint("token", &token)?;
		validate_endpoint("api", &api)?;

		Ok(ProviderDescriptor { endpoints: ProviderEndpoints { authorization, token, api } })
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	if url.scheme() != "https" {
		Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(raw: &str) -> Url {
		Url::parse(raw).expect("Test URL should parse.")
	}

	#[test]
	fn build_rejects_plain_http() {
		let err = ProviderDescriptor::builder()
			.authorization_endpoint(url("https://example.com/authorize"))
			.token_endpoint(url("http://example.com/token"))
			.api_endpoint(url("https://example.com/"))
			.build()
			.expect_err("Plain HTTP token endpoint should be rejected.");

		assert_eq!(
			err,
			ProviderDescriptorError::InsecureEndpoint {
				endpoint: "token",
				url: "http://example.com/token".into(),
			}
		);
	}

	#[test]
	fn api_endpoint_gains_trailing_slash() {
		let descriptor = ProviderDescriptor::builder()
			.authorization_endpoint(url("https://example.com/authorize"))
			.token_endpoint(url("https://example.com/token"))
			.api_endpoint(url("https://example.com/mock"))
			.build()
			.expect("Descriptor with HTTPS endpoints should build.");

		assert_eq!(descriptor.endpoints.api.as_str(), "https://example.com/mock/");
		assert_eq!(
			ProviderDescriptor::builder().build(),
			Err(ProviderDescriptorError::MissingAuthorizationEndpoint)
		);
	}
}
