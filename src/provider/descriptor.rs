//! Provider descriptor data structures shared by the authenticator and the API client.

/// Builder API for assembling provider descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Default vendor authorization page.
pub const FITBIT_AUTHORIZATION_URL: &str = "https://www.fitbit.com/oauth2/authorize";
/// Default vendor token endpoint.
pub const FITBIT_TOKEN_URL: &str = "https://api.fitbit.com/oauth2/token";
/// Default vendor resource API base.
pub const FITBIT_API_URL: &str = "https://api.fitbit.com/";

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderEndpoints {
	/// Authorization page opened in the browser.
	pub authorization: Url,
	/// Token endpoint used for exchanges and refreshes.
	pub token: Url,
	/// Resource API base; always ends with `/`.
	pub api: Url,
}

/// Immutable provider descriptor consumed by flows and the API client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderDescriptor {
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
}
impl ProviderDescriptor {
	/// Creates a new, empty builder.
	pub fn builder() -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::default()
	}

	/// Descriptor for the production vendor endpoints.
	pub fn fitbit() -> Result<Self> {
		let parse = |raw: &str| {
			Url::parse(raw).map_err(|source| ConfigError::InvalidEndpoint { source })
		};

		Ok(Self::builder()
			.authorization_endpoint(parse(FITBIT_AUTHORIZATION_URL)?)
			.token_endpoint(parse(FITBIT_TOKEN_URL)?)
			.api_endpoint(parse(FITBIT_API_URL)?)
			.build()
			.map_err(ConfigError::from)?)
	}

	/// Renders `{api}{version}/user/-/{endpoint}` for the authenticated user.
	pub fn resource_url(&self, version: &str, endpoint: &str) -> Result<Url> {
		self.endpoints
			.api
			.join(&format!("{version}/user/-/{endpoint}"))
			.map_err(|source| ConfigError::InvalidEndpoint { source }.into())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn fitbit_defaults_render_resource_urls() {
		let descriptor = ProviderDescriptor::fitbit().expect("Vendor defaults should be valid.");

		assert_eq!(descriptor.endpoints.token.as_str(), FITBIT_TOKEN_URL);
		assert_eq!(
			descriptor
				.resource_url("1.2", "sleep/date/2024-03-01.json")
				.expect("Resource URL should render.")
				.as_str(),
			"https://api.fitbit.com/1.2/user/-/sleep/date/2024-03-01.json"
		);
	}
}
