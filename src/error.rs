//! Crate-level error types shared by the authenticator, rate limiter, stores, and API client.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Nothing in this crate retries or suppresses these; callers decide what to do.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Config store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem detected before talking to the vendor.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, listener IO).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// A fetched document could not be written to the backfill output directory.
	#[error("Failed to write {}.", path.display())]
	Output {
		/// Destination file.
		path: std::path::PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// The wait for the authorization callback was cancelled.
	#[error("Server interrupted.")]
	Interrupted,
	/// A long-running command was stopped by the interrupt signal.
	#[error("Cancelled by interrupt.")]
	Cancelled,
	/// A vendor endpoint answered with a non-2xx status.
	#[error("The {endpoint} endpoint returned HTTP {status}: {body}")]
	Http {
		/// Endpoint label (`token` or `resource`).
		endpoint: &'static str,
		/// HTTP status code.
		status: u16,
		/// Raw response body, kept for diagnosis.
		body: String,
	},
	/// A vendor endpoint answered 2xx with JSON of an unexpected shape.
	#[error("The {endpoint} endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Endpoint label (`token` or `resource`).
		endpoint: &'static str,
		/// Structured parsing failure including the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A vendor endpoint answered in a way that fits no other category.
	#[error("The {endpoint} endpoint returned an unexpected response: {message}.")]
	UnexpectedResponse {
		/// Endpoint label (`token` or `resource`).
		endpoint: &'static str,
		/// Human-readable summary.
		message: String,
	},
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// An endpoint URL could not be parsed or joined.
	#[error("Endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Provider descriptor failed validation (missing or non-HTTPS endpoint).
	#[error(transparent)]
	Descriptor(#[from] crate::provider::ProviderDescriptorError),
	/// A required `(section, item)` entry is absent from the config store.
	#[error("Config store is missing `{section}.{item}`.")]
	MissingSetting {
		/// Section name.
		section: String,
		/// Item name.
		item: String,
	},
	/// The callback certificate file does not exist or cannot be read.
	#[error("Certificate file {path} cannot be read.")]
	CertificateUnreadable {
		/// Offending path.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// The callback certificate file lacks a certificate chain or private key, or rustls
	/// rejected it.
	#[error("Certificate file {path} is invalid: {reason}.")]
	InvalidCertificate {
		/// Offending path.
		path: String,
		/// What was wrong with it.
		reason: String,
	},
	/// Rate limiter frequency must be positive and finite.
	#[error("Rate limiter frequency must be positive and finite, got {frequency}.")]
	InvalidFrequency {
		/// Rejected frequency in calls per second.
		frequency: f64,
	},
	/// Stored credential has no refresh token but a refresh is due.
	#[error("Stored credential is missing a refresh token.")]
	MissingRefreshToken,
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Credential record builder validation failed.
	#[error("Unable to build credential record.")]
	CredentialBuild(#[from] crate::auth::CredentialRecordBuilderError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Builds a [`ConfigError::MissingSetting`] for the provided key.
	pub fn missing(key: &crate::store::StoreKey) -> Self {
		Self::MissingSetting { section: key.section.to_string(), item: key.item.to_string() }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the vendor API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure, including the callback listener socket.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn interrupted_uses_fixed_message() {
		assert_eq!(Error::Interrupted.to_string(), "Server interrupted.");
	}

	#[test]
	fn http_error_includes_body() {
		let err = Error::Http { endpoint: "token", status: 401, body: "{\"errors\":[]}".into() };

		assert_eq!(err.to_string(), "The token endpoint returned HTTP 401: {\"errors\":[]}");
	}

	#[test]
	fn missing_setting_names_section_and_item() {
		let err = ConfigError::missing(&crate::store::StoreKey::CLIENT_ID);

		assert_eq!(err.to_string(), "Config store is missing `app.client_id`.");
	}
}
