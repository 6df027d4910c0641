//! Vendor application credentials read from the `app` section of the config store.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::ConfigError,
	store::{SessionStore, StoreKey},
};

/// Client identifier and secret registered with the vendor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientCredentials {
	/// Public client identifier.
	pub client_id: String,
	/// Confidential client secret.
	pub client_secret: TokenSecret,
}
impl ClientCredentials {
	/// Wraps explicit credentials.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), client_secret: TokenSecret::new(client_secret) }
	}

	/// Reads `app.client_id` and `app.client_secret`.
	///
	/// Absent or empty entries fail with [`ConfigError::MissingSetting`] so a broken config is
	/// caught before any network activity.
	pub async fn load(store: &dyn SessionStore) -> Result<Self> {
		let client_id = required_text(store, &StoreKey::CLIENT_ID).await?;
		let client_secret = required_text(store, &StoreKey::CLIENT_SECRET).await?;

		Ok(Self::new(client_id, client_secret))
	}
}

async fn required_text(store: &dyn SessionStore, key: &StoreKey) -> Result<String> {
	let value = store.fetch(key).await?;

	match value.as_ref().and_then(|value| value.as_str()) {
		Some(text) if !text.is_empty() => Ok(text.to_owned()),
		_ => Err(ConfigError::missing(key).into()),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::{MemoryStore, StoreValue};

	#[tokio::test]
	async fn load_reads_app_section() {
		let store = MemoryStore::with_entries([
			(StoreKey::CLIENT_ID, StoreValue::from("23ABCD")),
			(StoreKey::CLIENT_SECRET, StoreValue::from("s3cr3t")),
		]);
		let credentials =
			ClientCredentials::load(&store).await.expect("Complete app section should load.");

		assert_eq!(credentials, ClientCredentials::new("23ABCD", "s3cr3t"));
	}

	#[tokio::test]
	async fn load_rejects_missing_or_empty_entries() {
		let store = MemoryStore::with_entries([(StoreKey::CLIENT_ID, StoreValue::from("23ABCD"))]);
		let err = ClientCredentials::load(&store)
			.await
			.expect_err("Missing client secret should be rejected.");

		assert!(err.to_string().contains("app.client_secret"));

		let store = MemoryStore::with_entries([
			(StoreKey::CLIENT_ID, StoreValue::from("")),
			(StoreKey::CLIENT_SECRET, StoreValue::from("s3cr3t")),
		]);
		let err =
			ClientCredentials::load(&store).await.expect_err("Empty client id should be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::MissingSetting { .. })));
	}
}
