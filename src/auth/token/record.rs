//! Credential record persisted in the `session` section, with its builder and expiry checks.

// self
use crate::{
	_prelude::*,
	auth::token::secret::TokenSecret,
	store::{SessionStore, StoreError, StoreKey, StoreValue},
};

/// Margin before the stored expiry at which a token counts as due for refresh.
pub const REFRESH_MARGIN: Duration = Duration::SECOND;

/// Errors produced by [`CredentialRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CredentialRecordBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
}

/// Access token, optional refresh token, and expiry instant.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret, if the vendor issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Instant after which the access token is no longer accepted.
	pub expires_at: OffsetDateTime,
}
impl CredentialRecord {
	/// Returns a builder for constructing records.
	pub fn builder() -> CredentialRecordBuilder {
		CredentialRecordBuilder::default()
	}

	/// Returns `true` once `instant` reaches one second before the expiry.
	pub fn needs_refresh_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at - REFRESH_MARGIN
	}

	/// Remaining lifetime at `instant`, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		(self.expires_at - instant).max(Duration::ZERO)
	}

	/// Reads the record from the `session` section.
	///
	/// An absent or empty `session.token` means no credential exists yet. A missing or
	/// unreadable expiry is treated as already expired, so the caller refreshes.
	pub async fn load(store: &dyn SessionStore) -> Result<Option<Self>> {
		let Some(access_token) = text(store, &StoreKey::TOKEN).await?.filter(|s| !s.is_empty())
		else {
			return Ok(None);
		};
		let refresh_token =
			text(store, &StoreKey::REFRESH_TOKEN).await?.filter(|s| !s.is_empty());
		let expires_at = store
			.fetch(&StoreKey::TOKEN_EXPIRY)
			.await?
			.and_then(|value| value.as_timestamp())
			.unwrap_or(OffsetDateTime::UNIX_EPOCH);

		Ok(Some(Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: refresh_token.map(TokenSecret::new),
			expires_at,
		}))
	}

	/// Writes the token, refresh token, and expiry with a single store mutation.
	///
	/// An absent refresh token is written as an empty string, which [`Self::load`] reads back
	/// as absent.
	pub async fn save(&self, store: &dyn SessionStore) -> Result<()> {
		let refresh = self.refresh_token.as_ref().map_or("", |secret| secret.expose());

		store
			.save_all(vec![
				(StoreKey::TOKEN, StoreValue::from(self.access_token.expose())),
				(StoreKey::REFRESH_TOKEN, StoreValue::from(refresh)),
				(StoreKey::TOKEN_EXPIRY, StoreValue::timestamp(self.expires_at)),
			])
			.await?;

		Ok(())
	}
}
impl Debug for CredentialRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialRecord")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`CredentialRecord`].
#[derive(Clone, Debug, Default)]
pub struct CredentialRecordBuilder {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl CredentialRecordBuilder {
	/// Sets the issued-at instant used to resolve a relative expiry.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Same as [`refresh_token`](Self::refresh_token) but keeps an existing secret.
	pub fn refresh_secret(mut self, secret: Option<TokenSecret>) -> Self {
		self.refresh_token = secret;

		self
	}

	/// Consumes the builder and produces a [`CredentialRecord`].
	///
	/// A relative expiry without an explicit `issued_at` is resolved against the system clock.
	pub fn build(self) -> Result<CredentialRecord, CredentialRecordBuilderError> {
		let access_token =
			self.access_token.ok_or(CredentialRecordBuilderError::MissingAccessToken)?;
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => self.issued_at.unwrap_or_else(OffsetDateTime::now_utc) + delta,
			(None, None) => return Err(CredentialRecordBuilderError::MissingExpiry),
		};

		Ok(CredentialRecord { access_token, refresh_token: self.refresh_token, expires_at })
	}
}

async fn text(store: &dyn SessionStore, key: &StoreKey) -> Result<Option<String>> {
	match store.fetch(key).await? {
		None => Ok(None),
		Some(StoreValue::Text(value)) => Ok(Some(value)),
		Some(_) => {
			let message = format!("Entry `{key}` must be a string");

			Err(StoreError::Serialization { message }.into())
		},
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::store::MemoryStore;

	fn record() -> CredentialRecord {
		CredentialRecord::builder()
			.access_token("access")
			.refresh_token("refresh")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::hours(8))
			.build()
			.expect("Credential record fixture should build.")
	}

	#[test]
	fn builder_resolves_relative_expiry() {
		assert_eq!(record().expires_at, macros::datetime!(2025-01-01 08:00 UTC));
		assert_eq!(
			CredentialRecord::builder().expires_in(Duration::hours(1)).build(),
			Err(CredentialRecordBuilderError::MissingAccessToken)
		);
		assert_eq!(
			CredentialRecord::builder().access_token("a").build(),
			Err(CredentialRecordBuilderError::MissingExpiry)
		);
	}

	#[tokio::test]
	async fn saving_without_refresh_token_clears_the_stored_one() {
		let store = MemoryStore::default();

		record().save(&store).await.expect("Saving the first record should succeed.");

		let replacement = CredentialRecord::builder()
			.access_token("access-2")
			.expires_at(macros::datetime!(2025-01-02 00:00 UTC))
			.build()
			.expect("Replacement record should build.");

		replacement.save(&store).await.expect("Saving the replacement should succeed.");

		let loaded = CredentialRecord::load(&store)
			.await
			.expect("Loading should succeed.")
			.expect("A record should be stored.");

		assert_eq!(loaded, replacement);
		assert_eq!(store.snapshot().get(&StoreKey::REFRESH_TOKEN), Some(&StoreValue::from("")));
	}

	#[test]
	fn refresh_is_due_one_second_before_expiry() {
		let record = record();

		assert!(!record.needs_refresh_at(macros::datetime!(2025-01-01 07:59:58 UTC)));
		assert!(record.needs_refresh_at(macros::datetime!(2025-01-01 07:59:59 UTC)));
		assert!(record.needs_refresh_at(macros::datetime!(2025-01-01 09:00 UTC)));
		assert_eq!(record.remaining_at(macros::datetime!(2025-01-01 09:00 UTC)), Duration::ZERO);
	}

	#[test]
	fn debug_redacts_secrets() {
		let rendered = format!("{:?}", record());

		assert!(!rendered.contains("access\""));
		assert!(rendered.contains("<redacted>"));
	}

	#[tokio::test]
	async fn save_then_load_preserves_the_record() {
		let store = MemoryStore::default();
		let record = record();

		record.save(&store).await.expect("Saving the record should succeed.");

		let loaded = CredentialRecord::load(&store)
			.await
			.expect("Loading the record should succeed.")
			.expect("A saved record should be present.");

		assert_eq!(loaded, record);
		assert_eq!(
			store.snapshot().get(&StoreKey::TOKEN_EXPIRY),
			Some(&StoreValue::timestamp(macros::datetime!(2025-01-01 08:00 UTC)))
		);
	}

	#[tokio::test]
	async fn empty_token_means_no_record() {
		let store = MemoryStore::with_entries([(StoreKey::TOKEN, StoreValue::from(""))]);

		assert!(CredentialRecord::load(&store).await.expect("Load should succeed.").is_none());
		assert!(
			CredentialRecord::load(&MemoryStore::default())
				.await
				.expect("Load should succeed.")
				.is_none()
		);
	}

	#[tokio::test]
	async fn missing_expiry_counts_as_expired() {
		let store = MemoryStore::with_entries([
			(StoreKey::TOKEN, StoreValue::from("access")),
			(StoreKey::REFRESH_TOKEN, StoreValue::from("refresh")),
		]);
		let loaded = CredentialRecord::load(&store)
			.await
			.expect("Load should succeed.")
			.expect("A token without expiry is still a record.");

		assert!(loaded.needs_refresh_at(macros::datetime!(2025-01-01 00:00 UTC)));
		assert_eq!(loaded.refresh_token, Some(TokenSecret::new("refresh")));
	}
}
