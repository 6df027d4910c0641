//! Persisted `(section, item)` key-value store shared by the authenticator and rate limiter.
//!
//! Both components receive the store as an injected [`SessionStore`] handle; there is no
//! process-wide singleton. Reads and writes are not guarded by any cross-process lock, so
//! two processes sharing one backing file can race each other. The crate assumes a single
//! writer and leaves it at that.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// std
use std::borrow::Cow;
// self
use crate::_prelude::*;

/// Boxed future returned by [`SessionStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for the persisted config.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Fetches the value stored under `key`, if present.
	fn fetch<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<StoreValue>>;

	/// Writes every entry and persists once; either all entries land or none do.
	fn save_all(&self, entries: Vec<(StoreKey, StoreValue)>) -> StoreFuture<'_, ()>;

	/// Writes a single entry.
	fn save(&self, key: StoreKey, value: StoreValue) -> StoreFuture<'_, ()> {
		self.save_all(vec![(key, value)])
	}
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Two-level key addressing one stored entry.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoreKey {
	/// Section (TOML table) name.
	pub section: Cow<'static, str>,
	/// Item name within the section.
	pub item: Cow<'static, str>,
}
impl StoreKey {
	/// Vendor application client identifier.
	pub const CLIENT_ID: Self = Self::from_static("app", "client_id");
	/// Vendor application client secret.
	pub const CLIENT_SECRET: Self = Self::from_static("app", "client_secret");
	/// Timestamp of the most recent permitted API call.
	pub const LAST_API_REQUEST: Self =
		Self::from_static("session", "last_api_request_timestamp_utc");
	/// Current refresh token.
	pub const REFRESH_TOKEN: Self = Self::from_static("session", "refresh_token");
	/// Current access token.
	pub const TOKEN: Self = Self::from_static("session", "token");
	/// Access token expiry.
	pub const TOKEN_EXPIRY: Self = Self::from_static("session", "token_expiry_timestamp_utc");

	/// Builds a key from owned or borrowed names.
	pub fn new(section: impl Into<Cow<'static, str>>, item: impl Into<Cow<'static, str>>) -> Self {
		Self { section: section.into(), item: item.into() }
	}

	/// Builds a key from static names in const contexts.
	pub const fn from_static(section: &'static str, item: &'static str) -> Self {
		Self { section: Cow::Borrowed(section), item: Cow::Borrowed(item) }
	}
}
impl Display for StoreKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}.{}", self.section, self.item)
	}
}

/// Scalar stored under a [`StoreKey`]; mirrors the TOML scalar types.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreValue {
	/// UTF-8 string.
	Text(String),
	/// Floating point number; timestamps are stored as fractional UTC seconds.
	Float(f64),
	/// Signed integer.
	Integer(i64),
	/// Boolean flag.
	Boolean(bool),
}
impl StoreValue {
	/// Encodes an instant as fractional Unix seconds.
	pub fn timestamp(instant: OffsetDateTime) -> Self {
		let secs = instant.unix_timestamp() as f64;

		Self::Float(secs + f64::from(instant.nanosecond()) / 1_000_000_000.)
	}

	/// Returns the string payload, if this is [`StoreValue::Text`].
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Text(value) => Some(value),
			_ => None,
		}
	}

	/// Decodes a Unix timestamp stored as a float or an integer.
	pub fn as_timestamp(&self) -> Option<OffsetDateTime> {
		match *self {
			Self::Float(secs) if secs.is_finite() => {
				let whole = secs.floor();
				let nanos = ((secs - whole) * 1_000_000_000.).round() as i64;

				OffsetDateTime::from_unix_timestamp(whole as i64)
					.ok()
					.map(|instant| instant + Duration::nanoseconds(nanos))
			},
			Self::Integer(secs) => OffsetDateTime::from_unix_timestamp(secs).ok(),
			_ => None,
		}
	}
}
impl From<String> for StoreValue {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}
impl From<&str> for StoreValue {
	fn from(value: &str) -> Self {
		Self::Text(value.to_owned())
	}
}
