//! Decision logic shared by the token flows.

// self
use crate::{
	_prelude::*,
	auth::{CredentialRecord, TokenSecret},
	error::ConfigError,
};

/// What [`Authenticator::get_token`](crate::flows::Authenticator::get_token) has to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenAction {
	/// No credential exists; run the full PKCE authorization.
	Authorize,
	/// The stored token is due; exchange the carried refresh token.
	Refresh(TokenSecret),
	/// The stored record is still valid.
	Reuse(CredentialRecord),
}
impl TokenAction {
	/// Picks the action for the stored record at `now`.
	///
	/// A record that is due for refresh but holds no refresh token is a configuration error;
	/// there is no automatic fallback to full authorization.
	pub fn decide(record: Option<CredentialRecord>, now: OffsetDateTime) -> Result<Self> {
		let Some(record) = record else {
			return Ok(Self::Authorize);
		};

		if !record.needs_refresh_at(now) {
			return Ok(Self::Reuse(record));
		}

		record
			.refresh_token
			.map(Self::Refresh)
			.ok_or_else(|| ConfigError::MissingRefreshToken.into())
	}
}
