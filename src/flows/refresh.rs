//! Refresh token exchange.
//!
//! The stored refresh token is exchanged through the rate limiter and the new record
//! replaces the stored one. If the vendor does not rotate the refresh token, the old one is
//! kept. A failed refresh propagates; there is no fallback to full authorization.

// self
use crate::{
	_prelude::*,
	auth::{CredentialRecord, TokenSecret},
	error::ConfigError,
	flows::Authenticator,
	obs::{self, FlowKind},
};

impl Authenticator {
	/// Exchanges the stored refresh token regardless of the current expiry.
	pub async fn refresh(&self) -> Result<CredentialRecord> {
		let _serialized = self.flow_guard.lock().await;
		let refresh = CredentialRecord::load(self.store.as_ref())
			.await?
			.and_then(|record| record.refresh_token)
			.ok_or(ConfigError::MissingRefreshToken)?;

		self.run_refresh(&refresh).await
	}

	pub(crate) async fn run_refresh(&self, refresh: &TokenSecret) -> Result<CredentialRecord> {
		obs::observe(FlowKind::Refresh, "refresh", async move {
			let facade = self.facade()?;
			let record =
				self.rate_limiter.run(facade.refresh_token(self.clock.as_ref(), refresh)).await?;

			record.save(self.store.as_ref()).await?;

			tracing::info!(expires_at = %record.expires_at, "Access token refreshed.");

			Ok(record)
		})
		.await
	}
}
