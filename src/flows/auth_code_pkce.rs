//! Authorization Code + PKCE against a local HTTPS callback listener.
//!
//! [`Authenticator::authorize`] generates a PKCE pair, binds the [`CallbackListener`], shows
//! the authorize URL through an [`AuthorizationPrompt`], and waits for the redirect. The
//! captured code is exchanged at the token endpoint and the resulting record replaces the
//! stored one. An interrupted wait fails with [`Error::Interrupted`]; retrying starts over with
//! a new verifier.

mod listener;
mod session;

pub use listener::*;
pub use session::*;

// self
use crate::{
	_prelude::*,
	auth::CredentialRecord,
	flows::Authenticator,
	obs::{self, FlowKind},
};

/// Presents the authorize URL to the user.
pub trait AuthorizationPrompt
where
	Self: Send + Sync,
{
	/// Shows `authorize_url`; called once the callback listener is bound. Failures must not
	/// abort the flow, since the user can still open the URL by hand.
	fn present(&self, authorize_url: &Url);
}

/// Opens the authorize URL in the default browser.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemBrowser;
impl AuthorizationPrompt for SystemBrowser {
	fn present(&self, authorize_url: &Url) {
		match webbrowser::open(authorize_url.as_str()) {
			Ok(()) => tracing::info!("Opened the authorization page in the default browser."),
			Err(e) => tracing::warn!(
				error = %e,
				url = %authorize_url,
				"Failed to open a browser; open the authorization URL manually."
			),
		}
	}
}

/// Source of the cancellation that ends a callback wait.
pub trait InterruptSignal
where
	Self: Send + Sync,
{
	/// Future resolving when the wait should be abandoned.
	fn interrupted(&self) -> InterruptFuture;
}

/// Cancels on Ctrl-C.
#[derive(Clone, Copy, Debug, Default)]
pub struct CtrlC;
impl InterruptSignal for CtrlC {
	fn interrupted(&self) -> InterruptFuture {
		Box::pin(async {
			// Without a signal handler the wait can only end with a code.
			if tokio::signal::ctrl_c().await.is_err() {
				std::future::pending::<()>().await;
			}
		})
	}
}

/// Drives `work` until it finishes or `signal` fires, failing with [`Error::Cancelled`] in the
/// latter case.
///
/// `work` is polled first, so a flow that listens to the same signal still reports its own
/// error.
pub async fn until_interrupted<F, T, E>(signal: &dyn InterruptSignal, work: F) -> Result<T, E>
where
	F: Future<Output = Result<T, E>>,
	E: From<Error>,
{
	tokio::select! {
		biased;
		outcome = work => outcome,
		_ = signal.interrupted() => Err(Error::Cancelled.into()),
	}
}

impl Authenticator {
	/// Runs the full PKCE authorization regardless of any stored credential.
	pub async fn authorize(&self) -> Result<CredentialRecord> {
		let _serialized = self.flow_guard.lock().await;

		self.run_authorization().await
	}

	pub(crate) async fn run_authorization(&self) -> Result<CredentialRecord> {
		obs::observe(FlowKind::AuthorizationCode, "authorize", async move {
			let facade = self.facade()?;
			let session = AuthorizationSession::new(
				&self.descriptor,
				&self.credentials.client_id,
				self.scope.clone(),
			);
			let listener = CallbackListener::bind(&self.callback).await?;

			tracing::info!(url = %session.authorize_url, "Waiting for the authorization callback.");

			self.rate_limiter
				.run(async {
					self.prompt.present(&session.authorize_url);

					Ok(())
				})
				.await?;

			let code = listener.wait_for_code(self.interrupt.interrupted()).await?;
			let record = self
				.rate_limiter
				.run(facade.exchange_authorization_code(
					self.clock.as_ref(),
					&code,
					session.verifier(),
				))
				.await?;

			record.save(self.store.as_ref()).await?;

			tracing::info!(expires_at = %record.expires_at, "Authorization completed.");

			Ok(record)
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	struct Fired;
	impl InterruptSignal for Fired {
		fn interrupted(&self) -> InterruptFuture {
			Box::pin(async {})
		}
	}

	#[tokio::test]
	async fn interrupt_cancels_pending_work() {
		let err = until_interrupted(&Fired, std::future::pending::<Result<()>>())
			.await
			.expect_err("Pending work should be cancelled.");

		assert!(matches!(err, Error::Cancelled));
	}

	#[tokio::test]
	async fn finished_work_wins_over_a_simultaneous_interrupt() {
		let value = until_interrupted(&Fired, async { Ok::<_, Error>(7) })
			.await
			.expect("Ready work should complete.");

		assert_eq!(value, 7);

		let err = until_interrupted(&Fired, async { Err::<(), _>(Error::Interrupted) })
			.await
			.expect_err("The work's own error should surface.");

		assert!(matches!(err, Error::Interrupted));
	}
}
