//! Short-lived HTTPS listener that captures the authorization redirect.
//!
//! The listener handles one connection at a time until a `GET` carrying a non-empty `code`
//! query parameter arrives. Requests without a code get an informational page and the wait
//! continues; failed TLS handshakes and unreadable requests are logged and skipped. Each
//! connection, handshake included, must finish within the idle timeout.

// std
use std::{
	fs, io,
	net::{IpAddr, Ipv4Addr, SocketAddr},
	path::{Path, PathBuf},
};
// crates.io
use rustls::{
	ServerConfig,
	pki_types::{CertificateDer, PrivateKeyDer},
};
use tokio::{
	io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
	net::{TcpListener, TcpStream},
};
use tokio_rustls::TlsAcceptor;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

/// Port the vendor application's redirect URI points at.
pub const DEFAULT_CALLBACK_PORT: u16 = 4444;

const CONFIRMATION_MESSAGE: &str =
	"Received the code! Please close this window.<script>window.close();</script>";
const MISSING_CODE_MESSAGE: &str = "Did not receive the code. Something went wrong.";
const MAX_HEAD_LEN: usize = 16 * 1024;
const MAX_HEADERS: usize = 64;
const DEFAULT_IDLE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Boxed future that resolves when the user cancels the wait.
pub type InterruptFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Validated listener settings; the certificate is parsed when the config is loaded.
#[derive(Clone, Debug)]
pub struct CallbackConfig {
	/// Address the listener binds to.
	pub bind_address: IpAddr,
	/// Port the listener binds to.
	pub port: u16,
	/// PEM file holding the certificate chain followed by the private key.
	pub certificate_path: PathBuf,
	/// Longest a single connection may take from accept to the end of its response.
	pub idle_timeout: std::time::Duration,
	tls: Arc<ServerConfig>,
}
impl CallbackConfig {
	/// Reads and validates the PEM file so a broken certificate fails before any network call.
	pub fn load(certificate_path: impl Into<PathBuf>, port: u16) -> Result<Self> {
		let certificate_path = certificate_path.into();
		let tls = load_server_config(&certificate_path)?;

		Ok(Self {
			bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
			port,
			certificate_path,
			idle_timeout: DEFAULT_IDLE_TIMEOUT,
			tls: Arc::new(tls),
		})
	}

	/// Overrides the per-connection idle timeout (defaults to 30 seconds).
	pub fn with_idle_timeout(mut self, timeout: std::time::Duration) -> Self {
		self.idle_timeout = timeout;

		self
	}

	/// Socket address the listener binds to.
	pub fn socket_addr(&self) -> SocketAddr {
		SocketAddr::new(self.bind_address, self.port)
	}
}

/// Lifecycle of a [`CallbackListener`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenerState {
	/// Accepting connections and waiting for a code.
	Listening,
	/// A code arrived; the confirmation page is being written.
	Responding,
	/// The socket is closed, after success or interruption.
	Stopped,
}

/// Bound TLS listener for one authorization attempt.
pub struct CallbackListener {
	listener: TcpListener,
	acceptor: TlsAcceptor,
	idle_timeout: std::time::Duration,
	state: ListenerState,
}
impl CallbackListener {
	/// Binds the TCP socket; the listener is [`ListenerState::Listening`] afterwards.
	pub async fn bind(config: &CallbackConfig) -> Result<Self> {
		let listener =
			TcpListener::bind(config.socket_addr()).await.map_err(TransportError::Io)?;

		tracing::debug!(address = %config.socket_addr(), "Callback listener bound.");

		Ok(Self {
			listener,
			acceptor: TlsAcceptor::from(config.tls.clone()),
			idle_timeout: config.idle_timeout,
			state: ListenerState::Listening,
		})
	}

	/// Local address of the bound socket.
	pub fn local_addr(&self) -> Result<SocketAddr> {
		Ok(self.listener.local_addr().map_err(TransportError::Io)?)
	}

	/// Current lifecycle state.
	pub fn state(&self) -> ListenerState {
		self.state
	}

	/// Waits for the redirect carrying `code`, or fails with [`Error::Interrupted`] once
	/// `interrupt` resolves. The socket is closed in both cases.
	pub async fn wait_for_code(mut self, interrupt: InterruptFuture) -> Result<String> {
		let outcome = tokio::select! {
			biased;
			_ = interrupt => Err(Error::Interrupted),
			code = self.accept_until_code() => code,
		};

		self.state = ListenerState::Stopped;

		if matches!(outcome, Err(Error::Interrupted)) {
			tracing::warn!("Authorization callback wait interrupted.");
		}

		outcome
	}

	async fn accept_until_code(&mut self) -> Result<String> {
		loop {
			let (tcp, peer) = self.listener.accept().await.map_err(TransportError::Io)?;
			let connection = serve_connection(&self.acceptor, tcp, &mut self.state);
			let handled = match tokio::time::timeout(self.idle_timeout, connection).await {
				Ok(handled) => handled,
				Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "Callback client went idle")),
			};

			match handled {
				Ok(Some(code)) => return Ok(code),
				Ok(None) => {
					tracing::info!(%peer, "Callback request carried no code; still waiting.")
				},
				Err(e) => tracing::warn!(%peer, error = %e, "Failed to handle callback request."),
			}
		}
	}
}
impl Debug for CallbackListener {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CallbackListener")
			.field("local_addr", &self.listener.local_addr().ok())
			.field("state", &self.state)
			.finish()
	}
}

async fn serve_connection(
	acceptor: &TlsAcceptor,
	tcp: TcpStream,
	state: &mut ListenerState,
) -> io::Result<Option<String>> {
	let tls = acceptor.accept(tcp).await?;

	handle_connection(tls, state).await
}

/// Reads one request head, answers it, and returns the `code` it carried, if any.
async fn handle_connection<S>(
	mut stream: S,
	state: &mut ListenerState,
) -> io::Result<Option<String>>
where
	S: AsyncRead + AsyncWrite + Unpin,
{
	let head = read_request_head(&mut stream).await?;
	let code = parse_code(&head)?;

	match &code {
		Some(_) => {
			*state = ListenerState::Responding;

			if let Err(e) = write_page(&mut stream, CONFIRMATION_MESSAGE).await {
				tracing::warn!(error = %e, "Failed to write the confirmation page.");
			}
		},
		None => write_page(&mut stream, MISSING_CODE_MESSAGE).await?,
	}

	Ok(code)
}

async fn read_request_head<S>(stream: &mut S) -> io::Result<Vec<u8>>
where
	S: AsyncRead + Unpin,
{
	let mut head = Vec::with_capacity(1024);
	let mut chunk = [0_u8; 1024];

	loop {
		let read = stream.read(&mut chunk).await?;

		if read == 0 {
			return Err(io::Error::new(
				io::ErrorKind::UnexpectedEof,
				"Connection closed before the request head ended",
			));
		}

		head.extend_from_slice(&chunk[..read]);

		if head.windows(4).any(|window| window == b"\r\n\r\n") {
			return Ok(head);
		}
		if head.len() > MAX_HEAD_LEN {
			return Err(io::Error::new(io::ErrorKind::InvalidData, "Request head is too large"));
		}
	}
}

fn parse_code(head: &[u8]) -> io::Result<Option<String>> {
	let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
	let mut request = httparse::Request::new(&mut headers);

	match request.parse(head) {
		Ok(httparse::Status::Complete(_)) => {},
		Ok(httparse::Status::Partial) =>
			return Err(io::Error::new(io::ErrorKind::InvalidData, "Incomplete request head")),
		Err(e) => return Err(io::Error::new(io::ErrorKind::InvalidData, e)),
	}

	if request.method != Some("GET") {
		return Ok(None);
	}

	let path = request.path.unwrap_or("/");
	let url = Url::parse("https://localhost")
		.and_then(|base| base.join(path))
		.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

	Ok(url
		.query_pairs()
		.find(|(key, _)| key == "code")
		.map(|(_, value)| value.into_owned())
		.filter(|value| !value.is_empty()))
}

async fn write_page<S>(stream: &mut S, message: &str) -> io::Result<()>
where
	S: AsyncWrite + Unpin,
{
	let body = format!("<pre>{message}</pre>");
	let response = format!(
		"HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\n\
		 Connection: close\r\n\r\n{body}",
		body.len()
	);

	stream.write_all(response.as_bytes()).await?;
	stream.flush().await?;
	stream.shutdown().await
}

fn load_server_config(path: &Path) -> Result<ServerConfig> {
	let invalid = |reason: String| ConfigError::InvalidCertificate {
		path: path.display().to_string(),
		reason,
	};
	let pem = fs::read(path).map_err(|source| ConfigError::CertificateUnreadable {
		path: path.display().to_string(),
		source,
	})?;
	let certs = rustls_pemfile::certs(&mut pem.as_slice())
		.collect::<Result<Vec<CertificateDer<'static>>, _>>()
		.map_err(|e| invalid(format!("unreadable certificate block ({e})")))?;

	if certs.is_empty() {
		return Err(invalid("no certificate found".into()).into());
	}

	let key: PrivateKeyDer<'static> = rustls_pemfile::private_key(&mut pem.as_slice())
		.map_err(|e| invalid(format!("unreadable private key block ({e})")))?
		.ok_or_else(|| invalid("no private key found".into()))?;
	let config =
		ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
			.with_safe_default_protocol_versions()
			.map_err(|e| invalid(e.to_string()))?
			.with_no_client_auth()
			.with_single_cert(certs, key)
			.map_err(|e| invalid(e.to_string()))?;

	Ok(config)
}
