//! Transport primitives for login attempts.
//!
//! The module exposes [`LoginHttpClient`], a factory that opens one isolated session per
//! attempt, and [`TransportErrorMapper`], which classifies transport failures. Sessions speak
//! [`oauth2::AsyncHttpClient`] so any HTTP stack that can run `oauth2` requests can drive a
//! login; the bundled reqwest implementation is enabled by the `reqwest` feature.

// crates.io
use oauth2::{AsyncHttpClient, HttpClientError};
#[cfg(feature = "reqwest")] use oauth2::{HttpRequest, HttpResponse};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
	flows::FlowStage,
};
#[cfg(feature = "reqwest")] use crate::redirect::RedirectInterceptor;

/// Factory for per-attempt HTTP sessions.
///
/// Every call to [`open_session`](LoginHttpClient::open_session) must return a session with
/// its own cookie jar and connection state and with automatic redirect following disabled.
/// Sessions are never shared across attempts; dropping one tears it down.
pub trait LoginHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Session handle issuing the attempt's requests.
	///
	/// The request future returned by [`AsyncHttpClient::call`] must be `Send` so attempts can
	/// hop executors.
	type Session: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Opens a fresh session whose requests must finish before `deadline`.
	fn open_session(&self, deadline: Option<Instant>) -> Result<Self::Session, ConfigError>;
}

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] raised during `stage` into a crate error.
	fn map_transport_error(&self, stage: FlowStage, error: HttpClientError<E>) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, stage: FlowStage, err: HttpClientError<ReqwestError>) -> Error {
		match err {
			HttpClientError::Reqwest(inner) if inner.is_timeout() => Error::Timeout { stage },
			HttpClientError::Reqwest(inner) => TransportError::from(*inner).into(),
			other => map_generic_transport_error(other),
		}
	}
}

/// Maps the transport-agnostic [`HttpClientError`] variants.
pub fn map_generic_transport_error<E>(err: HttpClientError<E>) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransportError::Other { message }.into(),
		_ => TransportError::Other { message: "unknown transport failure".into() }.into(),
	}
}

/// Reqwest session factory.
///
/// Each session is a new [`ReqwestClient`] with a cookie store and
/// [`RedirectInterceptor::policy`], so cookies and connections never leak between attempts.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient {
	accept_invalid_certs: bool,
	user_agent: Option<String>,
}
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Accepts invalid TLS certificates. Only meant for local test servers.
	pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
		self.accept_invalid_certs = accept;

		self
	}

	/// Overrides the `User-Agent` header sent by sessions.
	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());

		self
	}
}
#[cfg(feature = "reqwest")]
impl LoginHttpClient for ReqwestHttpClient {
	type Session = ReqwestSession;
	type TransportError = ReqwestError;

	fn open_session(&self, deadline: Option<Instant>) -> Result<Self::Session, ConfigError> {
		let mut builder =
			ReqwestClient::builder().redirect(RedirectInterceptor.policy()).cookie_store(true);

		if self.accept_invalid_certs {
			builder = builder.danger_accept_invalid_certs(true);
		}
		if let Some(user_agent) = &self.user_agent {
			builder = builder.user_agent(user_agent.as_str());
		}

		Ok(ReqwestSession::new(builder.build()?, deadline))
	}
}

#[cfg(feature = "reqwest")]
struct ReqwestSessionInner {
	client: ReqwestClient,
	deadline: Option<Instant>,
}

/// Session handle returned by [`ReqwestHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestSession(Arc<ReqwestSessionInner>);
#[cfg(feature = "reqwest")]
impl ReqwestSession {
	fn new(client: ReqwestClient, deadline: Option<Instant>) -> Self {
		Self(Arc::new(ReqwestSessionInner { client, deadline }))
	}
}
#[cfg(feature = "reqwest")]
impl Debug for ReqwestSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ReqwestSession").field("deadline", &self.0.deadline).finish()
	}
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestSession {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let session = Arc::clone(&self.0);

		Box::pin(async move {
			let mut request: reqwest::Request = request.try_into().map_err(Box::new)?;

			if let Some(deadline) = session.deadline {
				*request.timeout_mut() = Some(deadline.saturating_duration_since(Instant::now()));
			}

			let response = session.client.execute(request).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
