//! Attempt-level error types shared across request parsing, flows, and transports.
//!
//! Every variant is fatal for the attempt that raised it; nothing here is retried internally.
//! Callers that want to retry must start a fresh attempt, which opens a fresh session.

// self
use crate::{_prelude::*, flows::FlowStage, signer::SignatureError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

const GENERIC_FAILURE: &str = "Authentication failed.";

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Inbound authorization request lacks a required parameter.
	#[error("Authorization request is missing the `{name}` parameter.")]
	MissingParameter {
		/// Name of the first missing parameter in check order.
		name: &'static str,
	},
	/// Inbound authorization request carries a parameter that cannot be used.
	#[error("Authorization request parameter `{name}` is invalid: {reason}.")]
	InvalidParameter {
		/// Offending parameter name.
		name: &'static str,
		/// Human-readable rejection reason.
		reason: String,
	},
	/// Identity provider rejected the authorization request with a readable reason.
	#[error("Identity provider rejected the request: {reason}")]
	ClientError {
		/// HTTP status returned by the identity provider.
		status: u16,
		/// Reason extracted from the provider's error page.
		reason: String,
	},
	/// Expected HTML form is absent or has no `action`.
	#[error("Identity provider page does not contain a usable `{form_id}` form.")]
	FormParse {
		/// Element id that was looked up.
		form_id: String,
	},
	/// Username submission returned something other than the challenge page.
	#[error("Username submission returned an unexpected status ({status}).")]
	UsernameSubmit {
		/// HTTP status returned by the identity provider.
		status: u16,
	},
	/// Challenge form submission did not end in a redirect.
	#[error("Challenge submission returned an unexpected status ({status}).")]
	ChallengeSubmit {
		/// HTTP status returned by the identity provider.
		status: u16,
	},
	/// A challenge relay step returned an unexpected status.
	#[error("Challenge relay step `{stage}` returned an unexpected status ({status}).")]
	ChallengeResponse {
		/// Step that observed the status.
		stage: FlowStage,
		/// HTTP status returned by the identity provider.
		status: u16,
	},
	/// Challenge resource body is not valid JSON for the expected shape.
	#[error("Challenge relay step `{stage}` returned a malformed challenge resource.")]
	MalformedChallenge {
		/// Step that decoded the body.
		stage: FlowStage,
		/// Structured decoding failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Challenge resource lacks a field required by the next step.
	#[error("Challenge resource is missing `{field}` required by step `{stage}`.")]
	IncompleteChallenge {
		/// Step that needed the field.
		stage: FlowStage,
		/// Missing field name.
		field: &'static str,
	},
	/// A form action or challenge endpoint cannot be resolved to a URL.
	#[error("Step `{stage}` received an invalid endpoint `{endpoint}`.")]
	InvalidEndpoint {
		/// Step that resolved the endpoint.
		stage: FlowStage,
		/// Raw endpoint value.
		endpoint: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Redirect response without a usable `Location` header.
	#[error("Redirect response ({status}) did not carry a usable Location header.")]
	Redirect {
		/// HTTP status of the redirect response.
		status: u16,
	},
	/// Local signing failure.
	#[error(transparent)]
	Signature(#[from] SignatureError),
	/// Attempt deadline elapsed during the given step.
	#[error("Step `{stage}` exceeded the attempt deadline.")]
	Timeout {
		/// Step that was running when the deadline elapsed.
		stage: FlowStage,
	},
}
impl Error {
	/// Returns the taxonomy label for this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Config(_) => ErrorKind::Config,
			Self::Transport(_) => ErrorKind::Transport,
			Self::MissingParameter { .. } => ErrorKind::MissingParameter,
			Self::InvalidParameter { .. } => ErrorKind::InvalidParameter,
			Self::ClientError { .. } => ErrorKind::ClientError,
			Self::FormParse { .. } => ErrorKind::FormParse,
			Self::UsernameSubmit { .. } | Self::ChallengeSubmit { .. } =>
				ErrorKind::ChallengeSubmit,
			Self::ChallengeResponse { .. }
			| Self::MalformedChallenge { .. }
			| Self::IncompleteChallenge { .. }
			| Self::InvalidEndpoint { .. } => ErrorKind::ChallengeResponse,
			Self::Redirect { .. } => ErrorKind::Redirect,
			Self::Signature(_) => ErrorKind::Signature,
			Self::Timeout { .. } => ErrorKind::Timeout,
		}
	}

	/// Message suitable for the end user.
	///
	/// Provider rejections surface their reason verbatim, request and connectivity problems
	/// surface their kind, and protocol mismatches collapse into a generic failure.
	pub fn user_message(&self) -> String {
		match self {
			Self::ClientError { reason, .. } => reason.clone(),
			Self::MissingParameter { .. } | Self::InvalidParameter { .. } => self.to_string(),
			Self::Timeout { .. } => "The identity provider did not respond in time.".into(),
			Self::Transport(_) => "The identity provider could not be reached.".into(),
			Self::Signature(_) => "The device key could not sign the challenge.".into(),
			_ => GENERIC_FAILURE.into(),
		}
	}
}

impl From<crate::config::LoginConfigError> for Error {
	fn from(e: crate::config::LoginConfigError) -> Self {
		ConfigError::from(e).into()
	}
}

/// Stable error labels used in logs and metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Inbound request lacks a required parameter.
	MissingParameter,
	/// Inbound request carries an unusable parameter value.
	InvalidParameter,
	/// Identity provider rejected the request.
	ClientError,
	/// Expected HTML form missing.
	FormParse,
	/// Challenge relay step failed.
	ChallengeResponse,
	/// Form submission step failed.
	ChallengeSubmit,
	/// Redirect without `Location`.
	Redirect,
	/// Local signing failure.
	Signature,
	/// Attempt deadline elapsed.
	Timeout,
	/// Local configuration problem.
	Config,
	/// Network failure.
	Transport,
}
impl ErrorKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorKind::MissingParameter => "missing_parameter",
			ErrorKind::InvalidParameter => "invalid_parameter",
			ErrorKind::ClientError => "client_error",
			ErrorKind::FormParse => "form_parse",
			ErrorKind::ChallengeResponse => "challenge_response",
			ErrorKind::ChallengeSubmit => "challenge_submit",
			ErrorKind::Redirect => "redirect",
			ErrorKind::Signature => "signature",
			ErrorKind::Timeout => "timeout",
			ErrorKind::Config => "config",
			ErrorKind::Transport => "transport",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Configuration and request-construction failures.
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
	/// Login configuration failed validation.
	#[error(transparent)]
	InvalidLoginConfig(#[from] crate::config::LoginConfigError),
	/// Login configuration document could not be decoded.
	#[error("Login configuration is malformed.")]
	MalformedLoginConfig {
		/// Structured decoding failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the identity provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the identity provider.")]
	Io(#[from] std::io::Error),
	/// Transport failed without a typed error.
	#[error("Transport failed: {message}.")]
	Other {
		/// Transport-supplied description.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
