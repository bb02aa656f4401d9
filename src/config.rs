//! Login configuration passed to the authenticator at construction time.
//!
//! A [`LoginConfig`] names the identity provider's authorization endpoint, the local
//! account used when answering challenges, the element ids that identify the provider's
//! login pages, and the attempt deadline. Values are validated once, either through
//! [`LoginConfigBuilder`] or when decoded with [`LoginConfig::from_json_str`].

// std
use std::net::IpAddr;
// self
use crate::{_prelude::*, error::ConfigError};

/// Errors raised while constructing or validating a [`LoginConfig`].
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum LoginConfigError {
	/// Authorization endpoint is required.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The authorization endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Username must not be blank.
	#[error("Username cannot be empty.")]
	EmptyUsername,
	/// Element ids must not be blank.
	#[error("The {element} element id cannot be empty.")]
	EmptyElementId {
		/// Which element id failed validation.
		element: &'static str,
	},
	/// The attempt deadline must be positive.
	#[error("Attempt timeout must be greater than zero.")]
	ZeroTimeout,
}

/// Element ids used to locate forms and messages on the provider's HTML pages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormIds {
	/// Username form shown before the challenge form.
	pub login: String,
	/// Challenge (TOTP) form that ends in the code redirect.
	pub challenge: String,
	/// Element holding a human-readable error message.
	pub error_message: String,
}
impl Default for FormIds {
	fn default() -> Self {
		Self {
			login: "kc-form-login".into(),
			challenge: "kc-totp-login-form".into(),
			error_message: "kc-error-message".into(),
		}
	}
}

/// Immutable login configuration consumed by flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginConfig {
	/// Identity provider authorization endpoint.
	pub authorization_endpoint: Url,
	/// Local account name submitted with usernames and challenge responses.
	#[serde(default = "default_username")]
	pub username: String,
	/// Element ids of the provider's pages.
	#[serde(default)]
	pub forms: FormIds,
	/// Challenge payload submitted when the challenge form carries no challenge input.
	#[serde(default)]
	pub local_challenge_data: String,
	/// Deadline covering every request of one attempt.
	#[serde(default = "default_attempt_timeout")]
	pub attempt_timeout: StdDuration,
}
impl LoginConfig {
	/// Default local account name.
	pub const DEFAULT_USERNAME: &'static str = "user1";
	/// Default attempt deadline.
	pub const DEFAULT_ATTEMPT_TIMEOUT: StdDuration = StdDuration::from_secs(30);

	/// Creates a new builder.
	pub fn builder() -> LoginConfigBuilder {
		LoginConfigBuilder::new()
	}

	/// Decodes and validates a JSON configuration document.
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(raw);
		let config: Self = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ConfigError::MalformedLoginConfig { source })?;

		config.validate()?;

		Ok(config)
	}

	/// Validates invariants for the configuration.
	pub fn validate(&self) -> Result<(), LoginConfigError> {
		validate_endpoint(&self.authorization_endpoint)?;

		if self.username.trim().is_empty() {
			return Err(LoginConfigError::EmptyUsername);
		}

		for (element, id) in [
			("login form", &self.forms.login),
			("challenge form", &self.forms.challenge),
			("error message", &self.forms.error_message),
		] {
			if id.trim().is_empty() {
				return Err(LoginConfigError::EmptyElementId { element });
			}
		}

		if self.attempt_timeout.is_zero() {
			return Err(LoginConfigError::ZeroTimeout);
		}

		Ok(())
	}
}

/// Builder for [`LoginConfig`] values.
#[derive(Debug)]
pub struct LoginConfigBuilder {
	/// Authorization endpoint (required).
	pub authorization_endpoint: Option<Url>,
	/// Local account name.
	pub username: String,
	/// Element ids of the provider's pages.
	pub forms: FormIds,
	/// Fallback challenge payload for the local flow.
	pub local_challenge_data: String,
	/// Deadline covering every request of one attempt.
	pub attempt_timeout: StdDuration,
}
impl LoginConfigBuilder {
	/// Creates a builder seeded with defaults.
	pub fn new() -> Self {
		Self {
			authorization_endpoint: None,
			username: default_username(),
			forms: FormIds::default(),
			local_challenge_data: String::new(),
			attempt_timeout: default_attempt_timeout(),
		}
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Overrides the local account name.
	pub fn username(mut self, username: impl Into<String>) -> Self {
		self.username = username.into();

		self
	}

	/// Overrides the page element ids.
	pub fn forms(mut self, forms: FormIds) -> Self {
		self.forms = forms;

		self
	}

	/// Overrides the fallback challenge payload.
	pub fn local_challenge_data(mut self, data: impl Into<String>) -> Self {
		self.local_challenge_data = data.into();

		self
	}

	/// Overrides the attempt deadline.
	pub fn attempt_timeout(mut self, timeout: StdDuration) -> Self {
		self.attempt_timeout = timeout;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<LoginConfig, LoginConfigError> {
		let authorization_endpoint =
			self.authorization_endpoint.ok_or(LoginConfigError::MissingAuthorizationEndpoint)?;
		let config = LoginConfig {
			authorization_endpoint,
			username: self.username,
			forms: self.forms,
			local_challenge_data: self.local_challenge_data,
			attempt_timeout: self.attempt_timeout,
		};

		config.validate()?;

		Ok(config)
	}
}
impl Default for LoginConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

fn default_username() -> String {
	LoginConfig::DEFAULT_USERNAME.into()
}

fn default_attempt_timeout() -> StdDuration {
	LoginConfig::DEFAULT_ATTEMPT_TIMEOUT
}

fn validate_endpoint(url: &Url) -> Result<(), LoginConfigError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(LoginConfigError::InsecureEndpoint { url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
		Some(url::Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
		None => false,
	}
}
