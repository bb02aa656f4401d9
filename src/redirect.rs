//! Redirect interception: the terminal `302` of a login attempt is the attempt's result.
//!
//! Sessions are built with redirect following disabled ([`RedirectInterceptor::policy`]), and
//! every response is then handed to [`RedirectInterceptor::inspect`] before any step-specific
//! status handling runs.

// crates.io
use oauth2::{
	HttpResponse,
	http::{StatusCode, header::LOCATION},
};
// self
use crate::_prelude::*;

/// Captured authorization-code redirect. The engine never follows it.
///
/// Both forms of the target are kept: the `Location` header exactly as the provider sent it,
/// and the same value resolved against the request URL. Resolution normalises the URL
/// (lowercased host, percent-encoding, trailing slash on an empty path).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowResult {
	header: String,
	location: Url,
}
impl FlowResult {
	/// Wraps a raw `Location` header value and its resolved form.
	pub fn new(header: impl Into<String>, location: Url) -> Self {
		Self { header: header.into(), location }
	}

	/// `Location` header value as received.
	pub fn location_header(&self) -> &str {
		&self.header
	}

	/// Redirect target carrying the authorization code, resolved to an absolute URL.
	pub fn location(&self) -> &Url {
		&self.location
	}

	/// Authorization `code` query parameter, if present.
	pub fn code(&self) -> Option<String> {
		self.query_value("code")
	}

	/// Echoed `state` query parameter, if present.
	pub fn state(&self) -> Option<String> {
		self.query_value("state")
	}

	/// Consumes the result, returning the redirect target.
	pub fn into_url(self) -> Url {
		self.location
	}

	fn query_value(&self, name: &str) -> Option<String> {
		self.location
			.query_pairs()
			.find(|(key, _)| key == name)
			.map(|(_, value)| value.into_owned())
	}
}
impl Display for FlowResult {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.header)
	}
}

/// Per-session redirect policy.
#[derive(Clone, Copy, Debug, Default)]
pub struct RedirectInterceptor;
impl RedirectInterceptor {
	/// Status treated as flow completion.
	pub const COMPLETION_STATUS: StatusCode = StatusCode::FOUND;

	/// Reqwest redirect policy that never follows a redirect.
	#[cfg(feature = "reqwest")]
	pub fn policy(&self) -> reqwest::redirect::Policy {
		reqwest::redirect::Policy::none()
	}

	/// Classifies `response`, which answered a request to `request_url`.
	///
	/// Returns `Ok(Some(_))` for a `302` with a `Location` header (resolved against
	/// `request_url` when relative), `Ok(None)` for any other status, and
	/// [`Error::Redirect`] for a `302` whose `Location` is absent or unusable.
	pub fn inspect(
		&self,
		request_url: &Url,
		response: &HttpResponse,
	) -> Result<Option<FlowResult>> {
		let status = response.status();

		if status != Self::COMPLETION_STATUS {
			return Ok(None);
		}

		let redirect_error = || Error::Redirect { status: status.as_u16() };
		let location = response
			.headers()
			.get(LOCATION)
			.ok_or_else(redirect_error)?
			.to_str()
			.map_err(|_| redirect_error())?
			.trim();

		if location.is_empty() {
			return Err(redirect_error());
		}

		let resolved = request_url.join(location).map_err(|_| redirect_error())?;

		#[cfg(feature = "tracing")]
		tracing::debug!(location = %resolved, "Intercepted terminal redirect.");

		Ok(Some(FlowResult::new(location, resolved)))
	}
}
