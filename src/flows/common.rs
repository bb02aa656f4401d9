//! Shared plumbing for flow implementations: the per-attempt context, request builders, and
//! the single send path every step goes through.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest, HttpResponse,
	http::{
		Method,
		header::{ACCEPT, CONTENT_TYPE},
	},
};
use url::form_urlencoded::Serializer;
// self
use crate::{
	_prelude::*,
	auth::AuthRequest,
	config::LoginConfig,
	error::ConfigError,
	flows::{Authenticator, FlowStage, FlowState, FlowStateSlot},
	http::{LoginHttpClient, TransportErrorMapper},
	obs::AttemptSpan,
	redirect::{FlowResult, RedirectInterceptor},
};

/// `Accept` value sent when an HTML page is expected.
pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml";
/// `Accept` value sent when a JSON challenge resource is expected.
pub const ACCEPT_JSON: &str = "application/json";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Classified answer to one step request.
#[derive(Debug)]
pub enum StepResponse {
	/// The response was a terminal `302`; the attempt is over.
	Redirected(FlowResult),
	/// Any other response, with the URL it answered.
	Page {
		/// URL the request was sent to.
		url: Url,
		/// Raw response.
		response: HttpResponse,
	},
}

/// Context of one running attempt. Dropped with the attempt's future.
pub(crate) struct Attempt<'a, C, M>
where
	C: ?Sized + LoginHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) authenticator: &'a Authenticator<C, M>,
	pub(crate) request: &'a AuthRequest,
	session: C::Session,
	deadline: Option<Instant>,
	slot: &'a FlowStateSlot,
	span: &'a AttemptSpan,
}
impl<'a, C, M> Attempt<'a, C, M>
where
	C: ?Sized + LoginHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn new(
		authenticator: &'a Authenticator<C, M>,
		request: &'a AuthRequest,
		session: C::Session,
		deadline: Option<Instant>,
		slot: &'a FlowStateSlot,
		span: &'a AttemptSpan,
	) -> Self {
		Self { authenticator, request, session, deadline, slot, span }
	}

	pub(crate) fn config(&self) -> &LoginConfig {
		&self.authenticator.config
	}

	pub(crate) fn record(&self, state: FlowState) {
		self.slot.record(state);
	}

	fn check_deadline(&self, stage: FlowStage) -> Result<()> {
		match self.deadline {
			Some(deadline) if Instant::now() >= deadline => Err(Error::Timeout { stage }),
			_ => Ok(()),
		}
	}

	/// Sends `request` to `url` and classifies the answer.
	///
	/// The attempt deadline is checked before anything goes on the wire and again once the
	/// answer arrives; a late answer fails `stage` regardless of what it carries. Every response
	/// passes through [`RedirectInterceptor::inspect`] before the caller sees it.
	pub(crate) async fn send(
		&self,
		stage: FlowStage,
		url: Url,
		request: HttpRequest,
	) -> Result<StepResponse> {
		self.check_deadline(stage)?;
		self.span.enter_stage(stage);

		#[cfg(feature = "tracing")]
		tracing::debug!(
			stage = %stage,
			method = %request.method(),
			url = %url,
			"Sending login step."
		);

		let response = self
			.session
			.call(request)
			.await
			.map_err(|e| self.authenticator.transport_mapper.map_transport_error(stage, e))?;

		#[cfg(feature = "tracing")]
		tracing::debug!(
			stage = %stage,
			status = response.status().as_u16(),
			"Login step answered."
		);

		self.check_deadline(stage)?;

		Ok(match RedirectInterceptor.inspect(&url, &response)? {
			Some(result) => StepResponse::Redirected(result),
			None => StepResponse::Page { url, response },
		})
	}
}

/// Builds the outbound authorization URL for `request`.
///
/// Parameters already present on the configured endpoint are preserved; `state` is forwarded
/// when the inbound request carried one.
pub fn authorize_url(config: &LoginConfig, request: &AuthRequest) -> Url {
	let mut url = config.authorization_endpoint.clone();

	{
		let mut pairs = url.query_pairs_mut();

		pairs
			.append_pair("response_type", "code")
			.append_pair("client_id", &request.client_id)
			.append_pair("code_challenge_method", request.code_challenge_method.as_str())
			.append_pair("redirect_uri", request.redirect_uri.as_str())
			.append_pair("code_challenge", &request.code_challenge)
			.append_pair("scope", &request.scope);

		if let Some(state) = &request.state {
			pairs.append_pair("state", state);
		}
	}

	url
}

/// Builds a GET request for `url`.
pub fn get(url: &Url, accept: &str) -> Result<HttpRequest> {
	oauth2::http::Request::builder()
		.method(Method::GET)
		.uri(url.as_str())
		.header(ACCEPT, accept)
		.body(Vec::new())
		.map_err(|e| ConfigError::from(e).into())
}

/// Builds a form-encoded POST request for `url` with `pairs` as the body.
pub fn post_form<'p>(
	url: &Url,
	accept: &str,
	pairs: impl IntoIterator<Item = (&'p str, &'p str)>,
) -> Result<HttpRequest> {
	let body = Serializer::new(String::new()).extend_pairs(pairs).finish();

	oauth2::http::Request::builder()
		.method(Method::POST)
		.uri(url.as_str())
		.header(ACCEPT, accept)
		.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
		.body(body.into_bytes())
		.map_err(|e| ConfigError::from(e).into())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::StaticClientRegistry;

	fn config() -> LoginConfig {
		LoginConfig::builder()
			.authorization_endpoint(
				Url::parse("https://id.example/realms/health/auth?kc_idp_hint=local")
					.expect("Endpoint fixture should parse."),
			)
			.build()
			.expect("Config fixture should build.")
	}

	#[test]
	fn authorize_url_carries_pkce_parameters_in_order() {
		let request = AuthRequest::parse_str(
			"acmeauth://authorize?client_id=aua.example&redirect_uri=https://aua.example/cb\
			&code_challenge=abc&scope=openid%20profile&state=s1",
			&StaticClientRegistry::default(),
		)
		.expect("Request fixture should parse.");
		let url = authorize_url(&config(), &request);
		let names = url.query_pairs().map(|(name, _)| name.into_owned()).collect::<Vec<_>>();

		assert_eq!(
			names,
			[
				"kc_idp_hint",
				"response_type",
				"client_id",
				"code_challenge_method",
				"redirect_uri",
				"code_challenge",
				"scope",
				"state",
			]
		);
		assert!(url.as_str().contains("code_challenge_method=S256"));
		assert!(url.as_str().contains("redirect_uri=https%3A%2F%2Faua.example%2Fcb"));
	}

	#[test]
	fn form_posts_are_urlencoded() {
		let url = Url::parse("https://id.example/totp").expect("URL fixture should parse.");
		let request =
			post_form(&url, ACCEPT_HTML, [("challenge_data", "a b&c"), ("username", "user1")])
				.expect("Request should build.");

		assert_eq!(*request.method(), Method::POST);
		assert_eq!(request.headers()[CONTENT_TYPE], FORM_CONTENT_TYPE);
		assert_eq!(request.body().as_slice(), b"challenge_data=a+b%26c&username=user1");
	}
}
