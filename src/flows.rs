//! Login orchestration: one isolated session per attempt, one explicit state machine per flow
//! variant.
//!
//! [`Authenticator::authenticate`] selects the [`FlowVariant`] once from the request, opens a
//! fresh session, and then walks the variant's steps strictly in order. Every step classifies
//! its response before the next request is built; a `302` with `Location` anywhere ends the
//! attempt with a [`FlowResult`]. Dropping the returned future cancels the attempt and drops
//! its session; no request is issued after that point.

pub mod common;
mod local;
mod remote;

pub use remote::ChallengeResource;

// self
use crate::{
	_prelude::*,
	auth::AuthRequest,
	config::LoginConfig,
	flows::common::Attempt,
	http::{LoginHttpClient, TransportErrorMapper},
	obs::{self, AttemptSpan, FlowKind, FlowOutcome},
	signer::ChallengeSigner,
};
pub use crate::redirect::FlowResult;
#[cfg(feature = "reqwest")]
use crate::http::{ReqwestHttpClient, ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Authenticator specialized for the crate's default reqwest transport stack.
pub type ReqwestAuthenticator = Authenticator<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Flow variant chosen once per attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowVariant<'a> {
	/// HTML browser-emulation flow (no relayed challenge).
	Local,
	/// JSON challenge-relay flow driven by a relayed challenge.
	Remote {
		/// Challenge relayed through the inbound request.
		authn_challenge: &'a str,
	},
}
impl<'a> FlowVariant<'a> {
	/// Selects the variant from the presence of `authn_challenge`.
	pub fn select(request: &'a AuthRequest) -> Self {
		match request.authn_challenge.as_deref() {
			Some(authn_challenge) => Self::Remote { authn_challenge },
			None => Self::Local,
		}
	}

	/// Observability label for the variant.
	pub fn kind(&self) -> FlowKind {
		match self {
			Self::Local => FlowKind::LocalBrowser,
			Self::Remote { .. } => FlowKind::RemoteRelay,
		}
	}
}

/// Network-facing steps, used to label errors and log events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowStage {
	/// Authorization endpoint GET.
	Authorize,
	/// Username form POST (local flow).
	SubmitUsername,
	/// Challenge form POST (local flow).
	SubmitChallenge,
	/// Challenge-response POST (remote flow).
	ChallengeResponse,
	/// Finish POST (remote flow).
	Finish,
}
impl FlowStage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowStage::Authorize => "authorize",
			FlowStage::SubmitUsername => "submit_username",
			FlowStage::SubmitChallenge => "submit_challenge",
			FlowStage::ChallengeResponse => "challenge_response",
			FlowStage::Finish => "finish",
		}
	}
}
impl Display for FlowStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// States an attempt moves through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowState {
	/// Session opened, nothing sent yet.
	Init,
	/// Authorization endpoint answered.
	RequestedChallenge,
	/// Username form answered (local flow).
	FormSubmitted,
	/// Relayed challenge installed (remote flow).
	ChallengeReplaced,
	/// Challenge response answered.
	ResponseSubmitted,
	/// Redirect captured.
	Completed,
	/// Attempt failed.
	Failed,
}

/// Records the state transitions of one attempt for progress reporting.
#[derive(Clone, Debug, Default)]
pub struct FlowStateSlot(Arc<Mutex<Vec<FlowState>>>);
impl FlowStateSlot {
	/// Most recent state, if an attempt has started.
	pub fn current(&self) -> Option<FlowState> {
		self.0.lock().last().copied()
	}

	/// Every state observed by the current attempt, in order.
	pub fn history(&self) -> Vec<FlowState> {
		self.0.lock().clone()
	}

	pub(crate) fn begin(&self) {
		let mut states = self.0.lock();

		states.clear();
		states.push(FlowState::Init);
	}

	pub(crate) fn record(&self, state: FlowState) {
		self.0.lock().push(state);
	}
}

/// Drives login attempts against a single identity provider.
///
/// The authenticator holds only immutable configuration and factories; every call to
/// [`authenticate`](Self::authenticate) opens its own session, so independent attempts can
/// run concurrently without sharing cookies or connections.
#[derive(Clone)]
pub struct Authenticator<C, M>
where
	C: ?Sized + LoginHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Session factory used for every attempt.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Endpoint, account, and page configuration.
	pub config: LoginConfig,
	/// Optional device-key signer for the remote flow.
	pub signer: Option<ChallengeSigner>,
}
impl<C, M> Authenticator<C, M>
where
	C: ?Sized + LoginHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates an authenticator that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		config: LoginConfig,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			config,
			signer: None,
		}
	}

	/// Signs relayed challenges with `signer` before submitting them.
	pub fn with_signer(mut self, signer: ChallengeSigner) -> Self {
		self.signer = Some(signer);

		self
	}

	/// Runs one attempt for `request` and returns the captured redirect.
	pub async fn authenticate(&self, request: &AuthRequest) -> Result<FlowResult> {
		self.authenticate_observed(request, &FlowStateSlot::default()).await
	}

	/// Like [`authenticate`](Self::authenticate), recording state transitions into `slot`.
	pub async fn authenticate_observed(
		&self,
		request: &AuthRequest,
		slot: &FlowStateSlot,
	) -> Result<FlowResult> {
		let variant = FlowVariant::select(request);
		let kind = variant.kind();
		let span = AttemptSpan::new(kind, &request.client_id);

		obs::record_attempt_outcome(kind, FlowOutcome::Attempt);
		slot.begin();

		let result = span.instrument(self.run_attempt(request, variant, slot, &span)).await;

		match &result {
			Ok(_) => {
				slot.record(FlowState::Completed);
				obs::record_attempt_outcome(kind, FlowOutcome::Success);
			},
			Err(e) => {
				#[cfg(feature = "tracing")]
				tracing::warn!(flow = %kind, error = %e, kind = %e.kind(), "Login attempt failed.");

				slot.record(FlowState::Failed);
				obs::record_attempt_outcome(kind, FlowOutcome::Failure);
				obs::record_attempt_failure(kind, e.kind());
			},
		}

		result
	}

	async fn run_attempt(
		&self,
		request: &AuthRequest,
		variant: FlowVariant<'_>,
		slot: &FlowStateSlot,
		span: &AttemptSpan,
	) -> Result<FlowResult> {
		let deadline = Instant::now().checked_add(self.config.attempt_timeout);
		// The session lives exactly as long as this future.
		let session = self.http_client.open_session(deadline)?;
		let attempt = Attempt::new(self, request, session, deadline, slot, span);

		match variant {
			FlowVariant::Local => local::run(&attempt).await,
			FlowVariant::Remote { authn_challenge } => remote::run(&attempt, authn_challenge).await,
		}
	}
}
#[cfg(feature = "reqwest")]
impl Authenticator<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a new authenticator backed by the default reqwest session factory.
	pub fn new(config: LoginConfig) -> Self {
		Self::with_http_client(
			config,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Debug for Authenticator<C, M>
where
	C: ?Sized + LoginHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Authenticator")
			.field("config", &self.config)
			.field("signer_set", &self.signer.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::test_registry;

	const LOCAL: &str = "acmeauth://authorize?client_id=aua.example\
		&redirect_uri=https://aua.example/cb&code_challenge=c&scope=openid";

	#[test]
	fn variant_follows_the_relayed_challenge() {
		let registry = test_registry();
		let local = AuthRequest::parse_str(LOCAL, &registry).expect("Local request should parse.");
		let remote = AuthRequest::parse_str(&format!("{LOCAL}&authn_challenge=sig"), &registry)
			.expect("Remote request should parse.");

		assert_eq!(FlowVariant::select(&local), FlowVariant::Local);
		assert_eq!(FlowVariant::select(&remote), FlowVariant::Remote { authn_challenge: "sig" });
		assert_eq!(FlowVariant::select(&remote).kind().as_str(), "remote_relay");
	}

	#[test]
	fn state_slot_restarts_per_attempt() {
		let slot = FlowStateSlot::default();

		assert!(slot.current().is_none());

		slot.begin();
		slot.record(FlowState::RequestedChallenge);
		slot.begin();

		assert_eq!(slot.history(), [FlowState::Init]);
	}

	#[cfg(feature = "reqwest")]
	#[tokio::test]
	async fn redirect_on_the_authorization_request_ends_the_attempt() {
		// crates.io
		use httpmock::prelude::*;
		// self
		use crate::_preludet::build_reqwest_test_authenticator;

		let server = MockServer::start_async().await;
		let mock = server
			.mock_async(|when, then| {
				when.method(GET).path("/auth").query_param("response_type", "code");
				then.status(302).header("Location", "https://aua.example/cb?code=early");
			})
			.await;
		let config = LoginConfig::builder()
			.authorization_endpoint(
				Url::parse(&server.url("/auth")).expect("Mock endpoint should parse."),
			)
			.build()
			.expect("Config should build.");
		let authenticator = build_reqwest_test_authenticator(config);
		let request =
			AuthRequest::parse_str(LOCAL, &test_registry()).expect("Request should parse.");
		let slot = FlowStateSlot::default();
		let result = authenticator
			.authenticate_observed(&request, &slot)
			.await
			.expect("Redirect should complete the attempt.");

		mock.assert_async().await;

		assert_eq!(result.code().as_deref(), Some("early"));
		assert_eq!(slot.history(), [FlowState::Init, FlowState::Completed]);
	}
}
