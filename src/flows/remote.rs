//! JSON challenge-relay flow.
//!
//! The provider answers the authorization request with a [`ChallengeResource`] instead of an
//! HTML page. The relayed challenge replaces whatever the provider issued, the response is
//! posted to the resource's endpoint, and a final `finish` command exchanges the device code
//! for the authorization-code redirect.

// crates.io
use oauth2::{HttpResponse, http::StatusCode};
// self
use crate::{
	_prelude::*,
	flows::{
		FlowStage, FlowState,
		common::{self, ACCEPT_JSON, Attempt, StepResponse},
	},
	http::{LoginHttpClient, TransportErrorMapper},
	redirect::FlowResult,
};

const COMMAND_CHALLENGE_RESPONSE: &str = "challenge_response";
const COMMAND_FINISH: &str = "finish";

/// Challenge resource exchanged with the provider's relay endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeResource {
	/// Endpoint the next command is posted to; may be relative to the answering URL.
	pub endpoint: String,
	/// Challenge the device must answer.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub challenge: Option<String>,
	/// Device code exchanged by the `finish` command.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub device_code: Option<String>,
	/// Whether the provider considers the device authenticated.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub authenticated: Option<bool>,
}
impl ChallengeResource {
	/// Returns a copy whose challenge is `challenge`; endpoint and device code are untouched.
	pub fn with_challenge(mut self, challenge: impl Into<String>) -> Self {
		self.challenge = Some(challenge.into());

		self
	}

	/// Adopts `next` as the current resource while keeping the device code issued first.
	pub fn carry_forward(self, next: Self) -> Self {
		Self { device_code: self.device_code.or(next.device_code), ..next }
	}
}

/// Resource plus the absolute URL its endpoint resolved to.
#[derive(Debug)]
struct Relay {
	resource: ChallengeResource,
	endpoint: Url,
}
impl Relay {
	fn resolve(stage: FlowStage, base: &Url, resource: ChallengeResource) -> Result<Self> {
		let endpoint = base.join(resource.endpoint.trim()).map_err(|source| {
			Error::InvalidEndpoint { stage, endpoint: resource.endpoint.clone(), source }
		})?;

		Ok(Self { resource, endpoint })
	}
}

/// Steps of the relay flow; each one owns the state it needs.
#[derive(Debug)]
enum RemoteStep {
	RequestChallenge,
	ReplaceChallenge(Relay),
	SubmitResponse(Relay),
	Finish(Relay),
	Done(FlowResult),
}

pub(crate) async fn run<C, M>(
	attempt: &Attempt<'_, C, M>,
	authn_challenge: &str,
) -> Result<FlowResult>
where
	C: ?Sized + LoginHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let mut step = RemoteStep::RequestChallenge;

	loop {
		step = match step {
			RemoteStep::RequestChallenge => request_challenge(attempt).await?,
			RemoteStep::ReplaceChallenge(relay) => {
				attempt.record(FlowState::ChallengeReplaced);

				RemoteStep::SubmitResponse(Relay {
					resource: relay.resource.with_challenge(authn_challenge),
					endpoint: relay.endpoint,
				})
			},
			RemoteStep::SubmitResponse(relay) => submit_response(attempt, relay).await?,
			RemoteStep::Finish(relay) => finish(attempt, relay).await?,
			RemoteStep::Done(result) => return Ok(result),
		};
	}
}

async fn request_challenge<C, M>(attempt: &Attempt<'_, C, M>) -> Result<RemoteStep>
where
	C: ?Sized + LoginHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let stage = FlowStage::Authorize;
	let url = common::authorize_url(attempt.config(), attempt.request);
	let request = common::get(&url, ACCEPT_JSON)?;
	let (url, response) = match attempt.send(stage, url, request).await? {
		StepResponse::Redirected(result) => return Ok(RemoteStep::Done(result)),
		StepResponse::Page { url, response } => (url, response),
	};

	attempt.record(FlowState::RequestedChallenge);

	let resource = decode(stage, &response)?;

	Ok(RemoteStep::ReplaceChallenge(Relay::resolve(stage, &url, resource)?))
}

async fn submit_response<C, M>(attempt: &Attempt<'_, C, M>, relay: Relay) -> Result<RemoteStep>
where
	C: ?Sized + LoginHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let stage = FlowStage::ChallengeResponse;
	let challenge = relay
		.resource
		.challenge
		.clone()
		.ok_or(Error::IncompleteChallenge { stage, field: "challenge" })?;
	let signature = match &attempt.authenticator.signer {
		Some(signer) => signer.sign(&challenge).await?.signed_nonce,
		None => challenge.clone(),
	};
	let request = common::post_form(
		&relay.endpoint,
		ACCEPT_JSON,
		[
			("command", COMMAND_CHALLENGE_RESPONSE),
			("signature", signature.as_str()),
			("challenge_data", challenge.as_str()),
			("username", attempt.config().username.as_str()),
		],
	)?;
	let (url, response) = match attempt.send(stage, relay.endpoint, request).await? {
		StepResponse::Redirected(result) => return Ok(RemoteStep::Done(result)),
		StepResponse::Page { url, response } => (url, response),
	};

	attempt.record(FlowState::ResponseSubmitted);

	let next = relay.resource.carry_forward(decode(stage, &response)?);

	Ok(RemoteStep::Finish(Relay::resolve(stage, &url, next)?))
}

async fn finish<C, M>(attempt: &Attempt<'_, C, M>, relay: Relay) -> Result<RemoteStep>
where
	C: ?Sized + LoginHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let stage = FlowStage::Finish;
	let device_code = relay
		.resource
		.device_code
		.as_deref()
		.ok_or(Error::IncompleteChallenge { stage, field: "device_code" })?;
	let request = common::post_form(
		&relay.endpoint,
		ACCEPT_JSON,
		[("command", COMMAND_FINISH), ("device_code", device_code)],
	)?;

	match attempt.send(stage, relay.endpoint, request).await? {
		StepResponse::Redirected(result) => Ok(RemoteStep::Done(result)),
		StepResponse::Page { response, .. } =>
			Err(Error::ChallengeResponse { stage, status: response.status().as_u16() }),
	}
}

fn decode(stage: FlowStage, response: &HttpResponse) -> Result<ChallengeResource> {
	if response.status() != StatusCode::OK {
		return Err(Error::ChallengeResponse { stage, status: response.status().as_u16() });
	}

	let mut de = serde_json::Deserializer::from_slice(response.body());

	serde_path_to_error::deserialize(&mut de)
		.map_err(|source| Error::MalformedChallenge { stage, source })
}
