//! HTML browser-emulation flow.
//!
//! The provider's login pages are walked the way a browser would: fetch the authorization
//! page, submit the username form when the provider shows one, then submit the challenge
//! form. The `302` answering the challenge form carries the authorization code.

// crates.io
use oauth2::{HttpResponse, http::StatusCode};
// self
use crate::{
	_prelude::*,
	flows::{
		FlowStage, FlowState,
		common::{self, ACCEPT_HTML, Attempt, StepResponse},
	},
	html::{self, HtmlForm},
	http::{LoginHttpClient, TransportErrorMapper},
	redirect::FlowResult,
};

/// Steps of the local flow; each one owns the input it needs.
#[derive(Debug)]
enum LocalStep {
	RequestLoginPage,
	SubmitUsername(HtmlForm),
	SubmitChallenge(HtmlForm),
	Done(FlowResult),
}

pub(crate) async fn run<C, M>(attempt: &Attempt<'_, C, M>) -> Result<FlowResult>
where
	C: ?Sized + LoginHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let mut step = LocalStep::RequestLoginPage;

	loop {
		step = match step {
			LocalStep::RequestLoginPage => request_login_page(attempt).await?,
			LocalStep::SubmitUsername(form) => submit_username(attempt, form).await?,
			LocalStep::SubmitChallenge(form) => submit_challenge(attempt, form).await?,
			LocalStep::Done(result) => return Ok(result),
		};
	}
}

async fn request_login_page<C, M>(attempt: &Attempt<'_, C, M>) -> Result<LocalStep>
where
	C: ?Sized + LoginHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let config = attempt.config();
	let url = common::authorize_url(config, attempt.request);
	let request = common::get(&url, ACCEPT_HTML)?;
	let (url, response) = match attempt.send(FlowStage::Authorize, url, request).await? {
		StepResponse::Redirected(result) => return Ok(LocalStep::Done(result)),
		StepResponse::Page { url, response } => (url, response),
	};

	attempt.record(FlowState::RequestedChallenge);
	reject_provider_error(attempt, &response)?;

	let (form_id, form) = html::extract_first_form(
		response.body(),
		&url,
		&[config.forms.challenge.as_str(), config.forms.login.as_str()],
	)?;

	Ok(if form_id == config.forms.login {
		LocalStep::SubmitUsername(form)
	} else {
		LocalStep::SubmitChallenge(form)
	})
}

async fn submit_username<C, M>(attempt: &Attempt<'_, C, M>, form: HtmlForm) -> Result<LocalStep>
where
	C: ?Sized + LoginHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let config = attempt.config();
	let request =
		common::post_form(&form.action_url, ACCEPT_HTML, [("username", config.username.as_str())])?;
	let (url, response) =
		match attempt.send(FlowStage::SubmitUsername, form.action_url, request).await? {
			StepResponse::Redirected(result) => return Ok(LocalStep::Done(result)),
			StepResponse::Page { url, response } => (url, response),
		};

	attempt.record(FlowState::FormSubmitted);

	if response.status() != StatusCode::OK {
		return Err(Error::UsernameSubmit { status: response.status().as_u16() });
	}

	let form = html::extract_form(response.body(), &url, &config.forms.challenge)?;

	Ok(LocalStep::SubmitChallenge(form))
}

async fn submit_challenge<C, M>(attempt: &Attempt<'_, C, M>, form: HtmlForm) -> Result<LocalStep>
where
	C: ?Sized + LoginHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let config = attempt.config();
	let challenge_data = form.challenge_context.as_deref().unwrap_or(&config.local_challenge_data);
	let request = common::post_form(
		&form.action_url,
		ACCEPT_HTML,
		[("challenge_data", challenge_data), ("username", config.username.as_str())],
	)?;
	let response = attempt.send(FlowStage::SubmitChallenge, form.action_url, request).await?;

	attempt.record(FlowState::ResponseSubmitted);

	match response {
		StepResponse::Redirected(result) => Ok(LocalStep::Done(result)),
		StepResponse::Page { response, .. } =>
			Err(Error::ChallengeSubmit { status: response.status().as_u16() }),
	}
}

/// Fails with the provider's own message when `response` is an error page.
fn reject_provider_error<C, M>(attempt: &Attempt<'_, C, M>, response: &HttpResponse) -> Result<()>
where
	C: ?Sized + LoginHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let status = response.status();

	if status.is_client_error() || status.is_server_error() {
		let reason =
			html::extract_error_message(response.body(), &attempt.config().forms.error_message);

		return Err(Error::ClientError { status: status.as_u16(), reason });
	}

	Ok(())
}
