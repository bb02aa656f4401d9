#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use oidc_headless::{
	_preludet::build_reqwest_test_authenticator,
	auth::{AuthRequest, ClientMetadata, StaticClientRegistry},
	config::LoginConfig,
	error::{Error, ErrorKind},
	flows::{FlowState, FlowStateSlot, ReqwestAuthenticator},
	url::Url,
};

const DEEP_LINK: &str = "acmeauth://authorize?response_type=code&client_id=aua.example\
	&redirect_uri=https%3A%2F%2Faua.example%2Flogin\
	&code_challenge=E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM\
	&code_challenge_method=S256&scope=openid%20profile&state=s1";

fn registry() -> StaticClientRegistry {
	StaticClientRegistry::from_iter([ClientMetadata::new(
		"aua.example",
		"Aua.App: Pain Diary",
		None,
	)])
}

fn authenticator(server: &MockServer) -> ReqwestAuthenticator {
	let config = LoginConfig::builder()
		.authorization_endpoint(
			Url::parse(&server.url("/realms/health/protocol/openid-connect/auth"))
				.expect("Mock authorization endpoint should parse successfully."),
		)
		.local_challenge_data("123456")
		.build()
		.expect("Login config should build for the mock provider.");

	build_reqwest_test_authenticator(config)
}

fn request() -> AuthRequest {
	AuthRequest::parse_str(DEEP_LINK, &registry()).expect("Deep link fixture should parse.")
}

fn username_page(action: &str) -> String {
	format!(r#"<form id="kc-form-login" action="{action}"></form>"#)
}

fn totp_page(action: &str) -> String {
	format!(
		r#"<!doctype html><html><body>
		<form id="kc-totp-login-form" action="{action}" method="post">
			<input type="text" name="otp"><input type="submit" value="Sign in">
		</form></body></html>"#
	)
}

#[tokio::test]
async fn totp_form_submission_captures_the_code_redirect() {
	let server = MockServer::start_async().await;
	let authorize = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/realms/health/protocol/openid-connect/auth")
				.query_param("response_type", "code")
				.query_param("client_id", "aua.example")
				.query_param("code_challenge_method", "S256")
				.query_param("state", "s1");
			then.status(200)
				.header("content-type", "text/html")
				.body(totp_page("/realms/health/login-actions/authenticate?execution=otp"));
		})
		.await;
	let submit = server
		.mock_async(|when, then| {
			when.method(POST).path("/realms/health/login-actions/authenticate");
			then.status(302).header("Location", "https://aua.example/login?code=abc&state=s1");
		})
		.await;
	let slot = FlowStateSlot::default();
	let result = authenticator(&server)
		.authenticate_observed(&request(), &slot)
		.await
		.expect("TOTP submission should end in the code redirect.");

	authorize.assert_async().await;
	submit.assert_async().await;

	assert_eq!(result.location().as_str(), "https://aua.example/login?code=abc&state=s1");
	assert_eq!(result.code().as_deref(), Some("abc"));
	assert_eq!(result.state().as_deref(), Some("s1"));
	assert_eq!(
		slot.history(),
		[
			FlowState::Init,
			FlowState::RequestedChallenge,
			FlowState::ResponseSubmitted,
			FlowState::Completed,
		]
	);
}

#[tokio::test]
async fn provider_error_page_surfaces_its_reason() {
	let server = MockServer::start_async().await;
	let authorize = server
		.mock_async(|when, then| {
			when.method(GET).path("/realms/health/protocol/openid-connect/auth");
			then.status(400).header("content-type", "text/html").body(
				r#"<html><body>
				<div id="kc-error-message"><p>Invalid client</p></div>
				</body></html>"#,
			);
		})
		.await;
	let slot = FlowStateSlot::default();
	let err = authenticator(&server)
		.authenticate_observed(&request(), &slot)
		.await
		.expect_err("Provider error pages should fail the attempt.");

	authorize.assert_async().await;

	assert!(matches!(
		&err,
		Error::ClientError { status: 400, reason } if reason == "Invalid client"
	));
	assert_eq!(err.kind(), ErrorKind::ClientError);
	assert_eq!(err.user_message(), "Invalid client");
	assert_eq!(slot.current(), Some(FlowState::Failed));
}

#[tokio::test]
async fn username_form_precedes_the_challenge_form() {
	let server = MockServer::start_async().await;
	let authorize = server
		.mock_async(|when, then| {
			when.method(GET).path("/realms/health/protocol/openid-connect/auth");
			then.status(200)
				.header("content-type", "text/html")
				.body(username_page("/realms/health/login-actions/username"));
		})
		.await;
	let username = server
		.mock_async(|when, then| {
			when.method(POST).path("/realms/health/login-actions/username");
			then.status(200).header("content-type", "text/html").body(totp_page("totp"));
		})
		.await;
	let totp = server
		.mock_async(|when, then| {
			when.method(POST).path("/realms/health/login-actions/totp");
			then.status(302).header("Location", "https://aua.example/login?code=def");
		})
		.await;
	let slot = FlowStateSlot::default();
	let result = authenticator(&server)
		.authenticate_observed(&request(), &slot)
		.await
		.expect("Username then TOTP submission should succeed.");

	authorize.assert_async().await;
	username.assert_async().await;
	totp.assert_async().await;

	assert_eq!(result.code().as_deref(), Some("def"));
	assert_eq!(
		slot.history(),
		[
			FlowState::Init,
			FlowState::RequestedChallenge,
			FlowState::FormSubmitted,
			FlowState::ResponseSubmitted,
			FlowState::Completed,
		]
	);
}

#[tokio::test]
async fn challenge_submission_without_redirect_fails() {
	let server = MockServer::start_async().await;
	let _authorize = server
		.mock_async(|when, then| {
			when.method(GET).path("/realms/health/protocol/openid-connect/auth");
			then.status(200).header("content-type", "text/html").body(totp_page("/totp"));
		})
		.await;
	let submit = server
		.mock_async(|when, then| {
			when.method(POST).path("/totp");
			then.status(200).header("content-type", "text/html").body(totp_page("/totp"));
		})
		.await;
	let err = authenticator(&server)
		.authenticate(&request())
		.await
		.expect_err("A challenge page answered with 200 should fail.");

	submit.assert_async().await;

	assert!(matches!(err, Error::ChallengeSubmit { status: 200 }));
	assert_eq!(err.user_message(), "Authentication failed.");
}

#[tokio::test]
async fn redirect_without_location_is_a_redirect_error() {
	let server = MockServer::start_async().await;
	let _authorize = server
		.mock_async(|when, then| {
			when.method(GET).path("/realms/health/protocol/openid-connect/auth");
			then.status(200).header("content-type", "text/html").body(totp_page("/totp"));
		})
		.await;
	let submit = server
		.mock_async(|when, then| {
			when.method(POST).path("/totp");
			then.status(302);
		})
		.await;
	let err = authenticator(&server)
		.authenticate(&request())
		.await
		.expect_err("A 302 without Location should fail.");

	submit.assert_async().await;

	assert!(matches!(err, Error::Redirect { status: 302 }));
	assert_eq!(err.kind(), ErrorKind::Redirect);
}

#[tokio::test]
async fn page_without_the_expected_form_is_a_parse_error() {
	let server = MockServer::start_async().await;
	let authorize = server
		.mock_async(|when, then| {
			when.method(GET).path("/realms/health/protocol/openid-connect/auth");
			then.status(200)
				.header("content-type", "text/html")
				.body("<html><body>Maintenance</body></html>");
		})
		.await;
	let err = authenticator(&server)
		.authenticate(&request())
		.await
		.expect_err("A page without a login form should fail.");

	authorize.assert_async().await;

	assert!(matches!(&err, Error::FormParse { form_id } if form_id == "kc-totp-login-form"));
	assert_eq!(err.kind(), ErrorKind::FormParse);
}
