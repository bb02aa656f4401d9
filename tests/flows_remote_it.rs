#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use oidc_headless::{
	_preludet::build_reqwest_test_authenticator,
	auth::{AuthRequest, StaticClientRegistry},
	config::LoginConfig,
	error::{Error, ErrorKind},
	flows::{FlowStage, FlowState, FlowStateSlot, ReqwestAuthenticator},
	url::Url,
};

const DEEP_LINK: &str = "acmeauth://authorize?client_id=aua.example\
	&redirect_uri=https%3A%2F%2Faua.example%2Flogin\
	&code_challenge=E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM\
	&scope=openid&authn_challenge=sig123";

fn authenticator(server: &MockServer) -> ReqwestAuthenticator {
	let config = LoginConfig::builder()
		.authorization_endpoint(
			Url::parse(&server.url("/realms/health/protocol/openid-connect/auth"))
				.expect("Mock authorization endpoint should parse successfully."),
		)
		.build()
		.expect("Login config should build for the mock provider.");

	build_reqwest_test_authenticator(config)
}

fn request() -> AuthRequest {
	AuthRequest::parse_str(DEEP_LINK, &StaticClientRegistry::default())
		.expect("Deep link fixture should parse.")
}

#[tokio::test]
async fn relay_flow_finishes_with_the_code_redirect() {
	let server = MockServer::start_async().await;
	let authorize = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/realms/health/protocol/openid-connect/auth")
				.query_param("client_id", "aua.example");
			then.status(200).header("content-type", "application/json").body(format!(
				r#"{{"endpoint":"{}","challenge":"server-nonce","device_code":"dc-1"}}"#,
				server.url("/realms/health/device/challenge")
			));
		})
		.await;
	let challenge = server
		.mock_async(|when, then| {
			when.method(POST).path("/realms/health/device/challenge");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"endpoint":"finish","authenticated":true}"#);
		})
		.await;
	let finish = server
		.mock_async(|when, then| {
			when.method(POST).path("/realms/health/device/finish");
			then.status(302).header("Location", "https://aua.example/login?code=relay-code");
		})
		.await;
	let slot = FlowStateSlot::default();
	let result = authenticator(&server)
		.authenticate_observed(&request(), &slot)
		.await
		.expect("Relay flow should end in the code redirect.");

	authorize.assert_async().await;
	challenge.assert_async().await;
	finish.assert_async().await;

	assert_eq!(result.code().as_deref(), Some("relay-code"));
	assert_eq!(
		slot.history(),
		[
			FlowState::Init,
			FlowState::RequestedChallenge,
			FlowState::ChallengeReplaced,
			FlowState::ResponseSubmitted,
			FlowState::Completed,
		]
	);
}

#[tokio::test]
async fn non_success_challenge_status_fails_the_attempt() {
	let server = MockServer::start_async().await;
	let authorize = server
		.mock_async(|when, then| {
			when.method(GET).path("/realms/health/protocol/openid-connect/auth");
			then.status(503).body("unavailable");
		})
		.await;
	let err = authenticator(&server)
		.authenticate(&request())
		.await
		.expect_err("A 503 challenge response should fail.");

	authorize.assert_async().await;

	assert!(matches!(err, Error::ChallengeResponse { stage: FlowStage::Authorize, status: 503 }));
	assert_eq!(err.kind(), ErrorKind::ChallengeResponse);
	assert_eq!(err.user_message(), "Authentication failed.");
}

#[tokio::test]
async fn finish_without_redirect_fails() {
	let server = MockServer::start_async().await;
	let _authorize = server
		.mock_async(|when, then| {
			when.method(GET).path("/realms/health/protocol/openid-connect/auth");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"endpoint":"/device","device_code":"dc-9"}"#);
		})
		.await;
	let device = server
		.mock_async(|when, then| {
			when.method(POST).path("/device");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"endpoint":"/device/finish"}"#);
		})
		.await;
	let finish = server
		.mock_async(|when, then| {
			when.method(POST).path("/device/finish");
			then.status(200).header("content-type", "application/json").body("{}");
		})
		.await;
	let err = authenticator(&server)
		.authenticate(&request())
		.await
		.expect_err("A finish answered with 200 should fail.");

	device.assert_async().await;
	finish.assert_async().await;

	assert!(matches!(err, Error::ChallengeResponse { stage: FlowStage::Finish, status: 200 }));
}
