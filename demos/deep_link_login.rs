//! Drives a full local login against a mocked identity provider: build a PKCE deep link the way
//! a client app would, parse it, walk the TOTP page, and print the captured code redirect.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use oidc_headless::{
	auth::{AuthRequest, ClientMetadata, PkcePair, StaticClientRegistry},
	config::LoginConfig,
	flows::{Authenticator, FlowStateSlot, ReqwestAuthenticator},
	http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let authorize_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/realms/demo/protocol/openid-connect/auth");
			then.status(200).header("content-type", "text/html").body(
				r#"<form id="kc-totp-login-form" action="/realms/demo/login-actions/authenticate">
					<input type="hidden" name="challenge" value="demo-nonce"></form>"#,
			);
		})
		.await;
	let submit_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/realms/demo/login-actions/authenticate");
			then.status(302)
				.header("Location", "https://notes.example/callback?code=demo-code&state=s-42");
		})
		.await;
	let registry = StaticClientRegistry::from_iter([ClientMetadata::new(
		"notes.example",
		"Notes",
		Some(Url::parse("https://notes.example/icon.png")?),
	)]);
	let pkce = PkcePair::generate();
	let deep_link = Url::parse_with_params(
		"acmeauth://authorize",
		[
			("response_type", "code"),
			("client_id", "notes.example"),
			("redirect_uri", "https://notes.example/callback"),
			("code_challenge", pkce.challenge.as_str()),
			("code_challenge_method", pkce.method.as_str()),
			("scope", "openid profile"),
			("state", "s-42"),
		],
	)?;
	let request = AuthRequest::parse(&deep_link, &registry)?;

	println!("Signing in to {}.", request.display_metadata().display_name);

	let config = LoginConfig::builder()
		.authorization_endpoint(Url::parse(
			&server.url("/realms/demo/protocol/openid-connect/auth"),
		)?)
		.username("demo-user")
		.build()?;
	let authenticator: ReqwestAuthenticator = Authenticator::with_http_client(
		config,
		ReqwestHttpClient::default().with_user_agent("oidc-headless-demo"),
		Arc::new(ReqwestTransportErrorMapper),
	);
	let slot = FlowStateSlot::default();
	let result = authenticator.authenticate_observed(&request, &slot).await?;

	println!("States: {:?}.", slot.history());
	println!("Captured redirect: {result}.");
	println!("Exchange code {:?} with verifier {}.", result.code(), pkce.verifier);

	authorize_mock.assert_async().await;
	submit_mock.assert_async().await;

	Ok(())
}
