//! Browser-less OpenID Connect login driver: parse a deep-linked authorization request, walk the
//! identity provider's login pages (or its JSON challenge relay) with one isolated HTTP session,
//! and hand back the captured authorization-code redirect instead of following it.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod flows;
pub mod html;
pub mod http;
pub mod obs;
pub mod redirect;
pub mod signer;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// self
	use crate::auth::{ClientMetadata, StaticClientRegistry};
	#[cfg(feature = "reqwest")]
	use crate::{
		config::LoginConfig,
		flows::Authenticator,
		http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
	};

	/// Authenticator type alias used by reqwest-backed tests.
	#[cfg(feature = "reqwest")]
	pub type ReqwestTestAuthenticator =
		Authenticator<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Builds a reqwest session factory that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		ReqwestHttpClient::default().danger_accept_invalid_certs(true)
	}

	/// Constructs an [`Authenticator`] for `config` backed by the insecure test transport.
	#[cfg(feature = "reqwest")]
	pub fn build_reqwest_test_authenticator(config: LoginConfig) -> ReqwestTestAuthenticator {
		Authenticator::with_http_client(
			config,
			test_reqwest_http_client(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}

	/// Registry holding the single `aua.example` client used across tests.
	pub fn test_registry() -> StaticClientRegistry {
		[ClientMetadata::new(
			"aua.example",
			"Aua.App: Pain Diary",
			Some(Url::parse("https://aua.example/icon.png").expect("Icon fixture should parse.")),
		)]
		.into_iter()
		.collect()
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::{Duration as StdDuration, Instant},
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tokio as _};
