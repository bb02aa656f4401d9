//! Parsing of deep-linked authorization requests into typed [`AuthRequest`] values.

// std
use std::borrow::Cow;
// self
use crate::{
	_prelude::*,
	auth::{ClientMetadata, ClientMetadataRegistry, PkceCodeChallengeMethod},
};

const CLIENT_ID: &str = "client_id";
const REDIRECT_URI: &str = "redirect_uri";
const CODE_CHALLENGE: &str = "code_challenge";
const CODE_CHALLENGE_METHOD: &str = "code_challenge_method";
const SCOPE: &str = "scope";
const AUTHN_CHALLENGE: &str = "authn_challenge";
const STATE: &str = "state";

/// Validated authorization request received through a deep link.
///
/// Values are immutable once parsed and live for exactly one authentication attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthRequest {
	/// Inbound URL the request was parsed from.
	pub url: Url,
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// Absolute redirect URI registered by the client.
	pub redirect_uri: Url,
	/// PKCE challenge computed by the client.
	pub code_challenge: String,
	/// PKCE challenge method (always `S256`).
	pub code_challenge_method: PkceCodeChallengeMethod,
	/// Space-delimited scope string, forwarded verbatim.
	pub scope: String,
	/// Relayed challenge; its presence selects the remote challenge-relay flow.
	pub authn_challenge: Option<String>,
	/// Opaque client state forwarded to the authorization endpoint when present.
	pub state: Option<String>,
	/// Display metadata resolved from the registry; `None` for unknown clients.
	pub client_metadata: Option<ClientMetadata>,
}
impl AuthRequest {
	/// Parses and validates `url`, resolving client metadata through `registry`.
	///
	/// Required parameters are checked in the order `client_id`, `redirect_uri`,
	/// `code_challenge`, `scope`; the first absent (or empty) one is reported through
	/// [`Error::MissingParameter`]. Parameter names match case-insensitively.
	pub fn parse(url: &Url, registry: &dyn ClientMetadataRegistry) -> Result<Self> {
		#[cfg(feature = "tracing")]
		tracing::debug!(url = %url, "Parsing inbound authorization request.");

		let client_id = required(url, CLIENT_ID)?;
		let redirect_uri = required(url, REDIRECT_URI)?;
		let code_challenge = required(url, CODE_CHALLENGE)?;
		let scope = required(url, SCOPE)?;
		let redirect_uri = Url::parse(&redirect_uri).map_err(|e| Error::InvalidParameter {
			name: REDIRECT_URI,
			reason: e.to_string(),
		})?;
		let code_challenge_method = match param(url, CODE_CHALLENGE_METHOD) {
			Some(method) => method
				.parse()
				.map_err(|reason| Error::InvalidParameter { name: CODE_CHALLENGE_METHOD, reason })?,
			None => PkceCodeChallengeMethod::S256,
		};
		let client_metadata = registry.lookup(&client_id);

		Ok(Self {
			url: url.clone(),
			client_id,
			redirect_uri,
			code_challenge,
			code_challenge_method,
			scope,
			authn_challenge: optional(url, AUTHN_CHALLENGE),
			state: optional(url, STATE),
			client_metadata,
		})
	}

	/// Parses a raw URL string; see [`AuthRequest::parse`].
	pub fn parse_str(raw: &str, registry: &dyn ClientMetadataRegistry) -> Result<Self> {
		let url = Url::parse(raw)
			.map_err(|e| Error::InvalidParameter { name: "url", reason: e.to_string() })?;

		Self::parse(&url, registry)
	}

	/// Returns true when `url` parses into a valid request.
	pub fn accepts(url: &Url, registry: &dyn ClientMetadataRegistry) -> bool {
		Self::parse(url, registry).is_ok()
	}

	/// Resolved metadata, or a placeholder naming the unknown client.
	pub fn display_metadata(&self) -> Cow<'_, ClientMetadata> {
		match &self.client_metadata {
			Some(metadata) => Cow::Borrowed(metadata),
			None => Cow::Owned(ClientMetadata::placeholder(&self.client_id)),
		}
	}

	/// Iterator over the individual scope values.
	pub fn scopes(&self) -> impl Iterator<Item = &str> {
		self.scope.split_whitespace()
	}
}

fn param<'a>(url: &'a Url, name: &str) -> Option<Cow<'a, str>> {
	url.query_pairs().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, value)| value)
}

fn optional(url: &Url, name: &str) -> Option<String> {
	param(url, name).filter(|value| !value.is_empty()).map(Cow::into_owned)
}

fn required(url: &Url, name: &'static str) -> Result<String> {
	optional(url, name).ok_or(Error::MissingParameter { name })
}
