//! PKCE (RFC 7636) primitives used when composing or validating authorization requests.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

const PKCE_VERIFIER_LEN: usize = 64;

/// Supported PKCE challenge methods.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	#[default]
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}
impl Display for PkceCodeChallengeMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for PkceCodeChallengeMethod {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"S256" => Ok(Self::S256),
			other => Err(format!("unsupported code challenge method `{other}`")),
		}
	}
}

/// Verifier/challenge pair for clients that compose their own inbound requests.
#[derive(Clone)]
pub struct PkcePair {
	/// Secret verifier kept by the client for the token exchange.
	pub verifier: String,
	/// Challenge sent with the authorization request.
	pub challenge: String,
	/// Challenge derivation method.
	pub method: PkceCodeChallengeMethod,
}
impl PkcePair {
	/// Generates a fresh random verifier and its S256 challenge.
	pub fn generate() -> Self {
		let verifier = rand::rng()
			.sample_iter(Alphanumeric)
			.take(PKCE_VERIFIER_LEN)
			.map(char::from)
			.collect::<String>();
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier, challenge, method: PkceCodeChallengeMethod::S256 }
	}
}
impl Debug for PkcePair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PkcePair")
			.field("challenge", &self.challenge)
			.field("method", &self.method)
			.finish_non_exhaustive()
	}
}

/// Derives the S256 challenge for `verifier`.
pub fn compute_pkce_challenge(verifier: &str) -> String {
	let mut hasher = Sha256::new();
	hasher.update(verifier.as_bytes());
	let digest = hasher.finalize();
	URL_SAFE_NO_PAD.encode(digest)
}
