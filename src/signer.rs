//! Device-key signing of server-issued challenges.
//!
//! The key pair lives behind a [`KeyStore`] so hardware-backed or prompt-gated stores can
//! suspend while the key is unlocked. Assertions are compact ES256 JWS values.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use p256::ecdsa::{Signature, SigningKey, signature::Signer as _};
// self
use crate::{_prelude::*, error::BoxError};

/// Future returned by [`KeyStore`] operations.
pub type KeyStoreFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, KeyStoreError>> + 'a + Send>>;

/// Source of the device's signing key pair.
pub trait KeyStore
where
	Self: Send + Sync,
{
	/// Loads the signing key, suspending while the backing store unlocks it.
	fn load_key_pair(&self) -> KeyStoreFuture<'_, SigningKey>;
}

/// Errors reported by [`KeyStore`] implementations.
#[derive(Debug, ThisError)]
pub enum KeyStoreError {
	/// No key pair has been provisioned.
	#[error("No device key pair is provisioned.")]
	NotProvisioned,
	/// The backing store failed.
	#[error("Key store backend failed.")]
	Backend {
		/// Backend-specific failure.
		#[source]
		source: BoxError,
	},
}
impl KeyStoreError {
	/// Wraps a backend-specific failure.
	pub fn backend(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Backend { source: Box::new(src) }
	}
}

/// Failures while producing a signed assertion.
#[derive(Debug, ThisError)]
pub enum SignatureError {
	/// The key pair could not be loaded.
	#[error("Device key pair is unavailable.")]
	KeyUnavailable(#[from] KeyStoreError),
	/// The JWS header or payload could not be encoded.
	#[error("Challenge assertion could not be encoded.")]
	Encode(#[from] serde_json::Error),
	/// The signature operation failed.
	#[error("Challenge assertion could not be signed.")]
	Sign(#[from] p256::ecdsa::Error),
}

/// In-memory [`KeyStore`] for tests and software-held keys.
#[derive(Clone, Default)]
pub struct MemoryKeyStore(Option<SigningKey>);
impl MemoryKeyStore {
	/// Creates a store holding `key`.
	pub fn new(key: SigningKey) -> Self {
		Self(Some(key))
	}
}
impl Debug for MemoryKeyStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("MemoryKeyStore").field(&self.0.as_ref().map(|_| "..")).finish()
	}
}
impl KeyStore for MemoryKeyStore {
	fn load_key_pair(&self) -> KeyStoreFuture<'_, SigningKey> {
		let key = self.0.clone();

		Box::pin(async move { key.ok_or(KeyStoreError::NotProvisioned) })
	}
}

/// Nonce together with its signed assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedChallenge {
	/// Nonce that was signed.
	pub nonce: String,
	/// Compact ES256 JWS over the nonce.
	pub signed_nonce: String,
}

#[derive(Serialize)]
struct JwsHeader {
	alg: &'static str,
	typ: &'static str,
}

#[derive(Serialize)]
struct ChallengeClaims<'a> {
	nonce: &'a str,
	iat: i64,
}

/// Signs challenges with the key held by a [`KeyStore`].
#[derive(Clone)]
pub struct ChallengeSigner {
	key_store: Arc<dyn KeyStore>,
}
impl ChallengeSigner {
	/// Creates a signer backed by `key_store`.
	pub fn new(key_store: Arc<dyn KeyStore>) -> Self {
		Self { key_store }
	}

	/// Loads the key pair and signs `nonce`. Failures are not retried.
	pub async fn sign(&self, nonce: &str) -> Result<SignedChallenge, SignatureError> {
		let key = self.key_store.load_key_pair().await?;
		let signed_nonce = sign_nonce(&key, nonce, OffsetDateTime::now_utc())?;

		Ok(SignedChallenge { nonce: nonce.to_owned(), signed_nonce })
	}
}
impl Debug for ChallengeSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ChallengeSigner(..)")
	}
}

/// Produces a compact ES256 JWS with `{"nonce", "iat"}` claims.
pub fn sign_nonce(
	key: &SigningKey,
	nonce: &str,
	issued_at: OffsetDateTime,
) -> Result<String, SignatureError> {
	let header = serde_json::to_vec(&JwsHeader { alg: "ES256", typ: "JWT" })?;
	let claims = serde_json::to_vec(&ChallengeClaims { nonce, iat: issued_at.unix_timestamp() })?;
	let signing_input =
		format!("{}.{}", URL_SAFE_NO_PAD.encode(header), URL_SAFE_NO_PAD.encode(claims));
	let signature: Signature = key.try_sign(signing_input.as_bytes())?;

	Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes())))
}
