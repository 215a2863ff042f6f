//! Request signing for the `X-Auth` header.
//!
//! Every call carries `app_key="..",nonce="..",signature=".."` where
//!
//! 1. `HA1 = sha1(app_key:realm:app_secret)`
//! 2. `HA2 = sha1(method:uri)`
//! 3. `signature = sha1(HA1:nonce:HA2)` with a fresh 40 hex char nonce
//!
//! HA1 and HA2 are computed once; only step 3 runs per request.

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use sha1::{Digest, Sha1};
use std::sync::{Mutex, PoisonError};

use crate::consts::{DELIMITER, METHOD, REALM, URI};

/// SHA-1 over the parts joined with the delimiter, as lowercase hex.
fn sha1_hex(parts: &[&str]) -> String {
    let mut hasher = Sha1::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(DELIMITER.as_bytes());
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// HA1: hash of the long-lived credentials.
pub fn derive_credential_hash(key: &str, realm: &str, secret: &str) -> String {
    sha1_hex(&[key, realm, secret])
}

/// HA2: hash of the fixed method and URI.
pub fn derive_method_hash(method: &str, uri: &str) -> String {
    sha1_hex(&[method, uri])
}

/// Output of one signing operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub nonce: String,
    pub signature: String,
    /// Value for the `X-Auth` header.
    pub header: String,
}

/// Holds the derived hashes and the random source for nonces.
pub struct Signer {
    app_key: String,
    ha1: String,
    ha2: String,
    rng: Mutex<StdRng>,
}

impl Signer {
    /// Derive HA1/HA2 and seed the nonce generator from the thread RNG.
    pub fn new(app_key: &str, app_secret: &str) -> Self {
        let seed: u64 = rand::rng().random();
        Self::with_seed(app_key, app_secret, seed)
    }

    /// Same as [`Signer::new`] with an explicit seed. Two signers with the
    /// same seed produce the same nonce sequence.
    pub fn with_seed(app_key: &str, app_secret: &str, seed: u64) -> Self {
        let ha1 = derive_credential_hash(app_key, REALM, app_secret);
        let ha2 = derive_method_hash(METHOD, URI);
        tracing::debug!(%ha1, %ha2, "derived credential hashes");
        Self {
            app_key: app_key.to_string(),
            ha1,
            ha2,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn ha1(&self) -> &str {
        &self.ha1
    }

    pub fn ha2(&self) -> &str {
        &self.ha2
    }

    /// 40 lowercase hex chars: two 64-bit values and one 32-bit value.
    pub fn generate_nonce(&self) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let a: u64 = rng.random();
        let b: u64 = rng.random();
        let c: u32 = rng.random();
        format!("{a:016x}{b:016x}{c:08x}")
    }

    /// Sign with a fresh nonce.
    pub fn sign_request(&self) -> SignedRequest {
        let nonce = self.generate_nonce();
        self.sign_with_nonce(nonce)
    }

    /// Sign with a caller-supplied nonce. Never reuse a nonce against the
    /// live endpoint.
    pub fn sign_with_nonce(&self, nonce: String) -> SignedRequest {
        let signature = sha1_hex(&[&self.ha1, &nonce, &self.ha2]);
        let header = format!(
            r#"app_key="{}",nonce="{}",signature="{}""#,
            self.app_key, nonce, signature
        );
        SignedRequest {
            nonce,
            signature,
            header,
        }
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("app_key", &self.app_key)
            .finish_non_exhaustive()
    }
}
