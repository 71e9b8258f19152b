use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Random bytes behind each verifier; encodes to 43 base64url characters.
pub const VERIFIER_BYTES: usize = 32;
const STATE_BYTES: usize = 16;

/// Verifier and its S256 challenge.
#[derive(Clone, PartialEq, Eq)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    pub fn generate() -> Result<Self> {
        let verifier = random_token(VERIFIER_BYTES)?;
        let challenge = challenge_for(&verifier);
        Ok(Self {
            verifier,
            challenge,
        })
    }
}

impl std::fmt::Debug for PkcePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkcePair")
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .finish()
    }
}

/// `BASE64URL(SHA256(ASCII(verifier)))` without padding.
pub fn challenge_for(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Fresh value for the authorize request's `state` parameter.
pub fn generate_state() -> Result<String> {
    random_token(STATE_BYTES)
}

fn random_token(len: usize) -> Result<String> {
    let mut buf = vec![0u8; len];
    getrandom::getrandom(&mut buf).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("system randomness unavailable: {e}"),
        )
    })?;
    Ok(URL_SAFE_NO_PAD.encode(buf))
}
