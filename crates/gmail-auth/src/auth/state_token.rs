//! CSRF state token for the authorization redirect

use super::types::{AuthError, AuthResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use tracing::debug;

/// Number of random bytes behind every state token (256 bits)
pub const STATE_TOKEN_BYTES: usize = 32;

/// Single-use nonce bound to one authorization attempt
#[derive(Clone, PartialEq, Eq)]
pub struct StateToken(String);

impl StateToken {
    /// Generate a fresh token from the operating system's secure random source
    pub fn generate() -> AuthResult<Self> {
        Self::generate_with(&mut OsRng)
    }

    /// Generate a token from the given random source.
    ///
    /// Fails with [`AuthError::EntropyUnavailable`] if the source cannot
    /// supply bytes.
    pub fn generate_with<R: RngCore + ?Sized>(rng: &mut R) -> AuthResult<Self> {
        let mut bytes = [0u8; STATE_TOKEN_BYTES];
        rng.try_fill_bytes(&mut bytes)
            .map_err(|e| AuthError::EntropyUnavailable(e.to_string()))?;

        let token = URL_SAFE_NO_PAD.encode(bytes);
        debug!("State parameter generated: {} chars", token.len());
        Ok(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact comparison against the value echoed back by the redirect
    pub fn matches(&self, received: &str) -> bool {
        let expected = self.0.as_bytes();
        let received = received.as_bytes();
        if expected.len() != received.len() {
            return false;
        }
        expected
            .iter()
            .zip(received)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl fmt::Debug for StateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateToken").field(&"<redacted>").finish()
    }
}
