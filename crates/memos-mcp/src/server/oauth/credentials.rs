//! Credential generation and comparison.
//!
//! Every identifier the authorization server hands out comes from here, and
//! every secret it receives is checked here.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Entropy for client identifiers.
pub const CLIENT_ID_BYTES: usize = 16;

/// Entropy for client secrets, authorization codes and tokens.
pub const SECRET_BYTES: usize = 32;

/// Generate `byte_len` random bytes from the OS-seeded CSPRNG, encoded as
/// URL-safe base64 without padding.
#[must_use]
pub fn generate(byte_len: usize) -> String {
    let mut bytes = vec![0u8; byte_len];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// New client identifier.
#[must_use]
pub fn client_id() -> String {
    generate(CLIENT_ID_BYTES)
}

/// New client secret, authorization code, access token or refresh token.
#[must_use]
pub fn secret() -> String {
    generate(SECRET_BYTES)
}

/// Compare an attacker-supplied secret with the expected one in constant time.
///
/// Both sides are hashed first so the comparison length does not depend on
/// either input.
#[must_use]
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    let provided = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    provided.as_slice().ct_eq(expected.as_slice()).into()
}
