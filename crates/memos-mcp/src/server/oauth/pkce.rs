//! PKCE (Proof Key for Code Exchange) verification.
//!
//! Implements S256 code challenge verification per RFC 7636. The `plain`
//! method is never accepted.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// The only supported challenge method.
pub const METHOD_S256: &str = "S256";

/// Compute `BASE64URL(SHA256(code_verifier))`.
#[must_use]
pub fn challenge_s256(code_verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()))
}

/// Verify a PKCE S256 code challenge.
///
/// Returns `false` for an empty verifier or challenge. The comparison runs in
/// constant time over the encoded digest.
#[must_use]
pub fn verify_s256(code_verifier: &str, code_challenge: &str) -> bool {
    if code_verifier.is_empty() || code_challenge.is_empty() {
        return false;
    }
    let computed = challenge_s256(code_verifier);
    computed.as_bytes().ct_eq(code_challenge.as_bytes()).into()
}
