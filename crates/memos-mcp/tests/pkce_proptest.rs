//! Property tests for PKCE S256 verification.

use proptest::prelude::*;

use memos_mcp::server::oauth::pkce::{challenge_s256, verify_s256};

proptest! {
    #[test]
    fn verifier_matches_own_challenge(verifier in "[A-Za-z0-9._~-]{43,128}") {
        prop_assert!(verify_s256(&verifier, &challenge_s256(&verifier)));
    }

    #[test]
    fn different_verifier_rejected(
        a in "[A-Za-z0-9._~-]{43,128}",
        b in "[A-Za-z0-9._~-]{43,128}",
    ) {
        prop_assume!(a != b);
        prop_assert!(!verify_s256(&b, &challenge_s256(&a)));
    }

    #[test]
    fn challenge_is_unpadded_base64url(verifier in "[A-Za-z0-9._~-]{43,128}") {
        let challenge = challenge_s256(&verifier);
        prop_assert_eq!(challenge.len(), 43);
        prop_assert!(challenge.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn arbitrary_input_never_panics(verifier in ".*", challenge in ".*") {
        let _ = verify_s256(&verifier, &challenge);
    }
}

#[test]
fn empty_verifier_rejected() {
    assert!(!verify_s256("", &challenge_s256("")));
}
