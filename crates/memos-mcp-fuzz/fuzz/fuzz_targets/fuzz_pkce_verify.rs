#![no_main]

use libfuzzer_sys::fuzz_target;
use memos_mcp::server::oauth::pkce::{challenge_s256, verify_s256};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Split into verifier and challenge at the first newline
    let (verifier, challenge) = text.split_once('\n').unwrap_or((text, ""));
    let _ = verify_s256(verifier, challenge);

    if !verifier.is_empty() {
        assert!(verify_s256(verifier, &challenge_s256(verifier)));
    }
});
