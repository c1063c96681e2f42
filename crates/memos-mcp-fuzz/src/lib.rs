//! Fuzzing library for memos-mcp.
//!
//! Targets cover the parts of the server that read untrusted bytes: token
//! endpoint bodies, PKCE verifiers and Memos API responses.
//!
//! # Usage
//!
//! ```bash
//! cd crates/memos-mcp-fuzz
//! cargo +nightly fuzz run fuzz_token_request -- -max_total_time=60
//! ```

pub use memos_mcp::models;
pub use memos_mcp::server::oauth::{pkce, token};
