#![no_main]

use axum::http::{HeaderMap, HeaderValue, header};
use libfuzzer_sys::fuzz_target;
use memos_mcp::server::oauth::token::parse_token_request;

fuzz_target!(|data: &[u8]| {
    // Same bytes as a form body and as a JSON body
    let _ = parse_token_request(&HeaderMap::new(), data);

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let _ = parse_token_request(&headers, data);
});
