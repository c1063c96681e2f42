//! Discovery documents and issuer resolution.
//!
//! - RFC 9728: OAuth Protected Resource Metadata
//! - RFC 8414: OAuth Authorization Server Metadata

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
    response::IntoResponse,
};
use serde_json::json;

use super::pkce::METHOD_S256;
use super::types::{GRANT_AUTHORIZATION_CODE, GRANT_REFRESH_TOKEN, RESPONSE_TYPE_CODE};
use crate::config::oauth::DEFAULT_SCOPE;
use crate::server::transport::HttpState;

/// Path of the protected resource document, relative to the issuer.
pub const PROTECTED_RESOURCE_PATH: &str = "/.well-known/oauth-protected-resource";

/// Path of the authorization server document, relative to the issuer.
pub const AUTH_SERVER_PATH: &str = "/.well-known/oauth-authorization-server";

/// Work out the public base URL of this server.
///
/// A configured issuer always wins. Otherwise the host comes from the
/// forwarding headers or `Host`, and any forwarding header implies the
/// request came through a TLS-terminating proxy.
#[must_use]
pub fn resolve_issuer(configured: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(issuer) = configured.filter(|i| !i.is_empty()) {
        return issuer.trim_end_matches('/').to_string();
    }

    let forwarded_host = header_str(headers, "x-forwarded-host")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let forwarded = header_str(headers, "forwarded");
    let proxied = forwarded_host.is_some()
        || forwarded.is_some()
        || header_str(headers, "x-forwarded-proto").is_some();

    let host = forwarded_host
        .map(ToOwned::to_owned)
        .or_else(|| forwarded.and_then(forwarded_host_param))
        .or_else(|| header_str(headers, header::HOST.as_str()).map(ToOwned::to_owned))
        .unwrap_or_else(|| "localhost".to_string());

    let scheme = if proxied { "https" } else { "http" };
    format!("{scheme}://{host}")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Extract `host=` from the first element of an RFC 7239 `Forwarded` header.
fn forwarded_host_param(value: &str) -> Option<String> {
    let first = value.split(',').next()?;
    first.split(';').find_map(|pair| {
        let (key, val) = pair.trim().split_once('=')?;
        if key.trim().eq_ignore_ascii_case("host") {
            let val = val.trim().trim_matches('"');
            (!val.is_empty()).then(|| val.to_string())
        } else {
            None
        }
    })
}

/// `GET /.well-known/oauth-protected-resource`
///
/// Tells clients where to find the authorization server for this resource.
pub async fn handle_protected_resource(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let issuer = state.issuer(&headers);
    Json(json!({
        "resource": issuer,
        "authorization_servers": [issuer],
        "scopes_supported": [DEFAULT_SCOPE],
        "bearer_methods_supported": ["header"]
    }))
}

/// `GET /.well-known/oauth-authorization-server`
///
/// Describes the OAuth endpoints and capabilities.
pub async fn handle_auth_server_metadata(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let issuer = state.issuer(&headers);
    Json(json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{issuer}/authorize"),
        "token_endpoint": format!("{issuer}/token"),
        "registration_endpoint": format!("{issuer}/register"),
        "scopes_supported": [DEFAULT_SCOPE],
        "response_types_supported": [RESPONSE_TYPE_CODE],
        "grant_types_supported": [GRANT_AUTHORIZATION_CODE, GRANT_REFRESH_TOKEN],
        "token_endpoint_auth_methods_supported": ["client_secret_post", "client_secret_basic", "none"],
        "code_challenge_methods_supported": [METHOD_S256]
    }))
}
