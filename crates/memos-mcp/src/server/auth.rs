//! Bearer token enforcement for the MCP endpoint.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::oauth::metadata::PROTECTED_RESOURCE_PATH;
use super::transport::HttpState;

/// Identity of the OAuth client behind a request, inserted into request
/// extensions once the bearer token checks out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedClient {
    pub client_id: String,
    pub scope: String,
}

/// Paths reachable without a token.
#[must_use]
pub fn is_public_path(path: &str) -> bool {
    matches!(path, "/health" | "/authorize" | "/token" | "/register")
        || path.starts_with("/.well-known/")
}

/// Reject requests to protected paths that lack a live access token.
pub async fn require_bearer(
    State(state): State<Arc<HttpState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_path(request.uri().path()) {
        return next.run(request).await;
    }

    let Some(token) = bearer_token(request.headers()) else {
        tracing::debug!(path = %request.uri().path(), "Missing bearer token");
        return challenge(
            &state,
            request.headers(),
            "unauthorized",
            "Missing or malformed bearer token",
        );
    };

    let validated = state.oauth.validate_access_token(token).await;
    match validated {
        Ok(access) => {
            request.extensions_mut().insert(AuthenticatedClient {
                client_id: access.client_id,
                scope: access.scope,
            });
        }
        Err(e) => {
            tracing::debug!(path = %request.uri().path(), error = %e, "Rejected bearer token");
            return challenge(&state, request.headers(), "invalid_token", e.description());
        }
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    response
}

/// Extract the token from `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// 401 with a `WWW-Authenticate` challenge pointing at the resource metadata.
fn challenge(state: &HttpState, headers: &HeaderMap, error: &str, description: &str) -> Response {
    let resource_metadata = format!("{}{PROTECTED_RESOURCE_PATH}", state.issuer(headers));
    let www_authenticate = if error == "invalid_token" {
        format!(r#"Bearer error="invalid_token", resource_metadata="{resource_metadata}""#)
    } else {
        format!(r#"Bearer resource_metadata="{resource_metadata}""#)
    };

    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": error, "error_description": description })),
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&www_authenticate) {
        response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
    }
    response
}
