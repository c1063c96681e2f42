//! Token endpoint: authorization_code and refresh_token grants (RFC 6749 §4.1.3, §6).

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Basic};
use serde::{Deserialize, Serialize};

use super::credentials;
use super::pkce;
use super::store::OAuthStore;
use super::types::{GRANT_AUTHORIZATION_CODE, GRANT_REFRESH_TOKEN};
use crate::error::{OAuthError, OAuthResult};
use crate::server::transport::HttpState;

/// Token request parameters, from a form-encoded or JSON body.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
}

/// Successful token response (RFC 6749 §5.1).
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub scope: String,
}

/// Run a token request against the store.
pub async fn exchange(store: &OAuthStore, req: &TokenRequest) -> OAuthResult<TokenResponse> {
    match req.grant_type.as_deref().filter(|g| !g.is_empty()) {
        None => Err(OAuthError::InvalidRequest("Missing grant_type".into())),
        Some(GRANT_AUTHORIZATION_CODE) => exchange_authorization_code(store, req).await,
        Some(GRANT_REFRESH_TOKEN) => exchange_refresh_token(store, req).await,
        Some(other) => Err(OAuthError::UnsupportedGrantType(format!(
            "Grant type '{other}' is not supported"
        ))),
    }
}

async fn exchange_authorization_code(
    store: &OAuthStore,
    req: &TokenRequest,
) -> OAuthResult<TokenResponse> {
    let code = required(req.code.as_deref(), "code")?;
    let client_id = required(req.client_id.as_deref(), "client_id")?;

    // Taken before any other check so the code is dead whatever happens next
    let Some(auth_code) = store.take_auth_code(code).await else {
        return Err(OAuthError::InvalidGrant("Invalid authorization code".into()));
    };

    if auth_code.is_expired_at(store.now()) {
        return Err(OAuthError::InvalidGrant("Authorization code expired".into()));
    }

    if client_id != auth_code.client_id {
        tracing::warn!(client_id = %client_id, "Authorization code presented by another client");
        return Err(OAuthError::InvalidGrant("client_id mismatch".into()));
    }

    authenticate_client(store, client_id, req.client_secret.as_deref()).await?;

    if let Some(redirect_uri) = req.redirect_uri.as_deref().filter(|u| !u.is_empty()) {
        if redirect_uri != auth_code.redirect_uri {
            return Err(OAuthError::InvalidGrant("redirect_uri mismatch".into()));
        }
    }

    if let Some(ref challenge) = auth_code.code_challenge {
        let verifier = req.code_verifier.as_deref().unwrap_or_default();
        if !pkce::verify_s256(verifier, challenge) {
            return Err(OAuthError::InvalidGrant("PKCE verification failed".into()));
        }
    }

    let (access, refresh) = store.issue_tokens(&auth_code.client_id, &auth_code.scope).await;
    tracing::info!(client_id = %auth_code.client_id, "Issued token pair");

    Ok(TokenResponse {
        expires_in: access.expires_in(store.now()),
        access_token: access.token,
        token_type: "Bearer",
        refresh_token: Some(refresh.token),
        scope: access.scope,
    })
}

async fn exchange_refresh_token(
    store: &OAuthStore,
    req: &TokenRequest,
) -> OAuthResult<TokenResponse> {
    let refresh_token = required(req.refresh_token.as_deref(), "refresh_token")?;
    let client_id = required(req.client_id.as_deref(), "client_id")?;

    let Some(refresh) = store.get_refresh_token(refresh_token).await else {
        return Err(OAuthError::InvalidGrant("Invalid refresh token".into()));
    };

    if client_id != refresh.client_id {
        tracing::warn!(client_id = %client_id, "Refresh token presented by another client");
        return Err(OAuthError::InvalidGrant("client_id mismatch".into()));
    }

    authenticate_client(store, client_id, req.client_secret.as_deref()).await?;

    let access = store.issue_access_token(&refresh.client_id, &refresh.scope).await;
    tracing::info!(client_id = %refresh.client_id, "Refreshed access token");

    Ok(TokenResponse {
        expires_in: access.expires_in(store.now()),
        access_token: access.token,
        token_type: "Bearer",
        refresh_token: None,
        scope: access.scope,
    })
}

/// Verify the client secret when one was presented.
///
/// Requests without a secret are treated as public clients bound by PKCE.
async fn authenticate_client(
    store: &OAuthStore,
    client_id: &str,
    client_secret: Option<&str>,
) -> OAuthResult<()> {
    let Some(client) = store.get_client(client_id).await else {
        return Err(OAuthError::InvalidClient("Unknown client".into()));
    };

    if let Some(secret) = client_secret.filter(|s| !s.is_empty()) {
        if !credentials::secrets_match(secret, &client.client_secret) {
            return Err(OAuthError::InvalidClient("Client authentication failed".into()));
        }
    }
    Ok(())
}

fn required<'a>(value: Option<&'a str>, name: &str) -> OAuthResult<&'a str> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| OAuthError::InvalidRequest(format!("Missing {name}")))
}

/// Decode the body as JSON or `application/x-www-form-urlencoded`, then fold
/// in HTTP Basic client credentials.
pub fn parse_token_request(headers: &HeaderMap, body: &[u8]) -> OAuthResult<TokenRequest> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    let mut req: TokenRequest = if is_json {
        serde_json::from_slice(body)
            .map_err(|e| OAuthError::InvalidRequest(format!("Malformed JSON body: {e}")))?
    } else {
        serde_urlencoded::from_bytes(body)
            .map_err(|e| OAuthError::InvalidRequest(format!("Malformed form body: {e}")))?
    };

    if let Some(Authorization(basic)) = headers.typed_get::<Authorization<Basic>>() {
        match req.client_id.as_deref() {
            Some(id) if id != basic.username() => {
                return Err(OAuthError::InvalidRequest("Conflicting client credentials".into()));
            }
            _ => req.client_id = Some(basic.username().to_owned()),
        }
        if req.client_secret.is_none() && !basic.password().is_empty() {
            req.client_secret = Some(basic.password().to_owned());
        }
    }

    Ok(req)
}

/// `POST /token`
///
/// Exchange an authorization code for tokens, or refresh an access token.
pub async fn handle_token(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let result = match parse_token_request(&headers, &body) {
        Ok(req) => exchange(&state.oauth, &req).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(tokens) => token_success(&tokens),
        Err(e) => {
            tracing::warn!(error = %e, "Token request rejected");
            e.into_response()
        }
    }
}

/// Build a token response with required OAuth 2.0 cache headers (RFC 6749 §5.1).
fn token_success(tokens: &TokenResponse) -> Response {
    let mut response = Json(tokens).into_response();

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}
