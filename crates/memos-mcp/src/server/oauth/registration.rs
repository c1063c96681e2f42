//! RFC 7591 Dynamic Client Registration.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::credentials;
use super::store::OAuthStore;
use super::types::{
    GRANT_AUTHORIZATION_CODE, GRANT_REFRESH_TOKEN, RESPONSE_TYPE_CODE, RegisteredClient,
};
use crate::config::oauth::DEFAULT_SCOPE;
use crate::error::{OAuthError, OAuthResult};
use crate::server::transport::HttpState;

const DEFAULT_AUTH_METHOD: &str = "client_secret_post";
const SUPPORTED_AUTH_METHODS: &[&str] = &["client_secret_post", "client_secret_basic", "none"];

/// Client-supplied registration metadata. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct ClientMetadata {
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub redirect_uris: Option<Vec<String>>,
    #[serde(default)]
    pub grant_types: Option<Vec<String>>,
    #[serde(default)]
    pub response_types: Option<Vec<String>>,
    #[serde(default)]
    pub token_endpoint_auth_method: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Registration response body (RFC 7591 §3.2.1).
///
/// Optional fields are omitted when empty. Some clients reject `null` here.
#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub client_id: String,
    pub client_secret: String,
    pub client_id_issued_at: i64,
    pub client_secret_expires_at: i64,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub token_endpoint_auth_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub redirect_uris: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub scope: String,
}

impl From<RegisteredClient> for RegistrationResponse {
    fn from(client: RegisteredClient) -> Self {
        Self {
            client_id_issued_at: client.issued_at.timestamp(),
            client_secret_expires_at: 0,
            client_id: client.client_id,
            client_secret: client.client_secret,
            grant_types: client.grant_types,
            response_types: client.response_types,
            token_endpoint_auth_method: client.token_endpoint_auth_method,
            client_name: client.client_name,
            redirect_uris: client.redirect_uris,
            scope: client.scope,
        }
    }
}

/// Validate metadata, mint credentials, store and persist the new client.
pub async fn register(store: &OAuthStore, metadata: ClientMetadata) -> OAuthResult<RegisteredClient> {
    let grant_types = non_empty_list(metadata.grant_types)
        .unwrap_or_else(|| vec![GRANT_AUTHORIZATION_CODE.into(), GRANT_REFRESH_TOKEN.into()]);
    if let Some(bad) = grant_types
        .iter()
        .find(|g| g.as_str() != GRANT_AUTHORIZATION_CODE && g.as_str() != GRANT_REFRESH_TOKEN)
    {
        return Err(OAuthError::InvalidClientMetadata(format!("Unsupported grant type: {bad}")));
    }

    let response_types =
        non_empty_list(metadata.response_types).unwrap_or_else(|| vec![RESPONSE_TYPE_CODE.into()]);
    if let Some(bad) = response_types.iter().find(|r| r.as_str() != RESPONSE_TYPE_CODE) {
        return Err(OAuthError::InvalidClientMetadata(format!("Unsupported response type: {bad}")));
    }

    let token_endpoint_auth_method = non_empty(metadata.token_endpoint_auth_method)
        .unwrap_or_else(|| DEFAULT_AUTH_METHOD.to_string());
    if !SUPPORTED_AUTH_METHODS.contains(&token_endpoint_auth_method.as_str()) {
        return Err(OAuthError::InvalidClientMetadata(format!(
            "Unsupported token_endpoint_auth_method: {token_endpoint_auth_method}"
        )));
    }

    let redirect_uris: Vec<String> = metadata
        .redirect_uris
        .unwrap_or_default()
        .into_iter()
        .filter(|u| !u.trim().is_empty())
        .collect();
    if let Some(bad) = redirect_uris.iter().find(|u| url::Url::parse(u).is_err()) {
        return Err(OAuthError::InvalidClientMetadata(format!("Invalid redirect URI: {bad}")));
    }

    let client = RegisteredClient {
        client_id: credentials::client_id(),
        client_secret: credentials::secret(),
        issued_at: store.now(),
        grant_types,
        response_types,
        token_endpoint_auth_method,
        client_name: non_empty(metadata.client_name),
        redirect_uris,
        scope: non_empty(metadata.scope).unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
    };

    store.insert_client(client.clone()).await;
    Ok(client)
}

/// `POST /register`
///
/// An empty body registers a client with all defaults.
pub async fn handle_register(State(state): State<Arc<HttpState>>, body: Bytes) -> Response {
    let metadata = if body.iter().all(u8::is_ascii_whitespace) {
        ClientMetadata::default()
    } else {
        match serde_json::from_slice::<ClientMetadata>(&body) {
            Ok(metadata) => metadata,
            Err(e) => {
                return OAuthError::InvalidClientMetadata(format!("Malformed registration body: {e}"))
                    .into_response();
            }
        }
    };

    match register(&state.oauth, metadata).await {
        Ok(client) => {
            tracing::info!(
                client_id = %client.client_id,
                client_name = client.client_name.as_deref().unwrap_or("-"),
                "Registered OAuth client"
            );
            (StatusCode::CREATED, Json(RegistrationResponse::from(client))).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejected client registration");
            e.into_response()
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_empty_list(value: Option<Vec<String>>) -> Option<Vec<String>> {
    value.filter(|v| !v.is_empty())
}
