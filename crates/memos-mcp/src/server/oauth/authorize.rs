//! Authorization endpoint: password challenge and code issuance.
//!
//! `GET /authorize` renders the login form, `POST /authorize` checks the
//! shared password and redirects back to the client with a code. Errors
//! before a trusted redirect URI is established are rendered inline, never
//! redirected.

use std::sync::Arc;

use axum::{
    Form,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

use super::credentials;
use super::login::{LoginForm, render_error_page, render_login_page};
use super::pkce::METHOD_S256;
use super::store::{CodeGrant, OAuthStore};
use super::types::{RESPONSE_TYPE_CODE, RegisteredClient};
use crate::server::transport::HttpState;

/// Query string of `GET /authorize`, and form body of `POST /authorize`.
#[derive(Debug, Default, Deserialize)]
pub struct AuthorizeRequest {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub response_type: Option<String>,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub scope: Option<String>,
    /// Only read on POST.
    pub password: Option<String>,
}

/// An authorization request that passed client and redirect checks.
#[derive(Debug)]
struct ValidatedRequest {
    client: RegisteredClient,
    redirect_uri: String,
    state: Option<String>,
    code_challenge: Option<String>,
    scope: String,
}

impl ValidatedRequest {
    fn login_form(&self) -> LoginForm<'_> {
        LoginForm {
            client_name: self.client.client_name.as_deref().unwrap_or(&self.client.client_id),
            client_id: &self.client.client_id,
            redirect_uri: &self.redirect_uri,
            state: self.state.as_deref().unwrap_or_default(),
            code_challenge: self.code_challenge.as_deref().unwrap_or_default(),
            code_challenge_method: METHOD_S256,
            scope: &self.scope,
        }
    }
}

/// `GET /authorize`
///
/// Renders the password challenge for a registered client.
pub async fn handle_authorize_get(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<AuthorizeRequest>,
) -> Response {
    let request = match validate(&state.oauth, &query).await {
        Ok(request) => request,
        Err(response) => return response,
    };

    tracing::debug!(client_id = %request.client.client_id, "Rendering login challenge");
    Html(render_login_page(&request.login_form(), None)).into_response()
}

/// `POST /authorize`
///
/// Checks the password and redirects to the client with a fresh code.
pub async fn handle_authorize_post(
    State(state): State<Arc<HttpState>>,
    Form(form): Form<AuthorizeRequest>,
) -> Response {
    let request = match validate(&state.oauth, &form).await {
        Ok(request) => request,
        Err(response) => return response,
    };

    let Some(ref expected) = state.server_password else {
        tracing::error!("Login attempted but no server password is configured");
        return html_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "configuration_error",
            "The server password is not configured",
        );
    };

    let provided = form.password.as_deref().unwrap_or_default();
    if !credentials::secrets_match(provided, expected) {
        tracing::warn!(client_id = %request.client.client_id, "Rejected login: wrong password");
        return (
            StatusCode::UNAUTHORIZED,
            Html(render_login_page(&request.login_form(), Some("Invalid password"))),
        )
            .into_response();
    }

    let Ok(mut location) = url::Url::parse(&request.redirect_uri) else {
        return html_error(StatusCode::BAD_REQUEST, "invalid_request", "Invalid redirect_uri");
    };

    let code = state
        .oauth
        .create_auth_code(CodeGrant {
            client_id: request.client.client_id.clone(),
            redirect_uri: request.redirect_uri.clone(),
            code_challenge: request.code_challenge.clone(),
            code_challenge_method: METHOD_S256.to_string(),
            scope: request.scope.clone(),
        })
        .await;

    {
        let mut pairs = location.query_pairs_mut();
        pairs.append_pair("code", &code.code);
        if let Some(ref oauth_state) = request.state {
            pairs.append_pair("state", oauth_state);
        }
    }

    tracing::info!(client_id = %request.client.client_id, "Issued authorization code");

    let mut response = StatusCode::FOUND.into_response();
    let headers = response.headers_mut();
    match HeaderValue::from_str(location.as_str()) {
        Ok(value) => {
            headers.insert(header::LOCATION, value);
        }
        Err(_) => {
            return html_error(StatusCode::BAD_REQUEST, "invalid_request", "Invalid redirect_uri");
        }
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// Check the client, response type, PKCE method and redirect URI.
async fn validate(store: &OAuthStore, req: &AuthorizeRequest) -> Result<ValidatedRequest, Response> {
    let Some(client_id) = req.client_id.as_deref().filter(|c| !c.is_empty()) else {
        return Err(html_error(StatusCode::BAD_REQUEST, "invalid_request", "Missing client_id"));
    };

    let Some(client) = store.get_client(client_id).await else {
        tracing::warn!(client_id = %client_id, "Authorization request for unknown client");
        return Err(html_error(StatusCode::BAD_REQUEST, "invalid_client", "Unknown client_id"));
    };

    if let Some(response_type) = req.response_type.as_deref() {
        if response_type != RESPONSE_TYPE_CODE {
            return Err(html_error(
                StatusCode::BAD_REQUEST,
                "unsupported_response_type",
                "response_type must be 'code'",
            ));
        }
    }

    if let Some(method) = req.code_challenge_method.as_deref().filter(|m| !m.is_empty()) {
        if method != METHOD_S256 {
            return Err(html_error(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "code_challenge_method must be 'S256'",
            ));
        }
    }

    let redirect_uri = match req.redirect_uri.as_deref().filter(|u| !u.is_empty()) {
        Some(uri) => {
            if !client.allows_redirect(uri) {
                return Err(html_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_request",
                    "redirect_uri not registered for this client",
                ));
            }
            uri.to_owned()
        }
        None => match client.redirect_uris.as_slice() {
            [only] => only.clone(),
            _ => {
                return Err(html_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_request",
                    "Missing redirect_uri",
                ));
            }
        },
    };

    let scope = req
        .scope
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| client.scope.clone());

    Ok(ValidatedRequest {
        redirect_uri,
        state: req.state.clone().filter(|s| !s.is_empty()),
        code_challenge: req.code_challenge.clone().filter(|c| !c.is_empty()),
        scope,
        client,
    })
}

fn html_error(status: StatusCode, error: &str, description: &str) -> Response {
    (status, Html(render_error_page(error, description))).into_response()
}
