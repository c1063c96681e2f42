//! Full end-to-end integration tests for the OAuth 2.0 flow via HTTP.
//!
//! Unlike oauth_tests.rs, which drives the store directly, these go through
//! the axum router with `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use serde_json::json;
use tower::ServiceExt;

use memos_mcp::client::MemosClient;
use memos_mcp::config::Config;
use memos_mcp::server::oauth::pkce::challenge_s256;
use memos_mcp::server::oauth::{ManualClock, OAuthStore};
use memos_mcp::server::transport::create_router;
use memos_mcp::tools::{self, ToolContext};

const ISSUER: &str = "https://mcp.example.com";
const REDIRECT: &str = "https://client.example.com/cb";
const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
const PASSWORD: &str = "test-password";

fn test_config() -> Config {
    let mut config = Config::for_testing("http://unused.localhost");
    config.issuer_url = Some(ISSUER.to_string());
    config
}

fn build_router(store: OAuthStore, config: &Config) -> Router {
    let client = MemosClient::new(config).unwrap();
    let ctx = ToolContext::new(Arc::new(client));
    create_router(tools::register_all_tools(), ctx, store, config)
}

fn build_test_router() -> Router {
    build_router(OAuthStore::new(), &test_config())
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

fn form(pairs: &[(&str, &str)]) -> Body {
    Body::from(serde_urlencoded::to_string(pairs).unwrap())
}

fn form_post(uri: &str, pairs: &[(&str, &str)]) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(form(pairs))
        .unwrap()
}

fn mcp_request(token: &str, body: serde_json::Value) -> Request<Body> {
    Request::post("/mcp")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn register_client(app: &Router) -> (String, String) {
    let response = app
        .clone()
        .oneshot(
            Request::post("/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "client_name": "Integration Test Client",
                        "redirect_uris": [REDIRECT]
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let info = body_json(response).await;
    (
        info["client_id"].as_str().unwrap().to_string(),
        info["client_secret"].as_str().unwrap().to_string(),
    )
}

fn authorize_fields<'a>(client_id: &'a str, challenge: &'a str) -> Vec<(&'static str, &'a str)> {
    vec![
        ("client_id", client_id),
        ("redirect_uri", REDIRECT),
        ("response_type", "code"),
        ("state", "xyz123"),
        ("code_challenge", challenge),
        ("code_challenge_method", "S256"),
        ("scope", "mcp"),
    ]
}

/// Run the password step and return the code from the redirect.
async fn authorize(app: &Router, client_id: &str) -> String {
    let challenge = challenge_s256(VERIFIER);
    let mut fields = authorize_fields(client_id, &challenge);
    fields.push(("password", PASSWORD));

    let response = app.clone().oneshot(form_post("/authorize", &fields)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    let url = url::Url::parse(&location).unwrap();
    assert!(location.starts_with(REDIRECT));

    let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
    assert_eq!(params.get("state").map(String::as_str), Some("xyz123"));
    params["code"].clone()
}

fn code_exchange<'a>(client_id: &'a str, code: &'a str) -> Vec<(&'static str, &'a str)> {
    vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", REDIRECT),
        ("client_id", client_id),
        ("code_verifier", VERIFIER),
    ]
}

#[tokio::test]
async fn test_full_oauth_http_flow() {
    let store = OAuthStore::new();
    let app = build_router(store.clone(), &test_config());

    // 1. Discovery
    let response = app
        .clone()
        .oneshot(
            Request::get("/.well-known/oauth-authorization-server").body(Body::empty()).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let metadata = body_json(response).await;
    assert_eq!(metadata["issuer"], ISSUER);
    assert_eq!(metadata["token_endpoint"], format!("{ISSUER}/token"));
    assert_eq!(metadata["code_challenge_methods_supported"], json!(["S256"]));

    // 2. Register
    let (client_id, _secret) = register_client(&app).await;

    // 3. Login page
    let challenge = challenge_s256(VERIFIER);
    let query = serde_urlencoded::to_string(authorize_fields(&client_id, &challenge)).unwrap();
    let response = app
        .clone()
        .oneshot(Request::get(format!("/authorize?{query}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Integration Test Client"));
    assert!(html.contains(r#"name="password""#));

    // 4. Wrong password re-renders the form
    let mut fields = authorize_fields(&client_id, &challenge);
    fields.push(("password", "wrong"));
    let response = app.clone().oneshot(form_post("/authorize", &fields)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(response).await.contains("Invalid password"));
    assert_eq!(store.pending_auth_codes().await, 0);

    // 5. Right password redirects with a code
    let code = authorize(&app, &client_id).await;
    assert_eq!(store.pending_auth_codes().await, 1);

    // 6. Exchange
    let response =
        app.clone().oneshot(form_post("/token", &code_exchange(&client_id, &code))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    assert_eq!(response.headers()[header::PRAGMA], "no-cache");
    let tokens = body_json(response).await;
    assert_eq!(tokens["token_type"], "Bearer");
    assert_eq!(tokens["expires_in"], 3600);
    assert_eq!(store.pending_auth_codes().await, 0);
    let access_token = tokens["access_token"].as_str().unwrap().to_string();
    let refresh_token = tokens["refresh_token"].as_str().unwrap().to_string();

    // 7. Replay fails
    let response =
        app.clone().oneshot(form_post("/token", &code_exchange(&client_id, &code))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_grant");

    // 8. Protected endpoint accepts the token
    let response = app
        .clone()
        .oneshot(mcp_request(&access_token, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-accel-buffering"], "no");
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "no-cache, no-store, must-revalidate"
    );
    let body = body_json(response).await;
    assert_eq!(body["result"]["tools"].as_array().map(Vec::len), Some(4));

    // 9. Refresh, twice
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(form_post(
                "/token",
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token.as_str()),
                    ("client_id", client_id.as_str()),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let refreshed = body_json(response).await;
        assert_ne!(refreshed["access_token"], access_token.as_str());
        assert!(refreshed.get("refresh_token").is_none());
    }
}

#[tokio::test]
async fn test_json_token_request_with_basic_auth() {
    let app = build_test_router();
    let (client_id, secret) = register_client(&app).await;
    let code = authorize(&app, &client_id).await;

    let basic = base64::Engine::encode(
        &base64::engine::general_purpose::STANDARD,
        format!("{client_id}:{secret}"),
    );
    let response = app
        .clone()
        .oneshot(
            Request::post("/token")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Basic {basic}"))
                .body(Body::from(
                    json!({
                        "grant_type": "authorization_code",
                        "code": code,
                        "redirect_uri": REDIRECT,
                        "code_verifier": VERIFIER
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_client_secret_is_401() {
    let app = build_test_router();
    let (client_id, _secret) = register_client(&app).await;
    let code = authorize(&app, &client_id).await;

    let mut fields = code_exchange(&client_id, &code);
    fields.push(("client_secret", "nope"));
    let response = app.clone().oneshot(form_post("/token", &fields)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "invalid_client");
}

#[tokio::test]
async fn test_unsupported_grant_type() {
    let app = build_test_router();
    let response = app
        .oneshot(form_post("/token", &[("grant_type", "client_credentials")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "unsupported_grant_type");
}

#[tokio::test]
async fn test_register_empty_body_uses_defaults() {
    let app = build_test_router();
    let response = app
        .oneshot(Request::post("/register").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let info = body_json(response).await;
    assert_eq!(info["token_endpoint_auth_method"], "client_secret_post");
    assert_eq!(info["client_secret_expires_at"], 0);
    assert!(info["client_id_issued_at"].is_i64());
    assert!(info.get("client_name").is_none());
    assert!(info.get("redirect_uris").is_none());
}

#[tokio::test]
async fn test_register_malformed_json() {
    let app = build_test_router();
    let response = app
        .oneshot(
            Request::post("/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_client_metadata");
}

#[tokio::test]
async fn test_authorize_unknown_client_renders_error() {
    let app = build_test_router();
    let response = app
        .oneshot(
            Request::get("/authorize?client_id=nobody&response_type=code")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::LOCATION).is_none());
    assert!(body_text(response).await.contains("invalid_client"));
}

#[tokio::test]
async fn test_authorize_unregistered_redirect_rejected() {
    let app = build_test_router();
    let (client_id, _) = register_client(&app).await;

    let challenge = challenge_s256(VERIFIER);
    let mut fields = authorize_fields(&client_id, &challenge);
    fields[1] = ("redirect_uri", "https://evil.example.com/cb");
    let query = serde_urlencoded::to_string(&fields).unwrap();

    let response = app
        .oneshot(Request::get(format!("/authorize?{query}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::LOCATION).is_none());
}

#[tokio::test]
async fn test_authorize_without_password_configured() {
    let mut config = test_config();
    config.server_password = None;
    let app = build_router(OAuthStore::new(), &config);
    let (client_id, _) = register_client(&app).await;

    let challenge = challenge_s256(VERIFIER);
    let mut fields = authorize_fields(&client_id, &challenge);
    fields.push(("password", "anything"));
    let response = app.oneshot(form_post("/authorize", &fields)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.contains("configuration_error"));
}

#[tokio::test]
async fn test_missing_bearer_challenge() {
    let app = build_test_router();
    let response = app
        .oneshot(
            Request::post("/")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let challenge = response.headers()[header::WWW_AUTHENTICATE].to_str().unwrap().to_string();
    assert_eq!(
        challenge,
        format!(r#"Bearer resource_metadata="{ISSUER}/.well-known/oauth-protected-resource""#)
    );
    assert_eq!(body_json(response).await["error"], "unauthorized");
}

#[tokio::test]
async fn test_unknown_bearer_is_invalid_token() {
    let app = build_test_router();
    let response = app
        .oneshot(mcp_request("made-up", json!({"jsonrpc": "2.0", "id": 1, "method": "ping"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let challenge = response.headers()[header::WWW_AUTHENTICATE].to_str().unwrap().to_string();
    assert!(challenge.contains(r#"error="invalid_token""#));
    assert_eq!(body_json(response).await["error"], "invalid_token");
}

#[tokio::test]
async fn test_bearer_expiry_boundary() {
    let clock = ManualClock::default();
    let store = OAuthStore::new()
        .with_clock(Arc::new(clock.clone()))
        .with_access_token_ttl(Duration::from_secs(120));
    let (access, _) = store.issue_tokens("client", "mcp").await;
    let app = build_router(store, &test_config());
    let ping = || json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});

    clock.advance(chrono::Duration::seconds(119));
    let response = app.clone().oneshot(mcp_request(&access.token, ping())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    clock.advance(chrono::Duration::seconds(1));
    let response = app.clone().oneshot(mcp_request(&access.token, ping())).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    clock.advance(chrono::Duration::seconds(1));
    let response = app.oneshot(mcp_request(&access.token, ping())).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_paths_skip_auth() {
    let app = build_test_router();

    let response =
        app.clone().oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");

    let response = app
        .clone()
        .oneshot(
            Request::get("/.well-known/oauth-protected-resource").body(Body::empty()).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let metadata = body_json(response).await;
    assert_eq!(metadata["resource"], ISSUER);
    assert_eq!(metadata["authorization_servers"], json!([ISSUER]));
    assert_eq!(metadata["bearer_methods_supported"], json!(["header"]));
}

#[tokio::test]
async fn test_issuer_derived_from_forwarded_headers() {
    let app = build_router(OAuthStore::new(), &Config::for_testing("http://unused.localhost"));
    let response = app
        .oneshot(
            Request::get("/.well-known/oauth-authorization-server")
                .header(header::HOST, "10.0.0.5:8716")
                .header("x-forwarded-host", "memos-mcp.example.org")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let metadata = body_json(response).await;
    assert_eq!(metadata["issuer"], "https://memos-mcp.example.org");
    assert_eq!(metadata["authorization_endpoint"], "https://memos-mcp.example.org/authorize");
}
