//! OAuth store persistence tests.
//!
//! Each test writes to its own temporary directory.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use memos_mcp::server::oauth::{ClientMetadata, CodeGrant, ManualClock, OAuthStore, register};

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap())
}

fn store_at(dir: &TempDir, clock: &ManualClock) -> OAuthStore {
    OAuthStore::new()
        .with_clock(Arc::new(clock.clone()))
        .with_access_token_ttl(Duration::from_secs(3600))
        .with_storage_path(dir.path().join("oauth.json"))
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = TempDir::new().unwrap();
    let clock = clock();

    let store = store_at(&dir, &clock);
    let client = register(&store, ClientMetadata::default()).await.unwrap();
    let (access, refresh) = store.issue_tokens(&client.client_id, "mcp").await;

    let reloaded = store_at(&dir, &clock);
    reloaded.load().await;

    let loaded_client = reloaded.get_client(&client.client_id).await.unwrap();
    assert_eq!(loaded_client.client_secret, client.client_secret);
    assert_eq!(loaded_client.redirect_uris, client.redirect_uris);

    let token = reloaded.validate_access_token(&access.token).await.unwrap();
    assert_eq!(token.client_id, client.client_id);
    assert_eq!(token.expires_at, access.expires_at);

    let refresh_loaded = reloaded.get_refresh_token(&refresh.token).await.unwrap();
    assert_eq!(refresh_loaded.client_id, client.client_id);
}

#[tokio::test]
async fn test_expired_access_tokens_skipped_on_load() {
    let dir = TempDir::new().unwrap();
    let clock = clock();

    let store = store_at(&dir, &clock);
    let (access, refresh) = store.issue_tokens("client", "mcp").await;

    clock.advance(chrono::Duration::hours(2));
    let reloaded = store_at(&dir, &clock);
    reloaded.load().await;

    assert_eq!(
        reloaded.validate_access_token(&access.token).await.unwrap_err().description(),
        "Unknown access token"
    );
    assert!(reloaded.get_refresh_token(&refresh.token).await.is_some());
}

#[tokio::test]
async fn test_authorization_codes_not_persisted() {
    let dir = TempDir::new().unwrap();
    let clock = clock();

    let store = store_at(&dir, &clock);
    let client = register(&store, ClientMetadata::default()).await.unwrap();
    store
        .create_auth_code(CodeGrant {
            client_id: client.client_id.clone(),
            redirect_uri: "https://client.example.com/cb".into(),
            code_challenge: None,
            code_challenge_method: "S256".into(),
            scope: "mcp".into(),
        })
        .await;
    store.save().await;

    let reloaded = store_at(&dir, &clock);
    reloaded.load().await;
    assert_eq!(reloaded.pending_auth_codes().await, 0);
    assert!(reloaded.get_client(&client.client_id).await.is_some());
}

#[tokio::test]
async fn test_snapshot_layout() {
    let dir = TempDir::new().unwrap();
    let clock = clock();

    let store = store_at(&dir, &clock);
    register(&store, ClientMetadata::default()).await.unwrap();

    let raw = std::fs::read_to_string(dir.path().join("oauth.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["access_tokens", "clients", "refresh_tokens"]);

    assert!(!dir.path().join("oauth.json.tmp").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_storage_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let clock = clock();

    let store = store_at(&dir, &clock);
    store.issue_tokens("client", "mcp").await;

    let path = dir.path().join("oauth.json");
    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600, "storage file must be 0600, got {mode:o}");

    // Still owner-only after a rewrite
    register(&store, ClientMetadata::default()).await.unwrap();
    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}

#[tokio::test]
async fn test_creates_missing_parent_directory() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("state").join("oauth.json");

    let store = OAuthStore::new().with_storage_path(&path);
    register(&store, ClientMetadata::default()).await.unwrap();

    assert!(path.exists());
}

#[tokio::test]
async fn test_malformed_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("oauth.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store = OAuthStore::new().with_storage_path(&path);
    store.load().await;
    assert!(store.get_client("anything").await.is_none());

    // The next write replaces the broken file
    let client = register(&store, ClientMetadata::default()).await.unwrap();
    let reloaded = OAuthStore::new().with_storage_path(&path);
    reloaded.load().await;
    assert!(reloaded.get_client(&client.client_id).await.is_some());
}

#[tokio::test]
async fn test_missing_file_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let store = OAuthStore::new().with_storage_path(dir.path().join("absent.json"));
    store.load().await;
    assert_eq!(store.pending_auth_codes().await, 0);
}
