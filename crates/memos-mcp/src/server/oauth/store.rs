//! OAuth state store with optional JSON file mirroring.
//!
//! All four record kinds live in `RwLock`-guarded maps. Clients, access tokens
//! and refresh tokens are written to disk after each mutation when a storage
//! path is configured; authorization codes stay in memory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use super::clock::{Clock, SystemClock};
use super::credentials;
use super::types::{AccessToken, AuthorizationCode, RefreshToken, RegisteredClient};
use crate::config::oauth::{
    AUTH_CODE_LIFETIME_SECS, DEFAULT_TOKEN_EXPIRY_SECS, MAX_TOKEN_EXPIRY_SECS,
};
use crate::error::{OAuthError, OAuthResult, StoreError};

/// Parameters bound into a new authorization code.
#[derive(Debug, Clone)]
pub struct CodeGrant {
    pub client_id: String,
    pub redirect_uri: String,
    pub code_challenge: Option<String>,
    pub code_challenge_method: String,
    pub scope: String,
}

/// On-disk layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    clients: HashMap<String, RegisteredClient>,
    #[serde(default)]
    access_tokens: HashMap<String, AccessToken>,
    #[serde(default)]
    refresh_tokens: HashMap<String, RefreshToken>,
}

/// Shared OAuth state. Cheap to clone; clones share the same maps.
#[derive(Clone)]
pub struct OAuthStore {
    clients: Arc<RwLock<HashMap<String, RegisteredClient>>>,
    auth_codes: Arc<RwLock<HashMap<String, AuthorizationCode>>>,
    access_tokens: Arc<RwLock<HashMap<String, AccessToken>>>,
    refresh_tokens: Arc<RwLock<HashMap<String, RefreshToken>>>,
    clock: Arc<dyn Clock>,
    /// Whole seconds, never above `MAX_TOKEN_EXPIRY_SECS`.
    access_token_ttl_secs: u32,
    storage_path: Option<PathBuf>,
    /// Serializes snapshot writes so an older snapshot never overwrites a newer one.
    save_lock: Arc<Mutex<()>>,
}

impl OAuthStore {
    /// Empty in-memory store on the system clock with the default token TTL.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
            auth_codes: Arc::new(RwLock::new(HashMap::new())),
            access_tokens: Arc::new(RwLock::new(HashMap::new())),
            refresh_tokens: Arc::new(RwLock::new(HashMap::new())),
            clock: Arc::new(SystemClock),
            access_token_ttl_secs: 0,
            storage_path: None,
            save_lock: Arc::new(Mutex::new(())),
        }
        .with_access_token_ttl(Duration::from_secs(DEFAULT_TOKEN_EXPIRY_SECS))
    }

    /// Use a different time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the access token lifetime, capped at one year.
    #[must_use]
    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        let secs = ttl.as_secs();
        if secs > MAX_TOKEN_EXPIRY_SECS {
            tracing::warn!(
                requested = secs,
                max = MAX_TOKEN_EXPIRY_SECS,
                "Access token lifetime capped"
            );
        }
        self.access_token_ttl_secs =
            u32::try_from(secs.min(MAX_TOKEN_EXPIRY_SECS)).unwrap_or(u32::MAX);
        self
    }

    /// Mirror clients and tokens to a JSON file.
    #[must_use]
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Current time according to the store's clock.
    #[must_use]
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Access token lifetime in seconds.
    #[must_use]
    pub fn access_token_ttl_secs(&self) -> u64 {
        u64::from(self.access_token_ttl_secs)
    }

    #[must_use]
    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }

    // ── Clients ──────────────────────────────────────────────────

    /// Insert a freshly registered client and persist.
    pub async fn insert_client(&self, client: RegisteredClient) {
        self.clients.write().await.insert(client.client_id.clone(), client);
        self.save().await;
    }

    /// Look up a client by ID.
    pub async fn get_client(&self, client_id: &str) -> Option<RegisteredClient> {
        self.clients.read().await.get(client_id).cloned()
    }

    // ── Authorization codes ──────────────────────────────────────

    /// Mint an authorization code valid for five minutes. Not persisted.
    pub async fn create_auth_code(&self, grant: CodeGrant) -> AuthorizationCode {
        let code = AuthorizationCode {
            code: credentials::secret(),
            client_id: grant.client_id,
            redirect_uri: grant.redirect_uri,
            code_challenge: grant.code_challenge,
            code_challenge_method: grant.code_challenge_method,
            scope: grant.scope,
            expires_at: self.now() + chrono::Duration::seconds(AUTH_CODE_LIFETIME_SECS),
        };

        self.auth_codes.write().await.insert(code.code.clone(), code.clone());
        code
    }

    /// Remove and return an authorization code, expired or not.
    ///
    /// Removal happens on lookup so a code can never be presented twice,
    /// whatever the outcome of the exchange.
    pub async fn take_auth_code(&self, code: &str) -> Option<AuthorizationCode> {
        self.auth_codes.write().await.remove(code)
    }

    /// Number of outstanding authorization codes.
    pub async fn pending_auth_codes(&self) -> usize {
        self.auth_codes.read().await.len()
    }

    // ── Tokens ───────────────────────────────────────────────────

    /// Issue an access token together with a refresh token, and persist.
    pub async fn issue_tokens(&self, client_id: &str, scope: &str) -> (AccessToken, RefreshToken) {
        let access = self.new_access_token(client_id, scope);
        let refresh = RefreshToken {
            token: credentials::secret(),
            client_id: client_id.to_owned(),
            scope: scope.to_owned(),
        };

        self.access_tokens.write().await.insert(access.token.clone(), access.clone());
        self.refresh_tokens.write().await.insert(refresh.token.clone(), refresh.clone());
        self.save().await;

        (access, refresh)
    }

    /// Issue an access token alone (refresh grant), and persist.
    pub async fn issue_access_token(&self, client_id: &str, scope: &str) -> AccessToken {
        let access = self.new_access_token(client_id, scope);
        self.access_tokens.write().await.insert(access.token.clone(), access.clone());
        self.save().await;
        access
    }

    fn new_access_token(&self, client_id: &str, scope: &str) -> AccessToken {
        let ttl = chrono::Duration::seconds(i64::from(self.access_token_ttl_secs));
        AccessToken {
            token: credentials::secret(),
            client_id: client_id.to_owned(),
            scope: scope.to_owned(),
            expires_at: self
                .now()
                .checked_add_signed(ttl)
                .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC),
        }
    }

    /// Look up a refresh token.
    pub async fn get_refresh_token(&self, token: &str) -> Option<RefreshToken> {
        self.refresh_tokens.read().await.get(token).cloned()
    }

    /// Check an access token presented as a bearer credential.
    ///
    /// Expired tokens are rejected but left in place.
    pub async fn validate_access_token(&self, token: &str) -> OAuthResult<AccessToken> {
        let tokens = self.access_tokens.read().await;
        let Some(access) = tokens.get(token) else {
            return Err(OAuthError::InvalidToken("Unknown access token".into()));
        };
        if access.is_expired_at(self.now()) {
            return Err(OAuthError::InvalidToken("Access token expired".into()));
        }
        Ok(access.clone())
    }

    /// Drop expired authorization codes and access tokens.
    ///
    /// Never scheduled automatically. Returns how many records were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.now();

        let codes_removed = {
            let mut codes = self.auth_codes.write().await;
            let before = codes.len();
            codes.retain(|_, c| !c.is_expired_at(now));
            before - codes.len()
        };

        let tokens_removed = {
            let mut tokens = self.access_tokens.write().await;
            let before = tokens.len();
            tokens.retain(|_, t| !t.is_expired_at(now));
            before - tokens.len()
        };

        if tokens_removed > 0 {
            self.save().await;
        }

        let removed = codes_removed + tokens_removed;
        if removed > 0 {
            tracing::debug!(codes = codes_removed, tokens = tokens_removed, "Purged expired OAuth records");
        }
        removed
    }

    // ── Persistence ──────────────────────────────────────────────

    /// Load persisted clients and tokens.
    ///
    /// A missing or malformed file is logged and leaves the store empty.
    /// Access tokens that expired while the process was down are skipped.
    pub async fn load(&self) {
        let Some(path) = self.storage_path.as_deref() else {
            return;
        };

        let snapshot = match read_snapshot(path).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::info!(path = %path.display(), "No OAuth storage file yet, starting empty");
                return;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable OAuth storage");
                return;
            }
        };

        let now = self.now();
        let access_tokens: HashMap<String, AccessToken> = snapshot
            .access_tokens
            .into_iter()
            .filter(|(_, t)| !t.is_expired_at(now))
            .collect();

        tracing::info!(
            clients = snapshot.clients.len(),
            access_tokens = access_tokens.len(),
            refresh_tokens = snapshot.refresh_tokens.len(),
            "OAuth store loaded"
        );

        *self.clients.write().await = snapshot.clients;
        *self.access_tokens.write().await = access_tokens;
        *self.refresh_tokens.write().await = snapshot.refresh_tokens;
    }

    /// Write the current snapshot to disk.
    ///
    /// Failures are logged; in-memory state stays authoritative.
    pub async fn save(&self) {
        let Some(path) = self.storage_path.as_deref() else {
            return;
        };

        let _guard = self.save_lock.lock().await;
        let snapshot = Snapshot {
            clients: self.clients.read().await.clone(),
            access_tokens: self.access_tokens.read().await.clone(),
            refresh_tokens: self.refresh_tokens.read().await.clone(),
        };

        if let Err(e) = write_snapshot(path, &snapshot).await {
            tracing::error!(path = %path.display(), error = %e, "Failed to save OAuth store");
        }
    }
}

async fn read_snapshot(path: &Path) -> Result<Option<Snapshot>, StoreError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&raw)?))
}

async fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_vec_pretty(snapshot)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, json).await?;

    // Owner-only: the snapshot holds client secrets and bearer tokens
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
    }

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

impl Default for OAuthStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OAuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthStore")
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("storage_path", &self.storage_path)
            .finish()
    }
}
