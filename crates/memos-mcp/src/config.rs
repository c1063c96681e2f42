//! Configuration for the Memos MCP server.

use std::path::PathBuf;
use std::time::Duration;

/// API configuration constants.
pub mod api {
    use std::time::Duration;

    /// Default Memos instance URL.
    pub const DEFAULT_BASE_URL: &str = "http://localhost:5230";

    /// Memos REST API prefix.
    pub const API_PREFIX: &str = "/api/v1";

    /// Request timeout.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Retries for transient downstream failures.
    pub const MAX_RETRIES: u32 = 3;

    /// Maximum keepalive connections.
    pub const MAX_KEEPALIVE: usize = 10;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);
}

/// OAuth configuration constants.
pub mod oauth {
    /// Default access token lifetime in seconds.
    pub const DEFAULT_TOKEN_EXPIRY_SECS: u64 = 3600;

    /// Longest accepted access token lifetime (one year).
    pub const MAX_TOKEN_EXPIRY_SECS: u64 = 365 * 24 * 60 * 60;

    /// Authorization code lifetime in seconds.
    pub const AUTH_CODE_LIFETIME_SECS: i64 = 300;

    /// Scope granted when the client does not ask for one.
    pub const DEFAULT_SCOPE: &str = "mcp";
}

/// Server configuration.
#[derive(Clone)]
pub struct Config {
    /// Memos instance base URL (no trailing slash).
    pub memos_base_url: String,

    /// Token forwarded to Memos as `Authorization: Bearer` (optional).
    pub memos_api_token: Option<String>,

    /// Shared password checked by the `/authorize` login form.
    pub server_password: Option<String>,

    /// Fixed OAuth issuer URL. Auto-detected from request headers when absent.
    pub issuer_url: Option<String>,

    /// Access token lifetime.
    pub token_expiry: Duration,

    /// JSON file mirroring issued clients and tokens (optional).
    pub storage_path: Option<PathBuf>,

    /// Request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Retries on transient downstream failures.
    pub max_retries: u32,
}

impl Config {
    /// Create a new configuration for the given Memos instance.
    #[must_use]
    pub fn new(memos_base_url: impl Into<String>, memos_api_token: Option<String>) -> Self {
        Self {
            memos_base_url: memos_base_url.into().trim_end_matches('/').to_string(),
            memos_api_token: memos_api_token.filter(|t| !t.is_empty()),
            server_password: None,
            issuer_url: None,
            token_expiry: Duration::from_secs(oauth::DEFAULT_TOKEN_EXPIRY_SECS),
            storage_path: None,
            request_timeout: api::REQUEST_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            max_retries: api::MAX_RETRIES,
        }
    }

    /// Create a test configuration pointing at a mock server.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            memos_base_url: base_url.trim_end_matches('/').to_string(),
            memos_api_token: Some("test-memos-token".to_string()),
            server_password: Some("test-password".to_string()),
            issuer_url: None,
            token_expiry: Duration::from_secs(oauth::DEFAULT_TOKEN_EXPIRY_SECS),
            storage_path: None,
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            max_retries: 0, // Fail fast in tests
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns error if `MEMOS_MCP_TOKEN_EXPIRY` is not a positive integer.
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var("MEMOS_BASE_URL")
            .unwrap_or_else(|_| api::DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(base_url, non_empty_var("MEMOS_API_TOKEN"));

        config.server_password = non_empty_var("MEMOS_MCP_PASSWORD");
        config.issuer_url = non_empty_var("MEMOS_MCP_ISSUER_URL");
        config.storage_path = non_empty_var("MEMOS_MCP_STORAGE_PATH").map(PathBuf::from);

        if let Some(raw) = non_empty_var("MEMOS_MCP_TOKEN_EXPIRY") {
            config.token_expiry = parse_token_expiry(&raw)?;
        }

        Ok(config)
    }

    /// Check if a Memos API token is configured.
    #[must_use]
    pub const fn has_api_token(&self) -> bool {
        self.memos_api_token.is_some()
    }

    /// Check if the login password is configured.
    #[must_use]
    pub const fn has_server_password(&self) -> bool {
        self.server_password.is_some()
    }
}

/// Parse an access-token lifetime in whole seconds.
///
/// # Errors
///
/// Returns error on non-numeric input, zero, or anything above one year.
pub fn parse_token_expiry(raw: &str) -> anyhow::Result<Duration> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("MEMOS_MCP_TOKEN_EXPIRY must be a number of seconds: {e}"))?;
    if secs == 0 {
        anyhow::bail!("MEMOS_MCP_TOKEN_EXPIRY must be greater than zero");
    }
    if secs > oauth::MAX_TOKEN_EXPIRY_SECS {
        anyhow::bail!(
            "MEMOS_MCP_TOKEN_EXPIRY must be at most {} seconds",
            oauth::MAX_TOKEN_EXPIRY_SECS
        );
    }
    Ok(Duration::from_secs(secs))
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Default for Config {
    fn default() -> Self {
        Self::new(api::DEFAULT_BASE_URL, None)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("memos_base_url", &self.memos_base_url)
            .field("has_api_token", &self.has_api_token())
            .field("has_server_password", &self.has_server_password())
            .field("issuer_url", &self.issuer_url)
            .field("token_expiry", &self.token_expiry)
            .field("storage_path", &self.storage_path)
            .finish()
    }
}
