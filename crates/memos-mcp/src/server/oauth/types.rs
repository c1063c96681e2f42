//! OAuth 2.0 records held by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Grant types a client may register for.
pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";
pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";

/// The only response type.
pub const RESPONSE_TYPE_CODE: &str = "code";

/// A dynamically registered OAuth client (RFC 7591).
///
/// Optional metadata is omitted from JSON when absent, never emitted as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredClient {
    pub client_id: String,
    pub client_secret: String,
    pub issued_at: DateTime<Utc>,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub token_endpoint_auth_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub redirect_uris: Vec<String>,
    pub scope: String,
}

impl RegisteredClient {
    /// Whether `uri` may receive authorization responses for this client.
    ///
    /// Clients that registered no redirect URIs accept any absolute URI.
    #[must_use]
    pub fn allows_redirect(&self, uri: &str) -> bool {
        if self.redirect_uris.is_empty() {
            return url::Url::parse(uri).is_ok();
        }
        self.redirect_uris.iter().any(|u| u == uri)
    }
}

/// An authorization code issued after a successful login. Memory only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    pub code: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub code_challenge: Option<String>,
    pub code_challenge_method: String,
    pub scope: String,
    pub expires_at: DateTime<Utc>,
}

/// An opaque access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub client_id: String,
    pub scope: String,
    pub expires_at: DateTime<Utc>,
}

/// A non-expiring, non-rotating refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    pub token: String,
    pub client_id: String,
    pub scope: String,
}

/// Expiry check shared by codes and access tokens: the boundary instant is expired.
#[must_use]
pub fn is_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= expires_at
}

impl AccessToken {
    /// Check if the token has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        is_expired(self.expires_at, now)
    }

    /// Seconds until expiry, rounded up, floored at zero.
    #[must_use]
    pub fn expires_in(&self, now: DateTime<Utc>) -> u64 {
        let remaining_ms = (self.expires_at - now).num_milliseconds();
        u64::try_from(remaining_ms).map_or(0, |ms| ms.div_ceil(1000))
    }
}

impl AuthorizationCode {
    /// Check if the code has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        is_expired(self.expires_at, now)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn client(redirect_uris: Vec<String>) -> RegisteredClient {
        RegisteredClient {
            client_id: "cid".into(),
            client_secret: "secret".into(),
            issued_at: Utc::now(),
            grant_types: vec![GRANT_AUTHORIZATION_CODE.into()],
            response_types: vec![RESPONSE_TYPE_CODE.into()],
            token_endpoint_auth_method: "none".into(),
            client_name: None,
            redirect_uris,
            scope: "mcp".into(),
        }
    }

    #[test]
    fn test_expiry_boundary_is_expired() {
        let now = Utc::now();
        assert!(is_expired(now, now));
        assert!(!is_expired(now + Duration::seconds(1), now));
        assert!(is_expired(now - Duration::seconds(1), now));
    }

    #[test]
    fn test_client_serialization_omits_absent_optionals() {
        let json = serde_json::to_value(client(vec![])).unwrap();
        assert!(json.get("client_name").is_none());
        assert!(json.get("redirect_uris").is_none());
        assert!(!json.to_string().contains("null"));
    }

    #[test]
    fn test_allows_redirect() {
        let registered = client(vec!["https://app.example/cb".into()]);
        assert!(registered.allows_redirect("https://app.example/cb"));
        assert!(!registered.allows_redirect("https://evil.example/cb"));

        let open = client(vec![]);
        assert!(open.allows_redirect("http://localhost:9999/callback"));
        assert!(!open.allows_redirect("not a url"));
    }

    #[test]
    fn test_expires_in_floors_at_zero() {
        let now = Utc::now();
        let token = AccessToken {
            token: "t".into(),
            client_id: "c".into(),
            scope: "mcp".into(),
            expires_at: now - Duration::seconds(5),
        };
        assert_eq!(token.expires_in(now), 0);
        assert_eq!(token.expires_in(now - Duration::seconds(65)), 60);
        assert_eq!(token.expires_in(now - Duration::milliseconds(5500)), 1);
    }
}
