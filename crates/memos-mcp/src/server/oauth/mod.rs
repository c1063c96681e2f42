//! OAuth 2.0 authorization server guarding the MCP endpoint.
//!
//! Self-contained and embedded in the binary. A single shared password
//! stands in for user accounts.
//!
//! ## Supported Standards
//! - RFC 9728: OAuth Protected Resource Metadata
//! - RFC 8414: OAuth Authorization Server Metadata
//! - RFC 7591: Dynamic Client Registration
//! - RFC 7636: PKCE (S256)
//! - RFC 6749: Authorization Code and Refresh Token grants

pub mod authorize;
pub mod clock;
pub mod credentials;
pub mod login;
pub mod metadata;
pub mod pkce;
pub mod registration;
pub mod store;
pub mod token;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use registration::{ClientMetadata, register};
pub use store::{CodeGrant, OAuthStore};
pub use token::{TokenRequest, TokenResponse, exchange};
pub use types::{AccessToken, AuthorizationCode, RefreshToken, RegisteredClient};
