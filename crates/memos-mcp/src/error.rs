//! Error types for the Memos MCP server.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Errors from the Memos HTTP client layer.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Middleware error
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// Memo not found (404 response)
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Description of the missing resource
        resource: String,
    },

    /// Invalid request parameters (400 response)
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message from API
        message: String,
    },

    /// Memos rejected the configured API token (401/403 response)
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Error message from API
        message: String,
    },

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Server error (5xx response)
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },
}

impl ClientError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    /// Create a server error.
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server { status, message: message.into() }
    }
}

/// Errors from MCP tool execution.
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    /// Error from the Memos client
    #[error("API error: {0}")]
    Client(#[from] ClientError),

    /// Input validation failed
    #[error("Validation error: {message}")]
    Validation {
        /// Field that failed validation
        field: String,
        /// Validation error message
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Convert to a user-friendly error message for MCP response.
    #[must_use]
    pub fn to_user_message(&self) -> String {
        match self {
            Self::Client(ClientError::NotFound { resource }) => {
                format!("Memo not found: {resource}. Please check the UID is correct.")
            }
            Self::Client(ClientError::Unauthorized { .. }) => {
                "Memos rejected the configured API token.".to_string()
            }
            Self::Validation { field, message } => {
                format!("Invalid input for '{field}': {message}")
            }
            _ => self.to_string(),
        }
    }
}

/// OAuth protocol errors, rendered as `{error, error_description}` JSON.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OAuthError {
    /// A required parameter is missing or malformed.
    #[error("invalid_request: {0}")]
    InvalidRequest(String),

    /// Unknown client, or client authentication failed.
    #[error("invalid_client: {0}")]
    InvalidClient(String),

    /// Registration metadata was rejected (RFC 7591 §3.2.2).
    #[error("invalid_client_metadata: {0}")]
    InvalidClientMetadata(String),

    /// Bad, expired or mismatched code or refresh token, or failed PKCE.
    #[error("invalid_grant: {0}")]
    InvalidGrant(String),

    /// The grant type is not one this server issues tokens for.
    #[error("unsupported_grant_type: {0}")]
    UnsupportedGrantType(String),

    /// No usable bearer credential on a protected request.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Bearer token is unknown or expired.
    #[error("invalid_token: {0}")]
    InvalidToken(String),

    /// The server is missing required configuration.
    #[error("configuration_error: {0}")]
    Configuration(String),
}

impl OAuthError {
    /// Wire-level error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidClient(_) => "invalid_client",
            Self::InvalidClientMetadata(_) => "invalid_client_metadata",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::Unauthorized(_) => "unauthorized",
            Self::InvalidToken(_) => "invalid_token",
            Self::Configuration(_) => "configuration_error",
        }
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::InvalidRequest(d)
            | Self::InvalidClient(d)
            | Self::InvalidClientMetadata(d)
            | Self::InvalidGrant(d)
            | Self::UnsupportedGrantType(d)
            | Self::Unauthorized(d)
            | Self::InvalidToken(d)
            | Self::Configuration(d) => d,
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidClient(_) | Self::Unauthorized(_) | Self::InvalidToken(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(serde_json::json!({
                "error": self.code(),
                "error_description": self.description()
            })),
        )
            .into_response()
    }
}

/// Errors from persisting the token store. Logged, never surfaced to clients.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Filesystem failure while reading or writing the snapshot.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded or decoded.
    #[error("storage format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Result type alias for OAuth operations.
pub type OAuthResult<T> = Result<T, OAuthError>;
