//! Memos REST API client.
//!
//! Provides async HTTP client with:
//! - Connection pooling via reqwest
//! - Retry middleware with exponential backoff
//! - Bearer authentication against the Memos instance

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};

use crate::config::{Config, api};
use crate::error::{ClientError, ClientResult};
use crate::models::{CreateMemoRequest, ListMemosResponse, Memo, MemoPatch, Visibility};

/// Memos API client.
#[derive(Clone)]
pub struct MemosClient {
    /// HTTP client with middleware.
    client: ClientWithMiddleware,

    /// `{base_url}/api/v1`.
    api_url: String,

    has_token: bool,
}

impl MemosClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the API token is not a valid header value or the
    /// HTTP client cannot be built.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(ref token) = config.memos_api_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(api::MAX_KEEPALIVE)
            .pool_idle_timeout(api::KEEPALIVE_EXPIRY)
            .gzip(true)
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_millis(500), Duration::from_secs(10))
            .build_with_max_retries(config.max_retries);

        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            api_url: format!("{}{}", config.memos_base_url, api::API_PREFIX),
            has_token: config.memos_api_token.is_some(),
        })
    }

    /// Check if an API token is configured.
    #[must_use]
    pub const fn has_api_token(&self) -> bool {
        self.has_token
    }

    /// List memos matching a CEL filter.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn list_memos(
        &self,
        filter: Option<&str>,
        page_size: u32,
        page_token: Option<&str>,
    ) -> ClientResult<ListMemosResponse> {
        let url = format!("{}/memos", self.api_url);

        let mut params = vec![("pageSize".to_string(), page_size.to_string())];
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            params.push(("filter".to_string(), filter.to_string()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken".to_string(), token.to_string()));
        }

        tracing::debug!(page_size, filter = filter.unwrap_or("-"), "Listing memos");
        self.get(&url, &params).await
    }

    /// Create a memo.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn create_memo(&self, content: &str, visibility: Visibility) -> ClientResult<Memo> {
        let url = format!("{}/memos", self.api_url);
        let body = serde_json::to_value(CreateMemoRequest {
            content,
            visibility: visibility.as_str(),
        })?;

        self.send(self.client.post(&url), &body).await
    }

    /// Apply a partial update to a memo.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn update_memo(&self, uid: &str, patch: &MemoPatch) -> ClientResult<Memo> {
        let url = format!("{}/memos/{}", self.api_url, uid);
        self.send(self.client.patch(&url), &patch.to_body()).await
    }

    /// Get a single memo by UID.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn get_memo(&self, uid: &str) -> ClientResult<Memo> {
        let url = format!("{}/memos/{}", self.api_url, uid);
        self.get(&url, &[]).await
    }

    /// Make a GET request.
    async fn get<T>(&self, url: &str, params: &[(String, String)]) -> ClientResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self.client.get(url).query(params).send().await?;

        let response = Self::handle_response(response).await?;
        let value: serde_json::Value = response.json().await?;

        serde_json::from_value(value).map_err(ClientError::from)
    }

    /// Send a request with a JSON body.
    async fn send<T>(
        &self,
        request: reqwest_middleware::RequestBuilder,
        body: &serde_json::Value,
    ) -> ClientResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let body_str = serde_json::to_string(body)?;

        let response = request.body(body_str).send().await?;

        let response = Self::handle_response(response).await?;
        let value: serde_json::Value = response.json().await?;

        serde_json::from_value(value).map_err(ClientError::from)
    }

    /// Handle API response status codes.
    async fn handle_response(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), "Memos API returned an error");

        match status.as_u16() {
            404 => Err(ClientError::not_found(text)),
            400 => Err(ClientError::bad_request(text)),
            401 | 403 => Err(ClientError::Unauthorized { message: text }),
            500..=599 => Err(ClientError::server(status.as_u16(), text)),
            _ => Err(ClientError::UnexpectedStatus { status: status.as_u16(), message: text }),
        }
    }
}

impl std::fmt::Debug for MemosClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemosClient")
            .field("api_url", &self.api_url)
            .field("has_api_token", &self.has_token)
            .finish()
    }
}
