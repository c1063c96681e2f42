//! MCP server implementation.
//!
//! Serves the MCP endpoint over HTTP behind the embedded OAuth 2.0
//! authorization server.

pub mod auth;
pub mod oauth;
pub mod transport;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::client::MemosClient;
use crate::config::Config;
use crate::tools::{self, McpTool, ToolContext};

use self::oauth::OAuthStore;

/// MCP server for Memos.
pub struct McpServer {
    /// Tool execution context.
    ctx: ToolContext,

    /// Registered tools.
    tools: Vec<Box<dyn McpTool>>,

    /// Clients, codes and tokens.
    oauth: OAuthStore,

    config: Config,
}

impl McpServer {
    /// Create a new MCP server.
    ///
    /// The token store picks up the configured access token lifetime and
    /// storage path, but is not loaded until [`McpServer::load_store`].
    #[must_use]
    pub fn new(client: MemosClient, config: Config) -> Self {
        let ctx = ToolContext::new(Arc::new(client));
        let tools = tools::register_all_tools();

        let mut oauth = OAuthStore::new().with_access_token_ttl(config.token_expiry);
        if let Some(ref path) = config.storage_path {
            oauth = oauth.with_storage_path(path.clone());
        }

        Self { ctx, tools, oauth, config }
    }

    /// Restore persisted clients and tokens, if a storage path is configured.
    pub async fn load_store(&self) {
        self.oauth.load().await;
    }

    /// Run the server in HTTP mode.
    ///
    /// # Errors
    ///
    /// Returns error if the listener cannot bind or the server fails.
    pub async fn run_http(self, addr: SocketAddr) -> anyhow::Result<()> {
        tracing::info!("Starting MCP server in HTTP mode on {}", addr);
        tracing::info!("Registered {} tools", self.tools.len());

        if !self.config.has_server_password() {
            tracing::warn!("MEMOS_MCP_PASSWORD is not set; authorization will be refused");
        }

        let router = transport::create_router(self.tools, self.ctx, self.oauth, &self.config);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("HTTP server listening on http://{}", addr);

        axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

        tracing::info!("HTTP server shut down");
        Ok(())
    }

    /// Get tool by name.
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<&dyn McpTool> {
        self.tools.iter().find(|t| t.name() == name).map(AsRef::as_ref)
    }

    /// List all available tools.
    #[must_use]
    pub fn list_tools(&self) -> Vec<(&str, &str)> {
        self.tools.iter().map(|t| (t.name(), t.description())).collect()
    }

    /// Token store shared with the HTTP handlers.
    #[must_use]
    pub const fn oauth_store(&self) -> &OAuthStore {
        &self.oauth
    }
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer").field("tools", &self.tools.len()).finish()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for CTRL+C, shutting down");
        return;
    }
    tracing::info!("Received shutdown signal");
}
