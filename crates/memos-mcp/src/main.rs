//! Memos MCP Server - Entry Point
//!
//! Serves the MCP endpoint over HTTP behind the embedded OAuth server.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use memos_mcp::{MemosClient, config::Config, server::McpServer};

#[derive(Parser, Debug)]
#[command(name = "memos-mcp")]
#[command(about = "MCP server for a Memos instance, with an embedded OAuth 2.0 server")]
#[command(version)]
struct Cli {
    /// Memos instance base URL
    #[arg(long, env = "MEMOS_BASE_URL")]
    memos_base_url: Option<String>,

    /// Memos API token
    #[arg(long, env = "MEMOS_API_TOKEN", hide_env_values = true)]
    memos_api_token: Option<String>,

    /// Shared password for approving OAuth clients
    #[arg(long, env = "MEMOS_MCP_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Public issuer URL (auto-detected from request headers when unset)
    #[arg(long, env = "MEMOS_MCP_ISSUER_URL")]
    issuer_url: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, env = "MEMOS_MCP_TOKEN_EXPIRY")]
    token_expiry: Option<String>,

    /// JSON file for persisting clients and tokens
    #[arg(long, env = "MEMOS_MCP_STORAGE_PATH")]
    storage_path: Option<PathBuf>,

    /// Listen host
    #[arg(long, default_value = "0.0.0.0", env = "MEMOS_MCP_HOST")]
    host: String,

    /// Listen port
    #[arg(long, default_value = "8716", env = "MEMOS_MCP_PORT")]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    /// Environment-derived config with flags layered on top.
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = Config::from_env()?;

        if let Some(url) = self.memos_base_url.filter(|u| !u.is_empty()) {
            config.memos_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(token) = self.memos_api_token.filter(|t| !t.is_empty()) {
            config.memos_api_token = Some(token);
        }
        if let Some(password) = self.password.filter(|p| !p.is_empty()) {
            config.server_password = Some(password);
        }
        if let Some(issuer) = self.issuer_url.filter(|i| !i.is_empty()) {
            config.issuer_url = Some(issuer);
        }
        if let Some(raw) = self.token_expiry {
            config.token_expiry = memos_mcp::config::parse_token_expiry(&raw)?;
        }
        if let Some(path) = self.storage_path {
            config.storage_path = Some(path);
        }

        Ok(config)
    }
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    let ip: IpAddr =
        cli.host.parse().with_context(|| format!("invalid listen host {}", cli.host))?;
    let addr = SocketAddr::new(ip, cli.port);

    let config = cli.into_config()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        memos_base_url = %config.memos_base_url,
        has_api_token = config.has_api_token(),
        persistent = config.storage_path.is_some(),
        "Starting Memos MCP server"
    );

    let client = MemosClient::new(&config)?;
    let server = McpServer::new(client, config);
    server.load_store().await;

    server.run_http(addr).await
}
