//! Memos MCP Server
//!
//! A Model Context Protocol (MCP) server for a [Memos](https://usememos.com)
//! instance, reachable over HTTP and guarded by an embedded OAuth 2.0
//! authorization server.
//!
//! # Features
//!
//! - **4 MCP Tools**: search, create, update and fetch memos
//! - **OAuth 2.0**: dynamic client registration, PKCE (S256), refresh tokens
//! - **Single-user login**: one shared password approves new clients
//! - **Optional persistence**: clients and tokens survive restarts
//!
//! # Example
//!
//! ```no_run
//! use memos_mcp::{client::MemosClient, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let client = MemosClient::new(&config)?;
//!
//!     let memo = client.get_memo("abc123").await?;
//!     println!("{:?}", memo.content);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod formatters;
pub mod models;
pub mod server;
pub mod tools;

pub use client::MemosClient;
pub use config::Config;
pub use error::{ClientError, OAuthError, ToolError};
