//! MCP tool implementations.
//!
//! Each tool:
//! 1. Parses and validates its input parameters
//! 2. Calls the Memos API client
//! 3. Returns the result as a JSON document

mod memos;

pub use memos::*;

use std::sync::Arc;

use crate::client::MemosClient;
use crate::error::ToolResult;

/// Tool execution context.
pub struct ToolContext {
    /// API client.
    pub client: Arc<MemosClient>,
}

impl ToolContext {
    /// Create a new tool context.
    #[must_use]
    pub const fn new(client: Arc<MemosClient>) -> Self {
        Self { client }
    }
}

/// Trait for MCP tools.
#[async_trait::async_trait]
pub trait McpTool: Send + Sync {
    /// Tool name (e.g., "search_memos").
    fn name(&self) -> &'static str;

    /// Tool description for LLM.
    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool with given input.
    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String>;
}

/// Register all tools.
#[must_use]
pub fn register_all_tools() -> Vec<Box<dyn McpTool>> {
    vec![
        Box::new(SearchMemosTool),
        Box::new(CreateMemoTool),
        Box::new(UpdateMemoTool),
        Box::new(GetMemoTool),
    ]
}
