//! Memo tools: search_memos, create_memo, update_memo, get_memo.

use serde_json::json;

use super::{McpTool, ToolContext};
use crate::error::{ToolError, ToolResult};
use crate::formatters;
use crate::models::{
    CreateMemoInput, GetMemoInput, MemoPatch, SearchMemosInput, UpdateMemoInput, Visibility,
};

/// Largest page Memos will return.
const MAX_PAGE_SIZE: u32 = 1000;

/// Quote a value as a CEL string literal.
fn cel_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn parse_visibility(raw: &str) -> ToolResult<Visibility> {
    raw.parse::<Visibility>().map_err(|msg| ToolError::validation("visibility", msg))
}

fn validate_uid(uid: &str) -> ToolResult<&str> {
    let uid = uid.trim();
    if uid.is_empty() || uid.contains('/') {
        return Err(ToolError::validation("memo_uid", "must be a bare memo UID, e.g. 'abc123'"));
    }
    Ok(uid)
}

/// Build the CEL filter for a search, joining clauses with `&&`.
///
/// # Errors
///
/// Returns a validation error for an unknown visibility.
pub fn build_filter(params: &SearchMemosInput) -> ToolResult<Option<String>> {
    let mut filters = Vec::new();

    if let Some(creator_id) = params.creator_id {
        filters.push(format!("creator_id == {creator_id}"));
    }

    if let Some(query) = params.query.as_deref().filter(|q| !q.is_empty()) {
        filters.push(format!("content.contains({})", cel_string(query)));
    }

    if let Some(tag) = params.tag.as_deref().filter(|t| !t.is_empty()) {
        filters.push(format!("tag in [{}]", cel_string(tag)));
    }

    if let Some(visibility) = params.visibility.as_deref().filter(|v| !v.is_empty()) {
        let visibility = parse_visibility(visibility)?;
        filters.push(format!("visibility == {}", cel_string(visibility.as_str())));
    }

    Ok((!filters.is_empty()).then(|| filters.join(" && ")))
}

/// Offset-style page token, sent only once the offset reaches a full page.
#[must_use]
pub fn page_token(offset: u32, limit: u32) -> Option<String> {
    (offset > 0 && limit > 0 && offset / limit > 0).then(|| format!("offset={offset}"))
}

/// Memo search tool.
pub struct SearchMemosTool;

#[async_trait::async_trait]
impl McpTool for SearchMemosTool {
    fn name(&self) -> &'static str {
        "search_memos"
    }

    fn description(&self) -> &'static str {
        "Search memos by content text, creator, tag or visibility. \
         All given filters must match."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Text to search for in memo content"
                },
                "creator_id": {
                    "type": "integer",
                    "description": "Only memos created by this user id"
                },
                "tag": {
                    "type": "string",
                    "description": "Only memos carrying this tag (without '#')"
                },
                "visibility": {
                    "type": "string",
                    "enum": Visibility::ALL
                },
                "limit": {
                    "type": "integer",
                    "default": 10,
                    "minimum": 1,
                    "maximum": MAX_PAGE_SIZE
                },
                "offset": {
                    "type": "integer",
                    "default": 0,
                    "minimum": 0
                }
            }
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let params: SearchMemosInput = serde_json::from_value(input)?;

        if params.limit == 0 || params.limit > MAX_PAGE_SIZE {
            return Err(ToolError::validation(
                "limit",
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }

        let filter = build_filter(&params)?;
        let token = page_token(params.offset, params.limit);

        let list = ctx
            .client
            .list_memos(filter.as_deref(), params.limit, token.as_deref())
            .await?;

        Ok(serde_json::to_string_pretty(&formatters::search_result(&list))?)
    }
}

/// Memo creation tool.
pub struct CreateMemoTool;

#[async_trait::async_trait]
impl McpTool for CreateMemoTool {
    fn name(&self) -> &'static str {
        "create_memo"
    }

    fn description(&self) -> &'static str {
        "Create a new memo. Content supports Markdown and #tags."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "Memo content (Markdown)"
                },
                "visibility": {
                    "type": "string",
                    "enum": Visibility::ALL,
                    "default": "PRIVATE"
                }
            },
            "required": ["content"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let params: CreateMemoInput = serde_json::from_value(input)?;
        let visibility = parse_visibility(&params.visibility)?;

        let memo = ctx.client.create_memo(&params.content, visibility).await?;
        tracing::info!(uid = memo.uid().unwrap_or("-"), "Created memo");

        Ok(serde_json::to_string_pretty(&formatters::write_result(&memo))?)
    }
}

/// Memo update tool.
pub struct UpdateMemoTool;

#[async_trait::async_trait]
impl McpTool for UpdateMemoTool {
    fn name(&self) -> &'static str {
        "update_memo"
    }

    fn description(&self) -> &'static str {
        "Update the content, visibility or pinned state of an existing memo. \
         Fields left out are not changed."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "memo_uid": {
                    "type": "string",
                    "description": "UID of the memo to update (e.g., 'abc123')"
                },
                "content": {
                    "type": "string",
                    "description": "New content"
                },
                "visibility": {
                    "type": "string",
                    "enum": Visibility::ALL
                },
                "pinned": {
                    "type": "boolean"
                }
            },
            "required": ["memo_uid"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let params: UpdateMemoInput = serde_json::from_value(input)?;
        let uid = validate_uid(&params.memo_uid)?;

        let visibility = params
            .visibility
            .as_deref()
            .map(parse_visibility)
            .transpose()?
            .map(|v| v.as_str().to_string());

        let patch = MemoPatch { content: params.content, visibility, pinned: params.pinned };
        if patch.is_empty() {
            return Err(ToolError::validation(
                "update",
                "at least one of content, visibility or pinned must be provided",
            ));
        }

        let memo = ctx.client.update_memo(uid, &patch).await?;
        tracing::info!(uid = %uid, "Updated memo");

        Ok(serde_json::to_string_pretty(&formatters::write_result(&memo))?)
    }
}

/// Memo lookup tool.
pub struct GetMemoTool;

#[async_trait::async_trait]
impl McpTool for GetMemoTool {
    fn name(&self) -> &'static str {
        "get_memo"
    }

    fn description(&self) -> &'static str {
        "Get a single memo by its UID."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "memo_uid": {
                    "type": "string",
                    "description": "UID of the memo (e.g., 'abc123')"
                }
            },
            "required": ["memo_uid"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let params: GetMemoInput = serde_json::from_value(input)?;
        let uid = validate_uid(&params.memo_uid)?;

        let memo = ctx.client.get_memo(uid).await?;

        Ok(serde_json::to_string_pretty(&formatters::memo_detail(&memo))?)
    }
}
