//! HTTP transport: OAuth endpoints plus JSON-RPC 2.0 over Streamable HTTP.
//!
//! Every response to a JSON-RPC request is a single JSON document. There is
//! no standalone SSE stream and no session teardown, so `GET` and `DELETE`
//! on the MCP endpoint answer 405.

use std::borrow::Cow;
use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::auth::{AuthenticatedClient, require_bearer};
use super::oauth::metadata::{
    AUTH_SERVER_PATH, PROTECTED_RESOURCE_PATH, handle_auth_server_metadata,
    handle_protected_resource, resolve_issuer,
};
use super::oauth::{OAuthStore, authorize, registration, token};
use crate::config::Config;
use crate::tools::{McpTool, ToolContext};

/// Protocol version answered when the client does not send one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";

/// JSON-RPC error codes.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
}

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcResponse {
    /// JSON-RPC version constant.
    const VERSION: &'static str = "2.0";

    #[must_use]
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self { jsonrpc: Cow::Borrowed(Self::VERSION), result: Some(result), error: None, id }
    }

    #[must_use]
    pub fn error(id: Option<serde_json::Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(Self::VERSION),
            result: None,
            error: Some(JsonRpcError { code, message: message.into(), data: None }),
            id,
        }
    }
}

/// MCP tool info for tools/list response.
#[derive(Debug, Serialize)]
pub struct McpToolInfo {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// Shared state for HTTP handlers.
pub struct HttpState {
    pub tools: Vec<Box<dyn McpTool>>,
    pub ctx: ToolContext,
    pub oauth: OAuthStore,
    /// Fixed issuer. Derived per request when absent.
    pub issuer_url: Option<String>,
    /// Shared login password. `None` disables code issuance.
    pub server_password: Option<String>,
}

impl HttpState {
    /// Public base URL as seen by the client that sent `headers`.
    #[must_use]
    pub fn issuer(&self, headers: &HeaderMap) -> String {
        resolve_issuer(self.issuer_url.as_deref(), headers)
    }
}

/// Create the HTTP router: OAuth endpoints, discovery documents, and the
/// bearer-protected MCP endpoint at `/` and `/mcp`.
pub fn create_router(
    tools: Vec<Box<dyn McpTool>>,
    ctx: ToolContext,
    oauth: OAuthStore,
    config: &Config,
) -> Router {
    let state = Arc::new(HttpState {
        tools,
        ctx,
        oauth,
        issuer_url: config.issuer_url.clone(),
        server_password: config.server_password.clone(),
    });

    Router::new()
        .route("/health", get(health_check))
        .route(PROTECTED_RESOURCE_PATH, get(handle_protected_resource))
        .route(AUTH_SERVER_PATH, get(handle_auth_server_metadata))
        .route("/register", post(registration::handle_register))
        .route(
            "/authorize",
            get(authorize::handle_authorize_get).post(authorize::handle_authorize_post),
        )
        .route("/token", post(token::handle_token))
        .route("/", post(handle_mcp_post).get(method_not_allowed).delete(method_not_allowed))
        .route("/mcp", post(handle_mcp_post).get(method_not_allowed).delete(method_not_allowed))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), require_bearer))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn method_not_allowed() -> StatusCode {
    StatusCode::METHOD_NOT_ALLOWED
}

/// Handle POST requests to the MCP endpoint (Streamable HTTP transport).
async fn handle_mcp_post(
    State(state): State<Arc<HttpState>>,
    client: Option<Extension<AuthenticatedClient>>,
    body: Bytes,
) -> Response {
    let value: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "Unparseable JSON-RPC body");
            return Json(JsonRpcResponse::error(None, codes::PARSE_ERROR, "Parse error"))
                .into_response();
        }
    };

    let id = value.get("id").cloned().filter(|id| !id.is_null());
    let req: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(req) => req,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                id,
                codes::INVALID_REQUEST,
                format!("Invalid request: {e}"),
            ))
            .into_response();
        }
    };

    let client_id = client.as_ref().map_or("-", |Extension(c)| c.client_id.as_str());
    tracing::debug!(method = %req.method, client_id, "Handling MCP request");

    // Notifications never get a response body
    if req.id.is_none() {
        return StatusCode::ACCEPTED.into_response();
    }

    let response = match req.method.as_str() {
        "initialize" => JsonRpcResponse::success(req.id, handle_initialize(&req.params)),
        "ping" => JsonRpcResponse::success(req.id, json!({})),
        "tools/list" => handle_tools_list(req.id, &state.tools),
        "tools/call" => handle_tools_call(req.id, &req.params, &state, client_id).await,
        _ => JsonRpcResponse::error(
            req.id,
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
        ),
    };

    Json(response).into_response()
}

fn handle_initialize(params: &serde_json::Value) -> serde_json::Value {
    let protocol_version = params
        .get("protocolVersion")
        .and_then(|v| v.as_str())
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);

    tracing::info!("MCP initialize: protocol version {}", protocol_version);

    json!({
        "protocolVersion": protocol_version,
        "capabilities": {
            "tools": {
                "listChanged": false
            }
        },
        "serverInfo": {
            "name": "memos-mcp",
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn handle_tools_list(id: Option<serde_json::Value>, tools: &[Box<dyn McpTool>]) -> JsonRpcResponse {
    let tool_list: Vec<McpToolInfo> = tools
        .iter()
        .map(|t| McpToolInfo {
            name: t.name().to_string(),
            description: t.description().to_string(),
            input_schema: t.input_schema(),
        })
        .collect();

    JsonRpcResponse::success(id, json!({ "tools": tool_list }))
}

async fn handle_tools_call(
    id: Option<serde_json::Value>,
    params: &serde_json::Value,
    state: &HttpState,
    client_id: &str,
) -> JsonRpcResponse {
    let Some(tool_name) = params.get("name").and_then(|v| v.as_str()) else {
        return JsonRpcResponse::error(id, codes::INVALID_PARAMS, "Missing 'name' parameter");
    };

    let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

    let Some(tool) = state.tools.iter().find(|t| t.name() == tool_name) else {
        return JsonRpcResponse::error(
            id,
            codes::INVALID_PARAMS,
            format!("Tool not found: {tool_name}"),
        );
    };

    tracing::info!(tool = %tool_name, client_id, "Executing tool");

    let (text, is_error) = match tool.execute(&state.ctx, arguments).await {
        Ok(result) => (result, false),
        Err(e) => {
            tracing::warn!(tool = %tool_name, error = %e, "Tool execution failed");
            (e.to_user_message(), true)
        }
    };

    JsonRpcResponse::success(
        id,
        json!({
            "content": [{
                "type": "text",
                "text": text
            }],
            "isError": is_error
        }),
    )
}
