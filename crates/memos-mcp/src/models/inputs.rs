//! Input models for MCP tool parameters.

use serde::{Deserialize, Serialize};

/// Input for memo search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMemosInput {
    /// Text the memo content must contain.
    #[serde(default)]
    pub query: Option<String>,

    /// Numeric id of the creating user.
    #[serde(default)]
    pub creator_id: Option<i64>,

    /// Tag the memo must carry (without the leading `#`).
    #[serde(default)]
    pub tag: Option<String>,

    /// PUBLIC, PROTECTED or PRIVATE (any case).
    #[serde(default)]
    pub visibility: Option<String>,

    /// Page size.
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Number of memos to skip.
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    10
}

impl Default for SearchMemosInput {
    fn default() -> Self {
        Self {
            query: None,
            creator_id: None,
            tag: None,
            visibility: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

/// Input for memo creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMemoInput {
    /// Markdown content.
    pub content: String,

    #[serde(default = "default_visibility")]
    pub visibility: String,
}

fn default_visibility() -> String {
    "PRIVATE".to_string()
}

/// Input for memo update. At least one optional field must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMemoInput {
    /// UID of the memo, e.g. `abc123`.
    pub memo_uid: String,

    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub visibility: Option<String>,

    #[serde(default)]
    pub pinned: Option<bool>,
}

/// Input for memo lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetMemoInput {
    /// UID of the memo, e.g. `abc123`.
    pub memo_uid: String,
}
