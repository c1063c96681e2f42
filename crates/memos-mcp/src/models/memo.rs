//! Memo resources as returned by the Memos v1 API.

use serde::{Deserialize, Serialize};

/// A single memo.
///
/// Visibility stays a string here so values added by newer Memos releases
/// still deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Memo {
    /// Resource name, `memos/{uid}`.
    pub name: Option<String>,

    pub uid: Option<String>,

    /// Resource name of the creator, `users/{id}`.
    pub creator: Option<String>,

    pub content: Option<String>,

    pub visibility: Option<String>,

    pub pinned: bool,

    pub create_time: Option<String>,

    pub update_time: Option<String>,

    pub display_time: Option<String>,

    /// Plain-text preview of the content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl Memo {
    /// UID, falling back to the last segment of the resource name.
    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.uid
            .as_deref()
            .or_else(|| self.name.as_deref().and_then(|n| n.rsplit('/').next()))
    }
}

/// Response of `GET /api/v1/memos`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListMemosResponse {
    pub memos: Vec<Memo>,

    /// Empty when there are no further pages.
    pub next_page_token: String,
}

/// Body of `POST /api/v1/memos`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateMemoRequest<'a> {
    pub content: &'a str,
    pub visibility: &'a str,
}

/// Body of `PATCH /api/v1/memos/{uid}`. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoPatch {
    pub content: Option<String>,
    pub visibility: Option<String>,
    pub pinned: Option<bool>,
}

impl MemoPatch {
    /// True when the patch would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.content.is_none() && self.visibility.is_none() && self.pinned.is_none()
    }

    /// JSON body sent to Memos. Carries `state` so the update leaves the
    /// memo's archive state alone.
    #[must_use]
    pub fn to_body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({ "state": "STATE_UNSPECIFIED" });
        if let Some(ref content) = self.content {
            body["content"] = content.clone().into();
        }
        if let Some(ref visibility) = self.visibility {
            body["visibility"] = visibility.clone().into();
        }
        if let Some(pinned) = self.pinned {
            body["pinned"] = pinned.into();
        }
        body
    }
}
