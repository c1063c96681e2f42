//! JSON shapes returned to MCP clients.

use serde_json::{Value, json};

use crate::models::{ListMemosResponse, Memo};

/// Memo fields shown to clients.
#[must_use]
pub fn memo_summary(memo: &Memo) -> Value {
    json!({
        "name": memo.name,
        "uid": memo.uid(),
        "creator": memo.creator,
        "content": memo.content,
        "visibility": memo.visibility,
        "pinned": memo.pinned,
        "createTime": memo.create_time,
        "updateTime": memo.update_time,
        "displayTime": memo.display_time,
    })
}

/// Summary plus the plain-text snippet (empty when Memos sent none).
#[must_use]
pub fn memo_detail(memo: &Memo) -> Value {
    let mut obj = memo_summary(memo);
    obj["snippet"] = json!(memo.snippet.as_deref().unwrap_or_default());
    obj
}

/// `{count, memos, nextPageToken}` for a search page.
#[must_use]
pub fn search_result(list: &ListMemosResponse) -> Value {
    json!({
        "count": list.memos.len(),
        "memos": list.memos.iter().map(memo_summary).collect::<Vec<_>>(),
        "nextPageToken": list.next_page_token,
    })
}

/// `{success: true, memo}` for writes.
#[must_use]
pub fn write_result(memo: &Memo) -> Value {
    json!({
        "success": true,
        "memo": memo_summary(memo),
    })
}
