//! Data models for Memos API entities and tool inputs.
//!
//! API models use `#[serde(default)]` and `camelCase` to match the Memos
//! JSON gateway. Tool inputs keep snake_case argument names.

mod enums;
mod inputs;
mod memo;

pub use enums::Visibility;
pub use inputs::{CreateMemoInput, GetMemoInput, SearchMemosInput, UpdateMemoInput};
pub use memo::{CreateMemoRequest, ListMemosResponse, Memo, MemoPatch};
