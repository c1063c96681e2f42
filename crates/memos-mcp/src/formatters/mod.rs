//! Output formatters for tool results.

mod json;

pub use self::json::*;
