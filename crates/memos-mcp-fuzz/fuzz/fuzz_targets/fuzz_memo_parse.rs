#![no_main]

use libfuzzer_sys::fuzz_target;
use memos_mcp::models::{ListMemosResponse, Memo};

fuzz_target!(|data: &[u8]| {
    // Should never panic, only return Ok or Err
    if let Ok(memo) = serde_json::from_slice::<Memo>(data) {
        let _ = memo.uid();
    }
    let _ = serde_json::from_slice::<ListMemosResponse>(data);
});
