//! Property-based tests for bank writes.
//!
//! Writes are driven through the engine against a mock reader whose primary
//! write always fails, so every generated payload exercises the fallback
//! decision.

mod common;

use common::{create_open_engine, written_chunks};
use proptest::prelude::*;
use rfidkit_core::{MemoryBank, WriteChunk, WriteRequest};
use rfidkit_hardware::mock::DriverCall;

/// Strategy for hex payloads of whole words (1-120 words).
fn word_aligned_payload() -> impl Strategy<Value = String> {
    (1usize..=120).prop_flat_map(|words| {
        prop::string::string_regex(&format!("[0-9A-F]{{{}}}", words * 4))
            .expect("Failed to create payload regex strategy")
    })
}

fn run_failing_write(ptr: u32, data: &str) -> Vec<WriteChunk> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        let (mut engine, _events, handle) = create_open_engine().await;
        handle.fail_next(DriverCall::WriteData, "primary write failed");

        let request = WriteRequest::new(MemoryBank::User, ptr, data, "00000000");
        engine.write_tag_data(&request).await;
        written_chunks(&handle)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_failed_primary_write_chunks_only_when_large(
        ptr in 0u32..64,
        data in word_aligned_payload(),
    ) {
        let word_count = (data.len() / 4) as u32;
        let chunks = run_failing_write(ptr, &data);

        prop_assert_eq!(chunks[0], WriteChunk { ptr, words: word_count });

        if word_count <= 32 {
            prop_assert_eq!(chunks.len(), 1);
        } else {
            let fallback = &chunks[1..];
            prop_assert_eq!(fallback.iter().map(|c| c.words).sum::<u32>(), word_count);
            for (i, chunk) in fallback.iter().enumerate() {
                prop_assert_eq!(chunk.ptr, ptr + 32 * i as u32);
                prop_assert!(chunk.words <= 32 && chunk.words > 0);
            }
        }
    }
}
