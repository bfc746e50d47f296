//! Common test utilities for engine integration tests.
//!
//! Every helper builds an engine around a [`MockUhfReader`] so tests can
//! script the reader and inspect exactly which driver calls were made.

#![allow(dead_code)]

use rfidkit_core::WriteChunk;
use rfidkit_engine::{EngineConfig, EventStream, RfidEngine, RfidEvent};
use rfidkit_hardware::mock::{DriverCall, MockUhfReader, MockUhfReaderHandle, RecordedCall};

/// Engine, event stream and mock controller, reader not yet opened.
pub fn create_engine() -> (RfidEngine<MockUhfReader>, EventStream, MockUhfReaderHandle) {
    let (reader, handle) = MockUhfReader::new();
    let (engine, events) = RfidEngine::new(reader, EngineConfig::default());
    (engine, events, handle)
}

/// Engine with the reader already opened.
pub async fn create_open_engine() -> (RfidEngine<MockUhfReader>, EventStream, MockUhfReaderHandle) {
    let (mut engine, events, handle) = create_engine();
    assert!(engine.init_reader().await.success);
    (engine, events, handle)
}

/// Offsets and sizes of every write the reader received, in order.
pub fn written_chunks(handle: &MockUhfReaderHandle) -> Vec<WriteChunk> {
    handle
        .calls_of(DriverCall::WriteData)
        .into_iter()
        .filter_map(|call| match call {
            RecordedCall::WriteData {
                ptr, word_count, ..
            } => Some(WriteChunk {
                ptr,
                words: word_count,
            }),
            _ => None,
        })
        .collect()
}

/// EPCs of the tag-discovered events among `events`.
pub fn discovered_epcs(events: &[RfidEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            RfidEvent::TagDiscovered { tag, .. } => Some(tag.epc.clone()),
            _ => None,
        })
        .collect()
}
