//! UHF RFID tag-transaction engine.
//!
//! Sits on top of a [`UhfDriver`](rfidkit_hardware::UhfDriver) and turns its
//! stateful, unreliable call set into a small application surface:
//!
//! - **Lifecycle**: idempotent open and close of the single reader handle.
//! - **Scanning**: single-shot and continuous (batch) inventory with per-session
//!   EPC deduplication and tag/complete/error notifications.
//! - **Bank access**: reads with one retry, writes with a chunked fallback for
//!   large payloads, and inventory filters; every read and write returns a
//!   diagnostic trace.
//! - **Buttons**: hardware key events forwarded onto the same event stream.
//!
//! # Quick Start
//!
//! ```
//! use rfidkit_core::{MemoryBank, WriteRequest};
//! use rfidkit_engine::{EngineConfig, RfidEngine, RfidEvent};
//! use rfidkit_hardware::mock::MockUhfReader;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (reader, handle) = MockUhfReader::new();
//!     handle.place_epcs(&["3000E2801160"]).unwrap();
//!
//!     let (mut engine, mut events) = RfidEngine::new(reader, EngineConfig::default());
//!     engine.init_reader().await;
//!
//!     let scan = engine.start_scan().await;
//!     assert!(scan.success);
//!     assert!(matches!(events.recv().await, Some(RfidEvent::TagDiscovered { .. })));
//!
//!     let write = WriteRequest::new(MemoryBank::User, 0, "CAFE", "00000000");
//!     assert!(engine.write_tag_data(&write).await.is_success());
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod memory;
pub mod registry;
pub mod session;

pub use config::EngineConfig;
pub use engine::{BatchScanResult, OperationResult, ReaderStatus, RfidEngine, ScanResult, StatusCode};
pub use error::{EngineError, Result};
pub use events::{EventStream, Notifier, RfidEvent, ScanCompletion, ScanErrorCode};
pub use memory::{
    BankData, MemoryAccessOrchestrator, ReadReport, ReadSummary, WriteAck, WriteReport,
    WriteSummary,
};
pub use registry::TagRegistry;
pub use session::{ScanMode, ScanSession, ScanStatus, SessionState, StopOutcome};
