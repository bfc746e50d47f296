//! Domain types shared by the rfidkit crates.
//!
//! This crate has no knowledge of the reader driver or the async runtime. It
//! defines the memory banks and their numeric codes, the tag record produced
//! by an inventory, filter and write descriptors, and the diagnostic trace
//! returned with every bank operation.

pub mod access;
pub mod bank;
pub mod constants;
pub mod error;
pub mod tag;
pub mod trace;

pub use access::{FilterSpec, WriteChunk, WriteRequest};
pub use bank::{BankCodec, BankConstants, MemoryBank};
pub use error::{Error, Result};
pub use tag::{TagRecord, TagRecordBuilder};
pub use trace::{OperationTrace, mask_password};

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
