//! Mock device implementations for testing and development.
//!
//! This module provides a simulated UHF reader that can be controlled
//! programmatically without requiring physical hardware.

pub mod reader;

// Re-export commonly used types
pub use reader::{DriverCall, MockUhfReader, MockUhfReaderHandle, RecordedCall};
