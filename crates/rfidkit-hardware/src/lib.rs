//! Reader hardware abstraction for rfidkit.
//!
//! This crate sits between the tag-transaction engine and a vendor UHF reader
//! driver. It defines the driver capability interface, owns the reader handle
//! lifecycle, and routes hardware button events from the host to a single
//! active consumer.
//!
//! # Design Philosophy
//!
//! - **Async-first**: Driver calls are asynchronous, declared with
//!   `impl Future + Send` return types (Rust 1.90 + Edition 2024 RPITIT) so
//!   they can be spawned onto the Tokio runtime.
//! - **Enum dispatch**: [`UhfDriver`] is not object-safe; use generics or
//!   [`AnyUhfReader`] for concrete dispatch.
//! - **Single owner**: Only [`ReaderLifecycle`] opens and releases the reader.
//!   Everything else borrows a [`ReaderHandle`].
//!
//! # Driver Interface
//!
//! ```no_run
//! use rfidkit_hardware::{DeviceContext, UhfDriver};
//! use rfidkit_hardware::error::Result;
//!
//! async fn read_tid<D: UhfDriver>(driver: &D) -> Result<Option<String>> {
//!     driver.init(&DeviceContext::new("C72")).await?;
//!     driver.read_data("00000000", 2, 0, 6).await
//! }
//! ```
//!
//! # Error Handling
//!
//! All operations return [`Result<T>`][error::Result] which uses the
//! [`HardwareError`] error type. Driver exceptions surface as
//! [`HardwareError::CommunicationError`]; a driver that answers with a
//! negative result returns `Ok(false)` or `Ok(None)` instead.
//!
//! # Mock Implementation
//!
//! [`mock::MockUhfReader`] simulates an RF field, bank memory and scripted
//! driver failures for development and testing without physical hardware.

pub mod buttons;
pub mod devices;
pub mod driver;
pub mod error;
pub mod lifecycle;
pub mod mock;
pub mod types;

// Re-export commonly used types for convenience
pub use buttons::{
    ButtonAction, ButtonConsumer, ButtonEvent, ButtonRegistration, HardwareButtonRouter, key_name,
};
pub use devices::AnyUhfReader;
pub use driver::{InventoryCallback, UhfDriver};
pub use error::{HardwareError, Result};
pub use lifecycle::{CloseOutcome, InitOutcome, ReaderHandle, ReaderLifecycle, ReconnectOutcome};
pub use types::{ConnectionProbe, DeviceContext};
