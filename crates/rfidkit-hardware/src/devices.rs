//! Enum wrapper for reader driver dispatch.
//!
//! [`UhfDriver`] returns `impl Future` from its methods and is therefore not
//! object-safe, so `Box<dyn UhfDriver>` is not an option. [`AnyUhfReader`]
//! gives the engine and the CLI a single concrete type that dispatches to the
//! known drivers at compile time.
//!
//! # Examples
//!
//! ```
//! use rfidkit_hardware::devices::AnyUhfReader;
//! use rfidkit_hardware::mock::MockUhfReader;
//!
//! let (reader, _handle) = MockUhfReader::new();
//! let any_reader = AnyUhfReader::Mock(reader);
//! assert_eq!(any_reader.name(), "Mock UHF Reader");
//! ```

use crate::driver::{InventoryCallback, UhfDriver};
use crate::mock::MockUhfReader;
use crate::types::DeviceContext;
use crate::Result;
use rfidkit_core::{BankConstants, TagRecord};

/// Enum wrapper for UHF reader dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyUhfReader {
    /// Mock reader for development and testing.
    Mock(MockUhfReader),
}

impl AnyUhfReader {
    /// Human-readable driver name.
    pub fn name(&self) -> &str {
        match self {
            Self::Mock(reader) => reader.name(),
        }
    }
}

impl From<MockUhfReader> for AnyUhfReader {
    fn from(reader: MockUhfReader) -> Self {
        Self::Mock(reader)
    }
}

impl UhfDriver for AnyUhfReader {
    async fn init(&self, context: &DeviceContext) -> Result<bool> {
        match self {
            Self::Mock(reader) => reader.init(context).await,
        }
    }

    async fn free(&self) -> Result<bool> {
        match self {
            Self::Mock(reader) => reader.free().await,
        }
    }

    fn set_inventory_callback(&self, callback: InventoryCallback) -> Result<()> {
        match self {
            Self::Mock(reader) => reader.set_inventory_callback(callback),
        }
    }

    async fn inventory_single_tag(&self) -> Result<Option<TagRecord>> {
        match self {
            Self::Mock(reader) => reader.inventory_single_tag().await,
        }
    }

    async fn start_inventory_tag(&self) -> Result<()> {
        match self {
            Self::Mock(reader) => reader.start_inventory_tag().await,
        }
    }

    async fn stop_inventory(&self) -> Result<bool> {
        match self {
            Self::Mock(reader) => reader.stop_inventory().await,
        }
    }

    async fn set_filter(&self, bank_code: u8, ptr: u32, len: u32, data: &str) -> Result<bool> {
        match self {
            Self::Mock(reader) => reader.set_filter(bank_code, ptr, len, data).await,
        }
    }

    async fn read_data(
        &self,
        password: &str,
        bank_code: u8,
        ptr: u32,
        len: u32,
    ) -> Result<Option<String>> {
        match self {
            Self::Mock(reader) => reader.read_data(password, bank_code, ptr, len).await,
        }
    }

    async fn write_data(
        &self,
        password: &str,
        bank_code: u8,
        ptr: u32,
        word_count: u32,
        data: &str,
    ) -> Result<bool> {
        match self {
            Self::Mock(reader) => {
                reader
                    .write_data(password, bank_code, ptr, word_count, data)
                    .await
            }
        }
    }

    fn probe_open(&self) -> Option<bool> {
        match self {
            Self::Mock(reader) => reader.probe_open(),
        }
    }

    fn bank_constants(&self) -> Option<BankConstants> {
        match self {
            Self::Mock(reader) => reader.bank_constants(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::DriverCall;

    #[tokio::test]
    async fn test_dispatches_to_mock() {
        let (reader, handle) = MockUhfReader::new();
        handle.place_epcs(&["E200001"]).unwrap();
        handle.set_bank_constants(Some(BankConstants {
            epc: 11,
            tid: 12,
            user: 13,
        }));
        let reader = AnyUhfReader::from(reader);

        assert!(reader.init(&DeviceContext::default()).await.unwrap());
        let tag = reader.inventory_single_tag().await.unwrap().unwrap();
        assert_eq!(tag.epc, "E200001");
        assert_eq!(reader.probe_open(), Some(true));
        assert_eq!(reader.bank_constants().map(|c| c.tid), Some(12));
        assert_eq!(handle.call_count(DriverCall::InventorySingleTag), 1);
    }
}
