//! UHF reader driver capability interface.
//!
//! This module defines the contract between the tag-transaction engine and a
//! vendor UHF reader driver. The driver owns the byte-level command set and
//! the serial link; the engine only sequences calls and interprets outcomes.
//!
//! Methods are declared as `fn ... -> impl Future<Output = _> + Send` rather
//! than `async fn` so the engine can move a driver call onto a spawned task
//! (continuous inventory runs in the background). Implementations are free to
//! write them as plain `async fn`.

use crate::error::Result;
use crate::types::DeviceContext;
use rfidkit_core::{BankConstants, TagRecord};
use std::future::Future;
use std::sync::Arc;

/// Callback the driver invokes for every tag it sees during inventory.
///
/// The driver may invoke it from any thread, including threads that are not
/// part of the async runtime, so it must not block.
pub type InventoryCallback = Arc<dyn Fn(TagRecord) + Send + Sync>;

/// UHF reader driver.
///
/// All methods take `&self`: the driver serializes access to the hardware
/// internally. Calls that conflict (e.g. a bank read while continuous
/// inventory is running) are expected to fail, not to corrupt state.
///
/// # Object Safety
///
/// This trait is NOT object-safe because its methods return `impl Future`.
/// Use generics, or [`AnyUhfReader`](crate::devices::AnyUhfReader) for
/// dispatch over the known drivers.
///
/// # Examples
///
/// ```no_run
/// use rfidkit_hardware::{DeviceContext, UhfDriver};
/// use rfidkit_hardware::error::Result;
///
/// async fn first_epc<D: UhfDriver>(driver: &D) -> Result<Option<String>> {
///     driver.init(&DeviceContext::default()).await?;
///     let tag = driver.inventory_single_tag().await?;
///     Ok(tag.map(|t| t.epc))
/// }
/// ```
pub trait UhfDriver: Send + Sync + 'static {
    /// Open the reader against the host device context.
    ///
    /// Returns `Ok(false)` when the driver declines to open without raising
    /// an error.
    fn init(&self, context: &DeviceContext) -> impl Future<Output = Result<bool>> + Send;

    /// Release the reader.
    fn free(&self) -> impl Future<Output = Result<bool>> + Send;

    /// Register the callback that receives inventory sightings.
    ///
    /// Replaces any previously registered callback.
    fn set_inventory_callback(&self, callback: InventoryCallback) -> Result<()>;

    /// Run one bounded inventory round and return the tag it found, if any.
    fn inventory_single_tag(&self) -> impl Future<Output = Result<Option<TagRecord>>> + Send;

    /// Start continuous inventory.
    ///
    /// Sightings are delivered through the inventory callback until
    /// [`stop_inventory`](Self::stop_inventory) is called.
    fn start_inventory_tag(&self) -> impl Future<Output = Result<()>> + Send;

    /// Stop continuous inventory.
    fn stop_inventory(&self) -> impl Future<Output = Result<bool>> + Send;

    /// Apply a select mask: bank code, bit offset, bit length, hex pattern.
    fn set_filter(
        &self,
        bank_code: u8,
        ptr: u32,
        len: u32,
        data: &str,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Read `len` words from a bank at word offset `ptr`.
    ///
    /// `Ok(None)` means the reader answered but returned no data.
    fn read_data(
        &self,
        password: &str,
        bank_code: u8,
        ptr: u32,
        len: u32,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Write `word_count` words of `data` into a bank at word offset `ptr`.
    fn write_data(
        &self,
        password: &str,
        bank_code: u8,
        ptr: u32,
        word_count: u32,
        data: &str,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Best-effort look at the driver's internal "is open" flag.
    ///
    /// `None` means the driver cannot tell.
    fn probe_open(&self) -> Option<bool> {
        None
    }

    /// Canonical bank codes, if the driver publishes them.
    fn bank_constants(&self) -> Option<BankConstants> {
        None
    }
}
