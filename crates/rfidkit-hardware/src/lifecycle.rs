//! Reader handle ownership.
//!
//! [`ReaderLifecycle`] is the only place that opens or releases the reader.
//! Scan sessions and bank operations borrow a [`ReaderHandle`] for the
//! duration of one call; they never tear it down. The handle is only dropped
//! by an explicit [`close`](ReaderLifecycle::close).

use crate::driver::UhfDriver;
use crate::error::{HardwareError, Result};
use crate::types::{ConnectionProbe, DeviceContext};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// An open connection to the reader.
pub struct ReaderHandle<D> {
    driver: Arc<D>,
    opened_at: DateTime<Utc>,
}

impl<D> ReaderHandle<D> {
    fn new(driver: Arc<D>) -> Self {
        Self {
            driver,
            opened_at: Utc::now(),
        }
    }

    /// Driver behind the handle.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Shared pointer to the driver, for work moved onto another task.
    pub fn shared(&self) -> Arc<D> {
        Arc::clone(&self.driver)
    }

    /// When the reader was opened.
    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }
}

impl<D> Clone for ReaderHandle<D> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            opened_at: self.opened_at,
        }
    }
}

impl<D> fmt::Debug for ReaderHandle<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderHandle")
            .field("opened_at", &self.opened_at)
            .finish_non_exhaustive()
    }
}

/// Result of a successful [`ReaderLifecycle::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// The reader was opened by this call.
    Opened,

    /// A handle already existed; the reader was not reopened.
    AlreadyOpen,
}

/// Result of a successful [`ReaderLifecycle::close`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The handle was released by this call.
    Released,

    /// There was no handle to release.
    NotOpen,
}

/// Result of a successful [`ReaderLifecycle::reconnect_if_needed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectOutcome {
    /// No reconnect was needed; carries what the probe reported.
    Connected(ConnectionProbe),

    /// The probe reported the link closed and the reader was reopened.
    Reconnected,
}

/// Owner of the single reader handle.
///
/// # Examples
///
/// ```
/// use rfidkit_hardware::{DeviceContext, ReaderLifecycle};
/// use rfidkit_hardware::lifecycle::{CloseOutcome, InitOutcome};
/// use rfidkit_hardware::mock::MockUhfReader;
///
/// #[tokio::main]
/// async fn main() -> rfidkit_hardware::Result<()> {
///     let (reader, _handle) = MockUhfReader::new();
///     let mut lifecycle = ReaderLifecycle::new(reader, DeviceContext::default());
///
///     assert_eq!(lifecycle.init().await?, InitOutcome::Opened);
///     assert_eq!(lifecycle.init().await?, InitOutcome::AlreadyOpen);
///     assert_eq!(lifecycle.close().await?, CloseOutcome::Released);
///     assert_eq!(lifecycle.close().await?, CloseOutcome::NotOpen);
///     Ok(())
/// }
/// ```
pub struct ReaderLifecycle<D> {
    driver: Arc<D>,
    context: DeviceContext,
    handle: Option<ReaderHandle<D>>,
}

impl<D: UhfDriver> ReaderLifecycle<D> {
    /// Create a lifecycle around `driver`. The reader is not opened.
    pub fn new(driver: D, context: DeviceContext) -> Self {
        Self {
            driver: Arc::new(driver),
            context,
            handle: None,
        }
    }

    /// Open the reader if no handle exists.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::InitializationFailed`] if the driver reports
    /// failure or errors. No handle is kept in that case.
    pub async fn init(&mut self) -> Result<InitOutcome> {
        if self.handle.is_some() {
            debug!("RFID reader instance already exists");
            return Ok(InitOutcome::AlreadyOpen);
        }

        debug!(device = %self.context.name, "Opening RFID reader");
        match self.driver.init(&self.context).await {
            Ok(true) => {
                self.handle = Some(ReaderHandle::new(Arc::clone(&self.driver)));
                info!(device = %self.context.name, "RFID reader initialized");
                Ok(InitOutcome::Opened)
            }
            Ok(false) => {
                warn!(device = %self.context.name, "RFID reader init returned false");
                Err(HardwareError::initialization_failed(
                    "driver reported failure",
                ))
            }
            Err(e) => {
                error!(device = %self.context.name, "RFID init error: {}", e);
                Err(HardwareError::initialization_failed(e.to_string()))
            }
        }
    }

    /// Release the reader if a handle exists.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::ReleaseFailed`] if the driver reports failure
    /// or errors. The handle is kept in that case so the caller can retry.
    pub async fn close(&mut self) -> Result<CloseOutcome> {
        if self.handle.is_none() {
            debug!("No RFID reader to close");
            return Ok(CloseOutcome::NotOpen);
        }

        debug!("Freeing RFID reader");
        match self.driver.free().await {
            Ok(true) => {
                self.handle = None;
                info!("RFID reader closed");
                Ok(CloseOutcome::Released)
            }
            Ok(false) => {
                warn!("RFID reader free returned false");
                Err(HardwareError::release_failed("driver reported failure"))
            }
            Err(e) => {
                error!("RFID close error: {}", e);
                Err(HardwareError::release_failed(e.to_string()))
            }
        }
    }

    /// Current handle, if the reader is open.
    pub fn handle(&self) -> Option<&ReaderHandle<D>> {
        self.handle.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Raw result of the driver's "is open" introspection.
    pub fn probe(&self) -> ConnectionProbe {
        ConnectionProbe::from(self.driver.probe_open())
    }

    /// Whether the reader link looks up. Unknown counts as connected.
    pub fn probe_connected(&self) -> bool {
        self.probe().assume_connected()
    }

    /// Reopen the reader if the probe reports the link closed.
    ///
    /// Calls the driver's `init` directly: a handle is already held, so the
    /// idempotent [`init`](Self::init) would not touch the hardware.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::Disconnected`] if the reopen fails.
    pub async fn reconnect_if_needed(&self) -> Result<ReconnectOutcome> {
        let probe = self.probe();
        if probe.assume_connected() {
            return Ok(ReconnectOutcome::Connected(probe));
        }

        warn!(device = %self.context.name, "Reader disconnected, attempting reconnect");
        match self.driver.init(&self.context).await {
            Ok(true) => {
                info!(device = %self.context.name, "Reader reconnected");
                Ok(ReconnectOutcome::Reconnected)
            }
            Ok(false) => {
                error!("Reconnect failed");
                Err(HardwareError::disconnected(self.context.name.clone()))
            }
            Err(e) => {
                error!("Exception during reader reconnect: {}", e);
                Err(HardwareError::disconnected(self.context.name.clone()))
            }
        }
    }

    pub fn driver(&self) -> &Arc<D> {
        &self.driver
    }

    pub fn context(&self) -> &DeviceContext {
        &self.context
    }
}

impl<D> fmt::Debug for ReaderLifecycle<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderLifecycle")
            .field("context", &self.context)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}
