//! Application-facing call surface.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::{self, EventStream, Notifier, RfidEvent, ScanErrorCode};
use crate::memory::{MemoryAccessOrchestrator, ReadReport, WriteReport};
use crate::session::{ScanSession, SessionState, StopOutcome};
use rfidkit_core::{FilterSpec, MemoryBank, TagRecord, WriteRequest};
use rfidkit_hardware::{
    ButtonRegistration, CloseOutcome, HardwareButtonRouter, InitOutcome, ReaderLifecycle,
    UhfDriver,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Success flag and message returned by most engine calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
}

impl OperationResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Result of [`RfidEngine::start_scan`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<TagRecord>,
    pub message: String,
}

/// Result of [`RfidEngine::start_batch_scan`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchScanResult {
    pub success: bool,
    pub message: String,
    /// Tags seen during the grace interval, in first-seen order.
    pub tags: Vec<TagRecord>,
    pub count: usize,
    /// True while the reader keeps scanning in the background.
    pub continuous: bool,
}

impl BatchScanResult {
    fn started(tags: Vec<TagRecord>, continuous: bool) -> Self {
        Self {
            success: true,
            message: "Batch scan started successfully".to_string(),
            count: tags.len(),
            tags,
            continuous,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            tags: Vec::new(),
            count: 0,
            continuous: false,
        }
    }
}

/// Coarse reader state for status displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Disconnected,
    Busy,
    Ready,
}

/// Result of [`RfidEngine::reader_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderStatus {
    pub is_connected: bool,
    pub status: StatusCode,
}

/// Tag-transaction engine.
///
/// Owns the reader lifecycle and the scan session and sequences every bank
/// operation. Results come back from each call; notifications go to the
/// [`EventStream`] returned by [`new`](Self::new).
///
/// Foreground calls take `&mut self`, so at most one of them is in flight.
/// Only continuous inventory runs in the background.
///
/// # Examples
///
/// ```
/// use rfidkit_core::TagRecord;
/// use rfidkit_engine::{EngineConfig, RfidEngine};
/// use rfidkit_hardware::mock::MockUhfReader;
///
/// #[tokio::main]
/// async fn main() {
///     let (reader, handle) = MockUhfReader::new();
///     handle.place_tag(TagRecord::new("3000E2801160").unwrap());
///
///     let (mut engine, _events) = RfidEngine::new(reader, EngineConfig::default());
///     assert!(engine.init_reader().await.success);
///
///     let scan = engine.start_scan().await;
///     assert_eq!(scan.tag.unwrap().epc, "3000E2801160");
/// }
/// ```
pub struct RfidEngine<D> {
    lifecycle: ReaderLifecycle<D>,
    session: ScanSession,
    notifier: Notifier,
    buttons: Option<ButtonRegistration>,
}

impl<D: UhfDriver> RfidEngine<D> {
    /// Create an engine around `driver`. The reader is not opened.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(driver: D, config: EngineConfig) -> (Self, EventStream) {
        let (notifier, events) = events::channel(config.event_capacity);
        let session = ScanSession::new(notifier.clone(), config.batch_grace());
        let lifecycle = ReaderLifecycle::new(driver, config.device);

        let engine = Self {
            lifecycle,
            session,
            notifier,
            buttons: None,
        };
        (engine, events)
    }

    /// Receive hardware button events on this engine's event stream.
    ///
    /// Replaces whatever consumer the router had.
    pub fn attach_buttons(&mut self, router: &Arc<HardwareButtonRouter>) {
        self.buttons = Some(router.register(Arc::new(self.notifier.clone())));
        debug!("Hardware buttons attached");
    }

    /// Stop receiving hardware button events. Returns false if not attached.
    pub fn detach_buttons(&mut self) -> bool {
        self.buttons.take().is_some()
    }

    /// Open the reader. Succeeds without reopening if it is already open.
    pub async fn init_reader(&mut self) -> OperationResult {
        match self.lifecycle.init().await {
            Ok(InitOutcome::Opened | InitOutcome::AlreadyOpen) => {
                OperationResult::ok("RFID reader initialized successfully")
            }
            Err(e) => {
                error!("RFID init error: {}", e);
                OperationResult::failed("Failed to initialize RFID reader")
            }
        }
    }

    /// Release the reader. Succeeds if it was not open.
    pub async fn close_reader(&mut self) -> OperationResult {
        match self.lifecycle.close().await {
            Ok(CloseOutcome::Released | CloseOutcome::NotOpen) => {
                OperationResult::ok("RFID reader closed successfully")
            }
            Err(e) => {
                error!("RFID close error: {}", e);
                OperationResult::failed("Failed to close RFID reader")
            }
        }
    }

    /// Run one single-tag inventory round, opening the reader if needed.
    pub async fn start_scan(&mut self) -> ScanResult {
        let tag = if self.ensure_open(false).await
            && let Some(handle) = self.lifecycle.handle()
        {
            self.session.start_single(handle).await
        } else {
            None
        };

        match tag {
            Some(tag) => ScanResult {
                success: true,
                tag: Some(tag),
                message: "Tag scanned successfully".to_string(),
            },
            None => ScanResult {
                success: false,
                tag: None,
                message: "No tag found or scan failed".to_string(),
            },
        }
    }

    /// Start continuous inventory, opening the reader if needed.
    ///
    /// Returns the tags seen during the grace interval; scanning continues
    /// until [`stop_scan`](Self::stop_scan).
    pub async fn start_batch_scan(&mut self) -> BatchScanResult {
        if !self.ensure_open(true).await {
            return BatchScanResult::failed("Failed to initialize RFID reader");
        }
        let Some(handle) = self.lifecycle.handle() else {
            return BatchScanResult::failed(EngineError::NotInitialized.to_string());
        };

        match self.session.start_batch(handle).await {
            Ok(tags) => BatchScanResult::started(tags, self.session.state().continuation),
            Err(e) => {
                error!("Batch scan failed: {}", e);
                BatchScanResult::failed(e.to_string())
            }
        }
    }

    /// Stop the running scan. Succeeds if nothing was running.
    pub async fn stop_scan(&mut self) -> OperationResult {
        match self.session.stop(self.lifecycle.handle()).await {
            Ok(StopOutcome::Stopped(_) | StopOutcome::NotScanning) => {
                OperationResult::ok("Scan stopped successfully")
            }
            Err(e) => {
                error!("Stop scan error: {}", e);
                OperationResult::failed("Failed to stop scan")
            }
        }
    }

    /// Apply an inventory filter, or clear it.
    pub async fn set_filter(&mut self, filter: &FilterSpec) -> OperationResult {
        let applied = self
            .memory()
            .set_filter(self.lifecycle.handle(), filter)
            .await;
        filter_result(applied)
    }

    /// Narrow the inventory filter to the most recently discovered tag.
    pub async fn filter_last_tag(&mut self) -> OperationResult {
        let last = match self.session.last_tag().await {
            Ok(last) => last,
            Err(e) => {
                error!("Could not query last tag: {}", e);
                None
            }
        };
        let Some(tag) = last else {
            warn!("No tag discovered to filter on");
            return OperationResult::failed("No tag discovered to filter on");
        };

        info!(epc = %tag.epc, "Filtering on last discovered tag");
        let filter = FilterSpec::matching_epc(&tag.epc);
        self.set_filter(&filter).await
    }

    /// Read `len` words from `bank` at word offset `ptr`.
    ///
    /// The summary is also published as [`RfidEvent::TagRead`].
    pub async fn read_tag_data(
        &mut self,
        bank: MemoryBank,
        ptr: u32,
        len: u32,
        password: &str,
    ) -> ReadReport {
        let report = self
            .memory()
            .read_bank(&self.lifecycle, bank, ptr, len, password)
            .await;
        self.notifier.emit(RfidEvent::TagRead(report.summary()));
        report
    }

    /// Write `request` into its bank.
    ///
    /// The summary is also published as [`RfidEvent::TagWritten`].
    pub async fn write_tag_data(&mut self, request: &WriteRequest) -> WriteReport {
        let report = self
            .memory()
            .write_bank(self.lifecycle.handle(), request)
            .await;
        self.notifier.emit(RfidEvent::TagWritten(report.summary()));
        report
    }

    /// Reader status derived from handle presence and scan state.
    pub fn reader_status(&self) -> ReaderStatus {
        let is_connected = self.lifecycle.is_open();
        let status = if !is_connected {
            StatusCode::Disconnected
        } else if self.session.is_scanning() {
            StatusCode::Busy
        } else {
            StatusCode::Ready
        };

        ReaderStatus {
            is_connected,
            status,
        }
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    /// Tags discovered by the current (or last) scan session.
    pub async fn discovered_tags(&self) -> Vec<TagRecord> {
        self.session.snapshot().await.unwrap_or_default()
    }

    pub fn lifecycle(&self) -> &ReaderLifecycle<D> {
        &self.lifecycle
    }

    fn memory(&self) -> MemoryAccessOrchestrator {
        MemoryAccessOrchestrator::for_driver(self.lifecycle.driver().as_ref())
    }

    /// Open the reader for a scan if no handle is held.
    async fn ensure_open(&mut self, batch_mode: bool) -> bool {
        if self.lifecycle.is_open() {
            return true;
        }

        debug!("Reader not initialized, initializing now");
        match self.lifecycle.init().await {
            Ok(_) => true,
            Err(e) => {
                error!("Auto-init before scan failed: {}", e);
                self.notifier.emit(RfidEvent::scan_error(
                    ScanErrorCode::ReaderInitFailed,
                    "Failed to initialize RFID reader",
                    batch_mode,
                ));
                false
            }
        }
    }
}

fn filter_result(applied: bool) -> OperationResult {
    if applied {
        OperationResult::ok("Filter set successfully")
    } else {
        OperationResult::failed("Failed to set filter")
    }
}

impl<D> std::fmt::Debug for RfidEngine<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RfidEngine")
            .field("lifecycle", &self.lifecycle)
            .field("session", &self.session)
            .field("buttons_attached", &self.buttons.is_some())
            .finish()
    }
}
