//! Scan session state machine.
//!
//! A session is either `Idle` or `Scanning` in one of two modes:
//!
//! - **Single**: one bounded inventory round; the session returns to `Idle`
//!   before the call returns.
//! - **Batch**: continuous inventory started on a background task; the call
//!   returns a snapshot after a grace interval while scanning continues until
//!   [`ScanSession::stop`].
//!
//! # Message passing
//!
//! Driver callbacks may fire on any thread, so they never touch session state
//! directly. Sightings are sent as [`SessionMessage`]s to a worker task that
//! owns the [`TagRegistry`] and emits a [`RfidEvent::TagDiscovered`] for every
//! EPC it sees for the first time.
//!
//! Every session gets a new epoch. Sightings carry the epoch they were
//! captured under and the worker drops any that do not belong to the running
//! session, so late callbacks after a stop leave the registry untouched.
//!
//! Scan status lives in a [`watch`] channel shared by the foreground calls
//! and the background task. Clearing it is idempotent and only applies to the
//! epoch that asked for it.

use crate::error::{EngineError, Result};
use crate::events::{Notifier, RfidEvent, ScanCompletion, ScanErrorCode};
use crate::registry::TagRegistry;
use rfidkit_core::TagRecord;
use rfidkit_hardware::{ReaderHandle, UhfDriver};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Inventory mode of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    Single,
    Batch,
}

/// Whether a session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScanStatus {
    #[default]
    Idle,
    Scanning(ScanMode),
}

impl ScanStatus {
    pub fn is_scanning(&self) -> bool {
        matches!(self, Self::Scanning(_))
    }
}

/// Shared scan state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub status: ScanStatus,

    /// Set while a batch session keeps scanning after its call returned.
    pub continuation: bool,

    /// Number of the current (or last) session.
    pub epoch: u64,
}

/// Messages processed by the session worker.
#[derive(Debug)]
pub enum SessionMessage {
    /// A new session started: forget the previous session's tags.
    Begin { epoch: u64, mode: ScanMode },

    /// The driver saw a tag.
    Sighting { epoch: u64, tag: TagRecord },

    /// The session ended: drop further sightings for it.
    End { epoch: u64 },

    /// Copy of the registry, in first-seen order.
    Snapshot { reply: oneshot::Sender<Vec<TagRecord>> },

    /// Number of distinct tags in the registry.
    Count { reply: oneshot::Sender<usize> },

    /// Most recently discovered tag.
    Last {
        reply: oneshot::Sender<Option<TagRecord>>,
    },
}

/// Result of [`ScanSession::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// A running session was stopped.
    Stopped(ScanMode),

    /// No session was running; nothing happened.
    NotScanning,
}

/// Scan session controller.
///
/// Must be created inside a Tokio runtime: the worker task is spawned on
/// construction and aborted on drop.
pub struct ScanSession {
    state: Arc<watch::Sender<SessionState>>,
    tx: mpsc::UnboundedSender<SessionMessage>,
    notifier: Notifier,
    grace: Duration,
    worker: JoinHandle<()>,
}

impl ScanSession {
    pub fn new(notifier: Notifier, grace: Duration) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(rx, notifier.clone()));

        Self {
            state: Arc::new(state),
            tx,
            notifier,
            grace,
            worker,
        }
    }

    /// Current scan state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn is_scanning(&self) -> bool {
        self.state().status.is_scanning()
    }

    /// Watch scan state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Run one single-tag inventory round.
    ///
    /// Returns `None`, with no side effects, if a session is already running.
    /// Driver errors are reported as [`ScanErrorCode::ScanError`] events and
    /// also yield `None`.
    pub async fn start_single<D: UhfDriver>(&self, handle: &ReaderHandle<D>) -> Option<TagRecord> {
        let Some(epoch) = self.try_begin(ScanMode::Single) else {
            debug!("Already scanning, ignoring scan request");
            return None;
        };

        match self.run_single(handle, epoch).await {
            Ok(tag) => tag,
            Err(e) => {
                error!("Start scan error: {}", e);
                self.finish(epoch);
                self.notifier.emit(RfidEvent::scan_error(
                    ScanErrorCode::ScanException,
                    e.to_string(),
                    false,
                ));
                None
            }
        }
    }

    async fn run_single<D: UhfDriver>(
        &self,
        handle: &ReaderHandle<D>,
        epoch: u64,
    ) -> Result<Option<TagRecord>> {
        self.send(SessionMessage::Begin {
            epoch,
            mode: ScanMode::Single,
        })?;
        self.register_callback(handle, epoch);

        debug!(epoch, "Starting single tag inventory scan");
        let tag = match handle.driver().inventory_single_tag().await {
            Ok(tag) => tag,
            Err(e) => {
                error!("Error during single tag scan: {}", e);
                self.finish(epoch);
                self.notifier.emit(RfidEvent::scan_error(
                    ScanErrorCode::ScanError,
                    e.to_string(),
                    false,
                ));
                return Ok(None);
            }
        };
        debug!(epc = ?tag.as_ref().map(|t| &t.epc), "inventory_single_tag result");

        // The driver may not fire the callback for a single round.
        if let Some(tag) = &tag {
            self.send(SessionMessage::Sighting {
                epoch,
                tag: tag.clone(),
            })?;
        }

        self.finish(epoch);
        let total_tags = self.count().await?;
        self.notifier.emit(RfidEvent::ScanComplete(ScanCompletion {
            total_tags,
            time_taken_ms: 0,
            success: tag.is_some(),
            batch_mode: false,
            continuous: false,
            stopped: false,
        }));
        debug!(success = tag.is_some(), total_tags, "Scan complete");

        Ok(tag)
    }

    /// Start continuous inventory and return what was seen during the grace
    /// interval.
    ///
    /// A running session is stopped first. Scanning continues after return.
    ///
    /// # Errors
    ///
    /// Every failure is also published as a scan-error event:
    /// [`EngineError::InventoryFailed`] when the background inventory failed
    /// before the grace interval ended (`BATCH_SCAN_ERROR`), anything else
    /// when the session could not be started (`BATCH_SCAN_EXCEPTION`).
    pub async fn start_batch<D: UhfDriver>(&self, handle: &ReaderHandle<D>) -> Result<Vec<TagRecord>> {
        if self.is_scanning() {
            debug!("Scan in progress, stopping it before batch scan");
            if let Err(e) = self.stop(Some(handle)).await {
                warn!("Failed to stop previous scan: {}", e);
            }
        }

        let Some(epoch) = self.try_begin(ScanMode::Batch) else {
            warn!("Scan state changed while starting batch scan");
            let err = EngineError::AlreadyScanning;
            self.notifier.emit(RfidEvent::scan_error(
                ScanErrorCode::BatchScanException,
                err.to_string(),
                true,
            ));
            return Err(err);
        };

        match self.run_batch(handle, epoch).await {
            Ok(tags) => Ok(tags),
            Err(e @ EngineError::InventoryFailed(_)) => Err(e),
            Err(e) => {
                error!("Batch scan error: {}", e);
                self.finish(epoch);
                self.notifier.emit(RfidEvent::scan_error(
                    ScanErrorCode::BatchScanException,
                    e.to_string(),
                    true,
                ));
                Err(e)
            }
        }
    }

    async fn run_batch<D: UhfDriver>(
        &self,
        handle: &ReaderHandle<D>,
        epoch: u64,
    ) -> Result<Vec<TagRecord>> {
        self.send(SessionMessage::Begin {
            epoch,
            mode: ScanMode::Batch,
        })?;
        self.register_callback(handle, epoch);

        info!(epoch, "Starting continuous inventory");
        let driver = handle.shared();
        let state = Arc::clone(&self.state);
        let tx = self.tx.clone();
        let notifier = self.notifier.clone();
        let (failed_tx, mut failed_rx) = oneshot::channel();
        tokio::spawn(async move {
            if let Err(e) = driver.start_inventory_tag().await {
                error!("Continuous inventory error: {}", e);
                let cleared = clear_scanning(&state, epoch);
                let _ = tx.send(SessionMessage::End { epoch });
                if cleared {
                    notifier.emit(RfidEvent::scan_error(
                        ScanErrorCode::BatchScanError,
                        e.to_string(),
                        true,
                    ));
                }
                let _ = failed_tx.send(e.to_string());
            }
        });

        tokio::time::sleep(self.grace).await;
        if let Ok(message) = failed_rx.try_recv() {
            return Err(EngineError::InventoryFailed(message));
        }

        let tags = self.snapshot().await?;
        debug!(count = tags.len(), "Batch scan snapshot");
        Ok(tags)
    }

    /// Stop the running session.
    ///
    /// Without a handle the driver is not called, but the session still
    /// returns to `Idle`. Stopping an idle session does nothing and emits
    /// nothing.
    ///
    /// # Errors
    ///
    /// If the driver's stop command errors, the session is cleared and the
    /// error returned without a scan-complete notification.
    pub async fn stop<D: UhfDriver>(&self, handle: Option<&ReaderHandle<D>>) -> Result<StopOutcome> {
        let current = self.state();
        let ScanStatus::Scanning(mode) = current.status else {
            trace!("Stop requested while idle");
            return Ok(StopOutcome::NotScanning);
        };

        if let Some(handle) = handle {
            match handle.driver().stop_inventory().await {
                Ok(true) => {}
                Ok(false) => warn!("Driver reported failure stopping inventory"),
                Err(e) => {
                    error!("Stop scan error: {}", e);
                    self.finish(current.epoch);
                    return Err(e.into());
                }
            }
        }

        self.finish(current.epoch);
        let total_tags = self.count().await?;
        self.notifier.emit(RfidEvent::ScanComplete(ScanCompletion {
            total_tags,
            time_taken_ms: 0,
            success: true,
            batch_mode: mode == ScanMode::Batch,
            continuous: false,
            stopped: true,
        }));
        info!(?mode, total_tags, "Scan stopped");

        Ok(StopOutcome::Stopped(mode))
    }

    /// Tags discovered by the current (or last) session.
    pub async fn snapshot(&self) -> Result<Vec<TagRecord>> {
        self.request(|reply| SessionMessage::Snapshot { reply }).await
    }

    /// Number of distinct tags discovered by the current (or last) session.
    pub async fn count(&self) -> Result<usize> {
        self.request(|reply| SessionMessage::Count { reply }).await
    }

    /// Most recently discovered tag of the current (or last) session.
    pub async fn last_tag(&self) -> Result<Option<TagRecord>> {
        self.request(|reply| SessionMessage::Last { reply }).await
    }

    /// Move from `Idle` to `Scanning(mode)`, returning the new epoch.
    fn try_begin(&self, mode: ScanMode) -> Option<u64> {
        let mut epoch = None;
        self.state.send_if_modified(|state| {
            if state.status.is_scanning() {
                return false;
            }
            state.epoch += 1;
            state.status = ScanStatus::Scanning(mode);
            state.continuation = mode == ScanMode::Batch;
            epoch = Some(state.epoch);
            true
        });
        epoch
    }

    fn finish(&self, epoch: u64) {
        clear_scanning(&self.state, epoch);
        // The worker may be gone; the scan state above is what matters.
        let _ = self.tx.send(SessionMessage::End { epoch });
    }

    fn register_callback<D: UhfDriver>(&self, handle: &ReaderHandle<D>, epoch: u64) {
        let tx = self.tx.clone();
        let callback = Arc::new(move |tag: TagRecord| {
            trace!(epc = %tag.epc, "Tag found");
            let _ = tx.send(SessionMessage::Sighting { epoch, tag });
        });

        if let Err(e) = handle.driver().set_inventory_callback(callback) {
            // Single scans still get the inventory result directly.
            warn!("Error setting inventory callback: {}", e);
        }
    }

    fn send(&self, message: SessionMessage) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| EngineError::SessionClosed)
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> SessionMessage,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.send(message(reply))?;
        rx.await.map_err(|_| EngineError::SessionClosed)
    }

    #[cfg(test)]
    pub(crate) fn kill_worker(&self) {
        self.worker.abort();
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

impl std::fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSession")
            .field("state", &self.state())
            .field("grace", &self.grace)
            .finish_non_exhaustive()
    }
}

/// Return `epoch`'s session to `Idle`. Returns false if it already was, or if
/// another session has started since.
fn clear_scanning(state: &watch::Sender<SessionState>, epoch: u64) -> bool {
    state.send_if_modified(|state| {
        if state.epoch != epoch || !state.status.is_scanning() {
            return false;
        }
        state.status = ScanStatus::Idle;
        state.continuation = false;
        true
    })
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<SessionMessage>, notifier: Notifier) {
    let mut registry = TagRegistry::new();
    let mut active: Option<(u64, ScanMode)> = None;

    while let Some(message) = rx.recv().await {
        match message {
            SessionMessage::Begin { epoch, mode } => {
                registry.clear();
                active = Some((epoch, mode));
            }
            SessionMessage::Sighting { epoch, tag } => match active {
                Some((current, mode)) if current == epoch => {
                    if registry.contains(&tag.epc) {
                        trace!(epc = %tag.epc, "Duplicate sighting");
                        continue;
                    }
                    debug!(epc = %tag.epc, "New tag discovered");
                    registry.insert(tag.clone());
                    notifier.emit(RfidEvent::TagDiscovered {
                        tag,
                        batch_mode: mode == ScanMode::Batch,
                    });
                }
                _ => trace!(epoch, epc = %tag.epc, "Dropping sighting from ended session"),
            },
            SessionMessage::End { epoch } => {
                if active.is_some_and(|(current, _)| current == epoch) {
                    active = None;
                }
            }
            SessionMessage::Snapshot { reply } => {
                let _ = reply.send(registry.snapshot());
            }
            SessionMessage::Count { reply } => {
                let _ = reply.send(registry.len());
            }
            SessionMessage::Last { reply } => {
                let _ = reply.send(registry.last().cloned());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{self, EventStream};
    use rfidkit_hardware::mock::{DriverCall, MockUhfReader, MockUhfReaderHandle};
    use rfidkit_hardware::{DeviceContext, ReaderLifecycle};

    async fn setup() -> (
        ScanSession,
        EventStream,
        ReaderLifecycle<MockUhfReader>,
        MockUhfReaderHandle,
    ) {
        let (notifier, events) = events::channel(64);
        let session = ScanSession::new(notifier, Duration::from_millis(500));
        let (reader, handle) = MockUhfReader::new();
        let mut lifecycle = ReaderLifecycle::new(reader, DeviceContext::new("test"));
        lifecycle.init().await.unwrap();
        (session, events, lifecycle, handle)
    }

    fn tag(epc: &str) -> TagRecord {
        TagRecord::new(epc).unwrap()
    }

    #[tokio::test]
    async fn test_single_scan_returns_tag_and_completes() {
        let (session, mut events, lifecycle, handle) = setup().await;
        handle.place_epcs(&["AAAA"]).unwrap();

        let found = session.start_single(lifecycle.handle().unwrap()).await;
        assert_eq!(found.map(|t| t.epc), Some("AAAA".to_string()));
        assert_eq!(session.state().status, ScanStatus::Idle);

        let queued = events.drain();
        assert!(matches!(
            &queued[0],
            RfidEvent::TagDiscovered { tag, batch_mode: false } if tag.epc == "AAAA"
        ));
        assert!(matches!(
            &queued[1],
            RfidEvent::ScanComplete(ScanCompletion { total_tags: 1, success: true, stopped: false, .. })
        ));
    }

    #[tokio::test]
    async fn test_single_scan_with_empty_field() {
        let (session, mut events, lifecycle, _handle) = setup().await;

        assert!(session.start_single(lifecycle.handle().unwrap()).await.is_none());
        assert!(matches!(
            events.drain().as_slice(),
            [RfidEvent::ScanComplete(ScanCompletion { total_tags: 0, success: false, .. })]
        ));
    }

    #[tokio::test]
    async fn test_single_scan_driver_error() {
        let (session, mut events, lifecycle, handle) = setup().await;
        handle.fail_next(DriverCall::InventorySingleTag, "antenna fault");

        assert!(session.start_single(lifecycle.handle().unwrap()).await.is_none());
        assert!(!session.is_scanning());
        assert!(matches!(
            events.drain().as_slice(),
            [RfidEvent::ScanError { code: ScanErrorCode::ScanError, message, batch_mode: false }]
                if message.contains("antenna fault")
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_scan_rejected_while_scanning() {
        let (session, mut events, lifecycle, handle) = setup().await;
        handle.place_epcs(&["AAAA"]).unwrap();
        let reader = lifecycle.handle().unwrap();

        session.start_batch(reader).await.unwrap();
        let before = session.snapshot().await.unwrap();
        events.drain();
        handle.clear_calls();

        assert!(session.start_single(reader).await.is_none());
        assert_eq!(session.snapshot().await.unwrap(), before);
        assert_eq!(session.state().status, ScanStatus::Scanning(ScanMode::Batch));
        assert!(handle.calls().is_empty());
        assert!(events.drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_scan_deduplicates() {
        let (session, mut events, lifecycle, handle) = setup().await;
        handle.place_epcs(&["AAAA", "BBBB"]).unwrap();
        let reader = lifecycle.handle().unwrap();

        let tags = session.start_batch(reader).await.unwrap();
        assert_eq!(tags.len(), 2);

        handle.simulate_tag_read(tag("AAAA"));
        handle.simulate_tag_read(tag("CCCC"));
        handle.simulate_tag_read(tag("CCCC"));

        let epcs: Vec<String> = session
            .snapshot()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.epc)
            .collect();
        assert_eq!(epcs, vec!["AAAA", "BBBB", "CCCC"]);

        let discovered = events
            .drain()
            .into_iter()
            .filter(|e| matches!(e, RfidEvent::TagDiscovered { batch_mode: true, .. }))
            .count();
        assert_eq!(discovered, 3);

        let state = session.state();
        assert_eq!(state.status, ScanStatus::Scanning(ScanMode::Batch));
        assert!(state.continuation);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ignores_late_sightings() {
        let (session, mut events, lifecycle, handle) = setup().await;
        handle.place_epcs(&["AAAA"]).unwrap();
        let reader = lifecycle.handle().unwrap();

        session.start_batch(reader).await.unwrap();
        let outcome = session.stop(Some(reader)).await.unwrap();
        assert_eq!(outcome, StopOutcome::Stopped(ScanMode::Batch));

        handle.simulate_tag_read(tag("LATE"));
        assert_eq!(session.count().await.unwrap(), 1);
        assert_eq!(session.state().status, ScanStatus::Idle);
        assert!(!session.state().continuation);

        let last = events.drain().pop();
        assert!(matches!(
            last,
            Some(RfidEvent::ScanComplete(ScanCompletion {
                stopped: true,
                batch_mode: true,
                success: true,
                total_tags: 1,
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn test_stop_while_idle_is_silent() {
        let (session, mut events, lifecycle, handle) = setup().await;

        let outcome = session.stop(lifecycle.handle()).await.unwrap();
        assert_eq!(outcome, StopOutcome::NotScanning);
        assert_eq!(handle.call_count(DriverCall::StopInventory), 0);
        assert!(events.drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_error_clears_without_event() {
        let (session, mut events, lifecycle, handle) = setup().await;
        let reader = lifecycle.handle().unwrap();
        session.start_batch(reader).await.unwrap();
        events.drain();

        handle.fail_next(DriverCall::StopInventory, "bus error");
        assert!(session.stop(Some(reader)).await.is_err());
        assert!(!session.is_scanning());
        assert!(events.drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_failure_reports_batch_error() {
        let (session, mut events, lifecycle, handle) = setup().await;
        handle.fail_next(DriverCall::StartInventoryTag, "inventory rejected");

        let err = session
            .start_batch(lifecycle.handle().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InventoryFailed(ref m) if m.contains("inventory rejected")));
        assert!(!session.is_scanning());
        assert!(matches!(
            events.drain().as_slice(),
            [RfidEvent::ScanError { code: ScanErrorCode::BatchScanError, batch_mode: true, .. }]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_restart_stops_previous_session() {
        let (session, mut events, lifecycle, handle) = setup().await;
        handle.place_epcs(&["AAAA"]).unwrap();
        let reader = lifecycle.handle().unwrap();

        session.start_batch(reader).await.unwrap();
        handle.clear_field();
        handle.place_epcs(&["BBBB"]).unwrap();
        let tags = session.start_batch(reader).await.unwrap();

        assert_eq!(tags.iter().map(|t| t.epc.as_str()).collect::<Vec<_>>(), vec!["BBBB"]);
        assert_eq!(handle.call_count(DriverCall::StopInventory), 1);
        assert_eq!(session.state().epoch, 2);
        assert!(events.drain().iter().any(|e| matches!(
            e,
            RfidEvent::ScanComplete(ScanCompletion { stopped: true, .. })
        )));
    }

    #[tokio::test]
    async fn test_lost_worker_reports_scan_exception() {
        let (session, mut events, lifecycle, handle) = setup().await;
        handle.place_epcs(&["AAAA"]).unwrap();
        session.kill_worker();
        tokio::task::yield_now().await;

        assert!(session.start_single(lifecycle.handle().unwrap()).await.is_none());
        assert!(!session.is_scanning());
        assert!(events.drain().iter().any(|e| matches!(
            e,
            RfidEvent::ScanError { code: ScanErrorCode::ScanException, .. }
        )));
    }

    #[tokio::test]
    async fn test_state_watch_sees_transitions() {
        let (session, _events, lifecycle, _handle) = setup().await;
        let mut watcher = session.subscribe();

        session.start_single(lifecycle.handle().unwrap()).await;
        assert!(watcher.has_changed().unwrap());
        let state = *watcher.borrow_and_update();
        assert_eq!(state.status, ScanStatus::Idle);
        assert_eq!(state.epoch, 1);
    }
}
