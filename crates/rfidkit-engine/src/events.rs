//! Engine notifications.
//!
//! The engine publishes fire-and-forget [`RfidEvent`]s into a bounded
//! channel. A slow consumer never blocks a scan: when the channel is full
//! the event is dropped and a warning is logged.

use crate::memory::{ReadSummary, WriteSummary};
use rfidkit_core::TagRecord;
use rfidkit_hardware::{ButtonAction, ButtonConsumer, ButtonEvent};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tracing::{trace, warn};

/// Error code attached to a [`RfidEvent::ScanError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanErrorCode {
    /// The reader had to be opened for the scan and opening failed.
    ReaderInitFailed,

    /// The single inventory call failed.
    ScanError,

    /// The single scan failed outside the inventory call.
    ScanException,

    /// Continuous inventory failed on the background task.
    BatchScanError,

    /// The batch scan call itself failed.
    BatchScanException,
}

impl ScanErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReaderInitFailed => "READER_INIT_FAILED",
            Self::ScanError => "SCAN_ERROR",
            Self::ScanException => "SCAN_EXCEPTION",
            Self::BatchScanError => "BATCH_SCAN_ERROR",
            Self::BatchScanException => "BATCH_SCAN_EXCEPTION",
        }
    }
}

impl std::fmt::Display for ScanErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of [`RfidEvent::ScanComplete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanCompletion {
    /// Distinct tags discovered by the session.
    pub total_tags: usize,

    /// Always 0; session duration is not measured.
    #[serde(rename = "timeTaken")]
    pub time_taken_ms: u64,

    pub success: bool,
    pub batch_mode: bool,
    pub continuous: bool,
    pub stopped: bool,
}

/// Notification emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum RfidEvent {
    /// A tag was seen for the first time in the current session.
    #[serde(rename_all = "camelCase")]
    TagDiscovered { tag: TagRecord, batch_mode: bool },

    /// A scan session ended.
    ScanComplete(ScanCompletion),

    /// A scan session failed.
    #[serde(rename_all = "camelCase")]
    ScanError {
        code: ScanErrorCode,
        message: String,
        batch_mode: bool,
    },

    /// A hardware key went down.
    HardwareButtonPress(ButtonEvent),

    /// A hardware key came back up.
    HardwareButtonRelease(ButtonEvent),

    /// A bank read finished.
    TagRead(ReadSummary),

    /// A bank write finished.
    TagWritten(WriteSummary),
}

impl RfidEvent {
    pub(crate) fn scan_error(code: ScanErrorCode, message: impl Into<String>, batch_mode: bool) -> Self {
        Self::ScanError {
            code,
            message: message.into(),
            batch_mode,
        }
    }
}

/// Create a notification channel.
///
/// A capacity of 0 is raised to 1.
pub fn channel(capacity: usize) -> (Notifier, EventStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (Notifier { tx }, EventStream { rx })
}

/// Sending side of the notification channel.
///
/// Cheap to clone; every component that emits events holds its own copy.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::Sender<RfidEvent>,
}

impl Notifier {
    /// Publish `event` without waiting.
    pub fn emit(&self, event: RfidEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(?event, "Event channel full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                trace!("Event stream dropped, discarding event");
            }
        }
    }
}

impl ButtonConsumer for Notifier {
    fn on_button(&self, action: ButtonAction, event: ButtonEvent) {
        self.emit(match action {
            ButtonAction::Press => RfidEvent::HardwareButtonPress(event),
            ButtonAction::Release => RfidEvent::HardwareButtonRelease(event),
        });
    }
}

/// Receiving side of the notification channel.
///
/// # Examples
///
/// ```no_run
/// use rfidkit_engine::{EngineConfig, RfidEngine, RfidEvent};
/// use rfidkit_hardware::mock::MockUhfReader;
///
/// #[tokio::main]
/// async fn main() {
///     let (reader, _handle) = MockUhfReader::new();
///     let (mut engine, mut events) = RfidEngine::new(reader, EngineConfig::default());
///
///     engine.start_batch_scan().await;
///     while let Some(event) = events.recv().await {
///         if let RfidEvent::TagDiscovered { tag, .. } = event {
///             println!("Tag: {}", tag.epc);
///         }
///     }
/// }
/// ```
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<RfidEvent>,
}

impl EventStream {
    /// Wait for the next event.
    ///
    /// Returns `None` once every [`Notifier`] has been dropped.
    pub async fn recv(&mut self) -> Option<RfidEvent> {
        self.rx.recv().await
    }

    /// Take the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<RfidEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Take every event already queued.
    pub fn drain(&mut self) -> Vec<RfidEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_full_channel_drops_without_blocking() {
        let (notifier, mut events) = channel(1);
        notifier.emit(RfidEvent::scan_error(ScanErrorCode::ScanError, "first", false));
        notifier.emit(RfidEvent::scan_error(ScanErrorCode::ScanError, "second", false));

        let queued = events.drain();
        assert_eq!(queued.len(), 1);
        assert!(matches!(&queued[0], RfidEvent::ScanError { message, .. } if message == "first"));
    }

    #[test]
    fn test_emit_after_stream_dropped() {
        let (notifier, events) = channel(4);
        drop(events);
        notifier.emit(RfidEvent::scan_error(ScanErrorCode::ScanError, "nobody", false));
    }

    #[test]
    fn test_zero_capacity_is_usable() {
        let (notifier, mut events) = channel(0);
        notifier.emit(RfidEvent::scan_error(ScanErrorCode::ScanError, "one", false));
        assert!(events.try_recv().is_some());
    }

    #[test]
    fn test_button_events_are_forwarded() {
        let (notifier, mut events) = channel(4);
        notifier.on_button(ButtonAction::Press, ButtonEvent::new(311));
        notifier.on_button(ButtonAction::Release, ButtonEvent::new(311));

        let queued = events.drain();
        assert!(matches!(&queued[0], RfidEvent::HardwareButtonPress(e) if e.key_name == "TRIGGER key"));
        assert!(matches!(&queued[1], RfidEvent::HardwareButtonRelease(e) if e.key_code == 311));
    }

    #[rstest]
    #[case(ScanErrorCode::ReaderInitFailed, "READER_INIT_FAILED")]
    #[case(ScanErrorCode::ScanError, "SCAN_ERROR")]
    #[case(ScanErrorCode::ScanException, "SCAN_EXCEPTION")]
    #[case(ScanErrorCode::BatchScanError, "BATCH_SCAN_ERROR")]
    #[case(ScanErrorCode::BatchScanException, "BATCH_SCAN_EXCEPTION")]
    fn test_error_codes_serialize_as_wire_names(#[case] code: ScanErrorCode, #[case] wire: &str) {
        assert_eq!(serde_json::to_value(code).unwrap(), wire);
        assert_eq!(code.to_string(), wire);
    }

    #[test]
    fn test_scan_complete_serialization() {
        let event = RfidEvent::ScanComplete(ScanCompletion {
            total_tags: 3,
            time_taken_ms: 0,
            success: true,
            batch_mode: true,
            continuous: false,
            stopped: true,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "scanComplete");
        assert_eq!(json["totalTags"], 3);
        assert_eq!(json["timeTaken"], 0);
        assert_eq!(json["batchMode"], true);
        assert_eq!(json["stopped"], true);
    }

    #[test]
    fn test_tag_discovered_serialization() {
        let event = RfidEvent::TagDiscovered {
            tag: TagRecord::new("E200001").unwrap(),
            batch_mode: false,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "tagDiscovered");
        assert_eq!(json["tag"]["epc"], "E200001");
        assert_eq!(json["batchMode"], false);
    }
}
