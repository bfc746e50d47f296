//! Hardware button routing.
//!
//! Handheld readers expose a scan trigger and a few other keys as ordinary
//! key codes. The host forwards raw key-down / key-up codes to a
//! [`HardwareButtonRouter`], which hands them to whichever consumer is
//! currently active. The router knows nothing about scan state.
//!
//! # Registration
//!
//! At most one consumer is active. Registering replaces the previous one
//! (last writer wins). The returned [`ButtonRegistration`] clears the slot
//! when dropped, but only if its consumer is still the active one, so a late
//! drop never evicts a newer consumer.
//!
//! ```
//! use std::sync::Arc;
//! use rfidkit_hardware::buttons::{ButtonAction, ButtonConsumer, ButtonEvent, HardwareButtonRouter};
//!
//! struct Printer;
//!
//! impl ButtonConsumer for Printer {
//!     fn on_button(&self, action: ButtonAction, event: ButtonEvent) {
//!         println!("{:?} {}", action, event.key_name);
//!     }
//! }
//!
//! let router = HardwareButtonRouter::shared();
//! assert!(!router.on_key_down(311));
//!
//! let registration = router.register(Arc::new(Printer));
//! assert!(router.on_key_down(311));
//!
//! drop(registration);
//! assert!(!router.on_key_up(311));
//! ```

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Key codes the reader's pistol trigger and side keys report.
pub const TRIGGER_KEY_CODES: [i32; 6] = [139, 280, 293, 311, 312, 313];

/// Label for key codes outside the recognized set.
pub const UNKNOWN_KEY_NAME: &str = "UNKNOWN key";

/// Semantic name for a raw key code.
///
/// # Examples
///
/// ```
/// use rfidkit_hardware::buttons::key_name;
///
/// assert_eq!(key_name(311), "TRIGGER key");
/// assert_eq!(key_name(4), "BACK key");
/// assert_eq!(key_name(9999), "UNKNOWN key");
/// ```
pub fn key_name(key_code: i32) -> &'static str {
    match key_code {
        code if TRIGGER_KEY_CODES.contains(&code) => "TRIGGER key",
        82 => "MENU key",
        27 => "CAMERA key",
        25 => "VOLUME_DOWN key",
        23 => "DPAD_CENTER key",
        4 => "BACK key",
        _ => UNKNOWN_KEY_NAME,
    }
}

/// Whether the key went down or came back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonAction {
    Press,
    Release,
}

/// A routed key event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonEvent {
    /// Raw key code as reported by the host.
    pub key_code: i32,

    /// Semantic name, see [`key_name`].
    pub key_name: String,

    /// When the router received the key, as epoch milliseconds on the wire.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl ButtonEvent {
    pub fn new(key_code: i32) -> Self {
        Self {
            key_code,
            key_name: key_name(key_code).to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Receiver of routed button events.
///
/// Called synchronously on the thread that delivered the key; must not block.
pub trait ButtonConsumer: Send + Sync {
    fn on_button(&self, action: ButtonAction, event: ButtonEvent);
}

struct ActiveConsumer {
    id: u64,
    consumer: Arc<dyn ButtonConsumer>,
}

/// Shared registry holding the active button consumer.
#[derive(Default)]
pub struct HardwareButtonRouter {
    active: Mutex<Option<ActiveConsumer>>,
    next_id: AtomicU64,
}

impl HardwareButtonRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a router ready to be shared between the host and consumers.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Make `consumer` the active consumer, replacing any previous one.
    pub fn register(self: &Arc<Self>, consumer: Arc<dyn ButtonConsumer>) -> ButtonRegistration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let replaced = self
            .active
            .lock()
            .replace(ActiveConsumer { id, consumer })
            .is_some();
        debug!(id, replaced, "Button consumer registered");

        ButtonRegistration {
            router: Arc::downgrade(self),
            id,
        }
    }

    /// Whether a consumer is currently registered.
    pub fn has_active_consumer(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Route a key press. Returns false if nobody consumed it.
    pub fn on_key_down(&self, key_code: i32) -> bool {
        self.dispatch(ButtonAction::Press, key_code)
    }

    /// Route a key release. Returns false if nobody consumed it.
    pub fn on_key_up(&self, key_code: i32) -> bool {
        self.dispatch(ButtonAction::Release, key_code)
    }

    fn dispatch(&self, action: ButtonAction, key_code: i32) -> bool {
        // Clone out so the consumer runs without the lock held.
        let consumer = self
            .active
            .lock()
            .as_ref()
            .map(|active| Arc::clone(&active.consumer));

        match consumer {
            Some(consumer) => {
                let event = ButtonEvent::new(key_code);
                trace!(key_code, key_name = %event.key_name, ?action, "Routing hardware button");
                consumer.on_button(action, event);
                true
            }
            None => {
                trace!(key_code, ?action, "No active button consumer");
                false
            }
        }
    }

    fn release(&self, id: u64) {
        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|current| current.id == id) {
            *active = None;
            debug!(id, "Button consumer deregistered");
        }
    }
}

impl fmt::Debug for HardwareButtonRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HardwareButtonRouter")
            .field("has_active_consumer", &self.has_active_consumer())
            .finish()
    }
}

/// Guard for an active consumer registration.
#[derive(Debug)]
pub struct ButtonRegistration {
    router: Weak<HardwareButtonRouter>,
    id: u64,
}

impl ButtonRegistration {
    /// Deregister now instead of on drop.
    pub fn deregister(self) {
        drop(self);
    }
}

impl Drop for ButtonRegistration {
    fn drop(&mut self) {
        if let Some(router) = self.router.upgrade() {
            router.release(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(ButtonAction, ButtonEvent)>>,
    }

    impl ButtonConsumer for Recorder {
        fn on_button(&self, action: ButtonAction, event: ButtonEvent) {
            self.events.lock().push((action, event));
        }
    }

    #[rstest]
    #[case(311, "TRIGGER key")]
    #[case(139, "TRIGGER key")]
    #[case(280, "TRIGGER key")]
    #[case(293, "TRIGGER key")]
    #[case(82, "MENU key")]
    #[case(27, "CAMERA key")]
    #[case(25, "VOLUME_DOWN key")]
    #[case(23, "DPAD_CENTER key")]
    #[case(4, "BACK key")]
    #[case(24, "UNKNOWN key")]
    #[case(-1, "UNKNOWN key")]
    fn test_key_names(#[case] code: i32, #[case] expected: &str) {
        assert_eq!(key_name(code), expected);
    }

    #[test]
    fn test_no_consumer_returns_false() {
        let router = HardwareButtonRouter::shared();
        assert!(!router.has_active_consumer());
        assert!(!router.on_key_down(311));
        assert!(!router.on_key_up(311));
    }

    #[test]
    fn test_forwards_trigger_press() {
        let router = HardwareButtonRouter::shared();
        let recorder = Arc::new(Recorder::default());
        let _registration = router.register(recorder.clone());

        assert!(router.on_key_down(311));
        assert!(router.on_key_up(311));

        let events = recorder.events.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, ButtonAction::Press);
        assert_eq!(events[0].1.key_code, 311);
        assert_eq!(events[0].1.key_name, "TRIGGER key");
        assert_eq!(events[1].0, ButtonAction::Release);
    }

    #[test]
    fn test_unknown_code_still_forwarded() {
        let router = HardwareButtonRouter::shared();
        let recorder = Arc::new(Recorder::default());
        let _registration = router.register(recorder.clone());

        assert!(router.on_key_down(1234));

        let events = recorder.events.lock();
        assert_eq!(events[0].1.key_code, 1234);
        assert_eq!(events[0].1.key_name, UNKNOWN_KEY_NAME);
    }

    #[test]
    fn test_last_writer_wins() {
        let router = HardwareButtonRouter::shared();
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());

        let first_registration = router.register(first.clone());
        let _second_registration = router.register(second.clone());

        assert!(router.on_key_down(82));
        assert!(first.events.lock().is_empty());
        assert_eq!(second.events.lock().len(), 1);

        // Dropping the stale registration must not evict the newer consumer.
        drop(first_registration);
        assert!(router.has_active_consumer());
        assert!(router.on_key_down(82));
        assert_eq!(second.events.lock().len(), 2);
    }

    #[test]
    fn test_deregister_clears_slot() {
        let router = HardwareButtonRouter::shared();
        let registration = router.register(Arc::new(Recorder::default()));
        assert!(router.has_active_consumer());

        registration.deregister();
        assert!(!router.has_active_consumer());
        assert!(!router.on_key_down(311));
    }

    #[test]
    fn test_button_event_serialization() {
        let event = ButtonEvent::new(311);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["keyCode"], 311);
        assert_eq!(json["keyName"], "TRIGGER key");
        assert!(json["timestamp"].is_i64());
        assert_eq!(json["timestamp"], event.timestamp.timestamp_millis());
    }
}
