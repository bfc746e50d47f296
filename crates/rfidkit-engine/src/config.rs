//! Engine configuration.

use crate::error::Result;
use rfidkit_core::constants::{DEFAULT_BATCH_GRACE_MS, DEFAULT_EVENT_CAPACITY};
use rfidkit_hardware::DeviceContext;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for [`RfidEngine`](crate::RfidEngine).
///
/// Every field has a default, so a partial JSON document is enough.
///
/// # Examples
///
/// ```
/// use rfidkit_engine::EngineConfig;
///
/// let config = EngineConfig::from_json(r#"{ "batchGraceMs": 250 }"#).unwrap();
/// assert_eq!(config.batch_grace_ms, 250);
/// assert_eq!(config.event_capacity, 256);
/// assert_eq!(config.device.name, "default");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Host device the reader is opened against.
    pub device: DeviceContext,

    /// How long a batch scan waits before returning its first snapshot.
    pub batch_grace_ms: u64,

    /// Capacity of the notification channel.
    pub event_capacity: usize,
}

impl EngineConfig {
    /// Parse a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`](crate::EngineError::Config) if the
    /// document is not valid JSON or has mistyped fields.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn batch_grace(&self) -> Duration {
        Duration::from_millis(self.batch_grace_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            device: DeviceContext::default(),
            batch_grace_ms: DEFAULT_BATCH_GRACE_MS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.batch_grace(), Duration::from_millis(500));
        assert_eq!(config.event_capacity, 256);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_device_section() {
        let config = EngineConfig::from_json(
            r#"{ "batchGraceMs": 250, "device": { "name": "C72", "serialPort": "/dev/ttyS4", "baudRate": 115200 } }"#,
        )
        .unwrap();
        assert_eq!(config.batch_grace_ms, 250);
        assert_eq!(config.device.name, "C72");
        assert_eq!(config.device.serial_port.as_deref(), Some("/dev/ttyS4"));
        assert_eq!(config.device.baud_rate, Some(115200));
    }

    #[test]
    fn test_invalid_document() {
        let err = EngineConfig::from_json(r#"{ "batchGraceMs": "soon" }"#).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
