//! Types shared between the driver interface and the reader lifecycle.

use serde::{Deserialize, Serialize};

/// Host device context handed to the driver when the reader is opened.
///
/// The driver decides what to do with it; typically the serial port path
/// selects the UART the UHF module is wired to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceContext {
    /// Host device name (e.g., "C72", "MockHost").
    pub name: String,

    /// Optional serial port the reader module is attached to.
    pub serial_port: Option<String>,

    /// Optional baud rate for the serial link.
    pub baud_rate: Option<u32>,
}

impl DeviceContext {
    /// Create a new context with the host name only.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            serial_port: None,
            baud_rate: None,
        }
    }

    /// Set the serial port.
    pub fn with_serial_port(mut self, serial_port: impl Into<String>) -> Self {
        self.serial_port = Some(serial_port.into());
        self
    }

    /// Set the baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }
}

impl Default for DeviceContext {
    fn default() -> Self {
        Self::new("default")
    }
}

/// Outcome of inspecting the driver's "is open" flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionProbe {
    /// The driver reports the link as open.
    Open,

    /// The driver reports the link as closed.
    Closed,

    /// The driver does not expose the flag.
    Unknown,
}

impl ConnectionProbe {
    /// Interpret the probe, treating an unknown state as connected.
    pub fn assume_connected(self) -> bool {
        !matches!(self, Self::Closed)
    }
}

impl From<Option<bool>> for ConnectionProbe {
    fn from(flag: Option<bool>) -> Self {
        match flag {
            Some(true) => Self::Open,
            Some(false) => Self::Closed,
            None => Self::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_context_builder() {
        let context = DeviceContext::new("C72")
            .with_serial_port("/dev/ttyS4")
            .with_baud_rate(115200);

        assert_eq!(context.name, "C72");
        assert_eq!(context.serial_port.as_deref(), Some("/dev/ttyS4"));
        assert_eq!(context.baud_rate, Some(115200));
    }

    #[test]
    fn test_device_context_minimal() {
        let context = DeviceContext::new("MockHost");
        assert_eq!(context.serial_port, None);
        assert_eq!(context.baud_rate, None);
    }

    #[test]
    fn test_unknown_connection_fails_open() {
        assert!(ConnectionProbe::from(Some(true)).assume_connected());
        assert!(ConnectionProbe::from(None).assume_connected());
        assert!(!ConnectionProbe::from(Some(false)).assume_connected());
    }

    #[test]
    fn test_device_context_serialization() {
        let context = DeviceContext::new("C72").with_serial_port("/dev/ttyS4");
        let json = serde_json::to_value(&context).unwrap();
        assert_eq!(json["serialPort"], "/dev/ttyS4");
        assert!(json["baudRate"].is_null());

        let deserialized: DeviceContext = serde_json::from_value(json).unwrap();
        assert_eq!(context, deserialized);
    }
}
