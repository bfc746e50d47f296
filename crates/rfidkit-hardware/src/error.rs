//! Error types for reader driver operations.
//!
//! Every driver call returns [`Result<T>`]. Failures that a vendor SDK would
//! surface as thrown exceptions (link dropped, UART timeout, malformed reply)
//! arrive here as [`HardwareError`] values so the engine can retry or report
//! them without unwinding.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during reader operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HardwareError {
    /// Reader is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Reader communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Invalid data received from or sent to the reader.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Reader initialization failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// Reader could not be released.
    #[error("Release failed: {message}")]
    ReleaseFailed { message: String },
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    /// Create a new release failed error.
    pub fn release_failed(message: impl Into<String>) -> Self {
        Self::ReleaseFailed {
            message: message.into(),
        }
    }

    /// Short name of the error kind, used in operation traces.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Disconnected { .. } => "Disconnected",
            Self::CommunicationError { .. } => "CommunicationError",
            Self::InvalidData { .. } => "InvalidData",
            Self::InitializationFailed { .. } => "InitializationFailed",
            Self::ReleaseFailed { .. } => "ReleaseFailed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_error() {
        let error = HardwareError::disconnected("C72 UHF");
        assert!(matches!(error, HardwareError::Disconnected { .. }));
        assert_eq!(error.to_string(), "Device disconnected: C72 UHF");
        assert_eq!(error.kind(), "Disconnected");
    }

    #[test]
    fn test_communication_error() {
        let error = HardwareError::communication("UART timeout");
        assert_eq!(error.to_string(), "Communication error: UART timeout");
        assert_eq!(error.kind(), "CommunicationError");
    }

    #[test]
    fn test_initialization_failed_error() {
        let error = HardwareError::initialization_failed("power on failed");
        assert_eq!(error.to_string(), "Initialization failed: power on failed");
    }

    #[test]
    fn test_release_failed_error() {
        let error = HardwareError::release_failed("module busy");
        assert_eq!(error.to_string(), "Release failed: module busy");
        assert_eq!(error.kind(), "ReleaseFailed");
    }

    #[test]
    fn test_invalid_data_error() {
        let error = HardwareError::invalid_data("odd hex length");
        assert_eq!(error.to_string(), "Invalid data: odd hex length");
        assert_eq!(error.kind(), "InvalidData");
    }
}
