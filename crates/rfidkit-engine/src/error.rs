use rfidkit_hardware::HardwareError;
use thiserror::Error;

/// Failures reported by the tag-transaction engine.
///
/// Driver errors never escape the engine as panics or torn-down state; they
/// end up here, usually inside a read or write report next to its trace.
#[derive(Error, Debug)]
pub enum EngineError {
    // Lifecycle errors
    #[error("RFID reader not initialized")]
    NotInitialized,

    #[error("Reader disconnected and reconnect failed")]
    Disconnected,

    // Bank access errors
    #[error("Failed to read data: {0}")]
    ReadFailed(String),

    #[error("Failed to read tag data")]
    NoData,

    #[error("Failed to write tag data: {0}")]
    WriteFailed(String),

    #[error("Failed to write tag data: Failed to write at offset {offset}")]
    ChunkFailed { offset: u32 },

    // Session errors
    #[error("Scan session worker is not running")]
    SessionClosed,

    #[error("Scan already in progress")]
    AlreadyScanning,

    #[error("Continuous inventory failed: {0}")]
    InventoryFailed(String),

    // Configuration errors
    #[error("Invalid engine configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Hardware(#[from] HardwareError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
