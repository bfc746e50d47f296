//! Constants shared across the reader engine.
//!
//! Values here mirror what the vendor UHF driver expects or what callers of
//! the engine have historically relied on. Changing them changes observable
//! behavior (trace contents, chunk boundaries, defaulted fields).

// ============================================================================
// Memory bank codes
// ============================================================================

/// Bank code used for EPC when the driver does not publish its constants.
pub const FALLBACK_BANK_EPC: u8 = 1;

/// Bank code used for TID when the driver does not publish its constants.
pub const FALLBACK_BANK_TID: u8 = 2;

/// Bank code used for USER when the driver does not publish its constants.
pub const FALLBACK_BANK_USER: u8 = 3;

/// Bank code used for RESERVED when the driver does not publish its constants.
///
/// Deliberately equal to [`FALLBACK_BANK_EPC`]. Readers in the field have been
/// driven with this value; it is kept as-is rather than switched to the Gen2
/// RESERVED bank (0).
pub const FALLBACK_BANK_RESERVED: u8 = FALLBACK_BANK_EPC;

// ============================================================================
// Tag defaults
// ============================================================================

/// Signal strength reported when the driver's RSSI string is not a number.
pub const DEFAULT_RSSI: f64 = -50.0;

/// Capture count attached to every read event.
pub const TAG_CAPTURE_COUNT: u32 = 1;

/// Bit offset of the EPC proper inside the EPC bank (after CRC-16 and PC).
pub const EPC_FILTER_OFFSET_BITS: u32 = 32;

// ============================================================================
// Bank access
// ============================================================================

/// Number of hex characters that encode one 16-bit word.
pub const HEX_CHARS_PER_WORD: usize = 4;

/// Word count used when the payload length is not a multiple of four.
///
/// This is a fixed value, not derived from the payload.
pub const DEFAULT_WORD_COUNT: u32 = 5;

/// Largest number of words the driver accepts in one write call.
pub const MAX_WORDS_PER_WRITE: u32 = 32;

/// Access password for tags that are not password-protected.
pub const DEFAULT_ACCESS_PASSWORD: &str = "00000000";

// ============================================================================
// Engine defaults
// ============================================================================

/// Time a batch scan waits for the first burst of tags before returning.
pub const DEFAULT_BATCH_GRACE_MS: u64 = 500;

/// Capacity of the notification channel handed to engine consumers.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;
