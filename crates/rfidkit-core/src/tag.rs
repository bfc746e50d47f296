//! Tag records produced by an inventory.

use crate::constants::{DEFAULT_RSSI, TAG_CAPTURE_COUNT};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tag observed in the RF field.
///
/// The EPC is the identity of the record: scan sessions deduplicate on it.
/// Every other field is whatever the driver managed to report for this
/// particular sighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRecord {
    /// Electronic Product Code, hex encoded.
    pub epc: String,

    /// Tag identifier bank contents, if read.
    pub tid: Option<String>,

    /// User bank contents, if read.
    pub user: Option<String>,

    /// Protocol control word.
    pub pc: Option<String>,

    /// Antenna port the tag was seen on.
    pub ant: Option<String>,

    /// Reserved bank contents, if read.
    pub reserved: Option<String>,

    /// Frequency hopping channel the tag answered on.
    pub frequency_point: Option<u32>,

    /// Remaining tags reported by the reader buffer.
    pub remain: Option<u32>,

    /// Index of the tag in the reader buffer.
    pub index: Option<u32>,

    /// Backscatter phase.
    pub phase: Option<i32>,

    /// Signal strength in dBm.
    pub rssi: f64,

    /// Number of captures this record stands for (always 1 per read event).
    pub count: u32,

    /// When the tag was observed, as epoch milliseconds on the wire.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl TagRecord {
    /// Create a record with only an EPC, observed now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyEpc`] if `epc` is blank.
    ///
    /// # Examples
    ///
    /// ```
    /// use rfidkit_core::TagRecord;
    ///
    /// let tag = TagRecord::new("E2801160600002084F6C0A2B").unwrap();
    /// assert_eq!(tag.count, 1);
    /// assert_eq!(tag.rssi, -50.0);
    /// ```
    pub fn new(epc: impl Into<String>) -> Result<Self> {
        TagRecordBuilder::new(epc).build()
    }

    /// Create a builder for a record with optional fields.
    ///
    /// # Examples
    ///
    /// ```
    /// use rfidkit_core::TagRecord;
    ///
    /// let tag = TagRecord::builder("3000AABB")
    ///     .tid("E2003412")
    ///     .rssi_raw("-61.5")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(tag.rssi, -61.5);
    ///
    /// let unreadable = TagRecord::builder("3000AABB").rssi_raw("N/A").build().unwrap();
    /// assert_eq!(unreadable.rssi, -50.0);
    /// ```
    pub fn builder(epc: impl Into<String>) -> TagRecordBuilder {
        TagRecordBuilder::new(epc)
    }

    /// Number of 16-bit words in the EPC.
    pub fn epc_words(&self) -> usize {
        self.epc.len() / crate::constants::HEX_CHARS_PER_WORD
    }
}

/// Parse a driver-supplied RSSI string, falling back to [`DEFAULT_RSSI`].
pub fn parse_rssi(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(DEFAULT_RSSI)
}

/// Builder for [`TagRecord`].
#[derive(Debug, Clone)]
pub struct TagRecordBuilder {
    epc: String,
    tid: Option<String>,
    user: Option<String>,
    pc: Option<String>,
    ant: Option<String>,
    reserved: Option<String>,
    frequency_point: Option<u32>,
    remain: Option<u32>,
    index: Option<u32>,
    phase: Option<i32>,
    rssi: f64,
    timestamp: Option<DateTime<Utc>>,
}

impl TagRecordBuilder {
    /// Create a builder with the required EPC.
    pub fn new(epc: impl Into<String>) -> Self {
        Self {
            epc: epc.into(),
            tid: None,
            user: None,
            pc: None,
            ant: None,
            reserved: None,
            frequency_point: None,
            remain: None,
            index: None,
            phase: None,
            rssi: DEFAULT_RSSI,
            timestamp: None,
        }
    }

    pub fn tid(mut self, tid: impl Into<String>) -> Self {
        self.tid = Some(tid.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn pc(mut self, pc: impl Into<String>) -> Self {
        self.pc = Some(pc.into());
        self
    }

    pub fn ant(mut self, ant: impl Into<String>) -> Self {
        self.ant = Some(ant.into());
        self
    }

    pub fn reserved(mut self, reserved: impl Into<String>) -> Self {
        self.reserved = Some(reserved.into());
        self
    }

    pub fn frequency_point(mut self, frequency_point: u32) -> Self {
        self.frequency_point = Some(frequency_point);
        self
    }

    pub fn remain(mut self, remain: u32) -> Self {
        self.remain = Some(remain);
        self
    }

    pub fn index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    pub fn phase(mut self, phase: i32) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Set a numeric signal strength.
    pub fn rssi(mut self, rssi: f64) -> Self {
        self.rssi = if rssi.is_finite() { rssi } else { DEFAULT_RSSI };
        self
    }

    /// Set the signal strength from the driver's string form.
    pub fn rssi_raw(mut self, raw: &str) -> Self {
        self.rssi = parse_rssi(raw);
        self
    }

    /// Set a custom observation time.
    ///
    /// If not set, the current time is used when `build()` is called.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Build the record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyEpc`] if the EPC is empty or whitespace.
    pub fn build(self) -> Result<TagRecord> {
        if self.epc.trim().is_empty() {
            return Err(Error::EmptyEpc);
        }

        Ok(TagRecord {
            epc: self.epc,
            tid: self.tid,
            user: self.user,
            pc: self.pc,
            ant: self.ant,
            reserved: self.reserved,
            frequency_point: self.frequency_point,
            remain: self.remain,
            index: self.index,
            phase: self.phase,
            rssi: self.rssi,
            count: TAG_CAPTURE_COUNT,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
        })
    }
}
