//! Memory banks and their driver codes.

use crate::constants::{FALLBACK_BANK_EPC, FALLBACK_BANK_TID, FALLBACK_BANK_USER};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical memory bank of a Gen2 UHF tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemoryBank {
    /// Electronic Product Code bank.
    Epc,

    /// Tag identifier bank, usually factory programmed.
    Tid,

    /// User memory bank.
    User,

    /// Reserved bank (kill and access passwords).
    Reserved,
}

impl MemoryBank {
    /// All banks, in declaration order.
    pub const ALL: [MemoryBank; 4] = [Self::Epc, Self::Tid, Self::User, Self::Reserved];

    /// Canonical upper-case name of the bank.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Epc => "EPC",
            Self::Tid => "TID",
            Self::User => "USER",
            Self::Reserved => "RESERVED",
        }
    }

    /// Parse a bank name, treating anything unrecognized as EPC.
    ///
    /// This is the behavior application bridges rely on when they forward a
    /// bank name straight from user input.
    ///
    /// # Examples
    ///
    /// ```
    /// use rfidkit_core::MemoryBank;
    ///
    /// assert_eq!(MemoryBank::from_name_lossy("TID"), MemoryBank::Tid);
    /// assert_eq!(MemoryBank::from_name_lossy("bogus"), MemoryBank::Epc);
    /// ```
    pub fn from_name_lossy(name: &str) -> Self {
        name.parse().unwrap_or(Self::Epc)
    }
}

impl fmt::Display for MemoryBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryBank {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "EPC" => Ok(Self::Epc),
            "TID" => Ok(Self::Tid),
            "USER" => Ok(Self::User),
            "RESERVED" => Ok(Self::Reserved),
            other => Err(Error::UnknownBank(other.to_string())),
        }
    }
}

/// Bank codes published by a driver.
///
/// Drivers only publish EPC, TID and USER; RESERVED is always resolved from
/// the EPC code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankConstants {
    /// Code for the EPC bank.
    pub epc: u8,

    /// Code for the TID bank.
    pub tid: u8,

    /// Code for the USER bank.
    pub user: u8,
}

impl BankConstants {
    /// Table used when the driver cannot supply its own constants.
    pub const FALLBACK: BankConstants = BankConstants {
        epc: FALLBACK_BANK_EPC,
        tid: FALLBACK_BANK_TID,
        user: FALLBACK_BANK_USER,
    };
}

impl Default for BankConstants {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// Translates [`MemoryBank`] values into the numeric codes a driver expects.
///
/// # Examples
///
/// ```
/// use rfidkit_core::{BankCodec, MemoryBank};
///
/// let codec = BankCodec::new(None);
/// assert_eq!(codec.code_for(MemoryBank::Tid), 2);
/// assert_eq!(codec.code_for(MemoryBank::Reserved), codec.code_for(MemoryBank::Epc));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BankCodec {
    constants: BankConstants,
}

impl BankCodec {
    /// Build a codec from the driver's constants, if it has any.
    pub fn new(constants: Option<BankConstants>) -> Self {
        Self {
            constants: constants.unwrap_or(BankConstants::FALLBACK),
        }
    }

    /// Numeric code for `bank`.
    pub fn code_for(&self, bank: MemoryBank) -> u8 {
        match bank {
            MemoryBank::Epc => self.constants.epc,
            MemoryBank::Tid => self.constants.tid,
            MemoryBank::User => self.constants.user,
            // RESERVED shares the EPC code; see FALLBACK_BANK_RESERVED.
            MemoryBank::Reserved => self.constants.epc,
        }
    }

    /// Constants this codec resolves against.
    pub fn constants(&self) -> BankConstants {
        self.constants
    }
}
