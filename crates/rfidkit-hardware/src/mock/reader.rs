//! Mock UHF reader implementation for testing and development.
//!
//! This module provides a simulated reader that can be controlled
//! programmatically for testing without requiring physical hardware.

use crate::{
    HardwareError, Result,
    driver::{InventoryCallback, UhfDriver},
    types::DeviceContext,
};
use parking_lot::Mutex;
use rfidkit_core::{BankConstants, TagRecord, constants::HEX_CHARS_PER_WORD};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Driver calls that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverCall {
    Init,
    Free,
    SetInventoryCallback,
    InventorySingleTag,
    StartInventoryTag,
    StopInventory,
    SetFilter,
    ReadData,
    WriteData,
}

/// A driver call as the mock saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Init {
        device: String,
    },
    Free,
    SetInventoryCallback,
    InventorySingleTag,
    StartInventoryTag,
    StopInventory,
    SetFilter {
        bank_code: u8,
        ptr: u32,
        len: u32,
        data: String,
    },
    ReadData {
        password: String,
        bank_code: u8,
        ptr: u32,
        len: u32,
    },
    WriteData {
        password: String,
        bank_code: u8,
        ptr: u32,
        word_count: u32,
        data: String,
    },
}

impl RecordedCall {
    /// Which driver call this record is for.
    pub fn call(&self) -> DriverCall {
        match self {
            Self::Init { .. } => DriverCall::Init,
            Self::Free => DriverCall::Free,
            Self::SetInventoryCallback => DriverCall::SetInventoryCallback,
            Self::InventorySingleTag => DriverCall::InventorySingleTag,
            Self::StartInventoryTag => DriverCall::StartInventoryTag,
            Self::StopInventory => DriverCall::StopInventory,
            Self::SetFilter { .. } => DriverCall::SetFilter,
            Self::ReadData { .. } => DriverCall::ReadData,
            Self::WriteData { .. } => DriverCall::WriteData,
        }
    }
}

/// Scripted outcome for the next invocation of a call.
#[derive(Debug, Clone)]
enum Fault {
    /// Return an error, like a driver exception.
    Error(String),
    /// Answer without error but with a negative result (`false` / `None`).
    Refuse,
}

#[derive(Default)]
struct MockState {
    open: bool,
    hide_open_flag: bool,
    inventory_running: bool,
    callback: Option<InventoryCallback>,
    field: Vec<TagRecord>,
    memory: HashMap<u8, Vec<u16>>,
    filter: Option<(u8, u32, u32, String)>,
    bank_constants: Option<BankConstants>,
    faults: HashMap<DriverCall, VecDeque<Option<Fault>>>,
    calls: Vec<RecordedCall>,
}

impl MockState {
    /// Record the call and pop its scripted fault, if any.
    fn enter(&mut self, record: RecordedCall) -> Option<Fault> {
        let call = record.call();
        self.calls.push(record);
        self.faults
            .get_mut(&call)
            .and_then(VecDeque::pop_front)
            .flatten()
    }

    fn require_open(&self, device: &str) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(HardwareError::disconnected(device))
        }
    }
}

/// Mock UHF reader for testing and development.
///
/// The reader keeps a simulated RF field of tags and a word-addressed memory
/// per bank code. A [`MockUhfReaderHandle`] places tags in the field,
/// scripts failures and inspects the calls the engine made.
///
/// # Examples
///
/// ```
/// use rfidkit_core::TagRecord;
/// use rfidkit_hardware::{DeviceContext, UhfDriver};
/// use rfidkit_hardware::mock::MockUhfReader;
///
/// #[tokio::main]
/// async fn main() -> rfidkit_hardware::Result<()> {
///     let (reader, handle) = MockUhfReader::new();
///     handle.place_tag(TagRecord::new("3000E2801160").unwrap());
///
///     reader.init(&DeviceContext::default()).await?;
///     let tag = reader.inventory_single_tag().await?;
///     assert_eq!(tag.unwrap().epc, "3000E2801160");
///
///     Ok(())
/// }
/// ```
pub struct MockUhfReader {
    state: Arc<Mutex<MockState>>,
    name: String,
}

impl MockUhfReader {
    /// Create a new mock reader with the default name.
    ///
    /// Returns a tuple of (MockUhfReader, MockUhfReaderHandle) where the
    /// handle controls the simulated field and failures.
    pub fn new() -> (Self, MockUhfReaderHandle) {
        Self::with_name("Mock UHF Reader".to_string())
    }

    /// Create a new mock reader with a custom name.
    pub fn with_name(name: String) -> (Self, MockUhfReaderHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));

        let reader = Self {
            state: Arc::clone(&state),
            name: name.clone(),
        };
        let handle = MockUhfReaderHandle { state, name };

        (reader, handle)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn fault_error(message: String) -> HardwareError {
        HardwareError::communication(message)
    }

    fn do_init(&self, context: &DeviceContext) -> Result<bool> {
        let mut state = self.state.lock();
        match state.enter(RecordedCall::Init {
            device: context.name.clone(),
        }) {
            Some(Fault::Error(message)) => Err(Self::fault_error(message)),
            Some(Fault::Refuse) => Ok(false),
            None => {
                state.open = true;
                Ok(true)
            }
        }
    }

    fn do_free(&self) -> Result<bool> {
        let mut state = self.state.lock();
        match state.enter(RecordedCall::Free) {
            Some(Fault::Error(message)) => Err(Self::fault_error(message)),
            Some(Fault::Refuse) => Ok(false),
            None => {
                state.open = false;
                state.inventory_running = false;
                Ok(true)
            }
        }
    }

    fn do_set_callback(&self, callback: InventoryCallback) -> Result<()> {
        let mut state = self.state.lock();
        match state.enter(RecordedCall::SetInventoryCallback) {
            Some(Fault::Error(message)) => Err(Self::fault_error(message)),
            Some(Fault::Refuse) | None => {
                state.callback = Some(callback);
                Ok(())
            }
        }
    }

    fn do_inventory_single(&self) -> Result<Option<TagRecord>> {
        let mut state = self.state.lock();
        match state.enter(RecordedCall::InventorySingleTag) {
            Some(Fault::Error(message)) => Err(Self::fault_error(message)),
            Some(Fault::Refuse) => Ok(None),
            None => {
                state.require_open(&self.name)?;
                Ok(state.field.first().cloned())
            }
        }
    }

    fn do_start_inventory(&self) -> Result<()> {
        let (callback, field) = {
            let mut state = self.state.lock();
            match state.enter(RecordedCall::StartInventoryTag) {
                Some(Fault::Error(message)) => return Err(Self::fault_error(message)),
                Some(Fault::Refuse) | None => {}
            }
            state.require_open(&self.name)?;
            state.inventory_running = true;
            (state.callback.clone(), state.field.clone())
        };

        // Deliver the first round without the lock held.
        if let Some(callback) = callback {
            for tag in field {
                callback(tag);
            }
        }
        Ok(())
    }

    fn do_stop_inventory(&self) -> Result<bool> {
        let mut state = self.state.lock();
        match state.enter(RecordedCall::StopInventory) {
            Some(Fault::Error(message)) => Err(Self::fault_error(message)),
            Some(Fault::Refuse) => Ok(false),
            None => {
                state.inventory_running = false;
                Ok(true)
            }
        }
    }

    fn do_set_filter(&self, bank_code: u8, ptr: u32, len: u32, data: &str) -> Result<bool> {
        let mut state = self.state.lock();
        match state.enter(RecordedCall::SetFilter {
            bank_code,
            ptr,
            len,
            data: data.to_string(),
        }) {
            Some(Fault::Error(message)) => Err(Self::fault_error(message)),
            Some(Fault::Refuse) => Ok(false),
            None => {
                state.require_open(&self.name)?;
                state.filter = Some((bank_code, ptr, len, data.to_string()));
                Ok(true)
            }
        }
    }

    fn do_read(&self, password: &str, bank_code: u8, ptr: u32, len: u32) -> Result<Option<String>> {
        let mut state = self.state.lock();
        match state.enter(RecordedCall::ReadData {
            password: password.to_string(),
            bank_code,
            ptr,
            len,
        }) {
            Some(Fault::Error(message)) => Err(Self::fault_error(message)),
            Some(Fault::Refuse) => Ok(None),
            None => {
                state.require_open(&self.name)?;
                if len == 0 {
                    return Ok(None);
                }
                let words = state.memory.get(&bank_code);
                let hex = (ptr..ptr.saturating_add(len))
                    .map(|addr| {
                        let word = words
                            .and_then(|w| w.get(addr as usize))
                            .copied()
                            .unwrap_or(0);
                        format!("{:04X}", word)
                    })
                    .collect::<String>();
                Ok(Some(hex))
            }
        }
    }

    fn do_write(
        &self,
        password: &str,
        bank_code: u8,
        ptr: u32,
        word_count: u32,
        data: &str,
    ) -> Result<bool> {
        let mut state = self.state.lock();
        match state.enter(RecordedCall::WriteData {
            password: password.to_string(),
            bank_code,
            ptr,
            word_count,
            data: data.to_string(),
        }) {
            Some(Fault::Error(message)) => Err(Self::fault_error(message)),
            Some(Fault::Refuse) => Ok(false),
            None => {
                state.require_open(&self.name)?;
                let words = parse_words(data, word_count)?;
                store_words(state.memory.entry(bank_code).or_default(), ptr, &words);
                Ok(true)
            }
        }
    }
}

impl Default for MockUhfReader {
    fn default() -> Self {
        Self::new().0
    }
}

impl fmt::Debug for MockUhfReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockUhfReader")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl UhfDriver for MockUhfReader {
    async fn init(&self, context: &DeviceContext) -> Result<bool> {
        self.do_init(context)
    }

    async fn free(&self) -> Result<bool> {
        self.do_free()
    }

    fn set_inventory_callback(&self, callback: InventoryCallback) -> Result<()> {
        self.do_set_callback(callback)
    }

    async fn inventory_single_tag(&self) -> Result<Option<TagRecord>> {
        self.do_inventory_single()
    }

    async fn start_inventory_tag(&self) -> Result<()> {
        self.do_start_inventory()
    }

    async fn stop_inventory(&self) -> Result<bool> {
        self.do_stop_inventory()
    }

    async fn set_filter(&self, bank_code: u8, ptr: u32, len: u32, data: &str) -> Result<bool> {
        self.do_set_filter(bank_code, ptr, len, data)
    }

    async fn read_data(
        &self,
        password: &str,
        bank_code: u8,
        ptr: u32,
        len: u32,
    ) -> Result<Option<String>> {
        self.do_read(password, bank_code, ptr, len)
    }

    async fn write_data(
        &self,
        password: &str,
        bank_code: u8,
        ptr: u32,
        word_count: u32,
        data: &str,
    ) -> Result<bool> {
        self.do_write(password, bank_code, ptr, word_count, data)
    }

    fn probe_open(&self) -> Option<bool> {
        let state = self.state.lock();
        if state.hide_open_flag {
            None
        } else {
            Some(state.open)
        }
    }

    fn bank_constants(&self) -> Option<BankConstants> {
        self.state.lock().bank_constants
    }
}

/// Split `data` into `word_count` words, zero-padding a short payload.
fn parse_words(data: &str, word_count: u32) -> Result<Vec<u16>> {
    let wanted = word_count as usize * HEX_CHARS_PER_WORD;
    let mut hex: String = data.chars().take(wanted).collect();
    while hex.len() < wanted {
        hex.push('0');
    }

    (0..word_count as usize)
        .map(|i| {
            let chunk = hex
                .get(i * HEX_CHARS_PER_WORD..(i + 1) * HEX_CHARS_PER_WORD)
                .ok_or_else(|| HardwareError::invalid_data("payload is not ASCII hex"))?;
            u16::from_str_radix(chunk, 16)
                .map_err(|_| HardwareError::invalid_data(format!("'{}' is not hex", chunk)))
        })
        .collect()
}

fn store_words(bank: &mut Vec<u16>, ptr: u32, words: &[u16]) {
    let start = ptr as usize;
    let end = start + words.len();
    if bank.len() < end {
        bank.resize(end, 0);
    }
    bank[start..end].copy_from_slice(words);
}

/// Handle for controlling a mock UHF reader.
///
/// Clones share the same reader state.
///
/// # Examples
///
/// ```
/// use rfidkit_hardware::{DeviceContext, UhfDriver};
/// use rfidkit_hardware::mock::{DriverCall, MockUhfReader};
///
/// #[tokio::main]
/// async fn main() {
///     let (reader, handle) = MockUhfReader::new();
///
///     handle.fail_next(DriverCall::Init, "serial port busy");
///     assert!(reader.init(&DeviceContext::default()).await.is_err());
///     assert!(reader.init(&DeviceContext::default()).await.unwrap());
///     assert_eq!(handle.call_count(DriverCall::Init), 2);
/// }
/// ```
#[derive(Clone)]
pub struct MockUhfReaderHandle {
    state: Arc<Mutex<MockState>>,
    name: String,
}

impl MockUhfReaderHandle {
    /// Put a tag in the RF field.
    ///
    /// If continuous inventory is running, the tag is reported through the
    /// inventory callback immediately.
    pub fn place_tag(&self, tag: TagRecord) {
        let callback = {
            let mut state = self.state.lock();
            state.field.push(tag.clone());
            state
                .inventory_running
                .then(|| state.callback.clone())
                .flatten()
        };

        if let Some(callback) = callback {
            callback(tag);
        }
    }

    /// Put several tags, by EPC, in the RF field.
    pub fn place_epcs(&self, epcs: &[&str]) -> rfidkit_core::Result<()> {
        for epc in epcs {
            self.place_tag(TagRecord::new(*epc)?);
        }
        Ok(())
    }

    /// Remove every tag from the RF field.
    pub fn clear_field(&self) {
        self.state.lock().field.clear();
    }

    /// Push one sighting through the inventory callback.
    ///
    /// Returns false if no callback is registered.
    pub fn simulate_tag_read(&self, tag: TagRecord) -> bool {
        let callback = self.state.lock().callback.clone();
        match callback {
            Some(callback) => {
                callback(tag);
                true
            }
            None => false,
        }
    }

    /// Make the next invocation of `call` return an error.
    ///
    /// Scripted outcomes queue up: calling this twice fails the next two
    /// invocations.
    pub fn fail_next(&self, call: DriverCall, message: impl Into<String>) {
        self.push_fault(call, Some(Fault::Error(message.into())));
    }

    /// Make the next invocation of `call` answer `false` / `None` without error.
    pub fn refuse_next(&self, call: DriverCall) {
        self.push_fault(call, Some(Fault::Refuse));
    }

    /// Let the next invocation of `call` behave normally.
    ///
    /// Useful to place a success between scripted failures.
    pub fn pass_next(&self, call: DriverCall) {
        self.push_fault(call, None);
    }

    fn push_fault(&self, call: DriverCall, fault: Option<Fault>) {
        self.state
            .lock()
            .faults
            .entry(call)
            .or_default()
            .push_back(fault);
    }

    /// Drop all scripted outcomes.
    pub fn clear_faults(&self) {
        self.state.lock().faults.clear();
    }

    /// Set the link state the driver reports.
    pub fn set_open(&self, open: bool) {
        self.state.lock().open = open;
    }

    /// Stop exposing the "is open" flag, as a driver without introspection.
    pub fn hide_open_flag(&self) {
        self.state.lock().hide_open_flag = true;
    }

    /// Publish canonical bank constants from the driver.
    pub fn set_bank_constants(&self, constants: Option<BankConstants>) {
        self.state.lock().bank_constants = constants;
    }

    /// Preload words into a bank.
    pub fn load_memory(&self, bank_code: u8, ptr: u32, words: &[u16]) {
        store_words(
            self.state.lock().memory.entry(bank_code).or_default(),
            ptr,
            words,
        );
    }

    /// Contents of a bank, as words.
    pub fn memory(&self, bank_code: u8) -> Vec<u16> {
        self.state
            .lock()
            .memory
            .get(&bank_code)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    pub fn is_inventory_running(&self) -> bool {
        self.state.lock().inventory_running
    }

    pub fn has_callback(&self) -> bool {
        self.state.lock().callback.is_some()
    }

    /// Last filter applied: bank code, offset, length, pattern.
    pub fn filter(&self) -> Option<(u8, u32, u32, String)> {
        self.state.lock().filter.clone()
    }

    /// Every call the reader received, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Calls of one kind, in order.
    pub fn calls_of(&self, call: DriverCall) -> Vec<RecordedCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|record| record.call() == call)
            .cloned()
            .collect()
    }

    pub fn call_count(&self, call: DriverCall) -> usize {
        self.calls_of(call).len()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for MockUhfReaderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockUhfReaderHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
