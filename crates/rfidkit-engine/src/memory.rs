//! Memory-bank reads, writes and filters.
//!
//! Every read and write returns a report carrying both the outcome and an
//! [`OperationTrace`] describing each step taken. The trace is returned on
//! success and on failure alike; callers surface it to operators when a tag
//! misbehaves in the field.
//!
//! # Retry and fallback
//!
//! - A read that errors is attempted exactly once more with the same
//!   arguments. A read that answers with no data is not retried.
//! - A write that errors falls back to a chunked write when the payload spans
//!   more than 32 words. Chunks are at most 32 words and advance the offset by
//!   32; the first failing chunk ends the write. A write that answers `false`
//!   is final.
//! - A filter that errors is applied once more. Clearing the filter is not
//!   retried.

use crate::error::EngineError;
use rfidkit_core::{
    BankCodec, FilterSpec, MemoryBank, OperationTrace, WriteRequest, mask_password,
};
use rfidkit_hardware::{ReaderHandle, ReaderLifecycle, ReconnectOutcome, UhfDriver};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Data returned by a successful read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankData {
    /// Hex payload as returned by the reader.
    pub data: String,
    pub bank: MemoryBank,
    pub ptr: u32,
    pub len: u32,
}

/// Confirmation of a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteAck {
    pub bank: MemoryBank,
    pub ptr: u32,
    pub word_count: u32,
    /// Whether the data went through the chunked fallback.
    pub chunked: bool,
}

/// Outcome and trace of a bank read.
#[derive(Debug)]
pub struct ReadReport {
    pub result: Result<BankData, EngineError>,
    pub trace: OperationTrace,
}

impl ReadReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Serializable view of the report, as sent on the event stream.
    pub fn summary(&self) -> ReadSummary {
        match &self.result {
            Ok(read) => ReadSummary {
                success: true,
                data: Some(read.data.clone()),
                bank: Some(read.bank),
                ptr: Some(read.ptr),
                len: Some(read.len),
                message: None,
                logs: self.trace.clone(),
            },
            Err(e) => ReadSummary {
                success: false,
                data: None,
                bank: None,
                ptr: None,
                len: None,
                message: Some(e.to_string()),
                logs: self.trace.clone(),
            },
        }
    }
}

/// Outcome and trace of a bank write.
#[derive(Debug)]
pub struct WriteReport {
    pub result: Result<WriteAck, EngineError>,
    pub trace: OperationTrace,
}

impl WriteReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Serializable view of the report, as sent on the event stream.
    pub fn summary(&self) -> WriteSummary {
        match &self.result {
            Ok(ack) => WriteSummary {
                success: true,
                bank: Some(ack.bank),
                ptr: Some(ack.ptr),
                message: None,
                logs: self.trace.clone(),
            },
            Err(e) => WriteSummary {
                success: false,
                bank: None,
                ptr: None,
                message: Some(e.to_string()),
                logs: self.trace.clone(),
            },
        }
    }
}

/// Flattened read outcome for bridges and event consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadSummary {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank: Option<MemoryBank>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ptr: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub len: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub logs: OperationTrace,
}

/// Flattened write outcome for bridges and event consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteSummary {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank: Option<MemoryBank>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ptr: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub logs: OperationTrace,
}

/// Sequences bank reads, writes and filters against the reader.
///
/// # Examples
///
/// ```
/// use rfidkit_core::{MemoryBank, WriteRequest};
/// use rfidkit_engine::memory::MemoryAccessOrchestrator;
/// use rfidkit_hardware::{DeviceContext, ReaderLifecycle};
/// use rfidkit_hardware::mock::MockUhfReader;
///
/// #[tokio::main]
/// async fn main() {
///     let (reader, _handle) = MockUhfReader::new();
///     let mut lifecycle = ReaderLifecycle::new(reader, DeviceContext::default());
///     lifecycle.init().await.unwrap();
///
///     let memory = MemoryAccessOrchestrator::for_driver(lifecycle.driver().as_ref());
///     let request = WriteRequest::new(MemoryBank::User, 0, "CAFEBABE", "00000000");
///     assert!(memory.write_bank(lifecycle.handle(), &request).await.is_success());
///
///     let report = memory.read_bank(&lifecycle, MemoryBank::User, 0, 2, "00000000").await;
///     assert_eq!(report.result.unwrap().data, "CAFEBABE");
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryAccessOrchestrator {
    codec: BankCodec,
}

impl MemoryAccessOrchestrator {
    pub fn new(codec: BankCodec) -> Self {
        Self { codec }
    }

    /// Build an orchestrator using the bank constants `driver` publishes.
    pub fn for_driver<D: UhfDriver>(driver: &D) -> Self {
        Self::new(BankCodec::new(driver.bank_constants()))
    }

    pub fn codec(&self) -> &BankCodec {
        &self.codec
    }

    /// Read `len` words from `bank` at word offset `ptr`.
    ///
    /// Never auto-initializes the reader. Reopens it first if the driver
    /// reports the link closed.
    pub async fn read_bank<D: UhfDriver>(
        &self,
        lifecycle: &ReaderLifecycle<D>,
        bank: MemoryBank,
        ptr: u32,
        len: u32,
        password: &str,
    ) -> ReadReport {
        let mut trace = OperationTrace::new();
        trace.push(format!(
            "Starting tag read: bank={}, ptr={}, len={}, password={}",
            bank,
            ptr,
            len,
            mask_password(password)
        ));
        debug!(%bank, ptr, len, "Starting tag read");

        let result = self
            .read_inner(lifecycle, bank, ptr, len, password, &mut trace)
            .await;
        ReadReport { result, trace }
    }

    async fn read_inner<D: UhfDriver>(
        &self,
        lifecycle: &ReaderLifecycle<D>,
        bank: MemoryBank,
        ptr: u32,
        len: u32,
        password: &str,
        trace: &mut OperationTrace,
    ) -> Result<BankData, EngineError> {
        let Some(handle) = lifecycle.handle() else {
            trace.push("Error: RFID reader not initialized");
            error!("RFID reader not initialized for read");
            return Err(EngineError::NotInitialized);
        };

        let bank_code = self.codec.code_for(bank);
        trace.push(format!("Translated bank '{}' to bank code {}", bank, bank_code));
        trace.push(format!("Device: {}", lifecycle.context().name));

        trace.push("Checking reader connection status");
        match handle.driver().probe_open() {
            Some(open) => trace.push(format!("Reader connection status from field: {}", open)),
            None => {
                trace.push("Could not check reader connection field: not exposed by driver");
                warn!("Failed to get reader connection status");
            }
        }

        match lifecycle.reconnect_if_needed().await {
            Ok(ReconnectOutcome::Connected(_)) => {}
            Ok(ReconnectOutcome::Reconnected) => {
                trace.push("Reader appears to be disconnected, attempting reconnect");
                trace.push("Reconnect result: true");
            }
            Err(e) => {
                trace.push("Reader appears to be disconnected, attempting reconnect");
                trace.push(format!("Reconnect error: {}", e));
                trace.push("Reconnect failed, aborting read");
                error!("Reconnect failed, aborting read");
                return Err(EngineError::Disconnected);
            }
        }

        trace.push(format!(
            "Attempting to read data with primary API (params: bankCode={}, ptr={}, len={})",
            bank_code, ptr, len
        ));
        let started = Instant::now();
        let primary = handle.driver().read_data(password, bank_code, ptr, len).await;
        let elapsed = started.elapsed().as_millis();

        let data = match primary {
            Ok(data) => {
                trace.push(format!("Read operation took {} ms", elapsed));
                trace.push(format!("Read result: {}", describe_read(&data)));
                debug!("Read result after {}ms: {:?}", elapsed, data);
                data
            }
            Err(e) => {
                let message = format!("Error reading data with standard API: {}", e);
                error!("{}", message);
                trace.push(message);
                trace.push(format!("Error kind: {}", e.kind()));

                trace.push("Attempting to read data with alternative API");
                let started = Instant::now();
                let fallback = handle.driver().read_data(password, bank_code, ptr, len).await;
                let elapsed = started.elapsed().as_millis();

                match fallback {
                    Ok(data) => {
                        trace.push(format!("Alternative read operation took {} ms", elapsed));
                        trace.push(format!(
                            "Alternative API read result: {}",
                            describe_read(&data)
                        ));
                        debug!("Alternative read result after {}ms: {:?}", elapsed, data);
                        data
                    }
                    Err(e) => {
                        let message = format!("Error reading data with alternative API: {}", e);
                        error!("{}", message);
                        trace.push(message);
                        trace.push(format!("Error kind: {}", e.kind()));
                        return Err(EngineError::ReadFailed(e.to_string()));
                    }
                }
            }
        };

        match data {
            Some(data) => {
                trace.push(format!("Successfully read data: {}", data));
                debug!(%data, "Read operation successful");
                Ok(BankData {
                    data,
                    bank,
                    ptr,
                    len,
                })
            }
            None => {
                trace.push("Read operation completed but returned null data");
                warn!("Read operation returned null data");
                Err(EngineError::NoData)
            }
        }
    }

    /// Write `request` into its bank.
    ///
    /// Never auto-initializes the reader.
    pub async fn write_bank<D: UhfDriver>(
        &self,
        handle: Option<&ReaderHandle<D>>,
        request: &WriteRequest,
    ) -> WriteReport {
        let mut trace = OperationTrace::new();
        trace.push(format!(
            "Starting tag write: bank={}, ptr={}, data length={}, password={}",
            request.bank,
            request.ptr,
            request.data.len(),
            mask_password(&request.password)
        ));
        debug!(bank = %request.bank, ptr = request.ptr, data_len = request.data.len(), "Starting tag write");

        let result = match handle {
            Some(handle) => self.write_inner(handle.driver(), request, &mut trace).await,
            None => {
                trace.push("Error: RFID reader not initialized");
                error!("RFID reader not initialized for write");
                Err(EngineError::NotInitialized)
            }
        };

        match &result {
            Ok(_) => {
                trace.push("Successfully wrote data to tag");
                debug!("Write operation successful");
            }
            Err(EngineError::NotInitialized) => {}
            Err(e) => {
                trace.push(format!("Write operation failed: {}", e));
                error!("Write operation failed: {}", e);
            }
        }

        WriteReport { result, trace }
    }

    async fn write_inner<D: UhfDriver>(
        &self,
        driver: &D,
        request: &WriteRequest,
        trace: &mut OperationTrace,
    ) -> Result<WriteAck, EngineError> {
        let bank_code = self.codec.code_for(request.bank);
        trace.push(format!(
            "Translated bank '{}' to bank code {}",
            request.bank, bank_code
        ));

        let word_count = request.word_count();
        trace.push(format!("Calculated word count: {}", word_count));

        trace.push("Attempting to write data with primary API");
        trace.push(format!(
            "Write parameters: bankCode={}, ptr={}, wordCount={}, data={}",
            bank_code, request.ptr, word_count, request.data
        ));
        let started = Instant::now();
        let primary = driver
            .write_data(
                &request.password,
                bank_code,
                request.ptr,
                word_count,
                &request.data,
            )
            .await;
        let elapsed = started.elapsed().as_millis();

        let ack = WriteAck {
            bank: request.bank,
            ptr: request.ptr,
            word_count,
            chunked: false,
        };

        match primary {
            Ok(true) => {
                trace.push(format!("Write operation took {} ms, result: true", elapsed));
                Ok(ack)
            }
            Ok(false) => {
                trace.push(format!("Write operation took {} ms, result: false", elapsed));
                Err(EngineError::WriteFailed("tag rejected the write".to_string()))
            }
            Err(e) => {
                let message = format!("Error with writeData API: {}", e);
                error!("{}", message);
                trace.push(message);
                trace.push(format!("Error kind: {}", e.kind()));

                if !request.needs_chunking() {
                    return Err(EngineError::WriteFailed(e.to_string()));
                }

                self.write_chunked(driver, request, bank_code, trace).await?;
                Ok(WriteAck {
                    chunked: true,
                    ..ack
                })
            }
        }
    }

    async fn write_chunked<D: UhfDriver>(
        &self,
        driver: &D,
        request: &WriteRequest,
        bank_code: u8,
        trace: &mut OperationTrace,
    ) -> Result<(), EngineError> {
        trace.push(format!(
            "Data too large ({} words), attempting chunked write",
            request.word_count()
        ));
        debug!("Attempting chunked write for large data");

        for chunk in request.chunk_plan() {
            trace.push(format!(
                "Writing chunk: start={}, size={}",
                chunk.ptr, chunk.words
            ));
            debug!(start = chunk.ptr, size = chunk.words, "Writing chunk");

            // Every chunk re-sends the full payload; only the offset and size change.
            let started = Instant::now();
            let outcome = driver
                .write_data(
                    &request.password,
                    bank_code,
                    chunk.ptr,
                    chunk.words,
                    &request.data,
                )
                .await;
            let elapsed = started.elapsed().as_millis();

            let failure = match outcome {
                Ok(true) => {
                    trace.push(format!("Chunk write took {} ms, result: true", elapsed));
                    None
                }
                Ok(false) => {
                    trace.push(format!("Chunk write took {} ms, result: false", elapsed));
                    Some(None)
                }
                Err(e) => {
                    trace.push(format!("Error with chunked writeData: {}", e));
                    Some(Some(e))
                }
            };

            if let Some(cause) = failure {
                let err = EngineError::ChunkFailed { offset: chunk.ptr };
                trace.push(format!(
                    "Chunk write failed: Failed to write at offset {}",
                    chunk.ptr
                ));
                match cause {
                    Some(e) => error!(offset = chunk.ptr, "Chunk write failed: {}", e),
                    None => error!(offset = chunk.ptr, "Chunk write failed"),
                }
                trace.push("Chunked write completed with result: false");
                return Err(err);
            }
        }

        trace.push("Chunked write completed with result: true");
        Ok(())
    }

    /// Apply `filter`, or clear filtering if it is a clearing filter.
    ///
    /// Returns false without touching the driver when no handle is given.
    pub async fn set_filter<D: UhfDriver>(
        &self,
        handle: Option<&ReaderHandle<D>>,
        filter: &FilterSpec,
    ) -> bool {
        let Some(handle) = handle else {
            warn!("RFID reader not initialized for set_filter");
            return false;
        };
        let driver = handle.driver();

        if filter.is_clear() {
            let clear = FilterSpec::clear();
            debug!("Disabling filter");
            return match driver
                .set_filter(self.codec.code_for(clear.bank), clear.ptr, clear.len, &clear.data)
                .await
            {
                Ok(applied) => applied,
                Err(e) => {
                    error!("Error disabling filter: {}", e);
                    false
                }
            };
        }

        let bank_code = self.codec.code_for(filter.bank);
        debug!(bank = %filter.bank, ptr = filter.ptr, len = filter.len, data = %filter.data, "Setting filter");
        match driver
            .set_filter(bank_code, filter.ptr, filter.len, &filter.data)
            .await
        {
            Ok(applied) => applied,
            Err(e) => {
                warn!("Error setting filter, retrying: {}", e);
                match driver
                    .set_filter(bank_code, filter.ptr, filter.len, &filter.data)
                    .await
                {
                    Ok(applied) => applied,
                    Err(e) => {
                        error!("Error setting filter: {}", e);
                        false
                    }
                }
            }
        }
    }
}

fn describe_read(data: &Option<String>) -> String {
    match data {
        Some(data) => format!("SUCCESS ({})", data),
        None => "NULL RESPONSE".to_string(),
    }
}
