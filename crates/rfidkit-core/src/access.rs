//! Filter and write descriptors for memory-bank access.

use crate::bank::MemoryBank;
use crate::constants::{
    DEFAULT_WORD_COUNT, EPC_FILTER_OFFSET_BITS, HEX_CHARS_PER_WORD, MAX_WORDS_PER_WRITE,
};
use serde::{Deserialize, Serialize};

/// Inventory filter (select mask) applied by the reader.
///
/// A filter with `len == 0` or an empty pattern clears filtering. The bank
/// of a clearing filter is irrelevant: it is always applied as EPC, offset 0,
/// length 0, empty pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Bank the mask is matched against.
    pub bank: MemoryBank,

    /// Bit offset into the bank.
    pub ptr: u32,

    /// Mask length in bits.
    pub len: u32,

    /// Hex pattern to match.
    pub data: String,
}

impl FilterSpec {
    pub fn new(bank: MemoryBank, ptr: u32, len: u32, data: impl Into<String>) -> Self {
        Self {
            bank,
            ptr,
            len,
            data: data.into(),
        }
    }

    /// The filter that disables filtering.
    pub fn clear() -> Self {
        Self::new(MemoryBank::Epc, 0, 0, String::new())
    }

    /// A filter selecting exactly the tag with `epc`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rfidkit_core::{FilterSpec, MemoryBank};
    ///
    /// let filter = FilterSpec::matching_epc("3000AABB");
    /// assert_eq!(filter.bank, MemoryBank::Epc);
    /// assert_eq!(filter.ptr, 32);
    /// assert_eq!(filter.len, 32);
    /// ```
    pub fn matching_epc(epc: &str) -> Self {
        Self::new(
            MemoryBank::Epc,
            EPC_FILTER_OFFSET_BITS,
            (epc.len() * 4) as u32,
            epc,
        )
    }

    /// Whether applying this filter clears filtering.
    pub fn is_clear(&self) -> bool {
        self.len == 0 || self.data.is_empty()
    }

    /// The filter that will actually be sent to the reader.
    pub fn effective(&self) -> Self {
        if self.is_clear() {
            Self::clear()
        } else {
            self.clone()
        }
    }
}

/// One bounded sub-write of a chunked write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteChunk {
    /// Word offset the chunk is written at.
    pub ptr: u32,

    /// Number of words in the chunk.
    pub words: u32,
}

/// Request to write a hex payload into a memory bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRequest {
    /// Target bank.
    pub bank: MemoryBank,

    /// Word offset to start writing at.
    pub ptr: u32,

    /// Hex payload.
    pub data: String,

    /// Access password.
    pub password: String,
}

impl WriteRequest {
    pub fn new(
        bank: MemoryBank,
        ptr: u32,
        data: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            bank,
            ptr,
            data: data.into(),
            password: password.into(),
        }
    }

    /// Number of words announced to the driver.
    ///
    /// Payload length / 4 when it divides exactly, otherwise
    /// [`DEFAULT_WORD_COUNT`].
    ///
    /// # Examples
    ///
    /// ```
    /// use rfidkit_core::{MemoryBank, WriteRequest};
    ///
    /// assert_eq!(WriteRequest::new(MemoryBank::Epc, 0, "AABBCCDD", "00000000").word_count(), 2);
    /// assert_eq!(WriteRequest::new(MemoryBank::Epc, 0, "AABBC", "00000000").word_count(), 5);
    /// ```
    pub fn word_count(&self) -> u32 {
        if self.data.len() % HEX_CHARS_PER_WORD == 0 {
            (self.data.len() / HEX_CHARS_PER_WORD) as u32
        } else {
            DEFAULT_WORD_COUNT
        }
    }

    /// Whether a failed single write may fall back to chunking.
    pub fn needs_chunking(&self) -> bool {
        self.word_count() > MAX_WORDS_PER_WRITE
    }

    /// Sub-writes used by the chunked fallback, in order.
    ///
    /// # Examples
    ///
    /// ```
    /// use rfidkit_core::{MemoryBank, WriteChunk, WriteRequest};
    ///
    /// let request = WriteRequest::new(MemoryBank::User, 4, "A".repeat(200), "00000000");
    /// assert_eq!(
    ///     request.chunk_plan(),
    ///     vec![WriteChunk { ptr: 4, words: 32 }, WriteChunk { ptr: 36, words: 18 }]
    /// );
    /// ```
    pub fn chunk_plan(&self) -> Vec<WriteChunk> {
        let mut chunks = Vec::new();
        let mut remaining = self.word_count();
        let mut ptr = self.ptr;

        while remaining > 0 {
            let words = remaining.min(MAX_WORDS_PER_WRITE);
            chunks.push(WriteChunk { ptr, words });
            ptr = ptr.saturating_add(MAX_WORDS_PER_WRITE);
            remaining -= words;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(MemoryBank::Epc)]
    #[case(MemoryBank::Tid)]
    #[case(MemoryBank::User)]
    #[case(MemoryBank::Reserved)]
    fn test_clear_filter_ignores_bank(#[case] bank: MemoryBank) {
        let filter = FilterSpec::new(bank, 0, 0, "");
        assert!(filter.is_clear());
        assert_eq!(filter.effective(), FilterSpec::clear());
    }

    #[test]
    fn test_zero_length_or_empty_pattern_clears() {
        assert!(FilterSpec::new(MemoryBank::Tid, 16, 0, "E280").is_clear());
        assert!(FilterSpec::new(MemoryBank::Tid, 16, 32, "").is_clear());
        assert!(!FilterSpec::new(MemoryBank::Tid, 16, 32, "E280").is_clear());
    }

    #[rstest]
    #[case("", 0)]
    #[case("AABB", 1)]
    #[case("AABBCCDD", 2)]
    #[case("AAB", 5)]
    #[case("AABBCC", 5)]
    #[case("AABBCCDDE", 5)]
    fn test_word_count(#[case] data: &str, #[case] expected: u32) {
        let request = WriteRequest::new(MemoryBank::User, 0, data, "00000000");
        assert_eq!(request.word_count(), expected);
    }

    #[test]
    fn test_small_write_is_single_chunk() {
        let request = WriteRequest::new(MemoryBank::Epc, 0, "AABBCCDD", "00000000");
        assert!(!request.needs_chunking());
        assert_eq!(request.chunk_plan(), vec![WriteChunk { ptr: 0, words: 2 }]);
    }

    #[test]
    fn test_exactly_thirty_two_words_does_not_chunk() {
        let request = WriteRequest::new(MemoryBank::User, 0, "0".repeat(128), "00000000");
        assert_eq!(request.word_count(), 32);
        assert!(!request.needs_chunking());
    }

    proptest! {
        #[test]
        fn prop_chunk_plan_covers_word_count(words in 0u32..400, ptr in 0u32..1000) {
            let data = "F".repeat((words as usize) * HEX_CHARS_PER_WORD);
            let request = WriteRequest::new(MemoryBank::User, ptr, data, "00000000");
            let plan = request.chunk_plan();

            prop_assert_eq!(plan.iter().map(|c| c.words).sum::<u32>(), words);
            for (i, chunk) in plan.iter().enumerate() {
                prop_assert!(chunk.words >= 1 && chunk.words <= MAX_WORDS_PER_WRITE);
                prop_assert_eq!(chunk.ptr, ptr + (i as u32) * MAX_WORDS_PER_WRITE);
                if i + 1 < plan.len() {
                    prop_assert_eq!(chunk.words, MAX_WORDS_PER_WRITE);
                }
            }
        }
    }
}
