//! This module contains the interface through which the decoder obtains raw
//! bytes, along with a simple in-memory implementation of it.
//!
//! The decoder never performs I/O itself. Anything that can answer the
//! questions posed by [`StateReader`] (a debugger's trace step, a node
//! provider, or a test fixture) can be decoded from.

use std::collections::HashMap;

use ethnum::U256;

use crate::{constant::WORD_SIZE_BYTES, pointer::ByteLocation, types::MagicVariable, utility::Word};

/// The capability to read raw data from an execution environment.
///
/// Each method returns [`None`] when the requested data cannot be obtained,
/// which the decoder reports as a read error.
pub trait StateReader {
    /// Reads the stack words from `from` to `to` inclusive, where index zero is
    /// the bottom of the stack.
    fn stack(&self, from: usize, to: usize) -> Option<Vec<Word>>;

    /// Reads `length` bytes of `location` starting at `start`.
    fn bytes(&self, location: ByteLocation, start: usize, length: usize) -> Option<Vec<u8>>;

    /// Gets the number of bytes that actually exist in `location`.
    fn length(&self, location: ByteLocation) -> Option<usize>;

    /// Reads the storage word at `address`.
    fn storage_word(&self, address: U256) -> Option<Word>;

    /// Reads the indexed event topic at `index`.
    fn topic(&self, index: usize) -> Option<Word>;

    /// Reads the raw bytes of `member` of the magic `variable`.
    fn special(&self, variable: MagicVariable, member: &str) -> Option<Vec<u8>>;
}

/// An execution state held entirely in memory.
///
/// Byte locations behave as they do on the EVM, reading as zero past the end
/// of the data that was provided. Storage similarly reads as zero at any slot
/// that was not set, unless [`EvmState::with_known_storage_only`] is used.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EvmState {
    stack:              Vec<Word>,
    memory:             Vec<u8>,
    calldata:           Vec<u8>,
    eventdata:          Vec<u8>,
    returndata:         Vec<u8>,
    code:               Vec<u8>,
    storage:            HashMap<U256, Word>,
    known_storage_only: bool,
    topics:             Vec<Word>,
    specials:           HashMap<(MagicVariable, String), Vec<u8>>,
}

impl EvmState {
    /// Constructs an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stack to `words`, given bottom first.
    #[must_use]
    pub fn with_stack(mut self, words: Vec<Word>) -> Self {
        self.stack = words;
        self
    }

    /// Pushes `word` onto the top of the stack.
    #[must_use]
    pub fn push(mut self, word: Word) -> Self {
        self.stack.push(word);
        self
    }

    /// Sets the contents of the byte `location` to `data`.
    #[must_use]
    pub fn with_bytes(mut self, location: ByteLocation, data: Vec<u8>) -> Self {
        *self.location_mut(location) = data;
        self
    }

    /// Sets the storage word at `address` to `word`.
    #[must_use]
    pub fn with_storage(mut self, address: impl Into<U256>, word: Word) -> Self {
        self.storage.insert(address.into(), word);
        self
    }

    /// Makes reads of storage words that were never set fail, rather than
    /// reading as zero.
    #[must_use]
    pub fn with_known_storage_only(mut self) -> Self {
        self.known_storage_only = true;
        self
    }

    /// Sets the event topics to `topics`.
    #[must_use]
    pub fn with_topics(mut self, topics: Vec<Word>) -> Self {
        self.topics = topics;
        self
    }

    /// Sets the raw bytes of `member` of the magic `variable`.
    #[must_use]
    pub fn with_special(
        mut self,
        variable: MagicVariable,
        member: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        self.specials.insert((variable, member.into()), data);
        self
    }

    fn location(&self, location: ByteLocation) -> &Vec<u8> {
        match location {
            ByteLocation::Memory => &self.memory,
            ByteLocation::Calldata => &self.calldata,
            ByteLocation::Eventdata => &self.eventdata,
            ByteLocation::Returndata => &self.returndata,
            ByteLocation::Code => &self.code,
        }
    }

    fn location_mut(&mut self, location: ByteLocation) -> &mut Vec<u8> {
        match location {
            ByteLocation::Memory => &mut self.memory,
            ByteLocation::Calldata => &mut self.calldata,
            ByteLocation::Eventdata => &mut self.eventdata,
            ByteLocation::Returndata => &mut self.returndata,
            ByteLocation::Code => &mut self.code,
        }
    }
}

impl StateReader for EvmState {
    fn stack(&self, from: usize, to: usize) -> Option<Vec<Word>> {
        if from > to {
            return None;
        }
        self.stack.get(from..=to).map(<[Word]>::to_vec)
    }

    fn bytes(&self, location: ByteLocation, start: usize, length: usize) -> Option<Vec<u8>> {
        let end = start.checked_add(length)?;
        let data = self.location(location);

        let mut result = vec![0u8; length];
        if start < data.len() {
            let available = end.min(data.len());
            result[..available - start].copy_from_slice(&data[start..available]);
        }

        Some(result)
    }

    fn length(&self, location: ByteLocation) -> Option<usize> {
        Some(self.location(location).len())
    }

    fn storage_word(&self, address: U256) -> Option<Word> {
        match self.storage.get(&address) {
            Some(word) => Some(*word),
            None if self.known_storage_only => None,
            None => Some([0u8; WORD_SIZE_BYTES]),
        }
    }

    fn topic(&self, index: usize) -> Option<Word> {
        self.topics.get(index).copied()
    }

    fn special(&self, variable: MagicVariable, member: &str) -> Option<Vec<u8>> {
        self.specials.get(&(variable, member.to_string())).cloned()
    }
}

#[cfg(test)]
mod test {
    use ethnum::U256;

    use crate::{
        pointer::ByteLocation,
        state::{EvmState, StateReader},
        utility::pad_left,
    };

    #[test]
    fn reads_zeroes_past_the_end_of_byte_locations() {
        let state = EvmState::new().with_bytes(ByteLocation::Memory, vec![1, 2, 3]);
        assert_eq!(state.bytes(ByteLocation::Memory, 1, 4), Some(vec![2, 3, 0, 0]));
        assert_eq!(state.bytes(ByteLocation::Memory, 10, 2), Some(vec![0, 0]));
        assert_eq!(state.bytes(ByteLocation::Memory, usize::MAX, 2), None);
    }

    #[test]
    fn reads_inclusive_stack_ranges() {
        let state = EvmState::new().push(pad_left(&[1])).push(pad_left(&[2]));
        assert_eq!(state.stack(0, 1).map(|s| s.len()), Some(2));
        assert_eq!(state.stack(1, 2), None);
    }

    #[test]
    fn unset_storage_reads_as_zero_unless_restricted() {
        let state = EvmState::new().with_storage(U256::ONE, pad_left(&[7]));
        assert_eq!(state.storage_word(U256::ONE), Some(pad_left(&[7])));
        assert_eq!(state.storage_word(U256::ZERO), Some([0u8; 32]));

        let restricted = state.with_known_storage_only();
        assert_eq!(restricted.storage_word(U256::ZERO), None);
    }
}
