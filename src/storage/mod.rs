//! This module contains the storage range calculator, which determines the
//! words and sub-word byte offsets that a piece of data occupies in persistent
//! contract storage.
//!
//! # Addressing
//!
//! Storage is a word-addressed array of 2^256 words. The compiler places
//! statically-sized data at sequential slots, and dynamically-sized data at
//! slots derived by hashing:
//!
//! - The elements of a dynamic array or long `bytes`/`string` at slot `p`
//!   begin at `keccak256(p)`.
//! - The value for key `k` of a mapping at slot `p` lives at
//!   `keccak256(k . p)`.
//!
//! A [`Slot`] records how a slot is derived rather than just its address, so
//! that the derivation can be displayed and so that storage read errors can
//! say precisely where the decoder was looking.

pub mod layout;

use std::fmt::{Display, Formatter};

use ethnum::U256;
use serde::Serialize;

use crate::{
    constant::WORD_SIZE_BYTES,
    utility::{keccak256, U256W},
};

/// A storage slot, described by how its address is derived.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    /// The slot from which this one is derived, if any.
    pub path: Option<Box<Slot>>,

    /// The number of words to add to the derived address.
    pub offset: U256W,

    /// Whether the address of `path` is hashed before adding `offset`, as for
    /// the data of dynamic arrays and long byte strings.
    pub hash_path: bool,

    /// The encoded mapping key, if this is the slot of a mapping value.
    ///
    /// When present, the address is `keccak256(key . address(path))`.
    pub key: Option<Vec<u8>>,
}

impl Slot {
    /// Constructs the slot at the absolute `address`.
    pub fn new(address: impl Into<U256W>) -> Self {
        Self {
            path:      None,
            offset:    address.into(),
            hash_path: false,
            key:       None,
        }
    }

    /// Constructs the slot `offset` words after this one.
    #[must_use]
    pub fn offset_by(&self, offset: U256) -> Self {
        Self {
            path:      Some(Box::new(self.clone())),
            offset:    U256W::from(offset),
            hash_path: false,
            key:       None,
        }
    }

    /// Constructs the slot at which the data for the dynamic array or long byte
    /// string at this slot begins.
    #[must_use]
    pub fn hashed(&self) -> Self {
        Self {
            path:      Some(Box::new(self.clone())),
            offset:    U256W::default(),
            hash_path: true,
            key:       None,
        }
    }

    /// Constructs the slot of the value stored under the `encoded_key` in the
    /// mapping at this slot.
    #[must_use]
    pub fn keyed(&self, encoded_key: Vec<u8>) -> Self {
        Self {
            path:      Some(Box::new(self.clone())),
            offset:    U256W::default(),
            hash_path: false,
            key:       Some(encoded_key),
        }
    }

    /// Computes the concrete address of the slot.
    ///
    /// All arithmetic wraps, matching the EVM.
    #[must_use]
    pub fn address(&self) -> U256 {
        let offset = self.offset.0;
        match (&self.path, &self.key) {
            (Some(path), Some(key)) => {
                let mut preimage = key.clone();
                preimage.extend_from_slice(&path.address().to_be_bytes());
                U256::from_be_bytes(keccak256(preimage)).wrapping_add(offset)
            }
            (Some(path), None) if self.hash_path => {
                U256::from_be_bytes(keccak256(path.address().to_be_bytes())).wrapping_add(offset)
            }
            (Some(path), None) => path.address().wrapping_add(offset),
            (None, _) => offset,
        }
    }
}

impl Display for Slot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:x}", self.address())
    }
}

/// A position within storage, given as a slot and a byte index into the
/// big-endian word at that slot.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct StoragePosition {
    /// The slot containing the position.
    pub slot: Slot,

    /// The index of the byte within the slot, counting from the most
    /// significant byte, where `0 <= index < 32`.
    pub index: usize,
}

impl StoragePosition {
    /// Constructs the position of byte `index` in `slot`.
    #[must_use]
    pub fn new(slot: Slot, index: usize) -> Self {
        Self { slot, index }
    }
}

/// An inclusive span of bytes in storage, potentially covering many words.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct Range {
    /// The first byte of the range.
    pub from: StoragePosition,

    /// The last byte of the range.
    pub to: StoragePosition,
}

impl Range {
    /// Constructs the range occupying the whole of `slot`.
    #[must_use]
    pub fn word(slot: Slot) -> Self {
        Self::words(slot, U256::ONE)
    }

    /// Constructs the range covering `count` whole words starting at `slot`.
    ///
    /// A `count` of zero is treated as one word.
    #[must_use]
    pub fn words(slot: Slot, count: U256) -> Self {
        let last = slot.offset_by(count.saturating_sub(U256::ONE));
        Self {
            from: StoragePosition::new(slot, 0),
            to:   StoragePosition::new(last, WORD_SIZE_BYTES - 1),
        }
    }

    /// Constructs the range of `size` bytes at the low-order end of `slot`,
    /// beginning `offset` bytes from the word's least-significant end.
    ///
    /// This is how the compiler packs small values into a shared slot.
    #[must_use]
    pub fn packed(slot: Slot, offset: usize, size: usize) -> Self {
        let end = WORD_SIZE_BYTES - offset;
        Self {
            from: StoragePosition::new(slot.clone(), end - size),
            to:   StoragePosition::new(slot, end - 1),
        }
    }

    /// Constructs the range of `length` contiguous bytes beginning at the start
    /// of `slot`, as used by long byte strings.
    ///
    /// A `length` of zero yields an empty range, whose end lies before its
    /// start.
    #[must_use]
    pub fn bytes(slot: Slot, length: usize) -> Self {
        if length == 0 {
            return Self {
                from: StoragePosition::new(slot.clone(), 1),
                to:   StoragePosition::new(slot, 0),
            };
        }
        let last_word = (length - 1) / WORD_SIZE_BYTES;
        let last_index = (length - 1) % WORD_SIZE_BYTES;
        let last = slot.offset_by(U256::from(last_word as u64));
        Self {
            from: StoragePosition::new(slot, 0),
            to:   StoragePosition::new(last, last_index),
        }
    }

    /// Checks whether the range covers no bytes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.from.slot.address() == self.to.slot.address() && self.to.index < self.from.index
    }

    /// Gets the number of words the range touches.
    #[must_use]
    pub fn word_count(&self) -> U256 {
        if self.is_empty() {
            return U256::ZERO;
        }
        self.to
            .slot
            .address()
            .wrapping_sub(self.from.slot.address())
            .wrapping_add(U256::ONE)
    }
}

impl Display for Range {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "slot {}[{}] to slot {}[{}]",
            self.from.slot, self.from.index, self.to.slot, self.to.index
        )
    }
}

/// The amount of storage a type occupies.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageSize {
    /// A number of bytes no greater than a word, which may share a slot with
    /// other data.
    Bytes(usize),

    /// A number of whole words, which always begins a fresh slot and is never
    /// shared.
    Words(U256W),
}

impl StorageSize {
    /// Gets the number of whole words this size occupies when placed at the
    /// start of a slot.
    #[must_use]
    pub fn words(&self) -> U256 {
        match self {
            Self::Bytes(_) => U256::ONE,
            Self::Words(words) => words.0,
        }
    }

    /// Gets the range occupied by a value of this size placed at the start of
    /// `slot`, as the compiler does for mapping values.
    #[must_use]
    pub fn range_at(&self, slot: Slot) -> Range {
        match self {
            Self::Bytes(size) => Range::packed(slot, 0, *size),
            Self::Words(words) => Range::words(slot, words.0),
        }
    }

    /// Gets the range of the element at `index` of an array of values of this
    /// size whose data begins at `slot`.
    ///
    /// Elements smaller than a word are packed as many to a slot as will fit,
    /// filling each slot from its least-significant end.
    #[must_use]
    pub fn element_range(&self, slot: &Slot, index: usize) -> Range {
        match self {
            Self::Bytes(size) => {
                let size = (*size).max(1);
                let per_word = WORD_SIZE_BYTES / size;
                let word = U256::from((index / per_word) as u64);
                let offset = (index % per_word) * size;
                Range::packed(slot.offset_by(word), offset, size)
            }
            Self::Words(words) => {
                let start = words.0.wrapping_mul(U256::from(index as u64));
                Range::words(slot.offset_by(start), words.0)
            }
        }
    }

    /// Gets the number of words taken up by `length` elements of this size.
    #[must_use]
    pub fn words_for_elements(&self, length: U256) -> U256 {
        match self {
            Self::Bytes(size) => {
                let per_word = U256::from((WORD_SIZE_BYTES / (*size).max(1)) as u64);
                let whole = length / per_word;
                if length % per_word == U256::ZERO {
                    whole
                } else {
                    whole + U256::ONE
                }
            }
            Self::Words(words) => words.0.saturating_mul(length),
        }
    }
}
