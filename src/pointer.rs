//! This module contains the pointers that tell the decoder where the raw bytes
//! for a value are to be found.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{storage::Range, types::MagicVariable, utility::Word};

/// The byte-addressed locations from which data can be read.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteLocation {
    /// Transient memory of the current call frame.
    Memory,

    /// The input data of the current call.
    Calldata,

    /// The non-indexed data of an event log.
    Eventdata,

    /// The data returned by the last completed call.
    Returndata,

    /// The bytecode of the executing contract, which holds immutables.
    Code,
}

impl Display for ByteLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Memory => "memory",
            Self::Calldata => "calldata",
            Self::Eventdata => "eventdata",
            Self::Returndata => "returndata",
            Self::Code => "code",
        };
        write!(f, "{name}")
    }
}

impl ByteLocation {
    /// Checks whether the location holds ABI-encoded data, in which dynamic
    /// data is referenced by offsets relative to the start of the enclosing
    /// container.
    #[must_use]
    pub fn is_abi(&self) -> bool {
        matches!(self, Self::Calldata | Self::Eventdata | Self::Returndata)
    }
}

/// The definition of a compile-time constant, as far as the decoder needs it.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ConstantDefinition {
    /// A literal whose value has already been encoded to its raw bytes, as
    /// they would appear in memory.
    Literal { bytes: Vec<u8> },

    /// An expression node of a kind that cannot be evaluated to bytes.
    #[serde(rename_all = "camelCase")]
    Unsupported { node_type: String },
}

/// A pointer to the raw data for a value.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Pointer {
    /// The stack words from `from` to `to` inclusive, counting from the bottom
    /// of the stack.
    Stack { from: usize, to: usize },

    /// A word that has already been read from the stack.
    StackLiteral { literal: Word },

    /// A span of a byte-addressed location.
    Bytes {
        location: ByteLocation,
        start:    usize,
        length:   usize,
    },

    /// One of the indexed topics of an event log.
    EventTopic { topic: usize },

    /// A span of persistent storage.
    Storage { range: Range },

    /// A compile-time constant.
    Constant { definition: ConstantDefinition },

    /// A member of one of the magic variables.
    Special { variable: MagicVariable },

    /// An immutable that is never assigned, and hence has no data anywhere.
    Nowhere,
}

/// Convenience constructors.
impl Pointer {
    /// Constructs a pointer to the single stack word at `index`.
    #[must_use]
    pub fn stack(index: usize) -> Self {
        Self::Stack {
            from: index,
            to:   index,
        }
    }

    /// Constructs a pointer to `length` bytes of `location` at `start`.
    #[must_use]
    pub fn bytes(location: ByteLocation, start: usize, length: usize) -> Self {
        Self::Bytes {
            location,
            start,
            length,
        }
    }

    /// Constructs a pointer to one word of `location` at `start`.
    #[must_use]
    pub fn word(location: ByteLocation, start: usize) -> Self {
        Self::bytes(location, start, crate::constant::WORD_SIZE_BYTES)
    }

    /// Constructs a pointer to the given storage `range`.
    #[must_use]
    pub fn storage(range: Range) -> Self {
        Self::Storage { range }
    }
}

impl Display for Pointer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stack { from, to } => write!(f, "stack[{from}..={to}]"),
            Self::StackLiteral { .. } => write!(f, "stack literal"),
            Self::Bytes {
                location,
                start,
                length,
            } => write!(f, "{location}[{start}..{}]", start.saturating_add(*length)),
            Self::EventTopic { topic } => write!(f, "topic {topic}"),
            Self::Storage { range } => write!(f, "storage {range}"),
            Self::Constant { .. } => write!(f, "constant"),
            Self::Special { variable } => write!(f, "{variable}"),
            Self::Nowhere => write!(f, "nowhere"),
        }
    }
}
