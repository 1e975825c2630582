//! This module contains errors pertaining to obtaining raw bytes from the data
//! source.

use serde::Serialize;
use thiserror::Error;

use crate::{pointer::ByteLocation, storage::Range, types::MagicVariable};

/// Errors that occur when the bytes for a value could not be obtained.
#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Error {
    #[error("Could not read stack words {from} to {to}")]
    Stack { from: usize, to: usize },

    #[error("Could not read {length} bytes of {location} at {start}")]
    Bytes {
        location: ByteLocation,
        start:    usize,
        length:   usize,
    },

    #[error("Could not read storage from {range}")]
    Storage { range: Range },

    #[error("Could not read event topic {index}")]
    Topic { index: usize },

    #[error("Could not read the value of `{variable}`")]
    Special { variable: String },

    #[error("Constants defined by a {definition} are not supported")]
    UnsupportedConstant { definition: String },

    #[error("The immutable variable is never assigned and has no value")]
    UnusedImmutable,
}

impl Error {
    /// Constructs an error for a member of a magic `variable`.
    #[must_use]
    pub fn special(variable: MagicVariable, member: &str) -> Self {
        Self::Special {
            variable: format!("{variable}.{member}"),
        }
    }
}
