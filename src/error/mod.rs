//! This module contains the error types for the decoder.
//!
//! Errors come in two levels:
//!
//! 1. Local faults, such as bad padding or an out-of-range enum ordinal, are
//!    data. They are embedded in the result tree exactly where they occurred as
//!    a [`decoder::DecoderError`], so that siblings and ancestors can continue
//!    to decode.
//! 2. Fatal faults are the only things that abort a decode. They are returned
//!    through the [`Result`] type of the library interface as a
//!    [`DecodingError`], and occur only when the shape of the data cannot be
//!    known (a user-defined type is missing), or when no bytes at all could be
//!    obtained to decode from.

pub mod decoder;
pub(crate) mod internal;
pub mod read;

use serde::Serialize;
use thiserror::Error;

use crate::types::Type;

/// The interface result type for the library.
///
/// # Usage
///
/// Any function considered to be part of the public interface of the library
/// should return this result type. A successful result may still contain
/// embedded errors for individual parts of the decoded value.
pub type Result<T> = std::result::Result<T, DecodingError>;

/// The errors that abort an entire decode.
#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DecodingError {
    /// The definition of a user-defined type was not available, so the shape
    /// of the data cannot be determined.
    #[error("The definition of {typ} could not be found")]
    UserDefinedTypeNotFound {
        #[serde(rename = "type")]
        typ: Type,
    },

    /// No bytes could be obtained from the data source.
    #[error(transparent)]
    Read {
        #[from]
        error: read::Error,
    },
}

impl DecodingError {
    /// Constructs an error for the missing definition of `typ`.
    #[must_use]
    pub fn not_found(typ: &Type) -> Self {
        Self::UserDefinedTypeNotFound { typ: typ.clone() }
    }
}
