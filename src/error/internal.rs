//! This module contains the crate-internal control flow used to carry faults
//! out of the recursive decoder.
//!
//! None of these types are ever exposed through the library interface. The
//! non-strict entry points convert them back into embedded errors or fatal
//! [`DecodingError`]s, while the strict entry points turn any rejection into a
//! "no decoding" answer.

use thiserror::Error;

use crate::error::{decoder::DecoderError, DecodingError};

/// Conditions that are only meaningful when decoding in strict mode.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub(crate) enum InternalUseError<N> {
    /// Dynamic data extends past the end of the bytes that actually exist.
    #[error("Data of length {length} runs past the end of {data_length} available bytes")]
    OverlongArrayOrStringStrictMode { length: N, data_length: usize },

    /// An internal function pointer appeared in ABI-encoded data.
    #[error("Internal function pointers cannot appear in ABI-encoded data")]
    InternalFunctionInAbi,
}

/// A reason for a strict decode to reject its input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Rejection<N> {
    /// A local fault that would be embedded in a non-strict decode.
    Local(DecoderError<N>),

    /// A condition only checked in strict mode.
    Internal(InternalUseError<N>),
}

/// The reasons a decode may stop before producing a result.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Stop<N> {
    /// A fatal fault that aborts the decode in any mode.
    Fatal(DecodingError),

    /// A strict-mode rejection.
    Rejected(Rejection<N>),
}

/// The result type used throughout the decoder's recursion.
pub(crate) type StopResult<T, N> = std::result::Result<T, Stop<N>>;

impl<N> From<DecodingError> for Stop<N> {
    fn from(value: DecodingError) -> Self {
        Self::Fatal(value)
    }
}

impl<N> From<crate::error::read::Error> for Stop<N> {
    fn from(value: crate::error::read::Error) -> Self {
        Self::Fatal(value.into())
    }
}

impl<N> From<DecoderError<N>> for Stop<N> {
    fn from(value: DecoderError<N>) -> Self {
        Self::Rejected(Rejection::Local(value))
    }
}

impl<N> From<InternalUseError<N>> for Stop<N> {
    fn from(value: InternalUseError<N>) -> Self {
        Self::Rejected(Rejection::Internal(value))
    }
}
