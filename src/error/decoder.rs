//! This module contains the local decoding faults that are embedded into the
//! result tree in place of a value.
//!
//! The errors are grouped by the category of type whose decoding produced
//! them, with the category-independent errors collected in [`GenericError`].
//! Any error that carries an integer, length or pointer that may be too large
//! for a native integer is parameterised by the numeric representation `N`.

use std::fmt::{Display, Formatter};

use serde::Serialize;
use thiserror::Error;

use crate::{
    error::{read, DecodingError},
    types::{ContractType, Type},
    value::DecodeResult,
};

/// The padding discipline that a value was expected to follow.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaddingType {
    /// Zeroes before the value.
    Left,

    /// Zeroes after the value.
    Right,

    /// Copies of the sign bit before the value.
    Signed,
}

impl Display for PaddingType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Signed => "signed",
        };
        write!(f, "{name}")
    }
}

/// A word whose bits outside of the value's significant region do not match
/// the expected padding.
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{raw} does not have valid {padding_type} padding")]
pub struct PaddingError {
    /// The raw bytes that were read, as hex.
    pub raw: String,

    /// The padding that was expected.
    pub padding_type: PaddingType,
}

#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum UintError {
    #[error("{0}")]
    Padding(PaddingError),
}

#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IntError {
    #[error("{0}")]
    Padding(PaddingError),
}

#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BoolError<N> {
    #[error("{0}")]
    Padding(PaddingError),

    /// The raw value is neither zero nor one.
    #[error("{raw} is not a valid boolean")]
    OutOfRange { raw: N },
}

#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BytesError {
    #[error("{0}")]
    Padding(PaddingError),
}

#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AddressError {
    #[error("{0}")]
    Padding(PaddingError),
}

#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FixedError {
    #[error("{0}")]
    Padding(PaddingError),
}

#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum UfixedError {
    #[error("{0}")]
    Padding(PaddingError),
}

#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EnumError<N> {
    #[error("{0}")]
    Padding(PaddingError),

    /// The ordinal is not less than the number of members of the enum.
    #[error("{raw} is not a valid ordinal for {typ}")]
    OutOfRange {
        #[serde(rename = "type")]
        typ: Type,
        raw: N,
    },

    /// The definition of the enum is unavailable, so its range cannot be
    /// checked.
    #[error("The definition of {typ} could not be found to check ordinal {raw}")]
    NotFound {
        #[serde(rename = "type")]
        typ: Type,
        raw: N,
    },
}

#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ContractError {
    #[error("{0}")]
    Padding(PaddingError),
}

/// Errors for external function pointers.
///
/// On the stack the address and selector occupy a full word each, while
/// everywhere else they are packed together into a single word, so the
/// padding error differs by location.
#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FunctionExternalError {
    #[error("{0}")]
    NonStackPadding(PaddingError),

    #[error("Address word {raw_address} or selector word {raw_selector} is not left-padded")]
    #[serde(rename_all = "camelCase")]
    StackPadding {
        raw_address:  String,
        raw_selector: String,
    },
}

/// Errors for internal function pointers.
#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FunctionInternalError {
    #[error("{0}")]
    Padding(PaddingError),

    /// The pointer does not correspond to any function in the contract.
    #[error(
        "No internal function of {} exists at deployed PC {deployed_program_counter} and \
         constructor PC {constructor_program_counter}",
        context.name
    )]
    #[serde(rename_all = "camelCase")]
    NoSuchInternalFunction {
        context:                     ContractType,
        deployed_program_counter:    u32,
        constructor_program_counter: u32,
    },

    /// A pointer only valid in deployed code was found while decoding in a
    /// constructor.
    #[error(
        "Deployed-code function pointer (PC {deployed_program_counter}) was found in the \
         constructor of {}",
        context.name
    )]
    #[serde(rename_all = "camelCase")]
    DeployedFunctionInConstructor {
        context:                     ContractType,
        deployed_program_counter:    u32,
        constructor_program_counter: u32,
    },

    /// The deployed program counter is zero while the constructor one is not,
    /// which the compiler never produces.
    #[error(
        "Function pointer with constructor PC {constructor_program_counter} and no deployed PC \
         in {} is malformed",
        context.name
    )]
    #[serde(rename_all = "camelCase")]
    MalformedInternalFunction {
        context:                     ContractType,
        constructor_program_counter: u32,
    },
}

/// Errors for dynamic data whose length or location is too large to be
/// represented and followed.
///
/// These are reported as not implemented rather than silently truncated.
#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DynamicDataError<N> {
    #[error("Arrays and strings of length {length} are not supported")]
    #[serde(rename_all = "camelCase")]
    OverlongArraysAndStrings {
        length:      N,
        data_length: Option<usize>,
    },

    #[error("Pointers to {pointer} are not supported")]
    OverlargePointer { pointer: N },

    /// A reference back to a value that encloses it.
    #[error("Circular references to {pointer} are not supported")]
    CircularReference { pointer: N },
}

/// Errors that may occur when decoding any category of type.
#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GenericError {
    #[error("The definition of {typ} could not be found")]
    UserDefinedTypeNotFound {
        #[serde(rename = "type")]
        typ: Type,
    },

    /// An indexed event parameter of reference type, of which only the hash
    /// was logged.
    #[error("Indexed parameter of type {typ} only has its hash {raw} available")]
    IndexedReferenceType {
        #[serde(rename = "type")]
        typ: Type,
        raw: String,
    },

    #[error("{error}")]
    Read { error: read::Error },
}

impl From<DecodingError> for GenericError {
    fn from(value: DecodingError) -> Self {
        match value {
            DecodingError::UserDefinedTypeNotFound { typ } => Self::UserDefinedTypeNotFound { typ },
            DecodingError::Read { error } => Self::Read { error },
        }
    }
}

/// A local decoding fault for a single node of the result tree.
#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
#[serde(tag = "category", content = "error", rename_all = "camelCase")]
pub enum DecoderError<N> {
    #[error("{0}")]
    Uint(UintError),

    #[error("{0}")]
    Int(IntError),

    #[error("{0}")]
    Bool(BoolError<N>),

    #[error("{0}")]
    Bytes(BytesError),

    #[error("{0}")]
    Address(AddressError),

    #[error("{0}")]
    Fixed(FixedError),

    #[error("{0}")]
    Ufixed(UfixedError),

    #[error("{0}")]
    Enum(EnumError<N>),

    #[error("{0}")]
    Contract(ContractError),

    #[error("{0}")]
    FunctionExternal(FunctionExternalError),

    #[error("{0}")]
    FunctionInternal(FunctionInternalError),

    /// The underlying value of a user-defined value type failed to decode.
    #[error("Underlying value could not be decoded: {0}")]
    UserDefinedValueType(Box<DecodeResult<N>>),

    #[error("{0}")]
    DynamicData(DynamicDataError<N>),

    #[error("{0}")]
    Generic(GenericError),
}

impl<N> DecoderError<N> {
    /// Gets the padding error contained in this error, if it is one.
    #[must_use]
    pub fn as_padding(&self) -> Option<&PaddingError> {
        match self {
            Self::Uint(UintError::Padding(e))
            | Self::Int(IntError::Padding(e))
            | Self::Bool(BoolError::Padding(e))
            | Self::Bytes(BytesError::Padding(e))
            | Self::Address(AddressError::Padding(e))
            | Self::Fixed(FixedError::Padding(e))
            | Self::Ufixed(UfixedError::Padding(e))
            | Self::Enum(EnumError::Padding(e))
            | Self::Contract(ContractError::Padding(e))
            | Self::FunctionExternal(FunctionExternalError::NonStackPadding(e))
            | Self::FunctionInternal(FunctionInternalError::Padding(e)) => Some(e),
            _ => None,
        }
    }
}

impl<N> From<GenericError> for DecoderError<N> {
    fn from(value: GenericError) -> Self {
        Self::Generic(value)
    }
}

impl<N> From<DynamicDataError<N>> for DecoderError<N> {
    fn from(value: DynamicDataError<N>) -> Self {
        Self::DynamicData(value)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        error::{
            decoder::{
                AddressError,
                BoolError,
                DecoderError,
                GenericError,
                PaddingError,
                PaddingType,
            },
            read,
            DecodingError,
        },
        numeric::BigNum,
    };

    #[test]
    fn finds_padding_errors_in_any_category() {
        let padding = PaddingError {
            raw:          "0x01".into(),
            padding_type: PaddingType::Left,
        };
        let error = DecoderError::<BigNum>::Address(AddressError::Padding(padding.clone()));
        assert_eq!(error.as_padding(), Some(&padding));

        let out_of_range = DecoderError::Bool(BoolError::OutOfRange {
            raw: BigNum::from(2u64),
        });
        assert!(out_of_range.as_padding().is_none());
    }

    #[test]
    fn converts_fatal_errors_for_display() {
        let fatal = DecodingError::from(read::Error::UnusedImmutable);
        let generic = GenericError::from(fatal);
        assert_eq!(
            generic.to_string(),
            "The immutable variable is never assigned and has no value"
        );
    }
}
