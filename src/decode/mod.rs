//! This module contains the decode engine, which turns the raw bytes found at
//! a [`Pointer`] into a [`DecodeResult`] for a given [`Type`].
//!
//! # Faults
//!
//! The engine distinguishes between two levels of fault:
//!
//! - Local faults, such as bad padding, are embedded into the result tree in
//!   place of the value that could not be decoded, and decoding continues with
//!   the value's siblings.
//! - Fatal faults, namely missing user-defined type definitions and data that
//!   cannot be read, abort the entire decode and are returned as a
//!   [`DecodingError`].
//!
//! In strict mode every local fault instead rejects the data outright, which
//! is used to check whether data is a well-formed encoding of a type at all.
//!
//! # Numeric Representation
//!
//! A [`Decoder`] is instantiated for a single [`Numeric`] representation,
//! which is used for every integer, length and pointer in the results of all
//! decodes it performs.

mod abi;
mod memory;
mod special;
mod stack;
mod storage;
mod value;

use std::{fmt::Display, marker::PhantomData};

use ethnum::U256;
use tracing::{debug, trace, warn};

pub use crate::decode::abi::{abi_size, AbiSize};
use crate::{
    constant::{DEFAULT_MAX_DYNAMIC_LENGTH, DEFAULT_STRICT_ABI_MODE_ENABLED, WORD_SIZE_BYTES},
    error::{
        self,
        decoder::{DecoderError, DynamicDataError},
        internal::{InternalUseError, Rejection, Stop, StopResult},
        read,
        DecodingError,
    },
    info::DecoderInfo,
    numeric::Numeric,
    pointer::{ByteLocation, Pointer},
    state::StateReader,
    types::{DefinitionRef, Member, Type, UserDefinedType},
    utility::{to_bounded_usize, to_u256, Word},
    value::DecodeResult,
};

/// The decoder, bound to a source of state, the static definitions needed to
/// interpret it, and a numeric representation.
#[derive(Debug)]
pub struct Decoder<'a, R, N> {
    /// The source of raw bytes.
    state: &'a R,

    /// The static definitions used to interpret the bytes.
    info: &'a DecoderInfo,

    /// The configuration of the decoder.
    config: Config,

    numeric: PhantomData<N>,
}

impl<'a, R, N> Decoder<'a, R, N>
where
    R: StateReader,
    N: Numeric,
{
    /// Constructs a new decoder reading from `state` and interpreting data
    /// using `info`, with the default configuration.
    #[must_use]
    pub fn new(state: &'a R, info: &'a DecoderInfo) -> Self {
        Self {
            state,
            info,
            config: Config::default(),
            numeric: PhantomData,
        }
    }

    /// Sets the configuration of the decoder to `config`.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Gets the configuration of the decoder.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Gets the static definitions in use by the decoder.
    #[must_use]
    pub fn info(&self) -> &DecoderInfo {
        self.info
    }

    /// Gets the source of raw bytes in use by the decoder.
    #[must_use]
    pub fn state(&self) -> &R {
        self.state
    }

    /// Decodes the value of type `typ` found at `pointer`, embedding any local
    /// faults into the result.
    ///
    /// This ignores [`Config::strict_abi_mode`].
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the definition of a user-defined type needed to
    /// decode the value is not known, or if the data could not be read.
    pub fn decode(&self, typ: &Type, pointer: &Pointer) -> error::Result<DecodeResult<N>> {
        let options = Options::new(&self.config).lenient();
        match self.finish(typ, self.decode_value(typ, pointer, &options))? {
            Some(result) => Ok(result),
            None => unreachable!("Data is only rejected in strict mode"),
        }
    }

    /// Decodes the value of type `typ` found at `pointer` in strict mode,
    /// returning [`None`] if the data is not a perfectly well-formed encoding
    /// of `typ`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the definition of a user-defined type needed to
    /// decode the value is not known, or if the data could not be read.
    pub fn decode_strict(
        &self,
        typ: &Type,
        pointer: &Pointer,
    ) -> error::Result<Option<DecodeResult<N>>> {
        let options = Options::new(&self.config).strict();
        self.finish(typ, self.decode_value(typ, pointer, &options))
    }

    /// Decodes the value of type `typ` found at `pointer`, in strict mode if
    /// and only if [`Config::strict_abi_mode`] is set.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the definition of a user-defined type needed to
    /// decode the value is not known, or if the data could not be read.
    pub fn run(&self, typ: &Type, pointer: &Pointer) -> error::Result<Option<DecodeResult<N>>> {
        let options = Options::new(&self.config);
        self.finish(typ, self.decode_value(typ, pointer, &options))
    }

    /// Converts the internal outcome of decoding `subject` into the library
    /// interface.
    pub(crate) fn finish<T>(
        &self,
        subject: impl Display,
        result: StopResult<T, N>,
    ) -> error::Result<Option<T>> {
        match result {
            Ok(result) => Ok(Some(result)),
            Err(Stop::Fatal(error)) => {
                warn!(%subject, %error, "Decoding aborted");
                Err(error)
            }
            Err(Stop::Rejected(rejection)) => {
                debug!(%subject, ?rejection, "Data rejected in strict mode");
                Ok(None)
            }
        }
    }

    /// Decodes the value of `typ` at `pointer`, dispatching on the kind of
    /// location the pointer refers to.
    pub(crate) fn decode_value(
        &self,
        typ: &Type,
        pointer: &Pointer,
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        trace!(%typ, %pointer, "Decoding value");

        // These types have no data of their own, wherever they are found.
        match typ {
            Type::Magic { variable } => return self.decode_magic(typ, *variable, options),
            Type::TypeOfContract { .. } | Type::TypeOfEnum { .. } => {
                return self.decode_type_value(typ);
            }
            _ => (),
        }

        match pointer {
            Pointer::Stack { from, to } => self.decode_stack(typ, *from, *to, options),
            Pointer::StackLiteral { literal } => self.decode_stack_literal(typ, literal, options),
            Pointer::Bytes {
                location, start, ..
            } if location.is_abi() => self.decode_abi(typ, *location, *start, options),
            Pointer::Bytes {
                location, start, ..
            } => self.decode_memory(typ, *location, *start, options),
            Pointer::EventTopic { topic } => self.decode_topic(typ, *topic, options),
            Pointer::Storage { range } => self.decode_storage(typ, range, options),
            Pointer::Constant { definition } => self.decode_constant(typ, definition, options),
            Pointer::Special { variable } => Err(read::Error::Special {
                variable: variable.to_string(),
            }
            .into()),
            Pointer::Nowhere => Err(read::Error::UnusedImmutable.into()),
        }
    }

    /// Embeds `error` in place of the value of `typ`, or rejects the data if
    /// decoding strictly.
    pub(crate) fn fail(
        &self,
        typ: &Type,
        error: impl Into<DecoderError<N>>,
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        let error = error.into();
        if options.strict {
            debug!(%typ, %error, "Rejecting data in strict mode");
            return Err(Stop::Rejected(Rejection::Local(error)));
        }

        debug!(%typ, %error, "Embedding decoding error");
        Ok(DecodeResult::error(typ.clone(), error))
    }

    /// Converts a length or pointer to a `usize` if it is small enough to be
    /// followed.
    pub(crate) fn bounded(&self, value: U256) -> Option<usize> {
        to_bounded_usize(value, self.config.max_dynamic_length)
    }

    /// Reads `length` bytes of `location` at `start`.
    pub(crate) fn read_bytes(
        &self,
        location: ByteLocation,
        start: usize,
        length: usize,
    ) -> StopResult<Vec<u8>, N> {
        self.state.bytes(location, start, length).ok_or_else(|| {
            read::Error::Bytes {
                location,
                start,
                length,
            }
            .into()
        })
    }

    /// Reads the word of `location` at `start`.
    pub(crate) fn read_word(&self, location: ByteLocation, start: usize) -> StopResult<Word, N> {
        let bytes = self.read_bytes(location, start, WORD_SIZE_BYTES)?;
        let mut word = [0u8; WORD_SIZE_BYTES];
        word.copy_from_slice(&bytes[..WORD_SIZE_BYTES]);
        Ok(word)
    }

    /// Reads the word of `location` at `start` as an unsigned integer.
    pub(crate) fn read_u256(&self, location: ByteLocation, start: usize) -> StopResult<U256, N> {
        Ok(to_u256(&self.read_word(location, start)?))
    }

    /// Checks that the `bytes` of contents of dynamic data of `length`,
    /// beginning at `start`, lie within the data that exists in `location`.
    ///
    /// Data that runs past the end is rejected in strict mode, and otherwise
    /// gives the error result to use in place of the value, rather than being
    /// read as zeroes.
    pub(crate) fn check_within_data(
        &self,
        typ: &Type,
        location: ByteLocation,
        start: usize,
        bytes: usize,
        length: usize,
        options: &Options,
    ) -> StopResult<Option<DecodeResult<N>>, N> {
        let Some(data_length) = self.state.length(location) else {
            return Ok(None);
        };
        if start.saturating_add(bytes) <= data_length {
            return Ok(None);
        }

        if options.strict {
            return Err(InternalUseError::OverlongArrayOrStringStrictMode {
                length: N::from_usize(length),
                data_length,
            }
            .into());
        }
        let error = DynamicDataError::OverlongArraysAndStrings {
            length:      N::from_usize(length),
            data_length: Some(data_length),
        };
        self.fail(typ, error, options).map(Some)
    }

    /// Looks up the definition referred to by `definition`, which is needed
    /// to decode `typ`.
    pub(crate) fn user_defined(
        &self,
        typ: &Type,
        definition: &DefinitionRef,
    ) -> StopResult<&'a UserDefinedType, N> {
        self.info
            .user_defined_type(&definition.id)
            .ok_or_else(|| DecodingError::not_found(typ).into())
    }

    /// Looks up the members of the struct referred to by `definition`.
    pub(crate) fn struct_members(
        &self,
        typ: &Type,
        definition: &DefinitionRef,
    ) -> StopResult<&'a [Member], N> {
        match self.user_defined(typ, definition)? {
            UserDefinedType::Struct { members, .. } => Ok(members),
            _ => Err(DecodingError::not_found(typ).into()),
        }
    }
}

/// The way in which the padding of values is checked.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum PaddingMode {
    /// Padding is checked according to the type: left-padding with zeroes for
    /// unsigned values, sign-extension for signed ones, and right-padding with
    /// zeroes for fixed-size byte arrays and external functions.
    #[default]
    Default,

    /// Padding is never checked, and is simply discarded.
    Permissive,

    /// As [`PaddingMode::Default`], except that signed values must be padded
    /// with zeroes rather than sign-extended.
    Zero,

    /// Every value must be right-padded with zeroes, as in some packed
    /// encodings.
    Right,

    /// As [`PaddingMode::Default`], except that signed values may be padded
    /// with either zeroes or copies of the sign bit.
    DefaultOrZero,
}

/// The configuration for the decoder.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// How the padding of values is checked.
    ///
    /// Values on the stack are always decoded permissively, as the compiler
    /// does not keep their padding clean, with the exception of external
    /// function pointers.
    ///
    /// Defaults to [`PaddingMode::Default`].
    pub padding_mode: PaddingMode,

    /// Whether [`Decoder::run`] decodes in strict mode, in which any local
    /// fault causes the data to be rejected rather than embedded, and in which
    /// ABI-encoded dynamic data must lie entirely within the data that exists.
    ///
    /// Defaults to [`DEFAULT_STRICT_ABI_MODE_ENABLED`].
    pub strict_abi_mode: bool,

    /// The largest length or pointer for dynamic data that the decoder will
    /// follow.
    ///
    /// Larger values are reported as errors rather than decoded.
    ///
    /// Defaults to [`DEFAULT_MAX_DYNAMIC_LENGTH`].
    pub max_dynamic_length: usize,
}

impl Config {
    /// Sets the `padding_mode` config parameter to `value`.
    #[must_use]
    pub fn with_padding_mode(mut self, value: PaddingMode) -> Self {
        self.padding_mode = value;
        self
    }

    /// Sets the `strict_abi_mode` config parameter to `value`.
    #[must_use]
    pub fn with_strict_abi_mode(mut self, value: bool) -> Self {
        self.strict_abi_mode = value;
        self
    }

    /// Sets the `max_dynamic_length` config parameter to `value`.
    #[must_use]
    pub fn with_max_dynamic_length(mut self, value: usize) -> Self {
        self.max_dynamic_length = value;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let padding_mode = PaddingMode::default();
        let strict_abi_mode = DEFAULT_STRICT_ABI_MODE_ENABLED;
        let max_dynamic_length = DEFAULT_MAX_DYNAMIC_LENGTH;
        Self {
            padding_mode,
            strict_abi_mode,
            max_dynamic_length,
        }
    }
}

/// The options that vary as the decoder recurses through a value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Options {
    /// How padding is checked for the current value.
    pub padding_mode: PaddingMode,

    /// Whether local faults reject the data.
    pub strict: bool,

    /// Whether the current value is ABI-encoded.
    pub abi: bool,

    /// The position from which ABI offsets in the current container are
    /// measured.
    pub abi_pointer_base: usize,
}

impl Options {
    /// Constructs the options at the root of a decode with `config`.
    pub fn new(config: &Config) -> Self {
        Self {
            padding_mode:     config.padding_mode,
            strict:           config.strict_abi_mode,
            abi:              false,
            abi_pointer_base: 0,
        }
    }

    /// Gets these options with strict mode enabled.
    #[must_use]
    pub fn strict(self) -> Self {
        Self {
            strict: true,
            ..self
        }
    }

    /// Gets these options with strict mode disabled.
    #[must_use]
    pub fn lenient(self) -> Self {
        Self {
            strict: false,
            ..self
        }
    }

    /// Gets these options with padding checks disabled.
    #[must_use]
    pub fn permissive(self) -> Self {
        Self {
            padding_mode: PaddingMode::Permissive,
            ..self
        }
    }

    /// Gets these options for ABI-encoded data whose offsets are measured from
    /// `base`.
    #[must_use]
    pub fn in_abi(self, base: usize) -> Self {
        Self {
            abi: true,
            abi_pointer_base: base,
            ..self
        }
    }
}
