//! This module contains the decoding of values held on the stack.
//!
//! Value types occupy a single word, with the exception of external function
//! pointers which occupy two. Reference types are held as a pointer into the
//! location they refer to, which is followed.

use tracing::debug;

use crate::{
    constant::{ADDRESS_SIZE_BYTES, SELECTOR_SIZE_BYTES},
    decode::{value::check_padding, Decoder, Options, PaddingMode},
    error::{
        decoder::{DecoderError, DynamicDataError, FunctionExternalError, PaddingType},
        internal::StopResult,
        read,
    },
    numeric::Numeric,
    pointer::ByteLocation,
    state::StateReader,
    storage::Slot,
    types::{Location, Type, Visibility},
    utility::{to_hex, to_u256, Address, Word},
    value::{DecodeResult, TupleEntry, Value},
};

impl<'a, R, N> Decoder<'a, R, N>
where
    R: StateReader,
    N: Numeric,
{
    /// Decodes the value of `typ` held in the stack words from `from` to `to`.
    pub(super) fn decode_stack(
        &self,
        typ: &Type,
        from: usize,
        to: usize,
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        let words = self
            .state
            .stack(from, to)
            .ok_or(read::Error::Stack { from, to })?;
        self.decode_stack_words(typ, &words, from, options)
    }

    /// Decodes the value of `typ` from a word that was already taken from the
    /// stack.
    pub(super) fn decode_stack_literal(
        &self,
        typ: &Type,
        literal: &Word,
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        self.decode_stack_words(typ, std::slice::from_ref(literal), 0, options)
    }

    /// Decodes the value of `typ` from `words`, the first of which is at
    /// stack index `from`.
    fn decode_stack_words(
        &self,
        typ: &Type,
        words: &[Word],
        from: usize,
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        let Some(first) = words.first() else {
            return Err(read::Error::Stack { from, to: from }.into());
        };

        match typ {
            Type::Function {
                visibility: Visibility::External,
                ..
            } => match words {
                [address, selector, ..] => {
                    self.decode_stack_external_function(typ, address, selector, options)
                }
                // A single word holds the packed form.
                _ => self.decode_word(typ, first, options),
            },
            Type::Mapping { .. } => {
                self.decode_storage_reference(typ, &Slot::new(to_u256(first)), options)
            }
            Type::Tuple { members } => {
                let mut entries = Vec::with_capacity(members.len());
                for (ix, member) in members.iter().enumerate() {
                    let index = from.saturating_add(ix);
                    let word = words.get(ix).ok_or(read::Error::Stack {
                        from: index,
                        to:   index,
                    })?;
                    let words = std::slice::from_ref(word);
                    let value = self.decode_stack_words(&member.typ, words, index, options)?;
                    entries.push(TupleEntry {
                        name: member.name.clone(),
                        value,
                    });
                }
                Ok(DecodeResult::value(typ.clone(), Value::Tuple(entries)))
            }
            _ if typ.is_reference() => self.decode_stack_reference(typ, words, options),
            _ => self.decode_word(typ, first, &options.permissive()),
        }
    }

    /// Decodes an external function pointer held as an address word followed
    /// by a selector word, each of which must be left-padded.
    fn decode_stack_external_function(
        &self,
        typ: &Type,
        address: &Word,
        selector: &Word,
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        let checked = Options {
            padding_mode: PaddingMode::Default,
            ..*options
        };
        let address_bytes =
            check_padding(address, ADDRESS_SIZE_BYTES, PaddingType::Left, &checked);
        let selector_bytes =
            check_padding(selector, SELECTOR_SIZE_BYTES, PaddingType::Left, &checked);

        match (address_bytes, selector_bytes) {
            (Ok(address), Ok(selector)) => {
                let function = self.external_function(Address::from_slice(address), selector);
                Ok(DecodeResult::value(
                    typ.clone(),
                    Value::FunctionExternal(function),
                ))
            }
            _ => {
                let error = FunctionExternalError::StackPadding {
                    raw_address:  to_hex(address),
                    raw_selector: to_hex(selector),
                };
                self.fail(typ, DecoderError::FunctionExternal(error), options)
            }
        }
    }

    /// Follows a reference held on the stack into the location it refers to.
    fn decode_stack_reference(
        &self,
        typ: &Type,
        words: &[Word],
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        let pointer = to_u256(&words[0]);
        match typ.location() {
            Some(Location::Storage) => {
                self.decode_storage_reference(typ, &Slot::new(pointer), options)
            }
            location => {
                let Some(address) = self.bounded(pointer) else {
                    let error = DynamicDataError::OverlargePointer {
                        pointer: N::from_unsigned(pointer),
                    };
                    return self.fail(typ, error, options);
                };

                if location == Some(Location::Calldata) {
                    // Dynamic calldata data is held as its start and length.
                    let length = match words.get(1) {
                        Some(length) if is_dynamic(typ) => {
                            let length = to_u256(length);
                            match self.bounded(length) {
                                Some(length) => Some(length),
                                None => {
                                    let error = DynamicDataError::OverlongArraysAndStrings {
                                        length:      N::from_unsigned(length),
                                        data_length: None,
                                    };
                                    return self.fail(typ, error, options);
                                }
                            }
                        }
                        _ => None,
                    };
                    debug!(%typ, address, ?length, "Following calldata reference from stack");
                    self.decode_abi_reference(
                        typ,
                        ByteLocation::Calldata,
                        address,
                        length,
                        &options.in_abi(address),
                    )
                } else {
                    self.decode_memory_reference(typ, ByteLocation::Memory, address, options)
                }
            }
        }
    }
}

/// Checks whether `typ` is dynamically sized at the top level.
fn is_dynamic(typ: &Type) -> bool {
    matches!(
        typ,
        Type::DynBytes { .. } | Type::String { .. } | Type::DynArray { .. }
    )
}
