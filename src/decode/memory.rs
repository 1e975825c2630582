//! This module contains the decoding of values in memory, and of immutables in
//! code, which are laid out in the same way.
//!
//! Every value occupies a single word. Reference types are held as a pointer
//! to where their data begins, and their data is never packed: each element
//! or member occupies a word of its own, holding either its value or a pointer
//! to it in turn.

use ethnum::U256;

use crate::{
    constant::WORD_SIZE_BYTES,
    decode::{Decoder, Options},
    error::{decoder::DynamicDataError, internal::StopResult},
    numeric::Numeric,
    pointer::ByteLocation,
    state::StateReader,
    types::{Location, Type},
    value::{DecodeResult, NamedResult, TupleEntry, Value},
};

impl<'a, R, N> Decoder<'a, R, N>
where
    R: StateReader,
    N: Numeric,
{
    /// Decodes the value of `typ` held in the word of `location` at `start`.
    ///
    /// For reference types the word is a pointer to the value's data.
    pub(super) fn decode_memory(
        &self,
        typ: &Type,
        location: ByteLocation,
        start: usize,
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        self.decode_memory_at(typ, location, start, &[], options)
    }

    /// Decodes the value of the reference type `typ` whose data begins at
    /// `address` in `location`.
    pub(super) fn decode_memory_reference(
        &self,
        typ: &Type,
        location: ByteLocation,
        address: usize,
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        self.decode_memory_reference_at(typ, location, address, &[], options)
    }

    fn decode_memory_at(
        &self,
        typ: &Type,
        location: ByteLocation,
        start: usize,
        visited: &[usize],
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        match typ {
            // Mappings have no representation outside of storage.
            Type::Mapping { .. } => Ok(DecodeResult::value(typ.clone(), Value::Mapping(vec![]))),
            _ if typ.is_reference() => {
                let pointer = self.read_u256(location, start)?;
                let Some(address) = self.bounded(pointer) else {
                    let error = DynamicDataError::OverlargePointer {
                        pointer: N::from_unsigned(pointer),
                    };
                    return self.fail(typ, error, options);
                };
                self.decode_memory_reference_at(typ, location, address, visited, options)
            }
            Type::Tuple { .. } => {
                self.decode_memory_reference_at(typ, location, start, visited, options)
            }
            _ => {
                let word = self.read_word(location, start)?;
                self.decode_word(typ, &word, options)
            }
        }
    }

    fn decode_memory_reference_at(
        &self,
        typ: &Type,
        location: ByteLocation,
        address: usize,
        visited: &[usize],
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        // Tuples are held in place, so share their address with their first
        // member.
        let mut path = visited.to_vec();
        if typ.is_reference() {
            if visited.contains(&address) {
                let error = DynamicDataError::CircularReference {
                    pointer: N::from_usize(address),
                };
                return self.fail(typ, error, options);
            }
            path.push(address);
        }

        match typ {
            Type::DynBytes { .. } | Type::String { .. } => {
                let length = match self.memory_length(typ, location, address, options)? {
                    Ok(length) => length,
                    Err(error) => return Ok(error),
                };
                let start = after_word(address);
                if let Some(error) =
                    self.check_within_data(typ, location, start, length, length, options)?
                {
                    return Ok(error);
                }
                let data = self.read_bytes(location, start, length)?;
                self.decode_word(typ, &data, options)
            }
            Type::DynArray { base, .. } => {
                let length = match self.memory_length(typ, location, address, options)? {
                    Ok(length) => length,
                    Err(error) => return Ok(error),
                };
                let start = after_word(address);
                let bytes = length.saturating_mul(WORD_SIZE_BYTES);
                if let Some(error) =
                    self.check_within_data(typ, location, start, bytes, length, options)?
                {
                    return Ok(error);
                }
                let base = base.at(Location::Memory);
                let elements = (0..length)
                    .map(|ix| {
                        let start = element_word(start, ix);
                        self.decode_memory_at(&base, location, start, &path, options)
                    })
                    .collect::<StopResult<Vec<_>, N>>()?;
                Ok(DecodeResult::value(typ.clone(), Value::Array(elements)))
            }
            Type::Array { base, length, .. } => {
                let Some(length) = self.bounded(length.0) else {
                    return self.fail(typ, overlong(length.0), options);
                };
                let base = base.at(Location::Memory);
                let elements = (0..length)
                    .map(|ix| {
                        let start = element_word(address, ix);
                        self.decode_memory_at(&base, location, start, &path, options)
                    })
                    .collect::<StopResult<Vec<_>, N>>()?;
                Ok(DecodeResult::value(typ.clone(), Value::Array(elements)))
            }
            Type::Struct { definition, .. } => {
                let members = self.struct_members(typ, definition)?;

                // Mappings occupy no space in memory, so only the other members
                // advance the position.
                let mut position = address;
                let mut result = Vec::with_capacity(members.len());
                for member in members {
                    let member_type = member.typ.at(Location::Memory);
                    let value =
                        self.decode_memory_at(&member_type, location, position, &path, options)?;
                    if !matches!(member.typ, Type::Mapping { .. }) {
                        position = after_word(position);
                    }
                    result.push(NamedResult::new(member.name.clone(), value));
                }
                Ok(DecodeResult::value(typ.clone(), Value::Struct(result)))
            }
            Type::Tuple { members } => {
                let entries = members
                    .iter()
                    .enumerate()
                    .map(|(ix, member)| {
                        let start = element_word(address, ix);
                        let value =
                            self.decode_memory_at(&member.typ, location, start, &path, options)?;
                        Ok(TupleEntry {
                            name: member.name.clone(),
                            value,
                        })
                    })
                    .collect::<StopResult<Vec<_>, N>>()?;
                Ok(DecodeResult::value(typ.clone(), Value::Tuple(entries)))
            }
            _ => self.decode_memory_at(typ, location, address, &path, options),
        }
    }

    /// Reads the length word at `address` for the dynamic data of `typ`.
    ///
    /// If the length is too large to follow, the error result to use in place
    /// of the value is returned instead.
    fn memory_length(
        &self,
        typ: &Type,
        location: ByteLocation,
        address: usize,
        options: &Options,
    ) -> StopResult<Result<usize, DecodeResult<N>>, N> {
        let length = self.read_u256(location, address)?;
        match self.bounded(length) {
            Some(length) => Ok(Ok(length)),
            None => self.fail(typ, overlong(length), options).map(Err),
        }
    }
}

/// Constructs the error for a length that is too large to follow.
pub(super) fn overlong<N: Numeric>(length: U256) -> DynamicDataError<N> {
    DynamicDataError::OverlongArraysAndStrings {
        length:      N::from_unsigned(length),
        data_length: None,
    }
}

/// Gets the position of the word after the one at `position`.
fn after_word(position: usize) -> usize {
    position.saturating_add(WORD_SIZE_BYTES)
}

/// Gets the position of the word at `index` in an array beginning at `start`.
fn element_word(start: usize, index: usize) -> usize {
    start.saturating_add(index.saturating_mul(WORD_SIZE_BYTES))
}
