//! This module contains the decoding of ABI-encoded values, as found in
//! calldata, event data and return data.
//!
//! # Encoding
//!
//! Every value has a head of a fixed size. For static types the head is the
//! value itself, with static arrays, structs and tuples encoded inline as the
//! concatenation of their elements' heads. For dynamic types the head is an
//! offset, measured from the start of the enclosing container, to the tail
//! where the data lives. A dynamic array or byte string begins its tail with
//! its length, and the enclosing container for its elements starts after it.

use ethnum::U256;
use serde::Serialize;

use crate::{
    constant::WORD_SIZE_BYTES,
    decode::{memory::overlong, Decoder, Options},
    error::{
        self,
        decoder::DynamicDataError,
        internal::StopResult,
        DecodingError,
    },
    info::DecoderInfo,
    numeric::Numeric,
    pointer::ByteLocation,
    state::StateReader,
    types::{Location, Type, UserDefinedType},
    value::{DecodeResult, NamedResult, TupleEntry, Value},
};

/// The size of the head of a value in the ABI encoding.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct AbiSize {
    /// The number of bytes occupied by the head.
    pub size: usize,

    /// Whether the type is dynamic, in which case the head is an offset.
    pub dynamic: bool,
}

impl AbiSize {
    fn fixed(size: usize) -> Self {
        Self {
            size,
            dynamic: false,
        }
    }

    fn dynamic() -> Self {
        Self {
            size:    WORD_SIZE_BYTES,
            dynamic: true,
        }
    }
}

/// Computes the size of the head of `typ` in the ABI encoding.
///
/// Static arrays too large for their size to be represented report the
/// largest representable size.
///
/// # Errors
///
/// Returns [`Err`] if the size depends on a struct whose definition is not in
/// `info`.
pub fn abi_size(typ: &Type, info: &DecoderInfo) -> error::Result<AbiSize> {
    match typ {
        Type::DynBytes { .. } | Type::String { .. } | Type::DynArray { .. } => {
            Ok(AbiSize::dynamic())
        }
        Type::Array { base, length, .. } => {
            let element = abi_size(base, info)?;
            if element.dynamic {
                return Ok(AbiSize::dynamic());
            }
            let size = U256::from(element.size as u64).saturating_mul(length.0);
            let size = if size > U256::from(usize::MAX as u64) {
                usize::MAX
            } else {
                size.as_usize()
            };
            Ok(AbiSize::fixed(size))
        }
        Type::Struct { definition, .. } => match info.user_defined_type(&definition.id) {
            Some(UserDefinedType::Struct { members, .. }) => {
                members_size(members.iter().map(|m| &m.typ), info)
            }
            _ => Err(DecodingError::not_found(typ)),
        },
        Type::Tuple { members } => members_size(members.iter().map(|m| &m.typ), info),
        // Mappings are never encoded, as in memory.
        Type::Mapping { .. } => Ok(AbiSize::fixed(0)),
        _ => Ok(AbiSize::fixed(WORD_SIZE_BYTES)),
    }
}

/// Computes the combined head size of a sequence of member types.
fn members_size<'t>(
    members: impl Iterator<Item = &'t Type>,
    info: &DecoderInfo,
) -> error::Result<AbiSize> {
    let mut size = 0usize;
    for member in members {
        let member = abi_size(member, info)?;
        if member.dynamic {
            return Ok(AbiSize::dynamic());
        }
        size = size.saturating_add(member.size);
    }
    Ok(AbiSize::fixed(size))
}

impl<'a, R, N> Decoder<'a, R, N>
where
    R: StateReader,
    N: Numeric,
{
    /// Decodes the value of `typ` whose head is at `start` in `location`.
    ///
    /// Offsets are measured from the base in `options`, which is the start of
    /// the data when not already inside an ABI container.
    pub(super) fn decode_abi(
        &self,
        typ: &Type,
        location: ByteLocation,
        start: usize,
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        let options = if options.abi {
            *options
        } else {
            options.in_abi(0)
        };

        if matches!(typ, Type::Mapping { .. }) {
            return Ok(DecodeResult::value(typ.clone(), Value::Mapping(vec![])));
        }

        let size = abi_size(typ, self.info)?;
        if size.dynamic {
            let offset = self.read_u256(location, start)?;
            let Some(offset) = self.bounded(offset) else {
                let error = DynamicDataError::OverlargePointer {
                    pointer: N::from_unsigned(offset),
                };
                return self.fail(typ, error, &options);
            };
            let address = options.abi_pointer_base.saturating_add(offset);
            return self.decode_abi_reference(typ, location, address, None, &options);
        }

        match typ {
            Type::Array { .. } | Type::Struct { .. } | Type::Tuple { .. } => {
                self.decode_abi_reference(typ, location, start, None, &options)
            }
            _ => {
                let word = self.read_word(location, start)?;
                self.decode_word(typ, &word, &options)
            }
        }
    }

    /// Decodes the value of the container type `typ` whose data begins at
    /// `address` in `location`.
    ///
    /// For dynamic arrays and byte strings, the `length` is read from the word
    /// at `address` unless it is already known, as for calldata references on
    /// the stack, in which case the data begins at `address` itself.
    pub(super) fn decode_abi_reference(
        &self,
        typ: &Type,
        location: ByteLocation,
        address: usize,
        length: Option<usize>,
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        let here = typ.location().unwrap_or(Location::Calldata);
        match typ {
            Type::DynBytes { .. } | Type::String { .. } => {
                let found = self.abi_length(typ, location, address, length, options)?;
                let (length, start) = match found {
                    Ok(found) => found,
                    Err(error) => return Ok(error),
                };
                if let Some(error) =
                    self.check_within_data(typ, location, start, length, length, options)?
                {
                    return Ok(error);
                }
                let data = self.read_bytes(location, start, length)?;
                self.decode_word(typ, &data, options)
            }
            Type::DynArray { base, .. } => {
                let found = self.abi_length(typ, location, address, length, options)?;
                let (length, start) = match found {
                    Ok(found) => found,
                    Err(error) => return Ok(error),
                };
                let base = base.at(here);
                let element = abi_size(&base, self.info)?;
                let bytes = length.saturating_mul(element.size);
                if let Some(error) =
                    self.check_within_data(typ, location, start, bytes, length, options)?
                {
                    return Ok(error);
                }
                self.decode_abi_elements(typ, &base, location, start, length, element, options)
            }
            Type::Array { base, length, .. } => {
                let Some(length) = self.bounded(length.0) else {
                    return self.fail(typ, overlong(length.0), options);
                };
                let base = base.at(here);
                let element = abi_size(&base, self.info)?;
                self.decode_abi_elements(typ, &base, location, address, length, element, options)
            }
            Type::Struct { definition, .. } => {
                let members = self.struct_members(typ, definition)?;
                let options = options.in_abi(address);
                let mut position = address;
                let mut values = Vec::with_capacity(members.len());
                for member in members {
                    let member_type = member.typ.at(here);
                    let value = self.decode_abi(&member_type, location, position, &options)?;
                    position = position.saturating_add(abi_size(&member_type, self.info)?.size);
                    values.push(NamedResult::new(member.name.clone(), value));
                }
                Ok(DecodeResult::value(typ.clone(), Value::Struct(values)))
            }
            Type::Tuple { members } => {
                let options = options.in_abi(address);
                let mut position = address;
                let mut entries = Vec::with_capacity(members.len());
                for member in members {
                    let value = self.decode_abi(&member.typ, location, position, &options)?;
                    position = position.saturating_add(abi_size(&member.typ, self.info)?.size);
                    entries.push(TupleEntry {
                        name: member.name.clone(),
                        value,
                    });
                }
                Ok(DecodeResult::value(typ.clone(), Value::Tuple(entries)))
            }
            _ => self.decode_abi(typ, location, address, options),
        }
    }

    /// Decodes `length` elements of type `base` whose heads begin at `start`,
    /// each `element` in size.
    #[allow(clippy::too_many_arguments)]
    fn decode_abi_elements(
        &self,
        typ: &Type,
        base: &Type,
        location: ByteLocation,
        start: usize,
        length: usize,
        element: AbiSize,
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        let options = options.in_abi(start);
        let elements = (0..length)
            .map(|ix| {
                let position = start.saturating_add(ix.saturating_mul(element.size));
                self.decode_abi(base, location, position, &options)
            })
            .collect::<StopResult<Vec<_>, N>>()?;
        Ok(DecodeResult::value(typ.clone(), Value::Array(elements)))
    }

    /// Gets the length of the dynamic data at `address` and the position at
    /// which its contents begin, or the error result to use in place of the
    /// value if the length cannot be followed.
    fn abi_length(
        &self,
        typ: &Type,
        location: ByteLocation,
        address: usize,
        known: Option<usize>,
        options: &Options,
    ) -> StopResult<Result<(usize, usize), DecodeResult<N>>, N> {
        if let Some(length) = known {
            return Ok(Ok((length, address)));
        }

        let length = self.read_u256(location, address)?;
        match self.bounded(length) {
            Some(length) => Ok(Ok((length, address.saturating_add(WORD_SIZE_BYTES)))),
            None => self.fail(typ, overlong(length), options).map(Err),
        }
    }
}
