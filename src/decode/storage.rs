//! This module contains the decoding of values in persistent contract storage.
//!
//! Value types are read from the byte range they occupy, which may be a
//! fraction of a word shared with other values. Reference types are followed
//! from the slot at which they begin, with the data of dynamic arrays and long
//! byte strings found at the hash of that slot, and the values of mappings
//! found at the hash of each known key with it.

use ethnum::U256;
use tracing::debug;

use crate::{
    constant::{SHORT_STORAGE_STRING_MAX_BYTES, WORD_SIZE_BYTES},
    decode::{memory::overlong, Decoder, Options, PaddingMode},
    error::{decoder::DynamicDataError, internal::StopResult, read},
    info::KeyValue,
    numeric::Numeric,
    state::StateReader,
    storage::{
        layout::{storage_size, StorageLayout},
        Range,
        Slot,
    },
    types::{Location, Member, Type},
    utility::to_u256,
    value::{DecodeResult, KeyValuePair, NamedResult, TupleEntry, Value},
};

impl<'a, R, N> Decoder<'a, R, N>
where
    R: StateReader,
    N: Numeric,
{
    /// Decodes the value of `typ` occupying `range` of storage.
    ///
    /// For reference types only the start of the range is significant.
    pub(super) fn decode_storage(
        &self,
        typ: &Type,
        range: &Range,
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        if typ.is_reference() || matches!(typ, Type::Tuple { .. }) {
            return self.decode_storage_reference(typ, &range.from.slot, options);
        }

        let raw = self.read_storage(range)?;
        self.decode_word(typ, &raw, options)
    }

    /// Decodes the value of the reference type `typ` beginning at `slot`.
    pub(super) fn decode_storage_reference(
        &self,
        typ: &Type,
        slot: &Slot,
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        match typ {
            Type::DynBytes { .. } | Type::String { .. } => {
                self.decode_storage_bytes(typ, slot, options)
            }
            Type::DynArray { base, .. } => {
                let length = to_u256(&self.read_storage(&Range::word(slot.clone()))?);
                let Some(length) = self.bounded(length) else {
                    return self.fail(typ, overlong(length), options);
                };
                self.decode_storage_elements(typ, base, &slot.hashed(), length, options)
            }
            Type::Array { base, length, .. } => {
                let Some(length) = self.bounded(length.0) else {
                    return self.fail(typ, overlong(length.0), options);
                };
                self.decode_storage_elements(typ, base, slot, length, options)
            }
            Type::Struct { definition, .. } => {
                let members = self.struct_members(typ, definition)?;
                let layout = StorageLayout::allocate(members, self.info)?;
                let values = layout
                    .slots()
                    .iter()
                    .map(|member| {
                        let member_type = member.typ.at(Location::Storage);
                        let value =
                            self.decode_storage(&member_type, &member.range(slot), options)?;
                        Ok(NamedResult::new(member.name.clone(), value))
                    })
                    .collect::<StopResult<Vec<_>, N>>()?;
                Ok(DecodeResult::value(typ.clone(), Value::Struct(values)))
            }
            Type::Tuple { members } => {
                let as_members: Vec<Member> = members
                    .iter()
                    .map(|m| Member::new(m.name.clone().unwrap_or_default(), m.typ.clone()))
                    .collect();
                let layout = StorageLayout::allocate(&as_members, self.info)?;
                let entries = members
                    .iter()
                    .zip(layout.slots())
                    .map(|(member, allocated)| {
                        let value =
                            self.decode_storage(&member.typ, &allocated.range(slot), options)?;
                        Ok(TupleEntry {
                            name: member.name.clone(),
                            value,
                        })
                    })
                    .collect::<StopResult<Vec<_>, N>>()?;
                Ok(DecodeResult::value(typ.clone(), Value::Tuple(entries)))
            }
            Type::Mapping { key, value } => self.decode_mapping(typ, key, value, slot, options),
            _ => {
                let size = storage_size(typ, self.info)?;
                self.decode_storage(typ, &size.range_at(slot.clone()), options)
            }
        }
    }

    /// Decodes a `bytes` or `string` beginning at `slot`.
    ///
    /// Short values of at most 31 bytes live in the slot itself with twice
    /// their length in the lowest byte. Longer values store twice their length
    /// plus one in the slot, with the data at its hash.
    fn decode_storage_bytes(
        &self,
        typ: &Type,
        slot: &Slot,
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        let word = self.read_storage(&Range::word(slot.clone()))?;
        let last = word[WORD_SIZE_BYTES - 1];

        if last % 2 == 0 {
            let length = usize::from(last / 2);
            if length > SHORT_STORAGE_STRING_MAX_BYTES {
                let error = DynamicDataError::OverlongArraysAndStrings {
                    length:      N::from_usize(length),
                    data_length: Some(SHORT_STORAGE_STRING_MAX_BYTES),
                };
                return self.fail(typ, error, options);
            }
            return self.decode_word(typ, &word[..length], options);
        }

        // The word is odd, so this never underflows.
        let length = (to_u256(&word) - U256::ONE) / 2;
        let Some(length) = self.bounded(length) else {
            return self.fail(typ, overlong(length), options);
        };
        let data = self.read_storage(&Range::bytes(slot.hashed(), length))?;
        self.decode_word(typ, &data, options)
    }

    /// Decodes `length` elements of type `base` packed from `data` onwards.
    fn decode_storage_elements(
        &self,
        typ: &Type,
        base: &Type,
        data: &Slot,
        length: usize,
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        let base = base.at(Location::Storage);
        let size = storage_size(&base, self.info)?;
        let elements = (0..length)
            .map(|ix| self.decode_storage(&base, &size.element_range(data, ix), options))
            .collect::<StopResult<Vec<_>, N>>()?;
        Ok(DecodeResult::value(typ.clone(), Value::Array(elements)))
    }

    /// Decodes the entries of the mapping at `slot` for each of the keys known
    /// to have been used with it.
    fn decode_mapping(
        &self,
        typ: &Type,
        key_type: &Type,
        value_type: &Type,
        slot: &Slot,
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        let value_type = value_type.at(Location::Storage);
        let size = storage_size(&value_type, self.info)?;

        let mut pairs = Vec::new();
        for key in self.info.keys_for(slot.address()) {
            let Some(decoded_key) = self.decode_key(key_type, key)? else {
                debug!(%typ, ?key, "Skipping mapping key of the wrong type");
                continue;
            };
            let value_slot = slot.keyed(key.encode());
            let value = self.decode_storage(&value_type, &size.range_at(value_slot), options)?;
            pairs.push(KeyValuePair {
                key: decoded_key,
                value,
            });
        }

        Ok(DecodeResult::value(typ.clone(), Value::Mapping(pairs)))
    }

    /// Decodes a mapping `key` as a value of `key_type`.
    ///
    /// Keys are checked with the default padding and never cause rejection,
    /// with keys that do not decode cleanly simply being skipped.
    fn decode_key(&self, key_type: &Type, key: &KeyValue) -> StopResult<Option<Value<N>>, N> {
        if !key_type.is_elementary() {
            return Ok(None);
        }

        let raw = match (key_type, key) {
            (Type::DynBytes { .. } | Type::String { .. }, KeyValue::DynBytes(b)) => b.clone(),
            (Type::DynBytes { .. } | Type::String { .. }, KeyValue::String(s)) => {
                s.as_bytes().to_vec()
            }
            (Type::DynBytes { .. } | Type::String { .. }, _) => return Ok(None),
            (_, key) => match key.to_word() {
                Some(word) => word.to_vec(),
                None => return Ok(None),
            },
        };

        let options = Options {
            padding_mode: PaddingMode::Default,
            ..Options::new(&self.config).lenient()
        };
        Ok(self.decode_word(key_type, &raw, &options)?.into_value())
    }

    /// Reads the bytes in `range`, which may span many words.
    fn read_storage(&self, range: &Range) -> StopResult<Vec<u8>, N> {
        let count = range.word_count();
        if count == U256::ZERO {
            return Ok(vec![]);
        }
        let error = || read::Error::Storage {
            range: range.clone(),
        };
        let count = self.bounded(count).ok_or_else(error)?;

        let start = range.from.slot.address();
        let mut bytes = Vec::with_capacity(count * WORD_SIZE_BYTES);
        for ix in 0..count {
            let address = start.wrapping_add(U256::from(ix as u64));
            let word = self.state.storage_word(address).ok_or_else(error)?;
            bytes.extend_from_slice(&word);
        }

        let end = (count - 1) * WORD_SIZE_BYTES + range.to.index + 1;
        Ok(bytes[range.from.index..end].to_vec())
    }
}
