//! This module contains the computation of storage sizes and of the layout of
//! struct members in storage.

use ethnum::U256;
use serde::Serialize;

use crate::{
    constant::{
        ADDRESS_SIZE_BYTES,
        BOOL_SIZE_BYTES,
        BYTE_SIZE_BITS,
        ENUM_SIZE_BYTES,
        EXTERNAL_FUNCTION_SIZE_BYTES,
        INTERNAL_FUNCTION_SIZE_BYTES,
        WORD_SIZE_BYTES,
    },
    error::{self, DecodingError},
    info::DecoderInfo,
    storage::{Range, Slot, StorageSize},
    types::{Member, Type, UserDefinedType, Visibility},
    utility::U256Wrapper,
};

/// Computes the amount of storage occupied by a value of type `typ`.
///
/// # Errors
///
/// Returns [`Err`] if the size depends on a user-defined type whose definition
/// is not in `info`.
pub fn storage_size(typ: &Type, info: &DecoderInfo) -> error::Result<StorageSize> {
    let bytes = |count: usize| Ok(StorageSize::Bytes(count));
    match typ {
        Type::Uint { bits }
        | Type::Int { bits }
        | Type::Fixed { bits, .. }
        | Type::Ufixed { bits, .. } => bytes(usize::from(*bits) / BYTE_SIZE_BITS),
        Type::Bool => bytes(BOOL_SIZE_BYTES),
        Type::Bytes { length } => bytes(usize::from(*length)),
        Type::Address { .. } | Type::Contract { .. } => bytes(ADDRESS_SIZE_BYTES),
        Type::Enum { .. } => bytes(ENUM_SIZE_BYTES),
        Type::Function {
            visibility: Visibility::External,
            ..
        } => bytes(EXTERNAL_FUNCTION_SIZE_BYTES),
        Type::Function { .. } => bytes(INTERNAL_FUNCTION_SIZE_BYTES),
        Type::UserDefinedValueType { definition } => match info.user_defined_type(&definition.id) {
            Some(UserDefinedType::UserDefinedValueType { underlying, .. }) => {
                storage_size(underlying, info)
            }
            _ => Err(DecodingError::not_found(typ)),
        },
        Type::Array { base, length, .. } => {
            let element = storage_size(base, info)?;
            Ok(StorageSize::Words(element.words_for_elements(length.0).into()))
        }
        Type::Struct { definition, .. } => match info.user_defined_type(&definition.id) {
            Some(UserDefinedType::Struct { members, .. }) => {
                Ok(StorageLayout::allocate(members, info)?.size())
            }
            _ => Err(DecodingError::not_found(typ)),
        },
        Type::Tuple { members } => {
            let members: Vec<Member> = members
                .iter()
                .map(|m| Member::new(m.name.clone().unwrap_or_default(), m.typ.clone()))
                .collect();
            Ok(StorageLayout::allocate(&members, info)?.size())
        }
        Type::DynBytes { .. }
        | Type::String { .. }
        | Type::DynArray { .. }
        | Type::Mapping { .. }
        | Type::Magic { .. }
        | Type::TypeOfContract { .. }
        | Type::TypeOfEnum { .. } => Ok(StorageSize::Words(U256::ONE.into())),
    }
}

/// The layout of the members of a struct in storage, relative to the slot at
/// which the struct begins.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct StorageLayout {
    slots: Vec<StorageSlot>,
    words: U256Wrapper,
}

impl StorageLayout {
    /// Allocates storage for `members` in declaration order, packing as the
    /// compiler does.
    ///
    /// A member smaller than a word shares the current slot if it fits in what
    /// remains of it, and otherwise moves on to the next slot. A member of one
    /// or more whole words always begins a fresh slot, and nothing is packed
    /// after it in its final slot.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the size of any member cannot be computed.
    pub fn allocate(members: &[Member], info: &DecoderInfo) -> error::Result<Self> {
        let mut layout = Self::default();
        let mut index = U256::ZERO;
        let mut offset = 0;

        for member in members {
            let size = storage_size(&member.typ, info)?;
            match size {
                StorageSize::Bytes(count) => {
                    if offset + count > WORD_SIZE_BYTES {
                        index = index.wrapping_add(U256::ONE);
                        offset = 0;
                    }
                    layout.add(&member.name, index, offset, size, &member.typ);
                    offset += count;
                }
                StorageSize::Words(words) => {
                    if offset > 0 {
                        index = index.wrapping_add(U256::ONE);
                        offset = 0;
                    }
                    layout.add(&member.name, index, 0, size, &member.typ);
                    index = index.wrapping_add(words.0);
                }
            }
        }

        layout.words = if offset > 0 {
            index.wrapping_add(U256::ONE)
        } else {
            index
        }
        .into();

        Ok(layout)
    }

    fn add(&mut self, name: &str, index: U256, offset: usize, size: StorageSize, typ: &Type) {
        self.slots.push(StorageSlot {
            name: name.to_string(),
            index: index.into(),
            offset,
            size,
            typ: typ.clone(),
        });
    }

    /// Gets the storage slots that make up this layout, in member declaration
    /// order.
    #[must_use]
    pub fn slots(&self) -> &Vec<StorageSlot> {
        &self.slots
    }

    /// Gets the total size of the laid-out struct.
    #[must_use]
    pub fn size(&self) -> StorageSize {
        StorageSize::Words(self.words)
    }

    /// Checks if the layout contains no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// The position allocated to a single struct member.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct StorageSlot {
    /// The name of the member.
    pub name: String,

    /// The index of the member's first slot, relative to the start of the
    /// struct.
    pub index: U256Wrapper,

    /// The offset in bytes from the least-significant end of the slot at
    /// which the member starts.
    ///
    /// This is always 0 for members of one or more whole words.
    pub offset: usize,

    /// The amount of storage the member occupies.
    pub size: StorageSize,

    /// The type of the member.
    #[serde(rename = "type")]
    pub typ: Type,
}

impl StorageSlot {
    /// Gets the range occupied by the member of a struct beginning at `base`.
    #[must_use]
    pub fn range(&self, base: &Slot) -> Range {
        let slot = base.offset_by(self.index.0);
        match self.size {
            StorageSize::Bytes(size) => Range::packed(slot, self.offset, size),
            StorageSize::Words(words) => Range::words(slot, words.0),
        }
    }
}

#[cfg(test)]
mod test {
    use ethnum::U256;

    use crate::{
        error::DecodingError,
        info::DecoderInfo,
        storage::{
            layout::{storage_size, StorageLayout},
            Slot,
            StorageSize,
        },
        types::{DefinitionRef, Location, Member, Type},
    };

    #[test]
    fn packs_small_members_into_a_shared_slot() -> anyhow::Result<()> {
        let members = vec![
            Member::new("a", Type::Uint { bits: 128 }),
            Member::new("b", Type::Uint { bits: 64 }),
            Member::new("c", Type::address()),
            Member::new("d", Type::Bool),
        ];
        let layout = StorageLayout::allocate(&members, &DecoderInfo::new())?;
        let slots = layout.slots();

        assert_eq!(slots[0].index.0, U256::ZERO);
        assert_eq!(slots[1].offset, 16);

        // `c` does not fit in the 8 remaining bytes.
        assert_eq!(slots[2].index.0, U256::ONE);
        assert_eq!(slots[2].offset, 0);
        assert_eq!(slots[3].offset, 20);
        assert_eq!(layout.size(), StorageSize::Words(U256::new(2).into()));

        let range = slots[3].range(&Slot::new(10u64));
        assert_eq!(range.from.slot.address(), U256::new(11));
        assert_eq!(range.from.index, 11);
        assert_eq!(range.to.index, 11);
        Ok(())
    }

    #[test]
    fn whole_word_members_are_never_shared() -> anyhow::Result<()> {
        let members = vec![
            Member::new("a", Type::Bool),
            Member::new("b", Type::string(Location::Storage)),
            Member::new("c", Type::Bool),
        ];
        let layout = StorageLayout::allocate(&members, &DecoderInfo::new())?;
        let indices: Vec<U256> = layout.slots().iter().map(|s| s.index.0).collect();
        assert_eq!(indices, vec![U256::ZERO, U256::ONE, U256::new(2)]);
        assert_eq!(layout.size(), StorageSize::Words(U256::new(3).into()));
        Ok(())
    }

    #[test]
    fn sizes_static_arrays_in_whole_words() -> anyhow::Result<()> {
        let info = DecoderInfo::new();
        let small = Type::array(Type::Uint { bits: 8 }, 33usize, Location::Storage);
        assert_eq!(storage_size(&small, &info)?, StorageSize::Words(U256::new(2).into()));

        let external = Type::external_function();
        assert_eq!(storage_size(&external, &info)?, StorageSize::Bytes(24));
        Ok(())
    }

    #[test]
    fn missing_struct_definitions_are_fatal() {
        let typ = Type::structure(DefinitionRef::new("7", "Missing"), Location::Storage);
        let result = storage_size(&typ, &DecoderInfo::new());
        assert_eq!(result, Err(DecodingError::not_found(&typ)));
    }
}
