//! This module contains common utilities for simplifying the writing of
//! integration tests for this library.

#![cfg(test)]

use evm_value_decoder::{
    info::DecoderInfo,
    numeric::BigNum,
    state::EvmState,
    types::{ContractType, DefinitionRef, Member, Type, UserDefinedType},
    utility::{pad_left, Word},
    Decoder,
};

/// Constructs a decoder with the default configuration that reads from `state`
/// and interprets it using `info`.
#[allow(unused)] // It is actually
pub fn decoder<'a>(state: &'a EvmState, info: &'a DecoderInfo) -> Decoder<'a, EvmState, BigNum> {
    Decoder::new(state, info)
}

/// Constructs the word holding the unsigned `value`.
#[allow(unused)] // It is actually
pub fn word(value: u64) -> Word {
    pad_left(&value.to_be_bytes())
}

/// Constructs a word from its `hex` representation, which must be exactly 64
/// digits long when the `0x` prefix is removed.
#[allow(unused)] // It is actually
pub fn word_from_hex(hex: &str) -> anyhow::Result<Word> {
    let bytes = hex::decode(hex.trim_start_matches("0x"))?;
    let word: Word = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("{hex} is not a single word"))?;
    Ok(word)
}

/// Concatenates `words` into a flat byte buffer, as they would appear in
/// memory or ABI-encoded data.
#[allow(unused)] // It is actually
pub fn concat(words: &[Word]) -> Vec<u8> {
    words.iter().flatten().copied().collect()
}

/// Constructs the type of the contract `Token` used throughout the tests.
#[allow(unused)] // It is actually
pub fn token_contract() -> ContractType {
    ContractType::new("100", "Token")
}

/// Constructs the reference to the enum `Color { Red, Green, Blue }`.
#[allow(unused)] // It is actually
pub fn color_enum() -> DefinitionRef {
    DefinitionRef::new("200", "Color").in_contract("Token")
}

/// Constructs the reference to the struct `Account`.
#[allow(unused)] // It is actually
pub fn account_struct() -> DefinitionRef {
    DefinitionRef::new("300", "Account").in_contract("Token")
}

/// Constructs decoder info that knows the definitions of the `Color` enum and
/// of the struct
///
/// ```solidity
/// struct Account {
///     uint128 balance;
///     bool frozen;
///     Color color;
///     address owner;
/// }
/// ```
#[allow(unused)] // It is actually
pub fn token_info() -> DecoderInfo {
    DecoderInfo::new()
        .with_type(UserDefinedType::Enum {
            definition: color_enum(),
            options:    vec!["Red".into(), "Green".into(), "Blue".into()],
        })
        .with_type(UserDefinedType::Struct {
            definition: account_struct(),
            members:    vec![
                Member::new("balance", Type::Uint { bits: 128 }),
                Member::new("frozen", Type::Bool),
                Member::new(
                    "color",
                    Type::Enum {
                        definition: color_enum(),
                    },
                ),
                Member::new("owner", Type::address()),
            ],
        })
}
