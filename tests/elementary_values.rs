//! This module is an integration test that checks the decoding of elementary
//! values held in memory and on the stack, including how malformed encodings
//! are reported.
#![cfg(test)]

use ethnum::{I256, U256};
use evm_value_decoder::{
    error::{
        decoder::{BoolError, DecoderError, DynamicDataError, EnumError, PaddingType},
        read,
        DecodingError,
    },
    info::DecoderInfo,
    numeric::{BigNum, DecimalString},
    pointer::{ByteLocation, Pointer},
    state::EvmState,
    types::{DefinitionRef, Location, Member, TupleMember, Type, UserDefinedType},
    utility::{pad_left, pad_right, sign_extend, to_hex, to_u256},
    value::{StringValue, Value},
    Config,
    Decoder,
    PaddingMode,
};

mod common;

fn memory(words: &[[u8; 32]]) -> EvmState {
    EvmState::new().with_bytes(ByteLocation::Memory, common::concat(words))
}

fn at(index: usize) -> Pointer {
    Pointer::word(ByteLocation::Memory, index * 32)
}

#[test]
fn decodes_unsigned_and_signed_integers() -> anyhow::Result<()> {
    let state = memory(&[common::word(42), sign_extend(&[0xfb])]);
    let info = DecoderInfo::new();
    let decoder = common::decoder(&state, &info);

    let unsigned = decoder.decode(&Type::uint256(), &at(0))?;
    assert_eq!(
        unsigned.as_value(),
        Some(&Value::Uint(BigNum::Unsigned(U256::from(42u64))))
    );

    let signed = decoder.decode(&Type::Int { bits: 8 }, &at(1))?;
    assert_eq!(
        signed.as_value(),
        Some(&Value::Int(BigNum::Signed(I256::new(-5))))
    );
    assert_eq!(signed.to_string(), "-5");

    Ok(())
}

#[test]
fn dirty_padding_is_embedded_as_an_error() -> anyhow::Result<()> {
    let dirty = pad_left(&[0x01, 0x2a]);
    let state = memory(&[dirty]);
    let info = DecoderInfo::new();
    let decoder = common::decoder(&state, &info);

    let result = decoder.decode(&Type::Uint { bits: 8 }, &at(0))?;
    assert!(!result.is_value());

    let padding = result
        .as_error()
        .and_then(DecoderError::as_padding)
        .ok_or_else(|| anyhow::anyhow!("Expected a padding error"))?;
    assert_eq!(padding.padding_type, PaddingType::Left);
    assert_eq!(padding.raw, to_hex(dirty));

    Ok(())
}

#[test]
fn booleans_report_the_whole_word_when_out_of_range() -> anyhow::Result<()> {
    let mut dirty_true = common::word(1);
    dirty_true[0] = 0x01;
    let state = memory(&[common::word(1), dirty_true, common::word(0)]);
    let info = DecoderInfo::new();
    let decoder = common::decoder(&state, &info);

    // A clean one is true
    let clean = decoder.decode(&Type::Bool, &at(0))?;
    assert_eq!(clean.as_value(), Some(&Value::Bool(true)));

    // A one with garbage in the high bits is not, and the error carries the
    // whole word as the value that was out of range
    let dirty = decoder.decode(&Type::Bool, &at(1))?;
    let expected = DecoderError::Bool(BoolError::OutOfRange {
        raw: BigNum::Unsigned(to_u256(&dirty_true)),
    });
    assert_eq!(dirty.as_error(), Some(&expected));

    let zero = decoder.decode(&Type::Bool, &at(2))?;
    assert_eq!(zero.as_value(), Some(&Value::Bool(false)));

    Ok(())
}

#[test]
fn enums_check_their_ordinal_against_the_definition() -> anyhow::Result<()> {
    let state = memory(&[common::word(2), common::word(3)]);
    let info = common::token_info();
    let decoder = common::decoder(&state, &info);
    let color = Type::Enum {
        definition: common::color_enum(),
    };

    let blue = decoder.decode(&color, &at(0))?;
    assert_eq!(blue.to_string(), "Blue");

    let out_of_range = decoder.decode(&color, &at(1))?;
    let expected = DecoderError::Enum(EnumError::OutOfRange {
        typ: color.clone(),
        raw: BigNum::Unsigned(U256::from(3u64)),
    });
    assert_eq!(out_of_range.as_error(), Some(&expected));

    Ok(())
}

#[test]
fn enums_without_a_definition_never_decode() -> anyhow::Result<()> {
    let state = memory(&[common::word(0)]);
    let info = DecoderInfo::new();
    let decoder = common::decoder(&state, &info);
    let color = Type::Enum {
        definition: common::color_enum(),
    };

    let result = decoder.decode(&color, &at(0))?;
    assert!(matches!(
        result.as_error(),
        Some(DecoderError::Enum(EnumError::NotFound { .. }))
    ));

    Ok(())
}

#[test]
fn user_defined_value_types_wrap_their_underlying_value() -> anyhow::Result<()> {
    let price = DefinitionRef::new("400", "Price");
    let typ = Type::UserDefinedValueType {
        definition: price.clone(),
    };
    let state = memory(&[common::word(7), pad_left(&[0xff; 9])]);
    let info = DecoderInfo::new().with_type(UserDefinedType::UserDefinedValueType {
        definition: price,
        underlying: Type::Uint { bits: 64 },
    });
    let decoder = common::decoder(&state, &info);

    let clean = decoder.decode(&typ, &at(0))?;
    let Some(Value::UserDefinedValueType(inner)) = clean.as_value() else {
        anyhow::bail!("Expected a user-defined value, got {clean:?}")
    };
    assert_eq!(inner.to_string(), "7");

    // The failure of the underlying value is wrapped rather than replacing it
    let dirty = decoder.decode(&typ, &at(1))?;
    let Some(DecoderError::UserDefinedValueType(inner)) = dirty.as_error() else {
        anyhow::bail!("Expected a wrapped error, got {dirty:?}")
    };
    assert!(inner.as_error().and_then(DecoderError::as_padding).is_some());

    Ok(())
}

#[test]
fn missing_user_defined_value_types_are_fatal() {
    let state = memory(&[common::word(7)]);
    let info = DecoderInfo::new();
    let decoder = common::decoder(&state, &info);
    let typ = Type::UserDefinedValueType {
        definition: DefinitionRef::new("401", "Missing"),
    };

    let result = decoder.decode(&typ, &at(0));
    assert!(matches!(
        result,
        Err(DecodingError::UserDefinedTypeNotFound { .. })
    ));
}

#[test]
fn strings_in_memory_follow_their_pointer() -> anyhow::Result<()> {
    let state = memory(&[
        common::word(0x40),
        common::word(0x80),
        common::word(5),
        pad_right(b"hello"),
        common::word(2),
        pad_right(&[0xc3, 0x28]),
    ]);
    let info = DecoderInfo::new();
    let decoder = common::decoder(&state, &info);

    let hello = decoder.decode(&Type::string(Location::Memory), &at(0))?;
    assert_eq!(
        hello.as_value(),
        Some(&Value::String(StringValue::Valid {
            value: "hello".into(),
        }))
    );

    // Invalid UTF-8 is kept as its raw bytes rather than being an error
    let malformed = decoder.decode(&Type::string(Location::Memory), &at(1))?;
    assert_eq!(
        malformed.as_value(),
        Some(&Value::String(StringValue::Malformed {
            raw: "0xc328".into(),
        }))
    );

    Ok(())
}

#[test]
fn overlarge_memory_pointers_leave_their_siblings() -> anyhow::Result<()> {
    let note = DefinitionRef::new("450", "Note");
    let info = DecoderInfo::new().with_type(UserDefinedType::Struct {
        definition: note.clone(),
        members:    vec![
            Member::new("before", Type::uint256()),
            Member::new("text", Type::string(Location::Memory)),
            Member::new("after", Type::uint256()),
        ],
    });
    let state = memory(&[
        common::word(0x20),
        common::word(1),
        common::word(1 << 40),
        common::word(2),
    ]);
    let decoder = common::decoder(&state, &info);

    let result = decoder.decode(&Type::structure(note, Location::Memory), &at(0))?;
    let member = |name: &str| {
        result
            .as_value()
            .and_then(|v| v.member(name))
            .ok_or_else(|| anyhow::anyhow!("Expected a note, got {result:?}"))
    };
    let expected = DecoderError::DynamicData(DynamicDataError::OverlargePointer {
        pointer: BigNum::Unsigned(U256::from(1u64 << 40)),
    });
    assert_eq!(member("text")?.as_error(), Some(&expected));
    assert_eq!(member("before")?.to_string(), "1");
    assert_eq!(member("after")?.to_string(), "2");

    Ok(())
}

#[test]
fn memory_arrays_past_the_end_are_not_built() -> anyhow::Result<()> {
    let state = memory(&[common::word(0x20), common::word(1000)]);
    let info = DecoderInfo::new();
    let decoder = common::decoder(&state, &info);

    let typ = Type::dyn_array(Type::uint256(), Location::Memory);
    let result = decoder.decode(&typ, &at(0))?;
    assert_eq!(
        result.as_error(),
        Some(&DecoderError::DynamicData(
            DynamicDataError::OverlongArraysAndStrings {
                length:      BigNum::Unsigned(U256::from(1000u64)),
                data_length: Some(64),
            }
        ))
    );

    // A configured maximum takes precedence over the extent of memory
    let capped: Decoder<_, BigNum> = Decoder::new(&state, &info)
        .with_config(Config::default().with_max_dynamic_length(10));
    let result = capped.decode(&typ, &at(0))?;
    assert_eq!(
        result.as_error(),
        Some(&DecoderError::DynamicData(
            DynamicDataError::OverlongArraysAndStrings {
                length:      BigNum::Unsigned(U256::from(1000u64)),
                data_length: None,
            }
        ))
    );

    Ok(())
}

#[test]
fn stack_read_errors_name_absolute_positions() {
    let state = EvmState::new()
        .push(common::word(1))
        .push(common::word(2))
        .push(common::word(3));
    let info = DecoderInfo::new();
    let decoder = common::decoder(&state, &info);

    let pair = Type::Tuple {
        members: vec![
            TupleMember {
                name: None,
                typ:  Type::uint256(),
            },
            TupleMember {
                name: None,
                typ:  Type::uint256(),
            },
        ],
    };

    // Only the first member is held at the given position
    assert_eq!(
        decoder.decode(&pair, &Pointer::stack(2)),
        Err(DecodingError::Read {
            error: read::Error::Stack { from: 3, to: 3 },
        })
    );
    assert_eq!(
        decoder.decode(&Type::uint256(), &Pointer::stack(5)),
        Err(DecodingError::Read {
            error: read::Error::Stack { from: 5, to: 5 },
        })
    );
}

#[test]
fn fixed_point_values_are_scaled_for_display() -> anyhow::Result<()> {
    let raw = I256::new(-1234);
    let state = memory(&[raw.to_be_bytes()]);
    let info = DecoderInfo::new();
    let decoder = common::decoder(&state, &info);

    let typ = Type::Fixed {
        bits:   128,
        places: 2,
    };
    let result = decoder.decode(&typ, &at(0))?;
    assert_eq!(result.to_string(), "-12.34");

    Ok(())
}

#[test]
fn padding_modes_change_what_is_accepted() -> anyhow::Result<()> {
    let sign_extended = sign_extend(&[0xfb]);
    let zero_padded = pad_left(&[0xfb]);
    let state = memory(&[sign_extended, zero_padded]);
    let info = DecoderInfo::new();
    let int8 = Type::Int { bits: 8 };

    let default = common::decoder(&state, &info);
    assert!(default.decode(&int8, &at(0))?.is_value());
    assert!(!default.decode(&int8, &at(1))?.is_value());

    let zero: Decoder<_, BigNum> = Decoder::new(&state, &info)
        .with_config(Config::default().with_padding_mode(PaddingMode::Zero));
    assert!(!zero.decode(&int8, &at(0))?.is_value());
    assert!(zero.decode(&int8, &at(1))?.is_value());

    let either: Decoder<_, BigNum> = Decoder::new(&state, &info)
        .with_config(Config::default().with_padding_mode(PaddingMode::DefaultOrZero));
    assert!(either.decode(&int8, &at(0))?.is_value());
    assert!(either.decode(&int8, &at(1))?.is_value());

    let permissive: Decoder<_, BigNum> = Decoder::new(&state, &info)
        .with_config(Config::default().with_padding_mode(PaddingMode::Permissive));
    let result = permissive.decode(&Type::Uint { bits: 8 }, &at(0))?;
    assert_eq!(result.to_string(), "251");

    Ok(())
}

#[test]
fn stack_values_ignore_dirty_padding() -> anyhow::Result<()> {
    let state = EvmState::new().push(pad_left(&[0xde, 0xad, 0x2a]));
    let info = DecoderInfo::new();
    let decoder = common::decoder(&state, &info);

    let result = decoder.decode(&Type::Uint { bits: 8 }, &Pointer::stack(0))?;
    assert_eq!(result.to_string(), "42");

    Ok(())
}

#[test]
fn decimal_strings_render_the_same_numbers() -> anyhow::Result<()> {
    let state = memory(&[sign_extend(&[0xfb])]);
    let info = DecoderInfo::new();
    let decoder: Decoder<_, DecimalString> = Decoder::new(&state, &info);

    let result = decoder.decode(&Type::Int { bits: 8 }, &at(0))?;
    let Some(Value::Int(value)) = result.as_value() else {
        anyhow::bail!("Expected an integer, got {result:?}")
    };
    assert_eq!(value.as_str(), "-5");

    Ok(())
}
