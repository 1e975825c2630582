//! This module is an integration test that checks the decoding of values that
//! do not come from the ordinary data locations, along with memory layouts
//! that need special handling and the serialized form of results.
#![cfg(test)]

use evm_value_decoder::{
    error::{
        decoder::{DecoderError, DynamicDataError},
        read,
        DecodingError,
    },
    info::DecoderInfo,
    pointer::{ByteLocation, ConstantDefinition, Pointer},
    state::EvmState,
    types::{DefinitionRef, Location, MagicVariable, Member, Type, UserDefinedType},
    utility::Address,
    value::Value,
};

mod common;

fn constant(bytes: &[u8]) -> Pointer {
    Pointer::Constant {
        definition: ConstantDefinition::Literal {
            bytes: bytes.to_vec(),
        },
    }
}

#[test]
fn decodes_the_members_of_magic_variables() -> anyhow::Result<()> {
    let sender = Address([0x99; 20]);
    let state = EvmState::new()
        .with_special(MagicVariable::Message, "data", vec![1, 2, 3])
        .with_special(MagicVariable::Message, "sig", vec![0xa9, 0x05, 0x9c, 0xbb])
        .with_special(MagicVariable::Message, "sender", sender.0.to_vec())
        .with_special(MagicVariable::Message, "value", vec![0x0a]);
    let info = DecoderInfo::new();
    let decoder = common::decoder(&state, &info);

    let typ = Type::Magic {
        variable: MagicVariable::Message,
    };
    let pointer = Pointer::Special {
        variable: MagicVariable::Message,
    };
    let result = decoder.decode(&typ, &pointer)?;
    assert_eq!(
        result.to_string(),
        format!("{{data: 0x010203, sig: 0xa9059cbb, sender: {sender}, value: 10}}")
    );

    Ok(())
}

#[test]
fn missing_magic_members_are_fatal() {
    let state = EvmState::new().with_special(MagicVariable::Transaction, "origin", vec![1]);
    let info = DecoderInfo::new();
    let decoder = common::decoder(&state, &info);

    let typ = Type::Magic {
        variable: MagicVariable::Transaction,
    };
    let pointer = Pointer::Special {
        variable: MagicVariable::Transaction,
    };
    let result = decoder.decode(&typ, &pointer);
    assert_eq!(
        result,
        Err(DecodingError::Read {
            error: read::Error::special(MagicVariable::Transaction, "gasprice"),
        })
    );
}

#[test]
fn lists_the_members_of_enum_types() -> anyhow::Result<()> {
    let state = EvmState::new();
    let info = common::token_info();
    let decoder = common::decoder(&state, &info);

    let typ = Type::TypeOfEnum {
        definition: common::color_enum(),
    };
    let result = decoder.decode(&typ, &Pointer::Nowhere)?;
    assert_eq!(result.to_string(), "{Red, Green, Blue}");

    let Some(Value::TypeOfEnum(members)) = result.as_value() else {
        anyhow::bail!("Expected the members of an enum, got {result:?}")
    };
    assert_eq!(members[2].numeric.to_string(), "2");

    // Without the definition there is nothing to list
    let empty = DecoderInfo::new();
    let decoder = common::decoder(&state, &empty);
    assert!(matches!(
        decoder.decode(&typ, &Pointer::Nowhere),
        Err(DecodingError::UserDefinedTypeNotFound { .. })
    ));

    Ok(())
}

#[test]
fn contract_types_have_no_members_to_show() -> anyhow::Result<()> {
    let state = EvmState::new();
    let info = DecoderInfo::new();
    let decoder = common::decoder(&state, &info);

    let typ = Type::TypeOfContract {
        contract: common::token_contract(),
    };
    let result = decoder.decode(&typ, &Pointer::Nowhere)?;
    assert_eq!(result.as_value(), Some(&Value::TypeOfContract(vec![])));

    Ok(())
}

#[test]
fn decodes_literal_constants() -> anyhow::Result<()> {
    let state = EvmState::new();
    let info = DecoderInfo::new();
    let decoder = common::decoder(&state, &info);

    let number = decoder.decode(&Type::Uint { bits: 8 }, &constant(&[0x2a]))?;
    assert_eq!(number.to_string(), "42");

    let text = decoder.decode(&Type::string(Location::Memory), &constant(b"hi"))?;
    assert_eq!(text.to_string(), "\"hi\"");

    let fixed_bytes = decoder.decode(&Type::Bytes { length: 4 }, &constant(b"abcd"))?;
    assert_eq!(fixed_bytes.to_string(), "0x61626364");

    Ok(())
}

#[test]
fn unsupported_constants_are_fatal() {
    let state = EvmState::new();
    let info = DecoderInfo::new();
    let decoder = common::decoder(&state, &info);

    let pointer = Pointer::Constant {
        definition: ConstantDefinition::Unsupported {
            node_type: "FunctionCall".into(),
        },
    };
    assert_eq!(
        decoder.decode(&Type::uint256(), &pointer),
        Err(DecodingError::Read {
            error: read::Error::UnsupportedConstant {
                definition: "FunctionCall".into(),
            },
        })
    );

    // Literals only make sense for value types
    let array = Type::dyn_array(Type::uint256(), Location::Memory);
    assert!(matches!(
        decoder.decode(&array, &constant(&[1])),
        Err(DecodingError::Read {
            error: read::Error::UnsupportedConstant { .. }
        })
    ));
}

#[test]
fn unused_immutables_and_misplaced_specials_cannot_be_read() {
    let state = EvmState::new();
    let info = DecoderInfo::new();
    let decoder = common::decoder(&state, &info);

    assert_eq!(
        decoder.decode(&Type::uint256(), &Pointer::Nowhere),
        Err(DecodingError::Read {
            error: read::Error::UnusedImmutable,
        })
    );

    let pointer = Pointer::Special {
        variable: MagicVariable::Block,
    };
    assert!(matches!(
        decoder.decode(&Type::uint256(), &pointer),
        Err(DecodingError::Read {
            error: read::Error::Special { .. }
        })
    ));
}

#[test]
fn mapping_members_take_no_space_in_memory() -> anyhow::Result<()> {
    let holder = DefinitionRef::new("700", "Holder");
    let info = DecoderInfo::new().with_type(UserDefinedType::Struct {
        definition: holder.clone(),
        members:    vec![
            Member::new("first", Type::uint256()),
            Member::new("balances", Type::mapping(Type::address(), Type::uint256())),
            Member::new("second", Type::uint256()),
        ],
    });
    let state = EvmState::new().with_bytes(
        ByteLocation::Memory,
        common::concat(&[common::word(0x20), common::word(1), common::word(2)]),
    );
    let decoder = common::decoder(&state, &info);

    let typ = Type::structure(holder, Location::Memory);
    let result = decoder.decode(&typ, &Pointer::word(ByteLocation::Memory, 0))?;
    assert_eq!(result.to_string(), "{first: 1, balances: {}, second: 2}");

    Ok(())
}

#[test]
fn circular_memory_references_are_reported() -> anyhow::Result<()> {
    let node = DefinitionRef::new("800", "Node");
    let node_type = Type::structure(node.clone(), Location::Memory);
    let info = DecoderInfo::new().with_type(UserDefinedType::Struct {
        definition: node,
        members:    vec![
            Member::new("value", Type::uint256()),
            Member::new("next", node_type.clone()),
        ],
    });

    // A node at 0x20 whose `next` points back to itself
    let state = EvmState::new().with_bytes(
        ByteLocation::Memory,
        common::concat(&[common::word(0x20), common::word(5), common::word(0x20)]),
    );
    let decoder = common::decoder(&state, &info);

    let result = decoder.decode(&node_type, &Pointer::word(ByteLocation::Memory, 0))?;
    let next = result
        .as_value()
        .and_then(|v| v.member("next"))
        .ok_or_else(|| anyhow::anyhow!("Expected a node, got {result:?}"))?;
    assert!(matches!(
        next.as_error(),
        Some(DecoderError::DynamicData(
            DynamicDataError::CircularReference { .. }
        ))
    ));

    // Decoding strictly rejects the data instead
    let strict = decoder.decode_strict(&node_type, &Pointer::word(ByteLocation::Memory, 0))?;
    assert_eq!(strict, None);

    Ok(())
}

#[test]
fn results_serialize_with_their_types() -> anyhow::Result<()> {
    let state = EvmState::new().push(common::word(42));
    let info = DecoderInfo::new();
    let decoder = common::decoder(&state, &info);

    let result = decoder.decode(&Type::uint256(), &Pointer::stack(0))?;
    let json = serde_json::to_value(&result)?;
    assert_eq!(json["kind"], "value");
    assert_eq!(json["type"]["typeClass"], "uint");
    assert_eq!(json["type"]["bits"], 256);
    assert_eq!(json["value"]["category"], "uint");
    assert_eq!(json["value"]["value"], "42");

    Ok(())
}
