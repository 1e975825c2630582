//! This module is an integration test that checks the resolution of external
//! and internal function pointers against the known contracts and the
//! executing code.
#![cfg(test)]

use evm_value_decoder::{
    error::decoder::{DecoderError, FunctionExternalError, FunctionInternalError},
    info::{AbiFunction, AbiParameter, Context, DecoderInfo, InternalFunctionEntry, KnownContract},
    numeric::BigNum,
    pointer::{ByteLocation, Pointer},
    state::EvmState,
    types::Type,
    utility::{pad_left, pad_right, Address},
    value::{ExternalFunctionValue, InternalFunctionValue, Value},
    DecodeResult,
};

mod common;

fn token_address() -> Address {
    Address([0x11; 20])
}

fn known_token() -> KnownContract {
    let transfer = AbiFunction::new(
        "transfer",
        vec![
            AbiParameter::new("to", "address"),
            AbiParameter::new("amount", "uint256"),
        ],
    );
    KnownContract::new(common::token_contract(), vec![transfer])
}

/// Packs an external function pointer as it appears outside of the stack.
fn external_word(address: Address, selector: [u8; 4]) -> [u8; 32] {
    let mut packed = address.0.to_vec();
    packed.extend_from_slice(&selector);
    pad_right(&packed)
}

/// Packs an internal function pointer from its pair of program counters.
fn internal_word(deployed: u32, constructor: u32) -> [u8; 32] {
    let mut packed = constructor.to_be_bytes().to_vec();
    packed.extend_from_slice(&deployed.to_be_bytes());
    pad_left(&packed)
}

fn external_function(
    word: [u8; 32],
    info: &DecoderInfo,
) -> anyhow::Result<DecodeResult<BigNum>> {
    let state = EvmState::new().with_bytes(ByteLocation::Memory, word.to_vec());
    let decoder = common::decoder(&state, info);
    Ok(decoder.decode(
        &Type::external_function(),
        &Pointer::word(ByteLocation::Memory, 0),
    )?)
}

#[test]
fn resolves_external_functions_on_known_contracts() -> anyhow::Result<()> {
    let info = DecoderInfo::new().with_contract(token_address(), known_token());

    // The selector of `transfer(address,uint256)`
    let word = external_word(token_address(), [0xa9, 0x05, 0x9c, 0xbb]);
    let known = external_function(word, &info)?;
    let Some(Value::FunctionExternal(ExternalFunctionValue::Known { abi, selector, .. })) =
        known.as_value()
    else {
        anyhow::bail!("Expected a known function, got {known:?}")
    };
    assert_eq!(abi.name, "transfer");
    assert_eq!(selector, "0xa9059cbb");

    let invalid = external_function(external_word(token_address(), [1, 2, 3, 4]), &info)?;
    assert!(matches!(
        invalid.as_value(),
        Some(Value::FunctionExternal(ExternalFunctionValue::Invalid { .. }))
    ));

    Ok(())
}

#[test]
fn unknown_addresses_give_unknown_functions() -> anyhow::Result<()> {
    let info = DecoderInfo::new();
    let result = external_function(external_word(Address([0x22; 20]), [1, 2, 3, 4]), &info)?;

    let Some(Value::FunctionExternal(function)) = result.as_value() else {
        anyhow::bail!("Expected an external function, got {result:?}")
    };
    assert!(matches!(function, ExternalFunctionValue::Unknown { .. }));
    assert_eq!(function.selector(), "0x01020304");

    Ok(())
}

#[test]
fn external_functions_must_be_right_padded() -> anyhow::Result<()> {
    let mut word = external_word(token_address(), [1, 2, 3, 4]);
    word[31] = 0xff;
    let result = external_function(word, &DecoderInfo::new())?;

    assert!(matches!(
        result.as_error(),
        Some(DecoderError::FunctionExternal(
            FunctionExternalError::NonStackPadding(_)
        ))
    ));

    Ok(())
}

#[test]
fn external_functions_on_the_stack_take_two_words() -> anyhow::Result<()> {
    let info = DecoderInfo::new().with_contract(token_address(), known_token());
    let address = token_address().to_word();
    let selector = pad_left(&[0xa9, 0x05, 0x9c, 0xbb]);
    let state = EvmState::new().push(address).push(selector);
    let decoder = common::decoder(&state, &info);

    let pointer = Pointer::Stack { from: 0, to: 1 };
    let result = decoder.decode(&Type::external_function(), &pointer)?;
    assert!(matches!(
        result.as_value(),
        Some(Value::FunctionExternal(ExternalFunctionValue::Known { .. }))
    ));

    // Unlike other stack values, the padding of both words is checked
    let dirty = pad_right(&[0xa9, 0x05, 0x9c, 0xbb]);
    let state = EvmState::new().push(address).push(dirty);
    let decoder = common::decoder(&state, &info);
    let result = decoder.decode(&Type::external_function(), &pointer)?;
    assert!(matches!(
        result.as_error(),
        Some(DecoderError::FunctionExternal(
            FunctionExternalError::StackPadding { .. }
        ))
    ));

    Ok(())
}

/// Decodes the internal function pointer with the given program counters in
/// `context`.
fn internal_function(
    deployed: u32,
    constructor: u32,
    context: Option<Context>,
) -> anyhow::Result<DecodeResult<BigNum>> {
    let mut info = DecoderInfo::new();
    if let Some(context) = context {
        info = info.with_context(context);
    }
    let state = EvmState::new().push(internal_word(deployed, constructor));
    let decoder = common::decoder(&state, &info);
    Ok(decoder.decode(&Type::internal_function(), &Pointer::stack(0))?)
}

fn deployed_context() -> Context {
    Context::new(common::token_contract())
        .with_internal_function(
            10,
            InternalFunctionEntry::new("_mint", "501", Some(common::token_contract())),
        )
        .with_internal_function(20, InternalFunctionEntry::designated_invalid())
}

#[test]
fn internal_functions_without_a_table_are_unknown() -> anyhow::Result<()> {
    let result = internal_function(10, 0, None)?;
    assert!(matches!(
        result.as_value(),
        Some(Value::FunctionInternal(InternalFunctionValue::Unknown {
            context: None,
            ..
        }))
    ));

    let no_table = Context::new(common::token_contract());
    let result = internal_function(10, 0, Some(no_table))?;
    let Some(Value::FunctionInternal(function)) = result.as_value() else {
        anyhow::bail!("Expected an internal function, got {result:?}")
    };
    assert!(matches!(function, InternalFunctionValue::Unknown { context: Some(_), .. }));
    assert_eq!(function.program_counters(), (10, 0));

    Ok(())
}

#[test]
fn zero_pointers_are_the_default_exception() -> anyhow::Result<()> {
    let result = internal_function(0, 0, Some(deployed_context()))?;
    assert!(matches!(
        result.as_value(),
        Some(Value::FunctionInternal(InternalFunctionValue::Exception { .. }))
    ));

    // So are pointers to the designated invalid function
    let result = internal_function(20, 0, Some(deployed_context()))?;
    assert!(matches!(
        result.as_value(),
        Some(Value::FunctionInternal(InternalFunctionValue::Exception { .. }))
    ));

    Ok(())
}

#[test]
fn resolves_internal_functions_from_the_table() -> anyhow::Result<()> {
    let result = internal_function(10, 0, Some(deployed_context()))?;
    let Some(Value::FunctionInternal(InternalFunctionValue::Function { name, .. })) =
        result.as_value()
    else {
        anyhow::bail!("Expected a resolved function, got {result:?}")
    };
    assert_eq!(name, "_mint");
    assert_eq!(result.to_string(), "Token._mint");

    Ok(())
}

#[test]
fn unresolvable_pointers_have_exactly_one_fault() -> anyhow::Result<()> {
    let classify = |deployed, constructor, context| -> anyhow::Result<FunctionInternalError> {
        match internal_function(deployed, constructor, Some(context))?.as_error() {
            Some(DecoderError::FunctionInternal(error)) => Ok(error.clone()),
            other => anyhow::bail!("Expected an internal function error, got {other:?}"),
        }
    };

    // A constructor counter without a deployed one is never produced
    assert!(matches!(
        classify(0, 5, deployed_context())?,
        FunctionInternalError::MalformedInternalFunction {
            constructor_program_counter: 5,
            ..
        }
    ));

    // A deployed-only pointer seen while constructing
    assert!(matches!(
        classify(10, 0, deployed_context().in_constructor())?,
        FunctionInternalError::DeployedFunctionInConstructor {
            deployed_program_counter: 10,
            ..
        }
    ));

    // A well-formed pointer to nothing in the table
    assert!(matches!(
        classify(99, 0, deployed_context())?,
        FunctionInternalError::NoSuchInternalFunction {
            deployed_program_counter: 99,
            ..
        }
    ));

    // The classification is deterministic
    assert_eq!(
        classify(99, 0, deployed_context())?,
        classify(99, 0, deployed_context())?
    );

    Ok(())
}

#[test]
fn constructors_resolve_by_their_own_program_counter() -> anyhow::Result<()> {
    let context = Context::new(common::token_contract())
        .in_constructor()
        .with_internal_function(
            7,
            InternalFunctionEntry::new("_init", "502", Some(common::token_contract())),
        );

    let result = internal_function(10, 7, Some(context))?;
    assert_eq!(result.to_string(), "Token._init");

    Ok(())
}
