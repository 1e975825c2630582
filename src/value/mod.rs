//! This module contains the result tree produced by the decoder.
//!
//! Every node of the tree is a [`DecodeResult`], which is either a successfully
//! decoded [`Value`] or the [`DecoderError`] that prevented decoding, and in
//! either case records the [`Type`] that was being decoded. Container values
//! hold child results that may themselves be errors: a struct may be decoded
//! successfully even though one of its fields was not. Child errors are never
//! promoted to errors of their parent.

pub mod display;

use serde::Serialize;

use crate::{
    error::decoder::DecoderError,
    info::AbiFunction,
    types::{ContractType, Mutability, Type},
    utility::Address,
};

/// The outcome of decoding a single node of the result tree.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DecodeResult<N> {
    /// The value was decoded successfully.
    Value {
        #[serde(rename = "type")]
        typ:   Type,
        value: Value<N>,
    },

    /// The value could not be decoded.
    Error {
        #[serde(rename = "type")]
        typ:   Type,
        error: DecoderError<N>,
    },
}

impl<N> DecodeResult<N> {
    /// Constructs a successful result for `typ`.
    #[must_use]
    pub fn value(typ: Type, value: Value<N>) -> Self {
        Self::Value { typ, value }
    }

    /// Constructs a failed result for `typ`.
    #[must_use]
    pub fn error(typ: Type, error: impl Into<DecoderError<N>>) -> Self {
        Self::Error {
            typ,
            error: error.into(),
        }
    }

    /// Gets the type that was being decoded.
    #[must_use]
    pub fn typ(&self) -> &Type {
        match self {
            Self::Value { typ, .. } | Self::Error { typ, .. } => typ,
        }
    }

    /// Checks if the result is a successfully decoded value.
    #[must_use]
    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value { .. })
    }

    /// Gets the decoded value, if decoding succeeded.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value<N>> {
        match self {
            Self::Value { value, .. } => Some(value),
            Self::Error { .. } => None,
        }
    }

    /// Gets the error, if decoding failed.
    #[must_use]
    pub fn as_error(&self) -> Option<&DecoderError<N>> {
        match self {
            Self::Value { .. } => None,
            Self::Error { error, .. } => Some(error),
        }
    }

    /// Takes the decoded value, if decoding succeeded.
    #[must_use]
    pub fn into_value(self) -> Option<Value<N>> {
        match self {
            Self::Value { value, .. } => Some(value),
            Self::Error { .. } => None,
        }
    }

    /// Checks whether this node or any node beneath it is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        match self {
            Self::Error { .. } => true,
            Self::Value { value, .. } => value.children().any(DecodeResult::has_errors),
        }
    }

    /// Gets the first error in the tree, searching depth first.
    #[must_use]
    pub fn first_error(&self) -> Option<&DecoderError<N>> {
        match self {
            Self::Error { error, .. } => Some(error),
            Self::Value { value, .. } => value.children().find_map(DecodeResult::first_error),
        }
    }
}

/// A successfully decoded value.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "category", content = "value", rename_all = "camelCase")]
pub enum Value<N> {
    Uint(N),

    Int(N),

    Bool(bool),

    /// A fixed-length byte array, as hex.
    Bytes(String),

    /// A dynamic byte array, as hex.
    DynBytes(String),

    Address(Address),

    String(StringValue),

    Fixed(FixedValue<N>),

    Ufixed(FixedValue<N>),

    Enum(EnumValue<N>),

    Contract(ContractValue),

    /// A user-defined value type, holding the result of decoding its
    /// underlying type.
    UserDefinedValueType(Box<DecodeResult<N>>),

    FunctionExternal(ExternalFunctionValue),

    FunctionInternal(InternalFunctionValue),

    Array(Vec<DecodeResult<N>>),

    /// The members of a struct in declaration order.
    Struct(Vec<NamedResult<N>>),

    Tuple(Vec<TupleEntry<N>>),

    /// The entries of a mapping for each of its known keys.
    Mapping(Vec<KeyValuePair<N>>),

    /// The members of a magic variable.
    Magic(Vec<NamedResult<N>>),

    /// All of the members of an enum, as for `type(E)`.
    TypeOfEnum(Vec<EnumValue<N>>),

    /// The members of the type of a contract, as for `type(C)`.
    TypeOfContract(Vec<NamedResult<N>>),
}

impl<N> Value<N> {
    /// Iterates over the child results held directly by this value.
    pub fn children(&self) -> Box<dyn Iterator<Item = &DecodeResult<N>> + '_> {
        match self {
            Self::UserDefinedValueType(inner) => Box::new(std::iter::once(inner.as_ref())),
            Self::Array(elements) => Box::new(elements.iter()),
            Self::Struct(members) | Self::Magic(members) | Self::TypeOfContract(members) => {
                Box::new(members.iter().map(|m| &m.value))
            }
            Self::Tuple(entries) => Box::new(entries.iter().map(|e| &e.value)),
            Self::Mapping(pairs) => Box::new(pairs.iter().map(|p| &p.value)),
            _ => Box::new(std::iter::empty()),
        }
    }

    /// Looks up the member called `name` of a struct or magic value.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&DecodeResult<N>> {
        match self {
            Self::Struct(members) | Self::Magic(members) | Self::TypeOfContract(members) => {
                members.iter().find(|m| m.name == name).map(|m| &m.value)
            }
            Self::Tuple(entries) => entries
                .iter()
                .find(|e| e.name.as_deref() == Some(name))
                .map(|e| &e.value),
            _ => None,
        }
    }
}

/// A UTF-8 string, which may not actually contain valid UTF-8.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StringValue {
    Valid { value: String },

    /// The raw bytes, as hex, of a string that is not valid UTF-8.
    Malformed { raw: String },
}

/// A fixed-point number, held as its integer representation and the number of
/// decimal places by which it is scaled.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct FixedValue<N> {
    pub raw:    N,
    pub places: u8,
}

/// A member of an enum.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct EnumValue<N> {
    /// The name of the member.
    pub name: String,

    /// The ordinal of the member.
    pub numeric: N,
}

/// A reference to a contract.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ContractValue {
    /// The contract at the address is known.
    Known {
        address: Address,
        class:   ContractType,
    },

    /// Nothing is known about the contract at the address.
    Unknown { address: Address },
}

impl ContractValue {
    /// Gets the address of the contract.
    #[must_use]
    pub fn address(&self) -> Address {
        match self {
            Self::Known { address, .. } | Self::Unknown { address } => *address,
        }
    }
}

/// An external function pointer, resolved as far as the known contracts allow.
///
/// The selector is always carried as hex, however the resolution turned out.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExternalFunctionValue {
    /// The contract is known and has a function with the selector.
    Known {
        contract: ContractValue,
        selector: String,
        abi:      AbiFunction,
    },

    /// The contract is known but has no function with the selector.
    Invalid {
        contract: ContractValue,
        selector: String,
    },

    /// Nothing is known about the contract at the address.
    Unknown {
        contract: ContractValue,
        selector: String,
    },
}

impl ExternalFunctionValue {
    /// Gets the selector as hex.
    #[must_use]
    pub fn selector(&self) -> &str {
        match self {
            Self::Known { selector, .. }
            | Self::Invalid { selector, .. }
            | Self::Unknown { selector, .. } => selector,
        }
    }
}

/// An internal function pointer, resolved as far as the executing context
/// allows.
///
/// Both program counters are always carried, as their pattern of zero and
/// non-zero values is meaningful.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum InternalFunctionValue {
    /// The pointer refers to a known function.
    #[serde(rename_all = "camelCase")]
    Function {
        context:                     ContractType,
        deployed_program_counter:    u32,
        constructor_program_counter: u32,
        name:                        String,
        id:                          String,
        defined_in:                  Option<ContractType>,
        mutability:                  Option<Mutability>,
    },

    /// The pointer is the compiler's default, which reverts when called.
    #[serde(rename_all = "camelCase")]
    Exception {
        context:                     ContractType,
        deployed_program_counter:    u32,
        constructor_program_counter: u32,
    },

    /// There is not enough information about the executing code to resolve
    /// the pointer.
    #[serde(rename_all = "camelCase")]
    Unknown {
        context:                     Option<ContractType>,
        deployed_program_counter:    u32,
        constructor_program_counter: u32,
    },
}

impl InternalFunctionValue {
    /// Gets the pair of deployed and constructor program counters.
    #[must_use]
    pub fn program_counters(&self) -> (u32, u32) {
        match self {
            Self::Function {
                deployed_program_counter,
                constructor_program_counter,
                ..
            }
            | Self::Exception {
                deployed_program_counter,
                constructor_program_counter,
                ..
            }
            | Self::Unknown {
                deployed_program_counter,
                constructor_program_counter,
                ..
            } => (*deployed_program_counter, *constructor_program_counter),
        }
    }
}

/// A named member of a struct or magic variable.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct NamedResult<N> {
    pub name:  String,
    pub value: DecodeResult<N>,
}

impl<N> NamedResult<N> {
    /// Constructs the member `name` with the given `value`.
    pub fn new(name: impl Into<String>, value: DecodeResult<N>) -> Self {
        let name = name.into();
        Self { name, value }
    }
}

/// A possibly-named member of a tuple.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TupleEntry<N> {
    pub name:  Option<String>,
    pub value: DecodeResult<N>,
}

/// An entry of a mapping.
///
/// The key is always a successfully decoded value; only the value stored under
/// it may fail to decode.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct KeyValuePair<N> {
    pub key:   Value<N>,
    pub value: DecodeResult<N>,
}
