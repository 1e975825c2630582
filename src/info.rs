//! This module contains the static metadata that the decoder consults while
//! decoding.
//!
//! All of it is produced upstream from compiled contract artifacts and is only
//! ever borrowed immutably by the decoder, so a single [`DecoderInfo`] can be
//! shared between any number of concurrent decodes.

use std::collections::HashMap;

use ethnum::{I256, U256};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    constant::SELECTOR_SIZE_BYTES,
    types::{ContractType, Mutability, TypeId, UserDefinedType},
    utility::{keccak256, pad_left, pad_right, Address, Word, U256W},
};

/// The bundle of static definitions available to a decode.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoderInfo {
    /// The definitions of the user-defined types that may be encountered.
    pub user_defined_types: HashMap<TypeId, UserDefinedType>,

    /// The contract whose code is executing, if known.
    pub current_context: Option<Context>,

    /// The contracts deployed at known addresses.
    pub contracts: HashMap<Address, KnownContract>,

    /// The keys that have been observed for mappings in storage.
    pub mapping_keys: Vec<MappingKey>,
}

impl DecoderInfo {
    /// Constructs an empty bundle of definitions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the `definition` of a user-defined type.
    #[must_use]
    pub fn with_type(mut self, definition: UserDefinedType) -> Self {
        self.user_defined_types
            .insert(definition.definition().id.clone(), definition);
        self
    }

    /// Sets the executing contract to `context`.
    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.current_context = Some(context);
        self
    }

    /// Registers `contract` as deployed at `address`.
    #[must_use]
    pub fn with_contract(mut self, address: Address, contract: KnownContract) -> Self {
        self.contracts.insert(address, contract);
        self
    }

    /// Registers `key` as a key of the mapping whose base slot is at `slot`.
    #[must_use]
    pub fn with_mapping_key(mut self, slot: impl Into<U256W>, key: KeyValue) -> Self {
        self.mapping_keys.push(MappingKey {
            slot: slot.into(),
            key,
        });
        self
    }

    /// Looks up the definition of the user-defined type with the given `id`.
    #[must_use]
    pub fn user_defined_type(&self, id: &TypeId) -> Option<&UserDefinedType> {
        self.user_defined_types.get(id)
    }

    /// Looks up the contract deployed at `address`.
    #[must_use]
    pub fn contract_at(&self, address: &Address) -> Option<&KnownContract> {
        self.contracts.get(address)
    }

    /// Gets the known keys, in the order they were registered, of the mapping
    /// whose base slot is at `slot`.
    pub fn keys_for(&self, slot: U256) -> impl Iterator<Item = &KeyValue> + '_ {
        self.mapping_keys
            .iter()
            .filter(move |k| k.slot.0 == slot)
            .map(|k| &k.key)
            .unique()
    }
}

/// The contract whose code is executing.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    /// The type of the executing contract.
    pub contract: ContractType,

    /// Whether the executing code is the contract's constructor rather than
    /// its deployed code.
    pub is_constructor: bool,

    /// The entry points of the internal functions in the executing code,
    /// keyed by program counter.
    ///
    /// This is [`None`] when the jump destinations are not known at all, which
    /// is different from a table that lacks a particular entry.
    pub internal_functions: Option<HashMap<u32, InternalFunctionEntry>>,
}

impl Context {
    /// Constructs the context for the deployed code of `contract` with no
    /// knowledge of its internal functions.
    #[must_use]
    pub fn new(contract: ContractType) -> Self {
        Self {
            contract,
            is_constructor: false,
            internal_functions: None,
        }
    }

    /// Marks the context as executing the constructor.
    #[must_use]
    pub fn in_constructor(mut self) -> Self {
        self.is_constructor = true;
        self
    }

    /// Adds an internal function entry point at `program_counter`.
    #[must_use]
    pub fn with_internal_function(
        mut self,
        program_counter: u32,
        entry: InternalFunctionEntry,
    ) -> Self {
        self.internal_functions
            .get_or_insert_with(HashMap::new)
            .insert(program_counter, entry);
        self
    }
}

/// An internal function entry point.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalFunctionEntry {
    /// The name of the function.
    pub name: String,

    /// The contract in which the function is defined, or [`None`] for a free
    /// function.
    pub defined_in: Option<ContractType>,

    /// The identifier of the function's definition.
    pub id: String,

    /// The state mutability of the function, if known.
    pub mutability: Option<Mutability>,

    /// Whether this is the function that the compiler jumps to when an
    /// uninitialised function pointer is called.
    pub is_designated_invalid: bool,
}

impl InternalFunctionEntry {
    /// Constructs the entry for function `name`, identified by `id` and
    /// defined in `defined_in`.
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        defined_in: Option<ContractType>,
    ) -> Self {
        Self {
            name: name.into(),
            defined_in,
            id: id.into(),
            mutability: None,
            is_designated_invalid: false,
        }
    }

    /// Constructs the entry for the compiler's designated invalid function.
    #[must_use]
    pub fn designated_invalid() -> Self {
        Self {
            name:                  String::new(),
            defined_in:            None,
            id:                    String::new(),
            mutability:            None,
            is_designated_invalid: true,
        }
    }
}

/// A contract deployed at a known address, along with its external interface.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownContract {
    /// The type of the contract.
    pub contract: ContractType,

    /// The external functions of the contract.
    pub functions: Vec<AbiFunction>,
}

impl KnownContract {
    /// Constructs a known `contract` with the given external `functions`.
    #[must_use]
    pub fn new(contract: ContractType, functions: Vec<AbiFunction>) -> Self {
        Self {
            contract,
            functions,
        }
    }

    /// Constructs a known `contract` from its JSON ABI.
    ///
    /// Entries other than functions are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `abi` is not a valid JSON ABI.
    pub fn from_abi_json(contract: ContractType, abi: &str) -> serde_json::Result<Self> {
        let entries: Vec<AbiEntry> = serde_json::from_str(abi)?;
        let functions = entries
            .into_iter()
            .filter_map(|e| match e {
                AbiEntry::Function(function) => Some(function),
                AbiEntry::Other => None,
            })
            .collect();
        Ok(Self::new(contract, functions))
    }

    /// Finds the external function with the given `selector`.
    #[must_use]
    pub fn function_with_selector(&self, selector: &[u8]) -> Option<&AbiFunction> {
        self.functions.iter().find(|f| f.selector() == selector)
    }
}

/// The entries of a JSON ABI that the decoder cares about.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum AbiEntry {
    Function(AbiFunction),

    #[serde(other)]
    Other,
}

/// An external function as described by the JSON ABI.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiFunction {
    pub name: String,

    #[serde(default)]
    pub inputs: Vec<AbiParameter>,

    #[serde(default)]
    pub outputs: Vec<AbiParameter>,

    pub state_mutability: Option<Mutability>,
}

impl AbiFunction {
    /// Constructs the function `name` taking the given `inputs`.
    pub fn new(name: impl Into<String>, inputs: Vec<AbiParameter>) -> Self {
        Self {
            name: name.into(),
            inputs,
            outputs: vec![],
            state_mutability: None,
        }
    }

    /// Gets the canonical signature of the function, as in `f(uint256,bool)`.
    #[must_use]
    pub fn signature(&self) -> String {
        let inputs = self.inputs.iter().map(AbiParameter::canonical_type).join(",");
        format!("{}({inputs})", self.name)
    }

    /// Gets the four-byte selector of the function.
    #[must_use]
    pub fn selector(&self) -> [u8; SELECTOR_SIZE_BYTES] {
        let hash = keccak256(self.signature());
        let mut selector = [0u8; SELECTOR_SIZE_BYTES];
        selector.copy_from_slice(&hash[..SELECTOR_SIZE_BYTES]);
        selector
    }
}

/// A parameter of a function as described by the JSON ABI.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct AbiParameter {
    #[serde(default)]
    pub name: String,

    /// The ABI type name, such as `uint256` or `tuple[]`.
    #[serde(rename = "type")]
    pub typ: String,

    /// The members of the tuple, if `typ` is a tuple type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<AbiParameter>>,
}

impl AbiParameter {
    /// Constructs the parameter `name` of type `typ`.
    pub fn new(name: impl Into<String>, typ: impl Into<String>) -> Self {
        Self {
            name:       name.into(),
            typ:        typ.into(),
            components: None,
        }
    }

    /// Gets the canonical type of the parameter, expanding tuples into their
    /// members.
    #[must_use]
    pub fn canonical_type(&self) -> String {
        match (&self.components, self.typ.strip_prefix("tuple")) {
            (Some(components), Some(suffix)) => {
                let members = components.iter().map(Self::canonical_type).join(",");
                format!("({members}){suffix}")
            }
            _ => self.typ.clone(),
        }
    }
}

/// A key observed for a mapping in storage.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingKey {
    /// The base slot of the mapping.
    pub slot: U256W,

    /// The key.
    pub key: KeyValue,
}

/// The value of a mapping key, prior to being decoded against the mapping's
/// key type.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum KeyValue {
    /// An unsigned integer, also used for enums.
    Uint(U256W),

    /// A signed integer, given as its two's complement bit pattern.
    Int(U256W),

    Bool(bool),

    /// An address, also used for contracts.
    Address(Address),

    /// The contents of a fixed-length byte array.
    Bytes(Vec<u8>),

    /// The contents of a dynamic byte array.
    DynBytes(Vec<u8>),

    String(String),
}

impl KeyValue {
    /// Constructs a signed integer key.
    #[must_use]
    pub fn int(value: I256) -> Self {
        Self::Int(U256::from_ne_bytes(value.to_ne_bytes()).into())
    }

    /// Checks whether the key is of a dynamically-sized type, and so is hashed
    /// without padding.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::DynBytes(_) | Self::String(_))
    }

    /// Gets the key as a word, padded as it would be on the stack, for keys of
    /// value types.
    #[must_use]
    pub fn to_word(&self) -> Option<Word> {
        let word = match self {
            Self::Uint(value) | Self::Int(value) => value.0.to_be_bytes(),
            Self::Bool(value) => pad_left(&[u8::from(*value)]),
            Self::Address(address) => address.to_word(),
            Self::Bytes(bytes) => pad_right(bytes),
            Self::DynBytes(_) | Self::String(_) => return None,
        };
        Some(word)
    }

    /// Gets the bytes that are hashed with the mapping's slot to locate the
    /// value stored under this key.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::DynBytes(bytes) => bytes.clone(),
            Self::String(string) => string.as_bytes().to_vec(),
            other => other.to_word().map(|w| w.to_vec()).unwrap_or_default(),
        }
    }
}
