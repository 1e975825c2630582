//! This module contains the descriptors for the static types that the decoder
//! is capable of decoding.
//!
//! Descriptors are pure data. They are produced upstream from the type
//! information in compiled contract artifacts, and are only ever read by the
//! decoder. User-defined types (structs, enums and user-defined value types)
//! are referenced by [`TypeId`], and their full definitions are looked up in
//! the [`crate::info::DecoderInfo`] at decode time.

use std::fmt::{Display, Formatter};

use ethnum::U256;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::utility::U256W;

/// The identifier of a user-defined type, unique across all compilations
/// known to the decoder.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct TypeId(pub String);

impl TypeId {
    /// Constructs a new type identifier from `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl Display for TypeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The data location annotated on a reference type.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    /// Persistent contract storage.
    Storage,

    /// Transient memory.
    Memory,

    /// The call's input data.
    Calldata,
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Storage => "storage",
            Self::Memory => "memory",
            Self::Calldata => "calldata",
        };
        write!(f, "{name}")
    }
}

/// The state mutability of a function.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mutability {
    Pure,
    View,
    NonPayable,
    Payable,
}

/// Whether a function pointer refers to a function on another contract or to
/// code within the current one.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// An address and selector pair.
    External,

    /// A pair of program counters into the current contract's code.
    Internal,
}

/// The kind of a contract-like definition.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    #[default]
    Contract,
    Interface,
    Library,
}

/// The debugger-only variables that bundle environment information.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum MagicVariable {
    /// `msg`, describing the current call.
    #[serde(rename = "msg")]
    Message,

    /// `block`, describing the current block.
    #[serde(rename = "block")]
    Block,

    /// `tx`, describing the current transaction.
    #[serde(rename = "tx")]
    Transaction,
}

impl Display for MagicVariable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Message => "msg",
            Self::Block => "block",
            Self::Transaction => "tx",
        };
        write!(f, "{name}")
    }
}

/// A reference to a user-defined type by its identifier, along with the names
/// needed to display it without having its full definition.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionRef {
    /// The identifier under which the full definition can be found.
    pub id: TypeId,

    /// The name of the type.
    pub name: String,

    /// The name of the contract in which the type is defined, if it is not
    /// defined at file level.
    pub defining_contract: Option<String>,
}

impl DefinitionRef {
    /// Constructs a reference to the type `name` with the given `id`.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id:                TypeId::new(id),
            name:              name.into(),
            defining_contract: None,
        }
    }

    /// Sets the contract in which the type is defined.
    #[must_use]
    pub fn in_contract(mut self, contract: impl Into<String>) -> Self {
        self.defining_contract = Some(contract.into());
        self
    }

    /// Gets the fully-qualified name of the type.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match &self.defining_contract {
            Some(contract) => format!("{contract}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// The type of a contract.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractType {
    /// The identifier of the contract definition.
    pub id: TypeId,

    /// The name of the contract.
    pub name: String,

    /// Whether this is a contract, interface or library.
    pub kind: ContractKind,

    /// Whether the contract can receive ether via a plain transfer.
    pub payable: bool,
}

impl ContractType {
    /// Constructs a new non-payable contract type.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id:      TypeId::new(id),
            name:    name.into(),
            kind:    ContractKind::Contract,
            payable: false,
        }
    }
}

/// A named member of a struct.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Member {
    /// The name of the member.
    pub name: String,

    /// The type of the member.
    #[serde(rename = "type")]
    pub typ: Type,
}

impl Member {
    /// Constructs a member called `name` of type `typ`.
    pub fn new(name: impl Into<String>, typ: Type) -> Self {
        let name = name.into();
        Self { name, typ }
    }
}

/// A member of a tuple, which may or may not have a name.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct TupleMember {
    /// The name of the member, if any.
    pub name: Option<String>,

    /// The type of the member.
    #[serde(rename = "type")]
    pub typ: Type,
}

/// Type descriptors for the static types of contract data.
///
/// # Invariants
///
/// Each individual variant in the enum describes the invariants placed upon it.
/// It is the responsibility of the code constructing these values to ensure
/// that the invariants are satisfied. Code utilising them will assume that the
/// data has been correctly constructed.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(tag = "typeClass", rename_all = "camelCase")]
pub enum Type {
    /// Unsigned integers of a given `bits` width, where `8 <= bits <= 256 &&
    /// bits % 8 == 0`.
    Uint { bits: u16 },

    /// Signed (two's complement) integers of a given `bits` width, where `8 <=
    /// bits <= 256 && bits % 8 == 0`.
    Int { bits: u16 },

    /// Booleans.
    Bool,

    /// Byte arrays of a fixed `length`, where `0 < length <= 32`.
    Bytes { length: u8 },

    /// A dynamically-sized byte array.
    DynBytes { location: Option<Location> },

    /// Addresses, equivalent to `Uint { bits: 160 }` except for
    /// interpretation.
    Address { payable: bool },

    /// A dynamically-sized UTF-8 string.
    String { location: Option<Location> },

    /// Signed fixed-point numbers of `bits` width with `places` decimal places.
    Fixed { bits: u16, places: u8 },

    /// Unsigned fixed-point numbers of `bits` width with `places` decimal
    /// places.
    Ufixed { bits: u16, places: u8 },

    /// An enumeration, whose members are found in its definition.
    Enum { definition: DefinitionRef },

    /// A reference to a contract, represented as its address.
    Contract { contract: ContractType },

    /// A user-defined value type, whose underlying elementary type is found in
    /// its definition.
    UserDefinedValueType { definition: DefinitionRef },

    /// A struct, whose members are found in its definition.
    Struct {
        definition: DefinitionRef,
        location:   Option<Location>,
    },

    /// A fixed-`length` array containing elements of the type `base`.
    Array {
        base:     Box<Type>,
        length:   U256W,
        location: Option<Location>,
    },

    /// A dynamically-sized array containing elements of the type `base`.
    DynArray {
        base:     Box<Type>,
        location: Option<Location>,
    },

    /// A mapping from `key` to `value`. Mappings only ever live in storage.
    Mapping { key: Box<Type>, value: Box<Type> },

    /// A tuple, such as a function's parameter or return list.
    Tuple { members: Vec<TupleMember> },

    /// A function pointer.
    Function {
        visibility: Visibility,
        mutability: Mutability,
        inputs:     Vec<Type>,
        outputs:    Vec<Type>,
    },

    /// One of the debugger-only magic variables.
    Magic { variable: MagicVariable },

    /// The type of a contract, as in `type(C)`.
    TypeOfContract { contract: ContractType },

    /// The type of an enum, as in `type(E)`.
    TypeOfEnum { definition: DefinitionRef },
}

/// Convenience constructors.
impl Type {
    /// Constructs `uint256`.
    #[must_use]
    pub fn uint256() -> Self {
        Self::Uint { bits: 256 }
    }

    /// Constructs a non-payable `address`.
    #[must_use]
    pub fn address() -> Self {
        Self::Address { payable: false }
    }

    /// Constructs a `string` in the provided `location`.
    #[must_use]
    pub fn string(location: Location) -> Self {
        Self::String {
            location: Some(location),
        }
    }

    /// Constructs a dynamic `bytes` in the provided `location`.
    #[must_use]
    pub fn dyn_bytes(location: Location) -> Self {
        Self::DynBytes {
            location: Some(location),
        }
    }

    /// Constructs a dynamic array of `base` in the provided `location`.
    #[must_use]
    pub fn dyn_array(base: Type, location: Location) -> Self {
        Self::DynArray {
            base:     Box::new(base),
            location: Some(location),
        }
    }

    /// Constructs a static array of `length` elements of `base` in the provided
    /// `location`.
    #[must_use]
    pub fn array(base: Type, length: impl Into<U256W>, location: Location) -> Self {
        Self::Array {
            base:     Box::new(base),
            length:   length.into(),
            location: Some(location),
        }
    }

    /// Constructs a struct referring to `definition` in the provided
    /// `location`.
    #[must_use]
    pub fn structure(definition: DefinitionRef, location: Location) -> Self {
        Self::Struct {
            definition,
            location: Some(location),
        }
    }

    /// Constructs a mapping from `key` to `value`.
    #[must_use]
    pub fn mapping(key: Type, value: Type) -> Self {
        Self::Mapping {
            key:   Box::new(key),
            value: Box::new(value),
        }
    }

    /// Constructs an external function pointer taking no arguments.
    #[must_use]
    pub fn external_function() -> Self {
        Self::Function {
            visibility: Visibility::External,
            mutability: Mutability::NonPayable,
            inputs:     vec![],
            outputs:    vec![],
        }
    }

    /// Constructs an internal function pointer taking no arguments.
    #[must_use]
    pub fn internal_function() -> Self {
        Self::Function {
            visibility: Visibility::Internal,
            mutability: Mutability::NonPayable,
            inputs:     vec![],
            outputs:    vec![],
        }
    }
}

/// Queries on types.
impl Type {
    /// Checks if the type is a reference type, namely one whose value is
    /// accessed through a pointer rather than held directly.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Self::DynBytes { .. }
                | Self::String { .. }
                | Self::Struct { .. }
                | Self::Array { .. }
                | Self::DynArray { .. }
                | Self::Mapping { .. }
        )
    }

    /// Checks if the type is an elementary type, and hence cannot contain other
    /// values.
    #[must_use]
    pub fn is_elementary(&self) -> bool {
        matches!(
            self,
            Self::Uint { .. }
                | Self::Int { .. }
                | Self::Bool
                | Self::Bytes { .. }
                | Self::DynBytes { .. }
                | Self::Address { .. }
                | Self::String { .. }
                | Self::Fixed { .. }
                | Self::Ufixed { .. }
                | Self::Enum { .. }
                | Self::Contract { .. }
                | Self::UserDefinedValueType { .. }
        )
    }

    /// Gets the data location of the type, if it has one.
    #[must_use]
    pub fn location(&self) -> Option<Location> {
        match self {
            Self::DynBytes { location }
            | Self::String { location }
            | Self::Struct { location, .. }
            | Self::Array { location, .. }
            | Self::DynArray { location, .. } => *location,
            Self::Mapping { .. } => Some(Location::Storage),
            _ => None,
        }
    }

    /// Gets a copy of the type relocated to `location`, including any element
    /// types nested in arrays.
    ///
    /// Types without a location are returned unchanged.
    #[must_use]
    pub fn at(&self, location: Location) -> Self {
        match self {
            Self::DynBytes { .. } => Self::DynBytes {
                location: Some(location),
            },
            Self::String { .. } => Self::String {
                location: Some(location),
            },
            Self::Struct { definition, .. } => Self::Struct {
                definition: definition.clone(),
                location:   Some(location),
            },
            Self::Array { base, length, .. } => Self::Array {
                base:     Box::new(base.at(location)),
                length:   *length,
                location: Some(location),
            },
            Self::DynArray { base, .. } => Self::DynArray {
                base:     Box::new(base.at(location)),
                location: Some(location),
            },
            other => other.clone(),
        }
    }

    /// Gets the static length of the type if it is a fixed-length array.
    #[must_use]
    pub fn static_length(&self) -> Option<U256> {
        match self {
            Self::Array { length, .. } => Some(length.0),
            _ => None,
        }
    }
}

/// Displays the type using source-level syntax.
impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let location = |location: &Option<Location>| match location {
            Some(location) => format!(" {location}"),
            None => String::new(),
        };
        match self {
            Self::Uint { bits } => write!(f, "uint{bits}"),
            Self::Int { bits } => write!(f, "int{bits}"),
            Self::Bool => write!(f, "bool"),
            Self::Bytes { length } => write!(f, "bytes{length}"),
            Self::DynBytes { location: loc } => write!(f, "bytes{}", location(loc)),
            Self::Address { payable } => {
                if *payable {
                    write!(f, "address payable")
                } else {
                    write!(f, "address")
                }
            }
            Self::String { location: loc } => write!(f, "string{}", location(loc)),
            Self::Fixed { bits, places } => write!(f, "fixed{bits}x{places}"),
            Self::Ufixed { bits, places } => write!(f, "ufixed{bits}x{places}"),
            Self::Enum { definition } => write!(f, "enum {}", definition.qualified_name()),
            Self::Contract { contract } => write!(f, "contract {}", contract.name),
            Self::UserDefinedValueType { definition } => {
                write!(f, "{}", definition.qualified_name())
            }
            Self::Struct {
                definition,
                location: loc,
            } => write!(f, "struct {}{}", definition.qualified_name(), location(loc)),
            Self::Array {
                base,
                length,
                location: loc,
            } => write!(f, "{}[{}]{}", base.at_rest(), length, location(loc)),
            Self::DynArray {
                base,
                location: loc,
            } => write!(f, "{}[]{}", base.at_rest(), location(loc)),
            Self::Mapping { key, value } => write!(f, "mapping({key} => {value})"),
            Self::Tuple { members } => {
                let members = members.iter().map(|m| m.typ.to_string()).join(",");
                write!(f, "tuple({members})")
            }
            Self::Function {
                visibility,
                inputs,
                outputs,
                ..
            } => {
                let inputs = inputs.iter().join(",");
                let outputs = outputs.iter().join(",");
                let visibility = match visibility {
                    Visibility::External => "external",
                    Visibility::Internal => "internal",
                };
                if outputs.is_empty() {
                    write!(f, "function({inputs}) {visibility}")
                } else {
                    write!(f, "function({inputs}) {visibility} returns ({outputs})")
                }
            }
            Self::Magic { variable } => write!(f, "{variable}"),
            Self::TypeOfContract { contract } => write!(f, "type(contract {})", contract.name),
            Self::TypeOfEnum { definition } => {
                write!(f, "type(enum {})", definition.qualified_name())
            }
        }
    }
}

impl Type {
    /// Gets the type with any location annotation stripped, for display of
    /// element types.
    fn at_rest(&self) -> Self {
        match self {
            Self::DynBytes { .. } => Self::DynBytes { location: None },
            Self::String { .. } => Self::String { location: None },
            Self::Struct { definition, .. } => Self::Struct {
                definition: definition.clone(),
                location:   None,
            },
            Self::Array { base, length, .. } => Self::Array {
                base:     base.clone(),
                length:   *length,
                location: None,
            },
            Self::DynArray { base, .. } => Self::DynArray {
                base:     base.clone(),
                location: None,
            },
            other => other.clone(),
        }
    }
}

/// The full definitions of user-defined types, as stored in the
/// [`crate::info::DecoderInfo`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "typeClass", rename_all = "camelCase")]
pub enum UserDefinedType {
    /// A struct with its members in declaration order.
    Struct {
        definition: DefinitionRef,
        members:    Vec<Member>,
    },

    /// An enum with its member names in declaration order.
    Enum {
        definition: DefinitionRef,
        options:    Vec<String>,
    },

    /// A user-defined value type wrapping the elementary type `underlying`.
    UserDefinedValueType {
        definition: DefinitionRef,
        underlying: Type,
    },
}

impl UserDefinedType {
    /// Gets the reference to this definition.
    #[must_use]
    pub fn definition(&self) -> &DefinitionRef {
        match self {
            Self::Struct { definition, .. }
            | Self::Enum { definition, .. }
            | Self::UserDefinedValueType { definition, .. } => definition,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::types::{DefinitionRef, Location, Type};

    #[test]
    fn displays_nested_types() {
        let typ = Type::mapping(
            Type::address(),
            Type::dyn_array(Type::Uint { bits: 64 }, Location::Storage),
        );
        assert_eq!(typ.to_string(), "mapping(address => uint64[] storage)");
    }

    #[test]
    fn relocates_nested_element_types() {
        let typ = Type::dyn_array(Type::string(Location::Storage), Location::Storage);
        let relocated = typ.at(Location::Memory);
        assert_eq!(
            relocated,
            Type::dyn_array(Type::string(Location::Memory), Location::Memory)
        );
    }

    #[test]
    fn classifies_reference_types() {
        let def = DefinitionRef::new("1", "S");
        assert!(Type::structure(def, Location::Memory).is_reference());
        assert!(Type::mapping(Type::Bool, Type::Bool).is_reference());
        assert!(!Type::Bytes { length: 4 }.is_reference());
        assert!(!Type::Tuple { members: vec![] }.is_reference());
    }

    #[test]
    fn round_trips_through_json() -> anyhow::Result<()> {
        let typ = Type::array(Type::Int { bits: 8 }, 3usize, Location::Calldata);
        let json = serde_json::to_string(&typ)?;
        let back: Type = serde_json::from_str(&json)?;
        assert_eq!(typ, back);
        Ok(())
    }
}
