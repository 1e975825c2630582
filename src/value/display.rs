//! This module contains the human-readable rendering of result trees.
//!
//! Rendering never fails on an embedded error. Errors are shown in place, so a
//! partially decoded struct still renders all of its fields.

use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::value::{
    ContractValue,
    DecodeResult,
    ExternalFunctionValue,
    FixedValue,
    InternalFunctionValue,
    StringValue,
    Value,
};

impl<N: Display> Display for DecodeResult<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value { value, .. } => write!(f, "{value}"),
            Self::Error { typ, error } => write!(f, "<error decoding {typ}: {error}>"),
        }
    }
}

impl<N: Display> Display for Value<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uint(value) | Self::Int(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Bytes(hex) | Self::DynBytes(hex) => write!(f, "{hex}"),
            Self::Address(address) => write!(f, "{address}"),
            Self::String(string) => write!(f, "{string}"),
            Self::Fixed(value) | Self::Ufixed(value) => write!(f, "{value}"),
            Self::Enum(value) => write!(f, "{}", value.name),
            Self::Contract(contract) => write!(f, "{contract}"),
            Self::UserDefinedValueType(inner) => write!(f, "{inner}"),
            Self::FunctionExternal(function) => write!(f, "{function}"),
            Self::FunctionInternal(function) => write!(f, "{function}"),
            Self::Array(elements) => write!(f, "[{}]", elements.iter().join(", ")),
            Self::Struct(members) | Self::Magic(members) | Self::TypeOfContract(members) => {
                let members = members
                    .iter()
                    .map(|m| format!("{}: {}", m.name, m.value))
                    .join(", ");
                write!(f, "{{{members}}}")
            }
            Self::Tuple(entries) => {
                let entries = entries
                    .iter()
                    .map(|e| match &e.name {
                        Some(name) => format!("{name}: {}", e.value),
                        None => e.value.to_string(),
                    })
                    .join(", ");
                write!(f, "({entries})")
            }
            Self::Mapping(pairs) => {
                let pairs = pairs
                    .iter()
                    .map(|p| format!("{} => {}", p.key, p.value))
                    .join(", ");
                write!(f, "{{{pairs}}}")
            }
            Self::TypeOfEnum(members) => {
                write!(f, "{{{}}}", members.iter().map(|m| &m.name).join(", "))
            }
        }
    }
}

impl Display for StringValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid { value } => write!(f, "{value:?}"),
            Self::Malformed { raw } => write!(f, "<malformed utf-8 {raw}>"),
        }
    }
}

/// Renders the scaled decimal, so that a raw value of `-1234` with two places
/// reads as `-12.34`.
impl<N: Display> Display for FixedValue<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let raw = self.raw.to_string();
        let places = usize::from(self.places);
        if places == 0 {
            return write!(f, "{raw}");
        }

        let (sign, digits) = match raw.strip_prefix('-') {
            Some(digits) => ("-", digits),
            None => ("", raw.as_str()),
        };
        let digits = format!("{digits:0>width$}", width = places + 1);
        let (whole, fraction) = digits.split_at(digits.len() - places);
        write!(f, "{sign}{whole}.{fraction}")
    }
}

impl Display for ContractValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Known { address, class } => write!(f, "{}({address})", class.name),
            Self::Unknown { address } => write!(f, "{address}"),
        }
    }
}

impl Display for ExternalFunctionValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Known { contract, abi, .. } => write!(f, "{contract}.{}", abi.name),
            Self::Invalid { contract, selector } => {
                write!(f, "{contract}.<invalid selector {selector}>")
            }
            Self::Unknown { contract, selector } => write!(f, "{contract}.{selector}"),
        }
    }
}

impl Display for InternalFunctionValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Function {
                name, defined_in, ..
            } => match defined_in {
                Some(contract) => write!(f, "{}.{name}", contract.name),
                None => write!(f, "{name}"),
            },
            Self::Exception { context, .. } => {
                write!(f, "{}.<uninitialized function>", context.name)
            }
            Self::Unknown {
                deployed_program_counter,
                constructor_program_counter,
                ..
            } => write!(
                f,
                "<internal function at deployed PC {deployed_program_counter}, constructor PC \
                 {constructor_program_counter}>"
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use ethnum::I256;

    use crate::{
        error::{decoder::GenericError, read},
        numeric::{BigNum, Numeric},
        types::{DefinitionRef, Location, Type},
        value::{DecodeResult, FixedValue, NamedResult, Value},
    };

    #[test]
    fn renders_scaled_fixed_point_numbers() {
        let value = FixedValue {
            raw:    BigNum::from_signed(I256::new(-1234)),
            places: 2,
        };
        assert_eq!(value.to_string(), "-12.34");

        let small = FixedValue {
            raw:    BigNum::from(5u64),
            places: 3,
        };
        assert_eq!(small.to_string(), "0.005");
    }

    #[test]
    fn renders_partial_structs() {
        let unreadable = DecodeResult::<BigNum>::error(
            Type::uint256(),
            GenericError::Read {
                error: read::Error::Topic { index: 3 },
            },
        );
        let owner = DecodeResult::value(Type::Bool, Value::Bool(true));
        let result = DecodeResult::value(
            Type::structure(DefinitionRef::new("1", "Account"), Location::Memory),
            Value::Struct(vec![
                NamedResult::new("active", owner),
                NamedResult::new("balance", unreadable),
            ]),
        );
        assert_eq!(
            result.to_string(),
            "{active: true, balance: <error decoding uint256: Could not read event topic 3>}"
        );
    }
}
