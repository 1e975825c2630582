//! This module contains the decoding of values that do not live in one of the
//! EVM's ordinary data locations: indexed event topics, compile-time
//! constants, the magic variables `msg`, `tx` and `block`, and the values of
//! `type(...)` expressions.

use tracing::debug;

use crate::{
    decode::{Decoder, Options},
    error::{decoder::GenericError, internal::StopResult, read, DecodingError},
    numeric::Numeric,
    pointer::ConstantDefinition,
    state::StateReader,
    types::{Location, MagicVariable, Type, UserDefinedType},
    utility::{pad_left, pad_right, to_hex},
    value::{DecodeResult, EnumValue, NamedResult, Value},
};

impl<'a, R, N> Decoder<'a, R, N>
where
    R: StateReader,
    N: Numeric,
{
    /// Decodes the value of `typ` logged as the event topic at index `topic`.
    ///
    /// Indexed parameters of reference types are logged as the hash of their
    /// encoding, so their values are unrecoverable. This is always embedded as
    /// an error, even in strict mode, as it says nothing about whether the
    /// event data is well-formed.
    pub(super) fn decode_topic(
        &self,
        typ: &Type,
        topic: usize,
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        let word = self
            .state
            .topic(topic)
            .ok_or(read::Error::Topic { index: topic })?;

        if typ.is_reference() || matches!(typ, Type::Tuple { .. }) {
            let error = GenericError::IndexedReferenceType {
                typ: typ.clone(),
                raw: to_hex(word),
            };
            debug!(%typ, topic, "Indexed reference type has only its hash available");
            return Ok(DecodeResult::error(typ.clone(), error));
        }

        self.decode_word(typ, &word, options)
    }

    /// Decodes the value of `typ` given by a constant `definition`.
    pub(super) fn decode_constant(
        &self,
        typ: &Type,
        definition: &ConstantDefinition,
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        let bytes = match definition {
            ConstantDefinition::Literal { bytes } => bytes,
            ConstantDefinition::Unsupported { node_type } => {
                return Err(read::Error::UnsupportedConstant {
                    definition: node_type.clone(),
                }
                .into());
            }
        };

        match typ {
            Type::DynBytes { .. } | Type::String { .. } => self.decode_word(typ, bytes, options),
            Type::Bytes { .. } => self.decode_word(typ, &pad_right(bytes), options),
            _ if typ.is_elementary() || matches!(typ, Type::Function { .. }) => {
                self.decode_word(typ, &pad_left(bytes), options)
            }
            _ => Err(read::Error::UnsupportedConstant {
                definition: typ.to_string(),
            }
            .into()),
        }
    }

    /// Decodes the members of the magic `variable`.
    ///
    /// The members are decoded permissively, as they are provided directly by
    /// the environment rather than read from contract data.
    pub(super) fn decode_magic(
        &self,
        typ: &Type,
        variable: MagicVariable,
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        let options = options.permissive();
        let members = magic_members(variable)
            .into_iter()
            .map(|(name, member_type)| {
                let raw = self
                    .state
                    .special(variable, name)
                    .ok_or_else(|| read::Error::special(variable, name))?;
                let value = self.decode_word(&member_type, &raw, &options)?;
                Ok(NamedResult::new(name, value))
            })
            .collect::<StopResult<Vec<_>, N>>()?;

        Ok(DecodeResult::value(typ.clone(), Value::Magic(members)))
    }

    /// Decodes the value of a `type(...)` expression.
    ///
    /// For an enum this lists its members, while for a contract there is
    /// nothing that can be shown.
    pub(super) fn decode_type_value(&self, typ: &Type) -> StopResult<DecodeResult<N>, N> {
        let Type::TypeOfEnum { definition } = typ else {
            return Ok(DecodeResult::value(typ.clone(), Value::TypeOfContract(vec![])));
        };

        let UserDefinedType::Enum { options, .. } = self.user_defined(typ, definition)? else {
            return Err(DecodingError::not_found(typ).into());
        };
        let values = options
            .iter()
            .enumerate()
            .map(|(ix, name)| EnumValue {
                name:    name.clone(),
                numeric: N::from_usize(ix),
            })
            .collect();

        Ok(DecodeResult::value(typ.clone(), Value::TypeOfEnum(values)))
    }
}

/// Gets the members of the magic `variable` along with their types.
fn magic_members(variable: MagicVariable) -> Vec<(&'static str, Type)> {
    match variable {
        MagicVariable::Message => vec![
            ("data", Type::dyn_bytes(Location::Calldata)),
            ("sig", Type::Bytes { length: 4 }),
            ("sender", Type::address()),
            ("value", Type::uint256()),
        ],
        MagicVariable::Transaction => {
            vec![("origin", Type::address()), ("gasprice", Type::uint256())]
        }
        MagicVariable::Block => vec![
            ("coinbase", Type::Address { payable: true }),
            ("difficulty", Type::uint256()),
            ("gaslimit", Type::uint256()),
            ("number", Type::uint256()),
            ("timestamp", Type::uint256()),
            ("chainid", Type::uint256()),
            ("basefee", Type::uint256()),
        ],
    }
}
