//! This module contains the decoding of complete ABI-encoded parameter lists,
//! namely the arguments of a call, the values it returns, and the parameters
//! of a logged event.
//!
//! Event decoding is always strict, so that it can be used to determine which
//! of a number of candidate event definitions a log was actually produced by.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    constant::SELECTOR_SIZE_BYTES,
    decode::{abi_size, Decoder, Options},
    error::{self, internal::StopResult, DecodingError},
    info::DecoderInfo,
    numeric::Numeric,
    pointer::{ByteLocation, Pointer},
    state::StateReader,
    types::{Type, UserDefinedType, Visibility},
    utility::{keccak256, Word},
    value::DecodeResult,
};

/// A parameter of a function or event.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Parameter {
    /// The name of the parameter, if it has one.
    pub name: Option<String>,

    /// The type of the parameter.
    #[serde(rename = "type")]
    pub typ: Type,

    /// Whether the parameter is logged as a topic rather than in the event
    /// data. Always false for function parameters.
    #[serde(default)]
    pub indexed: bool,
}

impl Parameter {
    /// Constructs a non-indexed parameter called `name` of type `typ`.
    pub fn new(name: impl Into<String>, typ: Type) -> Self {
        Self {
            name: Some(name.into()),
            typ,
            indexed: false,
        }
    }

    /// Marks the parameter as indexed.
    #[must_use]
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }
}

/// The definition of an event.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct EventDefinition {
    /// The name of the event.
    pub name: String,

    /// The parameters of the event, in declaration order.
    pub parameters: Vec<Parameter>,

    /// Whether the event omits its selector from the topics.
    #[serde(default)]
    pub anonymous: bool,
}

impl EventDefinition {
    /// Constructs a non-anonymous event called `name`.
    pub fn new(name: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self {
            name: name.into(),
            parameters,
            anonymous: false,
        }
    }

    /// Marks the event as anonymous.
    #[must_use]
    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    /// Gets the canonical signature of the event, such as
    /// `Transfer(address,address,uint256)`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if a parameter refers to a user-defined type that is not
    /// in `info`.
    pub fn signature(&self, info: &DecoderInfo) -> error::Result<String> {
        let types: Vec<String> = self
            .parameters
            .iter()
            .map(|p| abi_type_name(&p.typ, info))
            .try_collect()?;
        Ok(format!("{}({})", self.name, types.join(",")))
    }

    /// Gets the selector of the event, which is logged as its first topic.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if a parameter refers to a user-defined type that is not
    /// in `info`.
    pub fn selector(&self, info: &DecoderInfo) -> error::Result<Word> {
        Ok(keccak256(self.signature(info)?))
    }

    /// Gets the number of topics a log of this event carries.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        let indexed = self.parameters.iter().filter(|p| p.indexed).count();
        if self.anonymous {
            indexed
        } else {
            indexed + 1
        }
    }
}

/// A decoded parameter.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Argument<N> {
    /// The name of the parameter, if it has one.
    pub name: Option<String>,

    /// Whether the parameter was read from a topic.
    pub indexed: bool,

    /// The decoded value.
    pub value: DecodeResult<N>,
}

/// Gets the name of `typ` as it appears in canonical ABI signatures.
///
/// # Errors
///
/// Returns [`Err`] if `typ` refers to a user-defined type that is not in
/// `info`.
pub fn abi_type_name(typ: &Type, info: &DecoderInfo) -> error::Result<String> {
    let name = match typ {
        Type::Uint { bits } => format!("uint{bits}"),
        Type::Int { bits } => format!("int{bits}"),
        Type::Bool => "bool".into(),
        Type::Bytes { length } => format!("bytes{length}"),
        Type::DynBytes { .. } => "bytes".into(),
        Type::String { .. } => "string".into(),
        Type::Address { .. } | Type::Contract { .. } => "address".into(),
        Type::Fixed { bits, places } => format!("fixed{bits}x{places}"),
        Type::Ufixed { bits, places } => format!("ufixed{bits}x{places}"),
        Type::Enum { .. } => "uint8".into(),
        Type::Function {
            visibility: Visibility::External,
            ..
        } => "function".into(),
        Type::UserDefinedValueType { definition } => match info.user_defined_type(&definition.id) {
            Some(UserDefinedType::UserDefinedValueType { underlying, .. }) => {
                abi_type_name(underlying, info)?
            }
            _ => return Err(DecodingError::not_found(typ)),
        },
        Type::Array { base, length, .. } => format!("{}[{length}]", abi_type_name(base, info)?),
        Type::DynArray { base, .. } => format!("{}[]", abi_type_name(base, info)?),
        Type::Struct { definition, .. } => match info.user_defined_type(&definition.id) {
            Some(UserDefinedType::Struct { members, .. }) => {
                let members: Vec<String> = members
                    .iter()
                    .map(|m| abi_type_name(&m.typ, info))
                    .try_collect()?;
                format!("({})", members.join(","))
            }
            _ => return Err(DecodingError::not_found(typ)),
        },
        Type::Tuple { members } => {
            let members: Vec<String> = members
                .iter()
                .map(|m| abi_type_name(&m.typ, info))
                .try_collect()?;
            format!("({})", members.join(","))
        }
        // These never appear in ABI-encoded data, so are given their source
        // names.
        other => other.to_string(),
    };
    Ok(name)
}

impl<'a, R, N> Decoder<'a, R, N>
where
    R: StateReader,
    N: Numeric,
{
    /// Decodes the ABI-encoded `parameters` whose encoding begins at `base` in
    /// `location`, in strict mode if and only if strict ABI mode is configured.
    ///
    /// Return data is decoded with a `base` of zero.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if a user-defined type definition is missing, or if the
    /// data could not be read.
    pub fn decode_arguments(
        &self,
        parameters: &[Parameter],
        location: ByteLocation,
        base: usize,
    ) -> error::Result<Option<Vec<Argument<N>>>> {
        let options = Options::new(self.config()).in_abi(base);
        let result = self.decode_parameters(parameters.iter(), location, base, &options);
        self.finish(format!("parameters at {location}:{base}"), result)
    }

    /// Decodes the arguments of the call whose calldata is being read, which
    /// follow the four-byte function selector.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if a user-defined type definition is missing, or if the
    /// data could not be read.
    pub fn decode_calldata(
        &self,
        parameters: &[Parameter],
    ) -> error::Result<Option<Vec<Argument<N>>>> {
        self.decode_arguments(parameters, ByteLocation::Calldata, SELECTOR_SIZE_BYTES)
    }

    /// Decodes the log being read as an instance of `event`, with indexed
    /// parameters read from the topics and the rest from the event data.
    ///
    /// Decoding is strict, and [`None`] is returned if the log is not a
    /// well-formed instance of the event: the wrong number of topics, the
    /// wrong selector, or malformed data. Indexed parameters of reference
    /// types are only available as their hash, and are returned as errors.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if a user-defined type definition is missing, or if the
    /// data could not be read.
    pub fn decode_event(&self, event: &EventDefinition) -> error::Result<Option<Vec<Argument<N>>>> {
        let count = event.topic_count();
        let has_topics = count == 0 || self.state().topic(count - 1).is_some();
        if !has_topics || self.state().topic(count).is_some() {
            return Ok(None);
        }
        if !event.anonymous && self.state().topic(0) != Some(event.selector(self.info())?) {
            return Ok(None);
        }

        let options = Options::new(self.config()).strict().in_abi(0);
        let first_topic = usize::from(!event.anonymous);
        let result = self.decode_log(event, first_topic, &options);
        self.finish(format!("event {}", event.name), result)
    }

    /// Decodes a parameter list whose heads are laid out from `base`.
    fn decode_parameters<'p>(
        &self,
        parameters: impl Iterator<Item = &'p Parameter>,
        location: ByteLocation,
        base: usize,
        options: &Options,
    ) -> StopResult<Vec<Argument<N>>, N> {
        let mut position = base;
        let mut arguments = Vec::new();
        for parameter in parameters {
            let pointer = Pointer::word(location, position);
            let value = self.decode_value(&parameter.typ, &pointer, options)?;
            position = position.saturating_add(abi_size(&parameter.typ, self.info())?.size);
            arguments.push(Argument {
                name: parameter.name.clone(),
                indexed: false,
                value,
            });
        }
        Ok(arguments)
    }

    /// Decodes the parameters of `event`, taking the indexed ones from
    /// successive topics beginning at `first_topic`.
    fn decode_log(
        &self,
        event: &EventDefinition,
        first_topic: usize,
        options: &Options,
    ) -> StopResult<Vec<Argument<N>>, N> {
        let data = event.parameters.iter().filter(|p| !p.indexed);
        let mut data = self
            .decode_parameters(data, ByteLocation::Eventdata, 0, options)?
            .into_iter();

        let mut topic = first_topic;
        let mut arguments = Vec::with_capacity(event.parameters.len());
        for parameter in &event.parameters {
            if parameter.indexed {
                let pointer = Pointer::EventTopic { topic };
                let value = self.decode_value(&parameter.typ, &pointer, options)?;
                topic += 1;
                arguments.push(Argument {
                    name: parameter.name.clone(),
                    indexed: true,
                    value,
                });
            } else if let Some(argument) = data.next() {
                arguments.push(argument);
            }
        }
        Ok(arguments)
    }
}
