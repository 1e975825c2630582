//! This module contains the decoding of elementary values from their raw
//! bytes, once those bytes have been obtained from wherever they live.

use ethnum::{I256, U256};

use crate::{
    constant::{
        ADDRESS_SIZE_BYTES,
        BYTE_SIZE_BITS,
        ENUM_SIZE_BYTES,
        EXTERNAL_FUNCTION_SIZE_BYTES,
        INTERNAL_FUNCTION_SIZE_BYTES,
        PC_SIZE_BYTES,
    },
    decode::{Decoder, Options, PaddingMode},
    error::{
        decoder::{
            AddressError,
            BoolError,
            BytesError,
            ContractError,
            DecoderError,
            EnumError,
            FixedError,
            FunctionExternalError,
            FunctionInternalError,
            IntError,
            PaddingError,
            PaddingType,
            UfixedError,
            UintError,
        },
        internal::{InternalUseError, StopResult},
        DecodingError,
    },
    numeric::Numeric,
    state::StateReader,
    types::{Type, UserDefinedType, Visibility},
    utility::{pad_left, sign_extend, to_hex, to_u256, Address},
    value::{
        ContractValue,
        DecodeResult,
        EnumValue,
        ExternalFunctionValue,
        FixedValue,
        InternalFunctionValue,
        StringValue,
        Value,
    },
};

impl<'a, R, N> Decoder<'a, R, N>
where
    R: StateReader,
    N: Numeric,
{
    /// Decodes the value of the elementary or function type `typ` from its
    /// `raw` bytes.
    ///
    /// The raw bytes are usually a full word, but may be exactly the size of
    /// the value when it was packed, as in storage. For dynamic byte arrays
    /// and strings, the raw bytes are taken to be the contents.
    ///
    /// # Panics
    ///
    /// If `typ` is a container type, as those are never stored in a single
    /// word and are dispatched elsewhere.
    pub(crate) fn decode_word(
        &self,
        typ: &Type,
        raw: &[u8],
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        let success = |value| Ok(DecodeResult::value(typ.clone(), value));
        match typ {
            Type::Uint { bits } => {
                match check_padding(raw, width(*bits), PaddingType::Left, options) {
                    Ok(value) => success(Value::Uint(N::from_unsigned(to_u256(value)))),
                    Err(e) => self.fail(typ, DecoderError::Uint(UintError::Padding(e)), options),
                }
            }
            Type::Int { bits } => {
                match check_padding(raw, width(*bits), PaddingType::Signed, options) {
                    Ok(value) => success(Value::Int(N::from_signed(to_i256(value)))),
                    Err(e) => self.fail(typ, DecoderError::Int(IntError::Padding(e)), options),
                }
            }
            Type::Fixed { bits, places } => {
                match check_padding(raw, width(*bits), PaddingType::Signed, options) {
                    Ok(value) => success(Value::Fixed(FixedValue {
                        raw:    N::from_signed(to_i256(value)),
                        places: *places,
                    })),
                    Err(e) => self.fail(typ, DecoderError::Fixed(FixedError::Padding(e)), options),
                }
            }
            Type::Ufixed { bits, places } => {
                match check_padding(raw, width(*bits), PaddingType::Left, options) {
                    Ok(value) => success(Value::Ufixed(FixedValue {
                        raw:    N::from_unsigned(to_u256(value)),
                        places: *places,
                    })),
                    Err(e) => {
                        self.fail(typ, DecoderError::Ufixed(UfixedError::Padding(e)), options)
                    }
                }
            }
            Type::Bool => self.decode_bool(typ, raw, options),
            Type::Bytes { length } => {
                match check_padding(raw, usize::from(*length), PaddingType::Right, options) {
                    Ok(value) => success(Value::Bytes(to_hex(value))),
                    Err(e) => self.fail(typ, DecoderError::Bytes(BytesError::Padding(e)), options),
                }
            }
            Type::Address { .. } => {
                match check_padding(raw, ADDRESS_SIZE_BYTES, PaddingType::Left, options) {
                    Ok(value) => success(Value::Address(Address::from_slice(value))),
                    Err(e) => {
                        self.fail(typ, DecoderError::Address(AddressError::Padding(e)), options)
                    }
                }
            }
            Type::Contract { .. } => {
                match check_padding(raw, ADDRESS_SIZE_BYTES, PaddingType::Left, options) {
                    Ok(value) => {
                        success(Value::Contract(self.contract(Address::from_slice(value))))
                    }
                    Err(e) => {
                        self.fail(typ, DecoderError::Contract(ContractError::Padding(e)), options)
                    }
                }
            }
            Type::DynBytes { .. } => success(Value::DynBytes(to_hex(raw))),
            Type::String { .. } => success(Value::String(string_value(raw))),
            Type::Enum { definition } => {
                let options_list = match self.info.user_defined_type(&definition.id) {
                    Some(UserDefinedType::Enum { options: names, .. }) => names,
                    _ => {
                        let error = EnumError::NotFound {
                            typ: typ.clone(),
                            raw: N::from_unsigned(to_u256(raw)),
                        };
                        return self.fail(typ, DecoderError::Enum(error), options);
                    }
                };

                let value = match check_padding(raw, ENUM_SIZE_BYTES, PaddingType::Left, options) {
                    Ok(value) => to_u256(value),
                    Err(e) => {
                        return self.fail(typ, DecoderError::Enum(EnumError::Padding(e)), options);
                    }
                };

                let member = if value < U256::from(options_list.len() as u64) {
                    options_list.get(value.as_usize())
                } else {
                    None
                };
                match member {
                    Some(name) => success(Value::Enum(EnumValue {
                        name:    name.clone(),
                        numeric: N::from_unsigned(value),
                    })),
                    None => {
                        let error = EnumError::OutOfRange {
                            typ: typ.clone(),
                            raw: N::from_unsigned(value),
                        };
                        self.fail(typ, DecoderError::Enum(error), options)
                    }
                }
            }
            Type::UserDefinedValueType { definition } => {
                let UserDefinedType::UserDefinedValueType { underlying, .. } =
                    self.user_defined(typ, definition)?
                else {
                    return Err(DecodingError::not_found(typ).into());
                };

                let inner = self.decode_word(underlying, raw, options)?;
                if inner.is_value() {
                    success(Value::UserDefinedValueType(Box::new(inner)))
                } else {
                    self.fail(
                        typ,
                        DecoderError::UserDefinedValueType(Box::new(inner)),
                        options,
                    )
                }
            }
            Type::Function {
                visibility: Visibility::External,
                ..
            } => match check_padding(raw, EXTERNAL_FUNCTION_SIZE_BYTES, PaddingType::Right, options)
            {
                Ok(value) => {
                    let (address, selector) = value.split_at(ADDRESS_SIZE_BYTES);
                    let address = Address::from_slice(address);
                    success(Value::FunctionExternal(self.external_function(address, selector)))
                }
                Err(e) => {
                    let error = FunctionExternalError::NonStackPadding(e);
                    self.fail(typ, DecoderError::FunctionExternal(error), options)
                }
            },
            Type::Function { .. } => {
                if options.abi && options.strict {
                    return Err(InternalUseError::InternalFunctionInAbi.into());
                }
                match check_padding(raw, INTERNAL_FUNCTION_SIZE_BYTES, PaddingType::Left, options) {
                    Ok(value) => {
                        let value = pad_left(value);
                        let end = value.len();
                        let deployed = read_pc(&value[end - PC_SIZE_BYTES..]);
                        let constructor =
                            read_pc(&value[end - 2 * PC_SIZE_BYTES..end - PC_SIZE_BYTES]);
                        self.decode_internal_function(typ, deployed, constructor, options)
                    }
                    Err(e) => {
                        let error = FunctionInternalError::Padding(e);
                        self.fail(typ, DecoderError::FunctionInternal(error), options)
                    }
                }
            }
            Type::Struct { .. }
            | Type::Array { .. }
            | Type::DynArray { .. }
            | Type::Mapping { .. }
            | Type::Tuple { .. }
            | Type::Magic { .. }
            | Type::TypeOfContract { .. }
            | Type::TypeOfEnum { .. } => {
                unreachable!("{typ} is not decoded from a single word")
            }
        }
    }

    /// Decodes a boolean.
    ///
    /// Unless decoding permissively or with right-padding, the whole of the
    /// raw bytes is treated as the number to check, so that stray high-order
    /// bits are reported as the value being out of range.
    fn decode_bool(
        &self,
        typ: &Type,
        raw: &[u8],
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        let numeric = match options.padding_mode {
            PaddingMode::Permissive | PaddingMode::Right => {
                match check_padding(raw, 1, PaddingType::Left, options) {
                    Ok(value) => to_u256(value),
                    Err(e) => {
                        return self.fail(typ, DecoderError::Bool(BoolError::Padding(e)), options);
                    }
                }
            }
            _ => to_u256(raw),
        };

        if numeric > U256::ONE {
            let error = BoolError::OutOfRange {
                raw: N::from_unsigned(numeric),
            };
            return self.fail(typ, DecoderError::Bool(error), options);
        }

        Ok(DecodeResult::value(
            typ.clone(),
            Value::Bool(numeric == U256::ONE),
        ))
    }

    /// Resolves the contract at `address` against the known contracts.
    pub(crate) fn contract(&self, address: Address) -> ContractValue {
        match self.info.contract_at(&address) {
            Some(known) => ContractValue::Known {
                address,
                class: known.contract.clone(),
            },
            None => ContractValue::Unknown { address },
        }
    }

    /// Resolves the external function with `selector` on the contract at
    /// `address`.
    pub(crate) fn external_function(
        &self,
        address: Address,
        selector: &[u8],
    ) -> ExternalFunctionValue {
        let contract = self.contract(address);
        let hex = to_hex(selector);
        match self.info.contract_at(&address) {
            Some(known) => match known.function_with_selector(selector) {
                Some(abi) => ExternalFunctionValue::Known {
                    contract,
                    selector: hex,
                    abi: abi.clone(),
                },
                None => ExternalFunctionValue::Invalid {
                    contract,
                    selector: hex,
                },
            },
            None => ExternalFunctionValue::Unknown {
                contract,
                selector: hex,
            },
        }
    }

    /// Resolves the internal function pointer with the given pair of program
    /// counters against the executing contract.
    fn decode_internal_function(
        &self,
        typ: &Type,
        deployed: u32,
        constructor: u32,
        options: &Options,
    ) -> StopResult<DecodeResult<N>, N> {
        let success = |value| {
            Ok(DecodeResult::value(
                typ.clone(),
                Value::FunctionInternal(value),
            ))
        };

        let context = self.info.current_context.as_ref();
        let Some((context, table)) =
            context.and_then(|c| c.internal_functions.as_ref().map(|table| (c, table)))
        else {
            return success(InternalFunctionValue::Unknown {
                context:                     context.map(|c| c.contract.clone()),
                deployed_program_counter:    deployed,
                constructor_program_counter: constructor,
            });
        };
        let contract = context.contract.clone();

        if deployed == 0 && constructor == 0 {
            return success(InternalFunctionValue::Exception {
                context:                     contract,
                deployed_program_counter:    deployed,
                constructor_program_counter: constructor,
            });
        }

        if deployed == 0 {
            let error = FunctionInternalError::MalformedInternalFunction {
                context:                     contract,
                constructor_program_counter: constructor,
            };
            return self.fail(typ, DecoderError::FunctionInternal(error), options);
        }

        if context.is_constructor && constructor == 0 {
            let error = FunctionInternalError::DeployedFunctionInConstructor {
                context:                     contract,
                deployed_program_counter:    deployed,
                constructor_program_counter: constructor,
            };
            return self.fail(typ, DecoderError::FunctionInternal(error), options);
        }

        let program_counter = if context.is_constructor {
            constructor
        } else {
            deployed
        };

        match table.get(&program_counter) {
            None => {
                let error = FunctionInternalError::NoSuchInternalFunction {
                    context:                     contract,
                    deployed_program_counter:    deployed,
                    constructor_program_counter: constructor,
                };
                self.fail(typ, DecoderError::FunctionInternal(error), options)
            }
            Some(entry) if entry.is_designated_invalid => {
                success(InternalFunctionValue::Exception {
                    context:                     contract,
                    deployed_program_counter:    deployed,
                    constructor_program_counter: constructor,
                })
            }
            Some(entry) => success(InternalFunctionValue::Function {
                context:                     contract,
                deployed_program_counter:    deployed,
                constructor_program_counter: constructor,
                name:                        entry.name.clone(),
                id:                          entry.id.clone(),
                defined_in:                  entry.defined_in.clone(),
                mutability:                  entry.mutability,
            }),
        }
    }
}

/// Gets the width in bytes of a numeric type of `bits` width.
fn width(bits: u16) -> usize {
    usize::from(bits) / BYTE_SIZE_BITS
}

/// Interprets `bytes` as a big-endian two's complement integer.
fn to_i256(bytes: &[u8]) -> I256 {
    I256::from_be_bytes(sign_extend(bytes))
}

/// Interprets the four bytes of a program counter.
fn read_pc(bytes: &[u8]) -> u32 {
    let mut pc = [0u8; PC_SIZE_BYTES];
    pc.copy_from_slice(bytes);
    u32::from_be_bytes(pc)
}

/// Interprets `raw` as the contents of a string.
pub(crate) fn string_value(raw: &[u8]) -> StringValue {
    match std::str::from_utf8(raw) {
        Ok(value) => StringValue::Valid {
            value: value.to_string(),
        },
        Err(_) => StringValue::Malformed { raw: to_hex(raw) },
    }
}

/// Splits `raw` into the `size` significant bytes of the value and the bytes
/// of padding around them, returning `(value, padding)`.
fn split(raw: &[u8], size: usize, padding_type: PaddingType) -> (&[u8], &[u8]) {
    if raw.len() <= size {
        return (raw, &[]);
    }
    match padding_type {
        PaddingType::Left | PaddingType::Signed => {
            let (padding, value) = raw.split_at(raw.len() - size);
            (value, padding)
        }
        PaddingType::Right => raw.split_at(size),
    }
}

/// Checks whether `padding` is correct for `value` under `padding_type`.
fn is_padded(value: &[u8], padding: &[u8], padding_type: PaddingType) -> bool {
    let fill = match padding_type {
        PaddingType::Signed if value.first().is_some_and(|b| b & 0x80 != 0) => 0xff,
        _ => 0x00,
    };
    padding.iter().all(|b| *b == fill)
}

/// Checks the padding of the `size`-byte value in `raw`, whose padding is of
/// `default` type when the padding mode does not say otherwise.
///
/// On success the significant bytes of the value are returned.
pub(crate) fn check_padding<'r>(
    raw: &'r [u8],
    size: usize,
    default: PaddingType,
    options: &Options,
) -> Result<&'r [u8], PaddingError> {
    let padding_type = match (options.padding_mode, default) {
        (PaddingMode::Right, _) => PaddingType::Right,
        (PaddingMode::Zero, PaddingType::Signed) => PaddingType::Left,
        (_, default) => default,
    };
    let (value, padding) = split(raw, size, padding_type);

    let valid = match options.padding_mode {
        PaddingMode::Permissive => true,
        PaddingMode::DefaultOrZero => {
            is_padded(value, padding, padding_type) || is_padded(value, padding, PaddingType::Left)
        }
        PaddingMode::Default | PaddingMode::Zero | PaddingMode::Right => {
            is_padded(value, padding, padding_type)
        }
    };

    if valid {
        Ok(value)
    } else {
        Err(PaddingError {
            raw: to_hex(raw),
            padding_type,
        })
    }
}

#[cfg(test)]
mod test {
    use crate::{
        decode::{value::check_padding, Config, Options, PaddingMode},
        error::decoder::PaddingType,
        utility::{pad_left, sign_extend},
    };

    fn options(mode: PaddingMode) -> Options {
        Options::new(&Config::default().with_padding_mode(mode))
    }

    #[test]
    fn accepts_sign_extension_only_for_signed_padding() {
        let negative = sign_extend(&[0x80]);
        let default = options(PaddingMode::Default);
        assert!(check_padding(&negative, 1, PaddingType::Signed, &default).is_ok());
        assert!(check_padding(&negative, 1, PaddingType::Left, &default).is_err());

        let zero = options(PaddingMode::Zero);
        assert!(check_padding(&negative, 1, PaddingType::Signed, &zero).is_err());
        assert!(check_padding(&pad_left(&[0x80]), 1, PaddingType::Signed, &zero).is_ok());

        let either = options(PaddingMode::DefaultOrZero);
        assert!(check_padding(&negative, 1, PaddingType::Signed, &either).is_ok());
        assert!(check_padding(&pad_left(&[0x80]), 1, PaddingType::Signed, &either).is_ok());
    }

    #[test]
    fn reports_the_violated_padding() {
        let mut word = pad_left(&[1]);
        word[0] = 1;
        let result = check_padding(&word, 2, PaddingType::Left, &options(PaddingMode::Default));
        assert_eq!(result.map_err(|e| e.padding_type), Err(PaddingType::Left));

        let right = check_padding(&word, 2, PaddingType::Left, &options(PaddingMode::Right));
        assert_eq!(right.map_err(|e| e.padding_type), Err(PaddingType::Right));
    }

    #[test]
    fn permissive_mode_takes_significant_bytes() {
        let mut word = pad_left(&[0xab, 0xcd]);
        word[0] = 0xff;
        let result = check_padding(&word, 2, PaddingType::Left, &options(PaddingMode::Permissive));
        assert_eq!(result.ok(), Some(&[0xab, 0xcd][..]));
    }
}
