//! This module contains the numeric representation policy for the decoder.
//!
//! Every value or error that carries an integer, length or pointer that may
//! exceed the range of a native integer is parameterised by a type implementing
//! [`Numeric`]. The choice is made once per decode session by instantiating the
//! decoder at a given representation, and it therefore cannot vary within a
//! single result tree.
//!
//! Two representations are provided:
//!
//! - [`BigNum`], which retains the exact 256-bit integer.
//! - [`DecimalString`], which renders the integer as a base-10 string, useful
//!   when the result is only destined for display or for a consumer that
//!   cannot handle wide integers.

use std::{
    fmt::{Debug, Display, Formatter},
    hash::Hash,
};

use ethnum::{I256, U256};
use serde::{Serialize, Serializer};

/// The interface to a representation for potentially over-large integers.
pub trait Numeric
where
    Self: Clone + Debug + Display + Eq + Hash + Serialize,
{
    /// Represents an unsigned `value`.
    #[must_use]
    fn from_unsigned(value: U256) -> Self;

    /// Represents a signed (two's complement) `value`.
    #[must_use]
    fn from_signed(value: I256) -> Self;

    /// Represents a `value` that fits in a native integer.
    #[must_use]
    fn from_usize(value: usize) -> Self {
        Self::from_unsigned(U256::from(value as u64))
    }
}

/// An exact integer drawn from the 256-bit domain of the EVM.
///
/// Signed and unsigned values are kept distinct, as the same bit pattern means
/// different things depending on the type being decoded.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BigNum {
    /// An unsigned integer.
    Unsigned(U256),

    /// A signed integer.
    Signed(I256),
}

impl BigNum {
    /// Gets the value as an unsigned integer, if it is one or if it is a
    /// non-negative signed integer.
    #[must_use]
    pub fn as_unsigned(&self) -> Option<U256> {
        match self {
            Self::Unsigned(value) => Some(*value),
            Self::Signed(value) if *value >= I256::ZERO => {
                Some(U256::from_ne_bytes(value.to_ne_bytes()))
            }
            Self::Signed(_) => None,
        }
    }

    /// Checks if the number is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Unsigned(value) => *value == U256::ZERO,
            Self::Signed(value) => *value == I256::ZERO,
        }
    }
}

impl Numeric for BigNum {
    fn from_unsigned(value: U256) -> Self {
        Self::Unsigned(value)
    }

    fn from_signed(value: I256) -> Self {
        Self::Signed(value)
    }
}

impl Display for BigNum {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsigned(value) => write!(f, "{value}"),
            Self::Signed(value) => write!(f, "{value}"),
        }
    }
}

/// Wide integers are serialized as base-10 strings, as most consumers of the
/// serialized form cannot represent 256-bit numbers natively.
impl Serialize for BigNum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<U256> for BigNum {
    fn from(value: U256) -> Self {
        Self::Unsigned(value)
    }
}

impl From<I256> for BigNum {
    fn from(value: I256) -> Self {
        Self::Signed(value)
    }
}

impl From<u64> for BigNum {
    fn from(value: u64) -> Self {
        Self::Unsigned(U256::from(value))
    }
}

/// An integer rendered as a base-10 string.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DecimalString(String);

impl DecimalString {
    /// Gets the string representation of the number.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Numeric for DecimalString {
    fn from_unsigned(value: U256) -> Self {
        Self(value.to_string())
    }

    fn from_signed(value: I256) -> Self {
        Self(value.to_string())
    }
}

impl Display for DecimalString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<DecimalString> for String {
    fn from(value: DecimalString) -> Self {
        value.0
    }
}

#[cfg(test)]
mod test {
    use ethnum::{I256, U256};
    use serde_json::json;

    use crate::numeric::{BigNum, DecimalString, Numeric};

    #[test]
    fn big_num_serializes_as_decimal_string() {
        let value = BigNum::from_unsigned(U256::from(0x42u32));
        assert_eq!(json!(value).as_str(), Some("66"));
    }

    #[test]
    fn big_num_keeps_signedness() {
        let unsigned = BigNum::from_unsigned(U256::ONE);
        let signed = BigNum::from_signed(I256::ONE);
        assert_ne!(unsigned, signed);
        assert_eq!(signed.as_unsigned(), Some(U256::ONE));
        assert_eq!(BigNum::from_signed(I256::new(-1)).as_unsigned(), None);
    }

    #[test]
    fn decimal_strings_render_negative_values() {
        let value = DecimalString::from_signed(I256::new(-12));
        assert_eq!(value.as_str(), "-12");
        assert_eq!(DecimalString::from_usize(7).as_str(), "7");
    }

    #[test]
    fn decimal_strings_handle_full_width_values() {
        let value = DecimalString::from_unsigned(U256::MAX);
        assert_eq!(
            value.as_str(),
            "115792089237316195423570985008687907853269984665640564039457584007913129639935"
        );
    }
}
