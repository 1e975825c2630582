//! Utility functions useful throughout the codebase.

use std::{
    cmp::Ordering,
    fmt::{Debug, Display, Formatter},
};

use ethnum::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::constant::{ADDRESS_SIZE_BYTES, WORD_SIZE_BYTES};

/// A single 32-byte EVM word in big-endian byte order.
pub type Word = [u8; WORD_SIZE_BYTES];

/// Computes the keccak256 hash of `data`.
#[must_use]
pub fn keccak256(data: impl AsRef<[u8]>) -> Word {
    let digest = Keccak256::digest(data.as_ref());
    let mut word = [0u8; WORD_SIZE_BYTES];
    word.copy_from_slice(digest.as_slice());
    word
}

/// Encodes `bytes` as a lowercase hex string with a `0x` prefix.
#[must_use]
pub fn to_hex(bytes: impl AsRef<[u8]>) -> String {
    let mut string = String::from("0x");
    string.push_str(&hex::encode(bytes.as_ref()));
    string
}

/// Left-pads `bytes` with zeroes to a full word, keeping only the last word's
/// worth of bytes if more are provided.
#[must_use]
pub fn pad_left(bytes: &[u8]) -> Word {
    let mut word = [0u8; WORD_SIZE_BYTES];
    let take = bytes.len().min(WORD_SIZE_BYTES);
    word[WORD_SIZE_BYTES - take..].copy_from_slice(&bytes[bytes.len() - take..]);
    word
}

/// Right-pads `bytes` with zeroes to a full word, keeping only the first
/// word's worth of bytes if more are provided.
#[must_use]
pub fn pad_right(bytes: &[u8]) -> Word {
    let mut word = [0u8; WORD_SIZE_BYTES];
    let take = bytes.len().min(WORD_SIZE_BYTES);
    word[..take].copy_from_slice(&bytes[..take]);
    word
}

/// Sign-extends the two's complement number in `bytes` to a full word.
#[must_use]
pub fn sign_extend(bytes: &[u8]) -> Word {
    let negative = bytes.first().is_some_and(|b| b & 0x80 != 0);
    let mut word = if negative {
        [0xffu8; WORD_SIZE_BYTES]
    } else {
        [0u8; WORD_SIZE_BYTES]
    };
    let take = bytes.len().min(WORD_SIZE_BYTES);
    word[WORD_SIZE_BYTES - take..].copy_from_slice(&bytes[bytes.len() - take..]);
    word
}

/// Interprets `bytes` as a big-endian unsigned integer.
///
/// Only the last 32 bytes are considered if more are provided.
#[must_use]
pub fn to_u256(bytes: &[u8]) -> U256 {
    U256::from_be_bytes(pad_left(bytes))
}

/// Converts `value` to a `usize` if it is no larger than `limit`.
#[must_use]
pub fn to_bounded_usize(value: U256, limit: usize) -> Option<usize> {
    if value > U256::from(limit as u64) {
        None
    } else {
        Some(value.as_usize())
    }
}

/// A type alias to make [`U256Wrapper`] easier to type internally.
pub type U256W = U256Wrapper;

/// The `U256Wrapper` is responsible for allowing the serialisation of the
/// [`U256`] type to JSON.
///
/// It provides reasonable conversions from a number of common types used within
/// the library.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
#[repr(transparent)]
pub struct U256Wrapper(pub U256);

impl Debug for U256Wrapper {
    /// The wrapper has absolutely no semantic meaning, so we print the
    /// underlying value for the debug representation.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for U256Wrapper {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialOrd for U256Wrapper {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for U256Wrapper {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl From<U256> for U256Wrapper {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<U256Wrapper> for U256 {
    fn from(U256Wrapper(value): U256Wrapper) -> Self {
        value
    }
}

impl From<usize> for U256Wrapper {
    fn from(value: usize) -> Self {
        Self(U256::from(value as u128))
    }
}

impl From<u64> for U256Wrapper {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl Serialize for U256Wrapper {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_hex(self.0.to_be_bytes()))
    }
}

impl<'de> Deserialize<'de> for U256Wrapper {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        let u256 = U256::from_str_hex(&s).map_err(serde::de::Error::custom)?;
        Ok(U256Wrapper(u256))
    }
}

/// A 20-byte account address.
///
/// Addresses display and serialize in their [EIP-55](https://eips.ethereum.org/EIPS/eip-55)
/// checksummed form.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Address(pub [u8; ADDRESS_SIZE_BYTES]);

impl Address {
    /// Constructs an address from the last 20 bytes of `bytes`, left-padding
    /// with zeroes if fewer are provided.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Self {
        let word = pad_left(bytes);
        let mut address = [0u8; ADDRESS_SIZE_BYTES];
        address.copy_from_slice(&word[WORD_SIZE_BYTES - ADDRESS_SIZE_BYTES..]);
        Self(address)
    }

    /// Parses an address from a hex string, with or without a `0x` prefix.
    ///
    /// The checksum, if any, is not validated.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the string is not 20 bytes of valid hex.
    pub fn from_hex(string: &str) -> Result<Self, hex::FromHexError> {
        let digits = string.strip_prefix("0x").unwrap_or(string);
        let mut address = [0u8; ADDRESS_SIZE_BYTES];
        hex::decode_to_slice(digits, &mut address)?;
        Ok(Self(address))
    }

    /// Gets the address left-padded to a full word.
    #[must_use]
    pub fn to_word(&self) -> Word {
        pad_left(&self.0)
    }

    /// Renders the address with its EIP-55 checksum casing.
    #[must_use]
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());

        let mut result = String::from("0x");
        for (ix, c) in lower.chars().enumerate() {
            let nibble = if ix % 2 == 0 {
                hash[ix / 2] >> 4
            } else {
                hash[ix / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                result.push(c.to_ascii_uppercase());
            } else {
                result.push(c);
            }
        }

        result
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_checksum())
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use ethnum::U256;
    use serde_json::json;

    use crate::utility::{
        keccak256,
        pad_left,
        sign_extend,
        to_bounded_usize,
        to_hex,
        Address,
        U256Wrapper,
    };

    #[test]
    fn can_be_serialized() {
        let value = U256Wrapper(U256::from(0x42_u128));
        let expected = "0x0000000000000000000000000000000000000000000000000000000000000042";
        assert_eq!(json!(value).as_str(), Some(expected));
    }

    #[test]
    fn hashes_the_empty_string() {
        assert_eq!(
            to_hex(keccak256([])),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn sign_extends_negative_and_positive_values() {
        let negative = sign_extend(&[0xff, 0x80]);
        assert!(negative[..30].iter().all(|b| *b == 0xff));
        assert_eq!(&negative[30..], &[0xff, 0x80]);

        let positive = sign_extend(&[0x7f]);
        assert_eq!(positive, pad_left(&[0x7f]));
    }

    #[test]
    fn bounds_conversions_to_usize() {
        assert_eq!(to_bounded_usize(U256::from(10u32), 10), Some(10));
        assert_eq!(to_bounded_usize(U256::from(11u32), 10), None);
        assert_eq!(to_bounded_usize(U256::MAX, usize::MAX), None);
    }

    #[test]
    fn checksums_addresses() -> anyhow::Result<()> {
        // One of the reference vectors from EIP-55.
        let address = Address::from_hex("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed")?;
        assert_eq!(
            address.to_checksum(),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
        Ok(())
    }
}
