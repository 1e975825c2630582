//! This module contains constants that are needed throughout the codebase.

/// The width of a byte on the EVM (and most other places) in bits.
pub const BYTE_SIZE_BITS: usize = 8;

/// The width of word on the EVM in bits.
pub const WORD_SIZE_BITS: usize = 256;

/// The width of a word on the EVM in bytes.
pub const WORD_SIZE_BYTES: usize = WORD_SIZE_BITS / BYTE_SIZE_BITS;

/// The width of an address in bytes.
pub const ADDRESS_SIZE_BYTES: usize = 20;

/// The width of a function selector in bytes.
pub const SELECTOR_SIZE_BYTES: usize = 4;

/// The width of a single program counter inside an internal function pointer.
pub const PC_SIZE_BYTES: usize = 4;

/// The width of an external function pointer, consisting of an address
/// followed by a selector, when packed into memory or storage.
pub const EXTERNAL_FUNCTION_SIZE_BYTES: usize = ADDRESS_SIZE_BYTES + SELECTOR_SIZE_BYTES;

/// The width of an internal function pointer, consisting of the constructor
/// program counter followed by the deployed program counter.
pub const INTERNAL_FUNCTION_SIZE_BYTES: usize = 2 * PC_SIZE_BYTES;

/// The number of bytes an enum occupies in storage.
///
/// The compiler caps enums at 256 members, so one byte always suffices.
pub const ENUM_SIZE_BYTES: usize = 1;

/// The number of bytes a boolean occupies in storage.
pub const BOOL_SIZE_BYTES: usize = 1;

/// The largest number of bytes a short `bytes` or `string` can hold while still
/// being stored inline in its slot.
pub const SHORT_STORAGE_STRING_MAX_BYTES: usize = WORD_SIZE_BYTES - 1;

/// The default upper bound on any length or pointer that the decoder will
/// materialise.
///
/// Values beyond this are reported as not implemented rather than decoded.
/// Storage has no known extent to check a length against, so this alone bounds
/// the number of elements built for a storage array.
pub const DEFAULT_MAX_DYNAMIC_LENGTH: usize = 1 << 16;

/// The default value for whether the decoder runs in strict ABI mode.
///
/// Strict mode rejects any data that is not perfectly well-formed ABI. See
/// [`crate::decode::Config`] for more information on what this entails.
pub const DEFAULT_STRICT_ABI_MODE_ENABLED: bool = false;
