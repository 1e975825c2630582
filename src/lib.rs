//! This library decodes the raw bytes of a running or finished EVM execution
//! into typed values of the Solidity source program, for use by debuggers,
//! transaction explorers and other tools that need to show contract data to a
//! human.
//!
//! Given the static [`types::Type`] of a variable and a [`pointer::Pointer`]
//! saying where its bytes live, the [`Decoder`] produces a
//! [`value::DecodeResult`] tree. That tree may be only partially successful:
//! a field whose bytes are malformed is replaced by an error node, and the
//! rest of the value is still shown.
//!
//! # How it Works
//!
//! 1. The caller describes the static world in a [`info::DecoderInfo`]: the
//!    definitions of user-defined types, the contract currently executing and
//!    its internal function table, the contracts known by address, and the
//!    mapping keys that have been observed.
//! 2. The caller provides the raw bytes through an implementation of
//!    [`state::StateReader`], such as the in-memory [`state::EvmState`].
//! 3. The [`Decoder`] recurses through the type, following the data layout of
//!    the location the value lives in: the stack, memory, storage, or
//!    ABI-encoded calldata, event data and return data.
//!
//! # Basic Usage
//!
//! ```
//! use evm_value_decoder::{
//!     info::DecoderInfo,
//!     numeric::BigNum,
//!     pointer::Pointer,
//!     state::EvmState,
//!     types::Type,
//!     utility::pad_left,
//!     Decoder,
//! };
//!
//! let state = EvmState::new().push(pad_left(&[0x2a]));
//! let info = DecoderInfo::new();
//! let decoder: Decoder<_, BigNum> = Decoder::new(&state, &info);
//!
//! let result = decoder.decode(&Type::uint256(), &Pointer::stack(0)).unwrap();
//!
//! assert_eq!(result.to_string(), "42");
//! ```

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming

pub mod abi;
pub mod constant;
pub mod decode;
pub mod error;
pub mod info;
pub mod numeric;
pub mod pointer;
pub mod state;
pub mod storage;
pub mod types;
pub mod utility;
pub mod value;

// Re-exports to provide the library interface.
pub use decode::{Config, Decoder, PaddingMode};
pub use error::DecodingError;
pub use value::{DecodeResult, Value};
