//! A structural binary codec.
//!
//! Any type implementing [`Packable`] (usually through `#[derive(Packable)]`) can be written to
//! and read back from a byte stream without hand-written marshalling code. The first time a
//! type is used, the [`Registry`] compiles its shape into a [`Codec`] and caches it for the rest
//! of the process.
//!
//! The wire format is big-endian and has no type tags:
//!
//! | value                 | encoding                                          |
//! |-----------------------|---------------------------------------------------|
//! | `bool`, integers, floats | raw bytes, 1/2/4/8 wide                        |
//! | `String`              | `u32` byte length + UTF-8 bytes                   |
//! | `Vec<T>`              | `u32` element count + elements                    |
//! | `[T; N]`              | `N` elements                                      |
//! | maps                  | `u32` entry count + (key, value) pairs            |
//! | `Option<T>`, `Box<T>` | the pointee                                       |
//! | structs               | fields in declaration order                       |
//! | compressed field      | `u32` DEFLATE length + DEFLATE bytes              |
//!
//! Every length prefix is limited to `i32::MAX`.
//!
//! ```
//! use flatpack::Packable;
//!
//! #[derive(Packable, Default, Debug, PartialEq)]
//! struct Login {
//!     user: String,
//!     attempts: u16,
//!     #[pack(compress)]
//!     avatar: Vec<u8>,
//! }
//!
//! let login = Login { user: "root".into(), attempts: 3, avatar: vec![7; 512] };
//! let bytes = flatpack::to_bytes(&login).unwrap();
//! assert_eq!(flatpack::encoded_len(&login).unwrap(), bytes.len());
//! assert_eq!(flatpack::from_bytes::<Login>(&bytes).unwrap(), login);
//! ```

use std::{
    fmt::Display,
    io::{self, Read, Write},
    string::FromUtf8Error,
};

use bytes::Bytes;
use thiserror::Error;

extern crate self as flatpack;

pub mod adaptor;
pub mod codec;
mod impls;
pub mod registry;
pub mod shape;

pub use codec::compression::DEFAULT_COMPRESSION_LEVEL;
pub use codec::custom::{Packer, Unpacker};
pub use codec::{Codec, FixedCodec, VariableCodec};
pub use flatpack_macros::Packable;
pub use registry::Registry;
pub use shape::{
    ArrayInfo, FieldBinding, FieldInfo, Kind, MapInfo, Packable, PointerInfo, SequenceInfo,
    StructInfo, TypeInfo, TypeRef,
};

/// Largest value a length prefix may carry.
pub const MAX_LENGTH: u32 = i32::MAX as u32;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Stream was cut short or failed: {0}")]
    Incomplete(#[from] io::Error),
    #[error("Transmitted {what} length {len} is larger than {max}", max = MAX_LENGTH)]
    LargeLength { what: &'static str, len: u64 },
    #[error("Invalid utf8 string: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),
    #[error("{0}")]
    Custom(String),
}

impl Error {
    pub fn custom<T: Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Writes `value` to `writer`.
///
/// # Panics
///
/// When the type's schema is invalid (see [`Registry::resolve`]) or when `value` contains an
/// empty `Option` pointer, which has no wire representation.
pub fn to_writer<T: Packable>(value: &T, mut writer: impl Write) -> Result<()> {
    Registry::global()
        .resolve::<T>()
        .encode_from(&mut writer, value)
}

/// Convenience function that returns the encoded bytes.
pub fn to_bytes<T: Packable>(value: &T) -> Result<Bytes> {
    let codec = Registry::global().resolve::<T>();
    Ok(crate::codec::encode_to_vec(&codec, value)?.into())
}

/// Reads exactly one `T` from `reader`, overwriting `value`.
///
/// Empty `Option` pointers inside `value` are allocated as needed.
pub fn unpack_into<T: Packable>(mut reader: impl Read, value: &mut T) -> Result<()> {
    Registry::global()
        .resolve::<T>()
        .decode_into(&mut reader, value)
}

/// Reads exactly one `T` from `reader`, starting from `T::default()`.
pub fn from_reader<T: Packable>(reader: impl Read) -> Result<T> {
    let mut value = T::default();
    unpack_into(reader, &mut value)?;
    Ok(value)
}

pub fn from_bytes<T: Packable>(bytes: &[u8]) -> Result<T> {
    from_reader(bytes)
}

/// Returns the amount of bytes [`to_writer`] will produce for `value`.
///
/// Compressed fields and types with a custom [`Packer`] are measured by encoding them into a
/// scratch buffer.
pub fn encoded_len<T: Packable>(value: &T) -> Result<usize> {
    Registry::global().resolve::<T>().measure_length(value)
}
