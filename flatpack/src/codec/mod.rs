use std::{
    any::Any,
    io::{Read, Write},
    sync::Arc,
};

use crate::{Error, Result};

pub mod compression;
pub mod custom;
pub mod map;
pub mod pointer;
pub mod primitive;
pub mod sequence;
pub mod string;
pub mod structure;

/// A codec whose encoding always has the same length.
///
/// Transcoding works on a byte region of exactly [`FixedCodec::length`] bytes and cannot fail.
pub trait FixedCodec: Send + Sync {
    fn length(&self) -> usize;

    fn decode(&self, bytes: &[u8], slot: &mut dyn Any);

    fn encode(&self, value: &dyn Any, bytes: &mut [u8]);
}

/// A codec whose encoding length depends on the value.
pub trait VariableCodec: Send + Sync {
    fn decode(&self, reader: &mut dyn Read, slot: &mut dyn Any) -> Result<()>;

    fn encode(&self, writer: &mut dyn Write, value: &dyn Any) -> Result<()>;

    /// Exact number of bytes [`VariableCodec::encode`] writes for `value`.
    fn measure(&self, value: &dyn Any) -> Result<usize>;
}

/// The compiled encoding of one type.
///
/// Cloning is cheap; every clone shares the same codec.
#[derive(Clone)]
pub enum Codec {
    Fixed(Arc<dyn FixedCodec>),
    Variable(Arc<dyn VariableCodec>),
}

impl Codec {
    pub fn fixed(codec: impl FixedCodec + 'static) -> Self {
        Codec::Fixed(Arc::new(codec))
    }

    pub fn variable(codec: impl VariableCodec + 'static) -> Self {
        Codec::Variable(Arc::new(codec))
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Codec::Fixed(_))
    }

    /// The encoded length, if it does not depend on the value.
    pub fn fixed_len(&self) -> Option<usize> {
        match self {
            Codec::Fixed(codec) => Some(codec.length()),
            Codec::Variable(_) => None,
        }
    }

    pub fn as_fixed(&self) -> Option<&Arc<dyn FixedCodec>> {
        match self {
            Codec::Fixed(codec) => Some(codec),
            Codec::Variable(_) => None,
        }
    }

    /// Whether both handles point at the same codec instance.
    pub fn ptr_eq(&self, other: &Codec) -> bool {
        match (self, other) {
            (Codec::Fixed(a), Codec::Fixed(b)) => Arc::ptr_eq(a, b),
            (Codec::Variable(a), Codec::Variable(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Reads one value from `reader` into `slot`.
    pub fn decode_into(&self, reader: &mut dyn Read, slot: &mut dyn Any) -> Result<()> {
        match self {
            Codec::Fixed(codec) => {
                let mut buf = vec![0u8; codec.length()];
                reader.read_exact(&mut buf).map_err(Error::Incomplete)?;
                codec.decode(&buf, slot);
                Ok(())
            }
            Codec::Variable(codec) => codec.decode(reader, slot),
        }
    }

    /// Writes `value` to `writer`.
    pub fn encode_from(&self, writer: &mut dyn Write, value: &dyn Any) -> Result<()> {
        match self {
            Codec::Fixed(codec) => {
                let mut buf = vec![0u8; codec.length()];
                codec.encode(value, &mut buf);
                writer.write_all(&buf).map_err(Error::Incomplete)?;
                Ok(())
            }
            Codec::Variable(codec) => codec.encode(writer, value),
        }
    }

    /// Number of bytes [`Codec::encode_from`] writes for `value`.
    ///
    /// Fixed-size codecs never look at `value`.
    pub fn measure_length(&self, value: &dyn Any) -> Result<usize> {
        match self {
            Codec::Fixed(codec) => Ok(codec.length()),
            Codec::Variable(codec) => codec.measure(value),
        }
    }
}

/// Encodes into a scratch buffer.
pub(crate) fn encode_to_vec(codec: &Codec, value: &dyn Any) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(codec.fixed_len().unwrap_or_default());
    codec.encode_from(&mut buffer, value)?;
    Ok(buffer)
}
