use std::{any::Any, marker::PhantomData};

use crate::{
    codec::{Codec, FixedCodec},
    shape::{cast, cast_mut, Kind},
};

/// A number stored as its big-endian bytes.
pub trait BigEndian: Copy + Any {
    const WIDTH: usize;

    fn read(bytes: &[u8]) -> Self;

    fn write(self, bytes: &mut [u8]);
}

macro_rules! impl_big_endian {
    ($($ty:ty),*) => {
        $(
            impl BigEndian for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                fn read(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(&bytes[..Self::WIDTH]);
                    <$ty>::from_be_bytes(buf)
                }

                fn write(self, bytes: &mut [u8]) {
                    bytes[..Self::WIDTH].copy_from_slice(&self.to_be_bytes());
                }
            }
        )*
    };
}

// Floats go through `to_be_bytes`, which is their IEEE-754 bit pattern.
impl_big_endian!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);

pub struct NumberCodec<T>(PhantomData<fn() -> T>);

impl<T> Default for NumberCodec<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: BigEndian> FixedCodec for NumberCodec<T> {
    fn length(&self) -> usize {
        T::WIDTH
    }

    fn decode(&self, bytes: &[u8], slot: &mut dyn Any) {
        *cast_mut::<T>(slot) = T::read(bytes);
    }

    fn encode(&self, value: &dyn Any, bytes: &mut [u8]) {
        cast::<T>(value).write(bytes);
    }
}

/// One byte, `0` or `1` on the wire. Any non-zero byte decodes to `true`.
#[derive(Default)]
pub struct BoolCodec;

impl FixedCodec for BoolCodec {
    fn length(&self) -> usize {
        1
    }

    fn decode(&self, bytes: &[u8], slot: &mut dyn Any) {
        *cast_mut::<bool>(slot) = bytes[0] != 0;
    }

    fn encode(&self, value: &dyn Any, bytes: &mut [u8]) {
        bytes[0] = u8::from(*cast::<bool>(value));
    }
}

/// Looks up the primitive codec for `kind`, `None` if it is not a primitive.
pub fn primitive_codec(kind: &Kind) -> Option<Codec> {
    let codec = match kind {
        Kind::Bool => Codec::fixed(BoolCodec),
        Kind::I8 => Codec::fixed(NumberCodec::<i8>::default()),
        Kind::U8 => Codec::fixed(NumberCodec::<u8>::default()),
        Kind::I16 => Codec::fixed(NumberCodec::<i16>::default()),
        Kind::U16 => Codec::fixed(NumberCodec::<u16>::default()),
        Kind::I32 => Codec::fixed(NumberCodec::<i32>::default()),
        Kind::U32 => Codec::fixed(NumberCodec::<u32>::default()),
        Kind::I64 => Codec::fixed(NumberCodec::<i64>::default()),
        Kind::U64 => Codec::fixed(NumberCodec::<u64>::default()),
        Kind::F32 => Codec::fixed(NumberCodec::<f32>::default()),
        Kind::F64 => Codec::fixed(NumberCodec::<f64>::default()),
        _ => return None,
    };
    Some(codec)
}

#[cfg(test)]
mod test {
    use crate::codec::primitive::{primitive_codec, BoolCodec};
    use crate::codec::FixedCodec;
    use crate::shape::Kind;

    #[test]
    fn test_big_endian_layout() {
        let codec = primitive_codec(&Kind::U32).unwrap();
        let mut bytes = Vec::new();
        codec.encode_from(&mut bytes, &0x01020304u32).unwrap();
        assert_eq!(bytes, [0x01, 0x02, 0x03, 0x04]);

        let codec = primitive_codec(&Kind::I16).unwrap();
        let mut bytes = Vec::new();
        codec.encode_from(&mut bytes, &-2i16).unwrap();
        assert_eq!(bytes, [0xFF, 0xFE]);
    }

    #[test]
    fn test_float_bits() {
        let codec = primitive_codec(&Kind::F64).unwrap();
        let mut bytes = Vec::new();
        codec.encode_from(&mut bytes, &1.0f64).unwrap();
        assert_eq!(bytes, 1.0f64.to_bits().to_be_bytes());

        let mut value = 0.0f32;
        let codec = primitive_codec(&Kind::F32).unwrap();
        codec
            .decode_into(&mut &(-2.5f32).to_bits().to_be_bytes()[..], &mut value)
            .unwrap();
        assert_eq!(value, -2.5);
    }

    #[test]
    fn test_bool_any_nonzero_is_true() {
        let mut value = false;
        BoolCodec.decode(&[0x7F], &mut value);
        assert!(value);
        BoolCodec.decode(&[0x00], &mut value);
        assert!(!value);

        let mut bytes = [0xAA];
        BoolCodec.encode(&true, &mut bytes);
        assert_eq!(bytes, [1]);
    }

    #[test]
    fn test_widths() {
        let widths = [
            (Kind::Bool, 1),
            (Kind::I8, 1),
            (Kind::U8, 1),
            (Kind::I16, 2),
            (Kind::U16, 2),
            (Kind::I32, 4),
            (Kind::U32, 4),
            (Kind::F32, 4),
            (Kind::I64, 8),
            (Kind::U64, 8),
            (Kind::F64, 8),
        ];
        for (kind, width) in widths {
            assert_eq!(primitive_codec(&kind).unwrap().fixed_len(), Some(width));
        }
        assert!(primitive_codec(&Kind::String).is_none());
    }
}
