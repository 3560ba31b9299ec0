use std::{
    any::Any,
    io::{Read, Write},
};

use crate::{
    codec::{Codec, VariableCodec},
    shape::{cast, cast_mut, PackHook, UnpackHook},
    Result,
};

/// Replaces the field-by-field encoding of a struct.
///
/// Declare it with `#[pack(packer)]` so the derive routes encoding through it.
pub trait Packer {
    fn pack(&self, writer: &mut dyn Write) -> Result<()>;
}

/// Replaces the field-by-field decoding of a struct.
///
/// Declare it with `#[pack(unpacker)]` so the derive routes decoding through it.
pub trait Unpacker {
    fn unpack(&mut self, reader: &mut dyn Read) -> Result<()>;
}

/// Type-erased entry into [`Packer::pack`], stored by the derive in [`StructInfo`](crate::StructInfo).
pub fn pack_hook<T: Packer + 'static>(value: &dyn Any, writer: &mut dyn Write) -> Result<()> {
    cast::<T>(value).pack(writer)
}

pub fn unpack_hook<T: Unpacker + 'static>(slot: &mut dyn Any, reader: &mut dyn Read) -> Result<()> {
    cast_mut::<T>(slot).unpack(reader)
}

pub enum PackPath {
    Hook(PackHook),
    Fields(Codec),
}

pub enum UnpackPath {
    Hook(UnpackHook),
    Fields(Codec),
}

/// A struct with at least one user hook.
///
/// The direction without a hook falls back to the regular field codec. A packer hook is measured
/// by running it against a scratch buffer.
pub struct CustomCodec {
    pack: PackPath,
    unpack: UnpackPath,
}

impl CustomCodec {
    pub fn new(pack: PackPath, unpack: UnpackPath) -> Self {
        Self { pack, unpack }
    }
}

impl VariableCodec for CustomCodec {
    fn decode(&self, reader: &mut dyn Read, slot: &mut dyn Any) -> Result<()> {
        match &self.unpack {
            UnpackPath::Hook(unpack) => unpack(slot, reader),
            UnpackPath::Fields(codec) => codec.decode_into(reader, slot),
        }
    }

    fn encode(&self, writer: &mut dyn Write, value: &dyn Any) -> Result<()> {
        match &self.pack {
            PackPath::Hook(pack) => pack(value, writer),
            PackPath::Fields(codec) => codec.encode_from(writer, value),
        }
    }

    fn measure(&self, value: &dyn Any) -> Result<usize> {
        match &self.pack {
            PackPath::Hook(pack) => {
                let mut buffer = Vec::new();
                pack(value, &mut buffer)?;
                Ok(buffer.len())
            }
            PackPath::Fields(codec) => codec.measure_length(value),
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::{Read, Write};

    use crate::{
        encoded_len, from_bytes, to_bytes, Error, Packable, Packer, Registry, Result, Unpacker,
    };

    /// Writes its value as a single byte, reads it back doubled.
    #[derive(Packable, Default, Debug, PartialEq)]
    #[pack(unpacker)]
    struct Doubled {
        value: u8,
    }

    impl Unpacker for Doubled {
        fn unpack(&mut self, reader: &mut dyn Read) -> Result<()> {
            let mut byte = [0u8; 1];
            reader.read_exact(&mut byte)?;
            self.value = byte[0] * 2;
            Ok(())
        }
    }

    /// Writes a fixed marker, reads its fields normally.
    #[derive(Packable, Default, Debug, PartialEq)]
    #[pack(packer)]
    struct Marked {
        value: u16,
    }

    impl Packer for Marked {
        fn pack(&self, writer: &mut dyn Write) -> Result<()> {
            writer.write_all(&[0xAB, 0xCD])?;
            Ok(())
        }
    }

    /// Text stored without a length prefix, terminated by a zero byte.
    #[derive(Packable, Default, Debug, PartialEq)]
    #[pack(packer, unpacker)]
    struct CString {
        text: String,
        #[pack(skip)]
        scratch: Vec<u8>,
    }

    impl Packer for CString {
        fn pack(&self, writer: &mut dyn Write) -> Result<()> {
            if self.text.contains('\0') {
                return Err(Error::custom("text contains a NUL byte"));
            }
            writer.write_all(self.text.as_bytes())?;
            writer.write_all(&[0])?;
            Ok(())
        }
    }

    impl Unpacker for CString {
        fn unpack(&mut self, reader: &mut dyn Read) -> Result<()> {
            self.scratch.clear();
            let mut byte = [0u8; 1];
            loop {
                reader.read_exact(&mut byte)?;
                if byte[0] == 0 {
                    break;
                }
                self.scratch.push(byte[0]);
            }
            self.text = String::from_utf8(std::mem::take(&mut self.scratch))?;
            Ok(())
        }
    }

    #[test]
    fn test_unpacker_only() {
        let value = Doubled { value: 21 };
        let bytes = to_bytes(&value).unwrap();
        assert_eq!(&bytes[..], [21u8]);
        assert_eq!(encoded_len(&value).unwrap(), 1);
        assert_eq!(from_bytes::<Doubled>(&bytes).unwrap(), Doubled { value: 42 });
        assert!(!Registry::global().resolve::<Doubled>().is_fixed());
    }

    #[test]
    fn test_packer_only() {
        let value = Marked { value: 7 };
        let bytes = to_bytes(&value).unwrap();
        assert_eq!(&bytes[..], [0xABu8, 0xCD]);
        assert_eq!(encoded_len(&value).unwrap(), 2);
        assert_eq!(
            from_bytes::<Marked>(&bytes).unwrap(),
            Marked { value: 0xABCD }
        );
    }

    #[test]
    fn test_both_hooks() {
        let value = CString {
            text: "hooked".to_string(),
            scratch: Vec::new(),
        };
        let bytes = to_bytes(&value).unwrap();
        assert_eq!(&bytes[..], b"hooked\0");
        assert_eq!(encoded_len(&value).unwrap(), 7);
        assert_eq!(from_bytes::<CString>(&bytes).unwrap(), value);
    }

    #[test]
    fn test_hook_errors_propagate() {
        let value = CString {
            text: "a\0b".to_string(),
            scratch: Vec::new(),
        };
        assert!(matches!(to_bytes(&value), Err(Error::Custom(_))));
        assert!(matches!(encoded_len(&value), Err(Error::Custom(_))));
        assert!(matches!(
            from_bytes::<CString>(b"unterminated"),
            Err(Error::Incomplete(_))
        ));
    }
}
