use std::{
    any::Any,
    io::{Read, Write},
    sync::Arc,
};

use crate::{
    codec::{Codec, FixedCodec, VariableCodec},
    shape::{Getter, GetterMut},
    Result,
};

/// One encoded field: its codec and how to reach it inside the struct.
pub struct FieldSlot<C> {
    pub codec: C,
    pub get: Getter,
    pub get_mut: GetterMut,
}

/// Builds a struct codec from its fields in declaration order, `None` marking a skipped field.
///
/// The struct is fixed-size exactly when every encoded field is.
pub fn struct_codec(fields: Vec<Option<FieldSlot<Codec>>>) -> Codec {
    let mut size = Some(0usize);
    for slot in fields.iter().flatten() {
        size = match (size, slot.codec.fixed_len()) {
            (Some(total), Some(len)) => Some(total + len),
            _ => None,
        };
    }

    let Some(size) = size else {
        return Codec::variable(VariableStructCodec { fields });
    };

    let fields = fields
        .into_iter()
        .map(|slot| {
            slot.and_then(|slot| {
                Some(FieldSlot {
                    codec: slot.codec.as_fixed()?.clone(),
                    get: slot.get,
                    get_mut: slot.get_mut,
                })
            })
        })
        .collect();
    Codec::fixed(FixedStructCodec { size, fields })
}

/// Fields laid out back to back in a single buffer.
pub struct FixedStructCodec {
    size: usize,
    fields: Vec<Option<FieldSlot<Arc<dyn FixedCodec>>>>,
}

impl FixedCodec for FixedStructCodec {
    fn length(&self) -> usize {
        self.size
    }

    fn decode(&self, bytes: &[u8], slot: &mut dyn Any) {
        let mut offset = 0;
        for field in self.fields.iter().flatten() {
            let len = field.codec.length();
            field
                .codec
                .decode(&bytes[offset..offset + len], (field.get_mut)(slot));
            offset += len;
        }
    }

    fn encode(&self, value: &dyn Any, bytes: &mut [u8]) {
        let mut offset = 0;
        for field in self.fields.iter().flatten() {
            let len = field.codec.length();
            field
                .codec
                .encode((field.get)(value), &mut bytes[offset..offset + len]);
            offset += len;
        }
    }
}

/// Fields streamed one after another.
pub struct VariableStructCodec {
    fields: Vec<Option<FieldSlot<Codec>>>,
}

impl VariableCodec for VariableStructCodec {
    fn decode(&self, reader: &mut dyn Read, slot: &mut dyn Any) -> Result<()> {
        for field in self.fields.iter().flatten() {
            field.codec.decode_into(reader, (field.get_mut)(slot))?;
        }
        Ok(())
    }

    fn encode(&self, writer: &mut dyn Write, value: &dyn Any) -> Result<()> {
        for field in self.fields.iter().flatten() {
            field.codec.encode_from(writer, (field.get)(value))?;
        }
        Ok(())
    }

    fn measure(&self, value: &dyn Any) -> Result<usize> {
        let mut size = 0;
        for field in self.fields.iter().flatten() {
            size += field.codec.measure_length((field.get)(value))?;
        }
        Ok(size)
    }
}

#[cfg(test)]
mod test {
    use crate::{encoded_len, from_bytes, to_bytes, unpack_into, Packable, Registry};

    #[derive(Packable, Default, Debug, PartialEq)]
    struct Header {
        version: u8,
        #[pack(skip)]
        cached: Option<String>,
        flags: u16,
        checksum: u32,
    }

    #[derive(Packable, Default, Debug, PartialEq)]
    struct Frame {
        header: Header,
        position: [f32; 3],
        alive: bool,
    }

    #[derive(Packable, Default, Debug, PartialEq)]
    struct Named(String, u8);

    #[derive(Packable, Default, Debug, PartialEq)]
    struct Message {
        header: Header,
        #[pack(compress)]
        body: Vec<u8>,
    }

    #[derive(Packable, Default, Debug, PartialEq)]
    struct Empty;

    #[derive(Packable, Default, Debug, PartialEq)]
    struct Pair<T> {
        left: T,
        right: T,
    }

    #[test]
    fn test_fixed_struct_layout() {
        let codec = Registry::global().resolve::<Header>();
        assert_eq!(codec.fixed_len(), Some(7));

        let value = Header {
            version: 1,
            cached: None,
            flags: 0x0203,
            checksum: 0x04050607,
        };
        let bytes = to_bytes(&value).unwrap();
        assert_eq!(&bytes[..], [1u8, 2, 3, 4, 5, 6, 7]);
        assert_eq!(from_bytes::<Header>(&bytes).unwrap(), value);
    }

    #[test]
    fn test_skipped_field_is_untouched() {
        let mut target = Header {
            cached: Some("kept".to_string()),
            ..Default::default()
        };
        unpack_into(&[9u8, 0, 0, 0, 0, 0, 1][..], &mut target).unwrap();
        assert_eq!(target.version, 9);
        assert_eq!(target.checksum, 1);
        assert_eq!(target.cached.as_deref(), Some("kept"));

        // Skipped fields are not packed either, even when set.
        assert_eq!(encoded_len(&target).unwrap(), 7);
    }

    #[test]
    fn test_nested_fixed_struct() {
        let codec = Registry::global().resolve::<Frame>();
        assert_eq!(codec.fixed_len(), Some(7 + 12 + 1));

        let value = Frame {
            header: Header {
                version: 2,
                cached: None,
                flags: 0xFFFF,
                checksum: 0,
            },
            position: [1.0, -2.0, 0.5],
            alive: true,
        };
        let bytes = to_bytes(&value).unwrap();
        assert_eq!(bytes.len(), 20);
        assert_eq!(from_bytes::<Frame>(&bytes).unwrap(), value);
    }

    #[test]
    fn test_tuple_struct() {
        assert!(!Registry::global().resolve::<Named>().is_fixed());

        let value = Named("tuple".to_string(), 5);
        let bytes = to_bytes(&value).unwrap();
        assert_eq!(&bytes[..], b"\x00\x00\x00\x05tuple\x05");
        assert_eq!(encoded_len(&value).unwrap(), 10);
        assert_eq!(from_bytes::<Named>(&bytes).unwrap(), value);
    }

    #[test]
    fn test_compressed_field_makes_struct_variable() {
        assert!(!Registry::global().resolve::<Message>().is_fixed());

        let value = Message {
            header: Header {
                version: 3,
                ..Default::default()
            },
            body: b"abcabcabcabcabcabcabcabc".to_vec(),
        };
        let bytes = to_bytes(&value).unwrap();
        assert_eq!(&bytes[..7], [3u8, 0, 0, 0, 0, 0, 0]);
        assert_eq!(encoded_len(&value).unwrap(), bytes.len());
        assert_eq!(from_bytes::<Message>(&bytes).unwrap(), value);
    }

    #[test]
    fn test_empty_struct() {
        assert_eq!(Registry::global().resolve::<Empty>().fixed_len(), Some(0));
        assert!(to_bytes(&Empty).unwrap().is_empty());
        assert_eq!(from_bytes::<Empty>(&[]).unwrap(), Empty);
    }

    #[test]
    fn test_generic_struct() {
        assert_eq!(Registry::global().resolve::<Pair<u32>>().fixed_len(), Some(8));
        assert!(!Registry::global().resolve::<Pair<String>>().is_fixed());

        let value = Pair {
            left: "l".to_string(),
            right: "r".to_string(),
        };
        let bytes = to_bytes(&value).unwrap();
        assert_eq!(from_bytes::<Pair<String>>(&bytes).unwrap(), value);
    }
}
