use std::{
    any::Any,
    io::{Read, Write},
};

use flate2::{read::DeflateDecoder, write::DeflateEncoder, Compression};
use log::trace;

use crate::{
    adaptor::{PackReadExt, PackWriteExt, LENGTH_PREFIX},
    codec::{Codec, VariableCodec},
    Error, Result,
};

/// Level used by a bare `#[pack(compress)]`, best compression.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 9;

/// Highest level DEFLATE accepts.
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Stores the inner encoding as a raw DEFLATE stream behind a `u32` length prefix.
///
/// Always variable-size, whatever the inner codec is.
pub struct CompressionCodec {
    level: u32,
    inner: Codec,
}

impl CompressionCodec {
    /// # Panics
    ///
    /// If `level` is above [`MAX_COMPRESSION_LEVEL`].
    pub fn new(level: u32, inner: Codec) -> Self {
        assert!(
            level <= MAX_COMPRESSION_LEVEL,
            "Invalid compression level {level}, expected 0..={MAX_COMPRESSION_LEVEL}"
        );
        Self { level, inner }
    }

    fn compress(&self, value: &dyn Any) -> Result<Vec<u8>> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::new(self.level));
        self.inner.encode_from(&mut encoder, value)?;
        let compressed = encoder.finish().map_err(Error::Incomplete)?;

        trace!(
            "Produced a {} byte compression frame at level {}",
            compressed.len(),
            self.level
        );
        Ok(compressed)
    }
}

impl VariableCodec for CompressionCodec {
    fn decode(&self, reader: &mut dyn Read, slot: &mut dyn Any) -> Result<()> {
        let len = reader.get_length("compression frame")?;
        let compressed = reader.read_vec(len)?;

        let mut decoder = DeflateDecoder::new(&compressed[..]);
        self.inner.decode_into(&mut decoder, slot)
    }

    fn encode(&self, writer: &mut dyn Write, value: &dyn Any) -> Result<()> {
        let compressed = self.compress(value)?;
        writer.write_length("compression frame", compressed.len())?;
        writer.write_slice(&compressed)
    }

    fn measure(&self, value: &dyn Any) -> Result<usize> {
        Ok(LENGTH_PREFIX + self.compress(value)?.len())
    }
}

#[cfg(test)]
mod test {
    use flate2::read::DeflateDecoder;
    use std::io::Read;

    use crate::codec::compression::CompressionCodec;
    use crate::codec::VariableCodec;
    use crate::{encoded_len, from_bytes, to_bytes, Error, Packable, Registry};

    #[derive(Packable, Default, Debug, PartialEq)]
    struct Blob {
        #[pack(compress)]
        data: Vec<u8>,
    }

    #[derive(Packable, Default, Debug, PartialEq)]
    struct Stored {
        #[pack(compress = 0)]
        counter: u32,
    }

    #[test]
    fn test_roundtrip() {
        let value = Blob {
            data: vec![0x42; 10000],
        };
        let bytes = to_bytes(&value).unwrap();
        assert!(bytes.len() < 100);
        assert_eq!(encoded_len(&value).unwrap(), bytes.len());
        assert_eq!(from_bytes::<Blob>(&bytes).unwrap(), value);
    }

    #[test]
    fn test_fixed_inner_is_variable() {
        let codec = Registry::global().resolve::<Stored>();
        assert!(!codec.is_fixed());

        let value = Stored { counter: 0xCAFE };
        let bytes = to_bytes(&value).unwrap();
        assert_eq!(from_bytes::<Stored>(&bytes).unwrap(), value);
    }

    #[test]
    fn test_frame_is_raw_deflate() {
        let inner = Registry::global().resolve::<Vec<u8>>();
        let codec = CompressionCodec::new(6, inner);
        let mut bytes = Vec::new();
        codec.encode(&mut bytes, &vec![1u8, 2, 3]).unwrap();

        let frame_len = u32::from_be_bytes(bytes[..4].try_into().unwrap()) as usize;
        assert_eq!(frame_len, bytes.len() - 4);

        let mut inflated = Vec::new();
        DeflateDecoder::new(&bytes[4..])
            .read_to_end(&mut inflated)
            .unwrap();
        assert_eq!(inflated, [0u8, 0, 0, 3, 1, 2, 3]);
    }

    #[test]
    fn test_oversized_frame() {
        let bytes = [0xFFu8, 0xFF, 0xFF, 0xFF];
        assert!(matches!(
            from_bytes::<Blob>(&bytes),
            Err(Error::LargeLength {
                what: "compression frame",
                ..
            })
        ));
    }

    #[test]
    fn test_corrupt_frame() {
        // A reserved block type is never valid DEFLATE.
        let bytes = [0x00u8, 0x00, 0x00, 0x02, 0xFF, 0xFF];
        assert!(matches!(
            from_bytes::<Blob>(&bytes),
            Err(Error::Incomplete(_))
        ));
    }

    #[test]
    #[should_panic(expected = "Invalid compression level")]
    fn test_invalid_level() {
        let inner = Registry::global().resolve::<u8>();
        let _ = CompressionCodec::new(10, inner);
    }
}
