use std::io::{self, Read, Write};

use crate::{Error, Result, MAX_LENGTH};

/// Size of an encoded length prefix.
pub const LENGTH_PREFIX: usize = 4;

/// Chunk limit for buffers whose size comes off the wire.
const PREALLOCATION_LIMIT: usize = 64 * 1024;

pub trait PackReadExt {
    fn get_u32_be(&mut self) -> Result<u32>;

    /// Reads a length prefix, rejecting anything above [`MAX_LENGTH`].
    fn get_length(&mut self, what: &'static str) -> Result<usize>;

    /// Reads exactly `count` bytes.
    fn read_vec(&mut self, count: usize) -> Result<Vec<u8>>;
}

impl<R: Read + ?Sized> PackReadExt for R {
    fn get_u32_be(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf).map_err(Error::Incomplete)?;

        Ok(u32::from_be_bytes(buf))
    }

    fn get_length(&mut self, what: &'static str) -> Result<usize> {
        let len = self.get_u32_be()?;
        if len > MAX_LENGTH {
            return Err(Error::LargeLength {
                what,
                len: len.into(),
            });
        }

        Ok(len as usize)
    }

    fn read_vec(&mut self, count: usize) -> Result<Vec<u8>> {
        // The buffer only grows as bytes arrive, a forged prefix can't force a huge allocation.
        let mut buf = Vec::with_capacity(count.min(PREALLOCATION_LIMIT));
        Read::take(&mut *self, count as u64)
            .read_to_end(&mut buf)
            .map_err(Error::Incomplete)?;

        if buf.len() != count {
            return Err(Error::Incomplete(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {count} bytes, stream ended after {}", buf.len()),
            )));
        }

        Ok(buf)
    }
}

pub trait PackWriteExt {
    fn write_u32_be(&mut self, value: u32) -> Result<()>;

    /// Writes a length prefix, refusing anything above [`MAX_LENGTH`].
    fn write_length(&mut self, what: &'static str, len: usize) -> Result<()>;

    fn write_slice(&mut self, value: &[u8]) -> Result<()>;
}

impl<W: Write + ?Sized> PackWriteExt for W {
    fn write_u32_be(&mut self, value: u32) -> Result<()> {
        self.write_all(&value.to_be_bytes())
            .map_err(Error::Incomplete)?;
        Ok(())
    }

    fn write_length(&mut self, what: &'static str, len: usize) -> Result<()> {
        match u32::try_from(len) {
            Ok(len) if len <= MAX_LENGTH => self.write_u32_be(len),
            _ => Err(Error::LargeLength {
                what,
                len: len as u64,
            }),
        }
    }

    fn write_slice(&mut self, value: &[u8]) -> Result<()> {
        self.write_all(value).map_err(Error::Incomplete)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::adaptor::{PackReadExt, PackWriteExt};
    use crate::Error;

    #[test]
    fn test_length_roundtrip() {
        let mut bytes = Vec::new();
        bytes.write_length("test", 0x01020304).unwrap();
        assert_eq!(bytes, [0x01, 0x02, 0x03, 0x04]);
        assert_eq!((&bytes[..]).get_length("test").unwrap(), 0x01020304);
    }

    #[test]
    fn test_length_overflow() {
        let bytes = [0x80u8, 0x00, 0x00, 0x00];
        match (&bytes[..]).get_length("test") {
            Err(Error::LargeLength { what, len }) => {
                assert_eq!(what, "test");
                assert_eq!(len, 0x80000000);
            }
            other => panic!("Expected a length error, got {other:?}"),
        }

        let mut out = Vec::new();
        assert!(out.write_length("test", 0x80000000).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_read_vec_short() {
        let bytes = [1u8, 2, 3];
        let mut reader = &bytes[..];
        assert!(matches!(reader.read_vec(4), Err(Error::Incomplete(_))));

        let mut reader = &bytes[..];
        assert_eq!(reader.read_vec(2).unwrap(), [1, 2]);
        assert_eq!(reader, [3]);
    }
}
