use std::{
    any::Any,
    io::{Read, Write},
    sync::Arc,
};

use crate::{
    adaptor::{PackReadExt, PackWriteExt, LENGTH_PREFIX},
    codec::{Codec, FixedCodec, VariableCodec},
    shape::{ArrayInfo, SequenceInfo},
    Error, Result,
};

/// `u32` element count followed by the elements.
///
/// Fixed-size elements are packed into one buffer and transferred in a single call.
pub struct SequenceCodec {
    element: Codec,
    len: fn(&dyn Any) -> usize,
    get: fn(&dyn Any, usize) -> &dyn Any,
    reset: fn(&mut dyn Any, usize),
    push: fn(&mut dyn Any) -> &mut dyn Any,
}

impl SequenceCodec {
    pub fn new(info: &SequenceInfo, element: Codec) -> Self {
        Self {
            element,
            len: info.len,
            get: info.get,
            reset: info.reset,
            push: info.push,
        }
    }
}

/// Elements reserved up front when their encoding has to be streamed.
const RESERVE_LIMIT: usize = 1024;

/// Byte size of `count` packed elements.
fn packed_size(count: usize, width: usize) -> Result<usize> {
    count.checked_mul(width).ok_or(Error::LargeLength {
        what: "sequence",
        len: count as u64,
    })
}

impl VariableCodec for SequenceCodec {
    fn decode(&self, reader: &mut dyn Read, slot: &mut dyn Any) -> Result<()> {
        let count = reader.get_length("sequence")?;

        match &self.element {
            Codec::Fixed(element) => {
                let width = element.length();
                let packed = reader.read_vec(packed_size(count, width)?)?;

                (self.reset)(slot, count);
                if width == 0 {
                    for _ in 0..count {
                        element.decode(&[], (self.push)(slot));
                    }
                } else {
                    for chunk in packed.chunks_exact(width) {
                        element.decode(chunk, (self.push)(slot));
                    }
                }
            }
            Codec::Variable(element) => {
                (self.reset)(slot, count.min(RESERVE_LIMIT));
                for _ in 0..count {
                    element.decode(reader, (self.push)(slot))?;
                }
            }
        }

        Ok(())
    }

    fn encode(&self, writer: &mut dyn Write, value: &dyn Any) -> Result<()> {
        let count = (self.len)(value);
        writer.write_length("sequence", count)?;

        match &self.element {
            Codec::Fixed(element) => {
                let width = element.length();
                let mut packed = vec![0u8; packed_size(count, width)?];
                if width > 0 {
                    for (index, chunk) in packed.chunks_exact_mut(width).enumerate() {
                        element.encode((self.get)(value, index), chunk);
                    }
                }
                writer.write_slice(&packed)
            }
            Codec::Variable(element) => {
                for index in 0..count {
                    element.encode(writer, (self.get)(value, index))?;
                }
                Ok(())
            }
        }
    }

    fn measure(&self, value: &dyn Any) -> Result<usize> {
        let count = (self.len)(value);

        match &self.element {
            Codec::Fixed(element) => Ok(LENGTH_PREFIX + packed_size(count, element.length())?),
            Codec::Variable(element) => {
                let mut size = LENGTH_PREFIX;
                for index in 0..count {
                    size += element.measure((self.get)(value, index))?;
                }
                Ok(size)
            }
        }
    }
}

/// Builds the codec for `[T; N]`: `N` elements without a count prefix.
pub fn array_codec(info: &ArrayInfo, element: Codec) -> Codec {
    match element {
        Codec::Fixed(element) => Codec::fixed(FixedArrayCodec {
            size: element.length() * info.len,
            element,
            len: info.len,
            get: info.get,
            get_mut: info.get_mut,
        }),
        Codec::Variable(element) => Codec::variable(VariableArrayCodec {
            element,
            len: info.len,
            get: info.get,
            get_mut: info.get_mut,
        }),
    }
}

pub struct FixedArrayCodec {
    size: usize,
    element: Arc<dyn FixedCodec>,
    len: usize,
    get: fn(&dyn Any, usize) -> &dyn Any,
    get_mut: fn(&mut dyn Any, usize) -> &mut dyn Any,
}

impl FixedCodec for FixedArrayCodec {
    fn length(&self) -> usize {
        self.size
    }

    fn decode(&self, bytes: &[u8], slot: &mut dyn Any) {
        let width = self.element.length();
        for index in 0..self.len {
            let offset = index * width;
            self.element
                .decode(&bytes[offset..offset + width], (self.get_mut)(slot, index));
        }
    }

    fn encode(&self, value: &dyn Any, bytes: &mut [u8]) {
        let width = self.element.length();
        for index in 0..self.len {
            let offset = index * width;
            self.element
                .encode((self.get)(value, index), &mut bytes[offset..offset + width]);
        }
    }
}

pub struct VariableArrayCodec {
    element: Arc<dyn VariableCodec>,
    len: usize,
    get: fn(&dyn Any, usize) -> &dyn Any,
    get_mut: fn(&mut dyn Any, usize) -> &mut dyn Any,
}

impl VariableCodec for VariableArrayCodec {
    fn decode(&self, reader: &mut dyn Read, slot: &mut dyn Any) -> Result<()> {
        for index in 0..self.len {
            self.element.decode(reader, (self.get_mut)(slot, index))?;
        }
        Ok(())
    }

    fn encode(&self, writer: &mut dyn Write, value: &dyn Any) -> Result<()> {
        for index in 0..self.len {
            self.element.encode(writer, (self.get)(value, index))?;
        }
        Ok(())
    }

    fn measure(&self, value: &dyn Any) -> Result<usize> {
        let mut size = 0;
        for index in 0..self.len {
            size += self.element.measure((self.get)(value, index))?;
        }
        Ok(size)
    }
}
