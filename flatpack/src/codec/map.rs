use std::{
    any::Any,
    io::{Read, Write},
};

use crate::{
    adaptor::{PackReadExt, PackWriteExt, LENGTH_PREFIX},
    codec::{Codec, VariableCodec},
    shape::{EntryFiller, EntryVisitor, MapInfo},
    Result,
};

/// `u32` entry count followed by key/value pairs in the container's iteration order.
///
/// The order is not canonical: two encodings of equal `HashMap`s may differ byte-wise.
pub struct MapCodec {
    key: Codec,
    value: Codec,
    len: fn(&dyn Any) -> usize,
    for_each: fn(&dyn Any, EntryVisitor<'_>) -> Result<()>,
    clear: fn(&mut dyn Any),
    insert_with: fn(&mut dyn Any, EntryFiller<'_>) -> Result<()>,
}

impl MapCodec {
    pub fn new(info: &MapInfo, key: Codec, value: Codec) -> Self {
        Self {
            key,
            value,
            len: info.len,
            for_each: info.for_each,
            clear: info.clear,
            insert_with: info.insert_with,
        }
    }
}

impl VariableCodec for MapCodec {
    fn decode(&self, reader: &mut dyn Read, slot: &mut dyn Any) -> Result<()> {
        let count = reader.get_length("map")?;

        (self.clear)(slot);
        for _ in 0..count {
            (self.insert_with)(slot, &mut |key, value| {
                self.key.decode_into(reader, key)?;
                self.value.decode_into(reader, value)
            })?;
        }

        Ok(())
    }

    fn encode(&self, writer: &mut dyn Write, value: &dyn Any) -> Result<()> {
        writer.write_length("map", (self.len)(value))?;

        (self.for_each)(value, &mut |key, value| {
            self.key.encode_from(writer, key)?;
            self.value.encode_from(writer, value)
        })
    }

    fn measure(&self, value: &dyn Any) -> Result<usize> {
        let mut size = LENGTH_PREFIX;

        (self.for_each)(value, &mut |key, value| {
            size += self.key.measure_length(key)?;
            size += self.value.measure_length(value)?;
            Ok(())
        })?;

        Ok(size)
    }
}
