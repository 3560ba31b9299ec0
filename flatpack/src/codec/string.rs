use std::{
    any::Any,
    io::{Read, Write},
};

use crate::{
    adaptor::{PackReadExt, PackWriteExt, LENGTH_PREFIX},
    codec::VariableCodec,
    shape::{cast, cast_mut},
    Error, Result,
};

/// `u32` byte length followed by UTF-8 bytes.
#[derive(Default)]
pub struct StringCodec;

impl VariableCodec for StringCodec {
    fn decode(&self, reader: &mut dyn Read, slot: &mut dyn Any) -> Result<()> {
        let len = reader.get_length("string")?;
        let bytes = reader.read_vec(len)?;
        *cast_mut::<String>(slot) = String::from_utf8(bytes).map_err(Error::InvalidUtf8)?;
        Ok(())
    }

    fn encode(&self, writer: &mut dyn Write, value: &dyn Any) -> Result<()> {
        let value = cast::<String>(value);
        writer.write_length("string", value.len())?;
        writer.write_slice(value.as_bytes())
    }

    fn measure(&self, value: &dyn Any) -> Result<usize> {
        Ok(LENGTH_PREFIX + cast::<String>(value).len())
    }
}
