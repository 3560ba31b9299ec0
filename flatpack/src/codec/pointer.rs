use std::{
    any::Any,
    io::{Read, Write},
    sync::Arc,
};

use crate::{
    codec::{Codec, FixedCodec, VariableCodec},
    shape::PointerInfo,
    Result,
};

/// Wraps the pointee codec, keeping its fixed or variable nature.
pub fn pointer_codec(name: &'static str, info: &PointerInfo, pointee: Codec) -> Codec {
    match pointee {
        Codec::Fixed(inner) => Codec::fixed(FixedPointerCodec {
            name,
            inner,
            get: info.get,
            get_or_insert: info.get_or_insert,
        }),
        Codec::Variable(inner) => Codec::variable(VariablePointerCodec {
            name,
            inner,
            get: info.get,
            get_or_insert: info.get_or_insert,
        }),
    }
}

pub struct FixedPointerCodec {
    name: &'static str,
    inner: Arc<dyn FixedCodec>,
    get: fn(&dyn Any) -> Option<&dyn Any>,
    get_or_insert: fn(&mut dyn Any) -> &mut dyn Any,
}

impl FixedCodec for FixedPointerCodec {
    // Also what an empty pointer measures as.
    fn length(&self) -> usize {
        self.inner.length()
    }

    fn decode(&self, bytes: &[u8], slot: &mut dyn Any) {
        self.inner.decode(bytes, (self.get_or_insert)(slot));
    }

    fn encode(&self, value: &dyn Any, bytes: &mut [u8]) {
        let Some(pointee) = (self.get)(value) else {
            panic!("Attempting to pack an empty `{}`", self.name);
        };
        self.inner.encode(pointee, bytes);
    }
}

pub struct VariablePointerCodec {
    name: &'static str,
    inner: Arc<dyn VariableCodec>,
    get: fn(&dyn Any) -> Option<&dyn Any>,
    get_or_insert: fn(&mut dyn Any) -> &mut dyn Any,
}

impl VariableCodec for VariablePointerCodec {
    fn decode(&self, reader: &mut dyn Read, slot: &mut dyn Any) -> Result<()> {
        self.inner.decode(reader, (self.get_or_insert)(slot))
    }

    fn encode(&self, writer: &mut dyn Write, value: &dyn Any) -> Result<()> {
        let Some(pointee) = (self.get)(value) else {
            panic!("Attempting to pack an empty `{}`", self.name);
        };
        self.inner.encode(writer, pointee)
    }

    fn measure(&self, value: &dyn Any) -> Result<usize> {
        let Some(pointee) = (self.get)(value) else {
            panic!(
                "Attempting to measure an empty `{}`, its length depends on the pointee",
                self.name
            );
        };
        self.inner.measure(pointee)
    }
}
