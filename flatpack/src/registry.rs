//! Codec construction and caching.
//!
//! A type's codec is built on first use and then shared for the lifetime of the [`Registry`].
//! Construction of recursive types goes through a forwarding codec that is bound once the real
//! one is known, so resolving a type that mentions itself terminates.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    io::{Read, Write},
    sync::{Arc, LazyLock, OnceLock},
};

use log::{debug, trace};
use parking_lot::{Mutex, RwLock};

use crate::{
    codec::{
        compression::{CompressionCodec, MAX_COMPRESSION_LEVEL},
        custom::{CustomCodec, PackPath, UnpackPath},
        map::MapCodec,
        pointer::pointer_codec,
        primitive::primitive_codec,
        sequence::{array_codec, SequenceCodec},
        string::StringCodec,
        structure::{struct_codec, FieldSlot},
        Codec, VariableCodec,
    },
    shape::{FieldBinding, FieldInfo, Kind, Packable, StructInfo, TypeRef},
    Result,
};

static GLOBAL: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Cache of built codecs, keyed by type.
///
/// Lookups only take a read lock. Construction is serialized, and everything one construction
/// creates becomes visible to other threads at once, after it is complete.
#[derive(Default)]
pub struct Registry {
    codecs: RwLock<HashMap<TypeId, Codec>>,
    build: Mutex<()>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by [`to_writer`](crate::to_writer) and friends.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Returns the codec for `T`, building it on first use.
    ///
    /// # Panics
    ///
    /// If `T` or a type it contains has no encoding: `isize`/`usize`, `char`, `()`, or a field
    /// declared with a compression level above 9. Nothing is cached in that case.
    pub fn resolve<T: Packable>(&self) -> Codec {
        self.resolve_ref(TypeRef::of::<T>())
    }

    pub fn resolve_ref(&self, ty: TypeRef) -> Codec {
        if let Some(codec) = self.codecs.read().get(&ty.id) {
            return codec.clone();
        }

        let _guard = self.build.lock();
        // Another thread may have finished the same type while we waited.
        if let Some(codec) = self.codecs.read().get(&ty.id) {
            return codec.clone();
        }

        let mut builder = Builder {
            published: &self.codecs,
            staged: HashMap::new(),
        };
        let codec = builder.codec_for(ty);

        let staged = builder.staged;
        debug!("Publishing {} codec(s) for `{}`", staged.len(), ty.name);
        self.codecs.write().extend(staged);

        codec
    }

    /// Number of types with a published codec.
    pub fn len(&self) -> usize {
        self.codecs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.read().is_empty()
    }
}

struct Builder<'a> {
    published: &'a RwLock<HashMap<TypeId, Codec>>,
    staged: HashMap<TypeId, Codec>,
}

impl Builder<'_> {
    fn codec_for(&mut self, ty: TypeRef) -> Codec {
        if let Some(codec) = self.staged.get(&ty.id) {
            return codec.clone();
        }
        if let Some(codec) = self.published.read().get(&ty.id) {
            return codec.clone();
        }

        let info = (ty.describe)();
        let codec = match info.kind {
            Kind::Struct(info) => self.struct_codec(ty, info),
            Kind::String => Codec::variable(StringCodec),
            Kind::Sequence(info) => {
                let element = self.codec_for(info.element);
                Codec::variable(SequenceCodec::new(&info, element))
            }
            Kind::Array(info) => {
                let element = self.codec_for(info.element);
                array_codec(&info, element)
            }
            Kind::Map(info) => {
                let key = self.codec_for(info.key);
                let value = self.codec_for(info.value);
                Codec::variable(MapCodec::new(&info, key, value))
            }
            Kind::Pointer(info) => {
                let pointee = self.codec_for(info.pointee);
                pointer_codec(ty.name, &info, pointee)
            }
            Kind::PlatformWidth => panic!(
                "`{}` has a platform dependent width, use a sized integer instead",
                ty.name
            ),
            Kind::Unsupported(reason) => panic!("Cannot pack `{}`: {reason}", ty.name),
            kind => primitive_codec(&kind).unwrap_or_else(|| {
                panic!("No codec for `{}` of kind {}", ty.name, kind.label())
            }),
        };

        match codec.fixed_len() {
            Some(len) => debug!("Built fixed codec for `{}` ({len} bytes)", ty.name),
            None => debug!("Built variable codec for `{}`", ty.name),
        }
        self.staged.insert(ty.id, codec.clone());
        codec
    }

    fn struct_codec(&mut self, ty: TypeRef, info: StructInfo) -> Codec {
        // Fields that lead back to this struct resolve to the placeholder.
        let forward = Arc::new(Forward {
            name: ty.name,
            target: OnceLock::new(),
        });
        self.staged.insert(ty.id, Codec::Variable(forward.clone()));

        let codec = match (info.packer, info.unpacker) {
            (Some(pack), Some(unpack)) => Codec::variable(CustomCodec::new(
                PackPath::Hook(pack),
                UnpackPath::Hook(unpack),
            )),
            (None, None) => self.fields_codec(ty, &info.fields),
            (packer, unpacker) => {
                let fields = self.fields_codec(ty, &info.fields);
                let pack = packer.map_or_else(|| PackPath::Fields(fields.clone()), PackPath::Hook);
                let unpack = unpacker.map_or(UnpackPath::Fields(fields), UnpackPath::Hook);
                Codec::variable(CustomCodec::new(pack, unpack))
            }
        };

        forward.bind(codec.clone());
        trace!("Bound forwarding codec for `{}`", ty.name);
        codec
    }

    fn fields_codec(&mut self, ty: TypeRef, fields: &[FieldInfo]) -> Codec {
        let slots = fields
            .iter()
            .map(|field| match field.binding {
                FieldBinding::Skipped => None,
                FieldBinding::Packed {
                    ty: field_ty,
                    compression,
                    get,
                    get_mut,
                } => {
                    let mut codec = self.codec_for(field_ty);
                    if let Some(level) = compression {
                        assert!(
                            level <= MAX_COMPRESSION_LEVEL,
                            "Invalid compression level {level} on field `{}` of `{}`, expected 0..={MAX_COMPRESSION_LEVEL}",
                            field.name,
                            ty.name
                        );
                        codec = Codec::variable(CompressionCodec::new(level, codec));
                    }
                    Some(FieldSlot {
                        codec,
                        get,
                        get_mut,
                    })
                }
            })
            .collect();

        struct_codec(slots)
    }
}

/// Stands in for a struct codec while it is being built.
///
/// Always variable-size. Codecs holding one form a reference cycle with the struct codec; both
/// live as long as the registry's process, so the cycle is never collected.
struct Forward {
    name: &'static str,
    target: OnceLock<Codec>,
}

impl Forward {
    fn bind(&self, codec: Codec) {
        assert!(
            self.target.set(codec).is_ok(),
            "Codec for `{}` was built twice",
            self.name
        );
    }

    fn target(&self) -> &Codec {
        self.target
            .get()
            .unwrap_or_else(|| panic!("Codec for `{}` used before it was built", self.name))
    }
}

impl VariableCodec for Forward {
    fn decode(&self, reader: &mut dyn Read, slot: &mut dyn Any) -> Result<()> {
        self.target().decode_into(reader, slot)
    }

    fn encode(&self, writer: &mut dyn Write, value: &dyn Any) -> Result<()> {
        self.target().encode_from(writer, value)
    }

    fn measure(&self, value: &dyn Any) -> Result<usize> {
        self.target().measure_length(value)
    }
}
