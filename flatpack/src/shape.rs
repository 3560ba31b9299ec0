//! Static type descriptions.
//!
//! A [`TypeInfo`] is the schema the [`Registry`](crate::Registry) compiles into a codec. It
//! carries type-erased accessors so codecs can walk a value through `&dyn Any` without knowing
//! its concrete type.

use std::{
    any::{type_name, Any, TypeId},
    fmt,
    io::{Read, Write},
};

use crate::Result;

/// A type with a binary encoding.
///
/// Implemented for the sized primitives, `String`, `Vec`, arrays, `HashMap`, `BTreeMap`,
/// `Option` and `Box`. Structs implement it through `#[derive(Packable)]`.
///
/// `Default` provides the fresh value a decoder fills in.
pub trait Packable: Default + 'static {
    fn type_info() -> TypeInfo;
}

/// Lazy handle to a type's description.
///
/// Holding a `TypeRef` instead of a [`TypeInfo`] is what lets a struct mention itself.
#[derive(Clone, Copy)]
pub struct TypeRef {
    pub id: TypeId,
    pub name: &'static str,
    pub describe: fn() -> TypeInfo,
}

impl TypeRef {
    pub fn of<T: Packable>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            describe: T::type_info,
        }
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

pub struct TypeInfo {
    pub name: &'static str,
    pub kind: Kind,
}

impl TypeInfo {
    pub fn new(name: &'static str, kind: Kind) -> Self {
        Self { name, kind }
    }
}

/// Shape of a type.
///
/// The primitive variants must only be reported by the matching Rust type: the primitive codecs
/// downcast to it.
pub enum Kind {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    String,
    Struct(StructInfo),
    Sequence(SequenceInfo),
    Array(ArrayInfo),
    Map(MapInfo),
    Pointer(PointerInfo),
    /// `isize`/`usize`, whose width depends on the target.
    PlatformWidth,
    Unsupported(&'static str),
}

impl Kind {
    pub fn label(&self) -> &'static str {
        match self {
            Kind::Bool
            | Kind::I8
            | Kind::U8
            | Kind::I16
            | Kind::U16
            | Kind::I32
            | Kind::U32
            | Kind::I64
            | Kind::U64
            | Kind::F32
            | Kind::F64 => "primitive",
            Kind::String => "string",
            Kind::Struct(_) => "struct",
            Kind::Sequence(_) => "sequence",
            Kind::Array(_) => "array",
            Kind::Map(_) => "map",
            Kind::Pointer(_) => "pointer",
            Kind::PlatformWidth => "platform-width integer",
            Kind::Unsupported(_) => "unsupported",
        }
    }
}

pub type Getter = fn(&dyn Any) -> &dyn Any;
pub type GetterMut = fn(&mut dyn Any) -> &mut dyn Any;
pub type PackHook = fn(&dyn Any, &mut dyn Write) -> Result<()>;
pub type UnpackHook = fn(&mut dyn Any, &mut dyn Read) -> Result<()>;

pub struct StructInfo {
    /// All fields in declaration order, skipped ones included.
    pub fields: Vec<FieldInfo>,
    pub packer: Option<PackHook>,
    pub unpacker: Option<UnpackHook>,
}

pub struct FieldInfo {
    pub name: &'static str,
    pub binding: FieldBinding,
}

pub enum FieldBinding {
    /// Contributes no bytes; the field keeps whatever value it had.
    Skipped,
    Packed {
        ty: TypeRef,
        /// DEFLATE level, when the field is stored compressed.
        compression: Option<u32>,
        get: Getter,
        get_mut: GetterMut,
    },
}

impl FieldInfo {
    pub fn packed<T: Packable>(
        name: &'static str,
        compression: Option<u32>,
        get: Getter,
        get_mut: GetterMut,
    ) -> Self {
        Self {
            name,
            binding: FieldBinding::Packed {
                ty: TypeRef::of::<T>(),
                compression,
                get,
                get_mut,
            },
        }
    }

    pub fn skipped(name: &'static str) -> Self {
        Self {
            name,
            binding: FieldBinding::Skipped,
        }
    }
}

/// A growable homogeneous container.
pub struct SequenceInfo {
    pub element: TypeRef,
    pub len: fn(&dyn Any) -> usize,
    pub get: fn(&dyn Any, usize) -> &dyn Any,
    /// Empties the sequence and reserves room for about `n` elements.
    pub reset: fn(&mut dyn Any, usize),
    /// Appends a default element and returns it.
    pub push: fn(&mut dyn Any) -> &mut dyn Any,
}

/// A container with a length fixed by its type.
pub struct ArrayInfo {
    pub element: TypeRef,
    pub len: usize,
    pub get: fn(&dyn Any, usize) -> &dyn Any,
    pub get_mut: fn(&mut dyn Any, usize) -> &mut dyn Any,
}

pub type EntryVisitor<'a> = &'a mut dyn FnMut(&dyn Any, &dyn Any) -> Result<()>;
pub type EntryFiller<'a> = &'a mut dyn FnMut(&mut dyn Any, &mut dyn Any) -> Result<()>;

pub struct MapInfo {
    pub key: TypeRef,
    pub value: TypeRef,
    pub len: fn(&dyn Any) -> usize,
    /// Visits every entry in the container's own iteration order.
    pub for_each: fn(&dyn Any, EntryVisitor<'_>) -> Result<()>,
    pub clear: fn(&mut dyn Any),
    /// Fills a default key and value through the callback, then inserts them.
    pub insert_with: fn(&mut dyn Any, EntryFiller<'_>) -> Result<()>,
}

pub struct PointerInfo {
    pub pointee: TypeRef,
    /// `None` for an empty pointer.
    pub get: fn(&dyn Any) -> Option<&dyn Any>,
    /// Allocates a default pointee if the pointer is empty.
    pub get_or_insert: fn(&mut dyn Any) -> &mut dyn Any,
}

/// Downcasts a value handed to an accessor.
///
/// # Panics
///
/// If `value` is not a `T`. Codecs only pass values of the type they were built for, so this
/// indicates a `Packable` implementation reporting the wrong accessors.
pub fn cast<T: Any>(value: &dyn Any) -> &T {
    value
        .downcast_ref::<T>()
        .unwrap_or_else(|| panic!("codec for `{}` applied to another type", type_name::<T>()))
}

/// Mutable counterpart of [`cast`].
pub fn cast_mut<T: Any>(value: &mut dyn Any) -> &mut T {
    value
        .downcast_mut::<T>()
        .unwrap_or_else(|| panic!("codec for `{}` applied to another type", type_name::<T>()))
}
