use std::{
    any::{type_name, Any},
    collections::{BTreeMap, HashMap},
    hash::{BuildHasher, Hash},
};

use crate::shape::{
    cast, cast_mut, ArrayInfo, Kind, MapInfo, Packable, PointerInfo, SequenceInfo, TypeInfo,
    TypeRef,
};

macro_rules! impl_kind {
    ($($ty:ty => $kind:expr),* $(,)?) => {
        $(
            impl Packable for $ty {
                fn type_info() -> TypeInfo {
                    TypeInfo::new(type_name::<$ty>(), $kind)
                }
            }
        )*
    };
}

impl_kind!(
    bool => Kind::Bool,
    i8 => Kind::I8,
    u8 => Kind::U8,
    i16 => Kind::I16,
    u16 => Kind::U16,
    i32 => Kind::I32,
    u32 => Kind::U32,
    i64 => Kind::I64,
    u64 => Kind::U64,
    f32 => Kind::F32,
    f64 => Kind::F64,
    String => Kind::String,
    isize => Kind::PlatformWidth,
    usize => Kind::PlatformWidth,
    char => Kind::Unsupported("char has no fixed encoding, store it as a u32"),
    () => Kind::Unsupported("the unit type carries no data"),
);

impl<T: Packable> Packable for Vec<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::new(
            type_name::<Self>(),
            Kind::Sequence(SequenceInfo {
                element: TypeRef::of::<T>(),
                len: |seq| cast::<Self>(seq).len(),
                get: |seq, index| &cast::<Self>(seq)[index] as &dyn Any,
                reset: |seq, capacity| {
                    let seq = cast_mut::<Self>(seq);
                    seq.clear();
                    seq.reserve(capacity);
                },
                push: |seq| {
                    let seq = cast_mut::<Self>(seq);
                    seq.push(T::default());
                    let last = seq.len() - 1;
                    &mut seq[last] as &mut dyn Any
                },
            }),
        )
    }
}

impl<T: Packable, const N: usize> Packable for [T; N]
where
    [T; N]: Default,
{
    fn type_info() -> TypeInfo {
        TypeInfo::new(
            type_name::<Self>(),
            Kind::Array(ArrayInfo {
                element: TypeRef::of::<T>(),
                len: N,
                get: |array, index| &cast::<Self>(array)[index] as &dyn Any,
                get_mut: |array, index| &mut cast_mut::<Self>(array)[index] as &mut dyn Any,
            }),
        )
    }
}

impl<K, V, S> Packable for HashMap<K, V, S>
where
    K: Packable + Eq + Hash,
    V: Packable,
    S: BuildHasher + Default + 'static,
{
    fn type_info() -> TypeInfo {
        TypeInfo::new(
            type_name::<Self>(),
            Kind::Map(MapInfo {
                key: TypeRef::of::<K>(),
                value: TypeRef::of::<V>(),
                len: |map| cast::<Self>(map).len(),
                for_each: |map, visit| {
                    for (key, value) in cast::<Self>(map) {
                        visit(key, value)?;
                    }
                    Ok(())
                },
                clear: |map| cast_mut::<Self>(map).clear(),
                insert_with: |map, fill| {
                    let mut key = K::default();
                    let mut value = V::default();
                    fill(&mut key, &mut value)?;
                    cast_mut::<Self>(map).insert(key, value);
                    Ok(())
                },
            }),
        )
    }
}

impl<K, V> Packable for BTreeMap<K, V>
where
    K: Packable + Ord,
    V: Packable,
{
    fn type_info() -> TypeInfo {
        TypeInfo::new(
            type_name::<Self>(),
            Kind::Map(MapInfo {
                key: TypeRef::of::<K>(),
                value: TypeRef::of::<V>(),
                len: |map| cast::<Self>(map).len(),
                for_each: |map, visit| {
                    for (key, value) in cast::<Self>(map) {
                        visit(key, value)?;
                    }
                    Ok(())
                },
                clear: |map| cast_mut::<Self>(map).clear(),
                insert_with: |map, fill| {
                    let mut key = K::default();
                    let mut value = V::default();
                    fill(&mut key, &mut value)?;
                    cast_mut::<Self>(map).insert(key, value);
                    Ok(())
                },
            }),
        )
    }
}

/// `None` is an empty pointer: it can be measured when the pointee is fixed-size but never
/// encoded.
impl<T: Packable> Packable for Option<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::new(
            type_name::<Self>(),
            Kind::Pointer(PointerInfo {
                pointee: TypeRef::of::<T>(),
                get: |ptr| cast::<Self>(ptr).as_ref().map(|value| value as &dyn Any),
                get_or_insert: |ptr| {
                    cast_mut::<Self>(ptr).get_or_insert_with(T::default) as &mut dyn Any
                },
            }),
        )
    }
}

impl<T: Packable> Packable for Box<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::new(
            type_name::<Self>(),
            Kind::Pointer(PointerInfo {
                pointee: TypeRef::of::<T>(),
                get: |ptr| Some(&**cast::<Self>(ptr) as &dyn Any),
                get_or_insert: |ptr| &mut **cast_mut::<Self>(ptr) as &mut dyn Any,
            }),
        )
    }
}
