use core::hash::{BuildHasher, Hash};
use std::collections::{BTreeSet, HashSet};

use crate::info::{GenericTypeInfoCell, SetInfo, TypeInfo, Typed};
use crate::ops::{ReflectMut, ReflectRef};
use crate::registry::{FromType, GetTypeMeta, TypeMeta, TypeRegistry, TypeTraitDefault};
use crate::{FromReflect, Reflect};

// -----------------------------------------------------------------------------
// Set

/// An unordered collection of distinct values.
pub trait Set: Reflect {
    fn len(&self) -> usize;

    fn iter(&self) -> Box<dyn Iterator<Item = &dyn Reflect> + '_>;

    /// Inserts `value`. Returns whether it was new, or hands it back on a type
    /// mismatch.
    fn insert(&mut self, value: Box<dyn Reflect>) -> Result<bool, Box<dyn Reflect>>;
}

// -----------------------------------------------------------------------------
// Implementations

macro_rules! impl_reflect_set {
    (
        $ty:ident<T $(, $s:ident)?>,
        item: [$($item_bound:tt)*],
        $(hasher: [$($s_bound:tt)*],)?
    ) => {
        impl<T $(, $s)?> Reflect for $ty<T $(, $s)?>
        where
            T: FromReflect + GetTypeMeta + $($item_bound)*,
            $($s: $($s_bound)*,)?
        {
            crate::impls::impl_reflect_common!();

            #[inline]
            fn reflect_ref(&self) -> ReflectRef<'_> {
                ReflectRef::Set(self)
            }

            #[inline]
            fn reflect_mut(&mut self) -> ReflectMut<'_> {
                ReflectMut::Set(self)
            }
        }

        impl<T $(, $s)?> Set for $ty<T $(, $s)?>
        where
            T: FromReflect + GetTypeMeta + $($item_bound)*,
            $($s: $($s_bound)*,)?
        {
            #[inline]
            fn len(&self) -> usize {
                $ty::len(self)
            }

            fn iter(&self) -> Box<dyn Iterator<Item = &dyn Reflect> + '_> {
                Box::new($ty::iter(self).map(|item| item as &dyn Reflect))
            }

            fn insert(&mut self, value: Box<dyn Reflect>) -> Result<bool, Box<dyn Reflect>> {
                Ok($ty::insert(self, T::from_reflect(value)?))
            }
        }

        impl<T $(, $s)?> FromReflect for $ty<T $(, $s)?>
        where
            T: FromReflect + GetTypeMeta + $($item_bound)*,
            $($s: $($s_bound)*,)?
        {
        }

        impl<T $(, $s)?> Typed for $ty<T $(, $s)?>
        where
            T: FromReflect + GetTypeMeta + $($item_bound)*,
            $($s: $($s_bound)*,)?
        {
            fn type_info() -> &'static TypeInfo {
                static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
                CELL.get_or_insert::<Self>(|| TypeInfo::Set(SetInfo::new::<Self, T>()))
            }
        }

        impl<T $(, $s)?> GetTypeMeta for $ty<T $(, $s)?>
        where
            T: FromReflect + GetTypeMeta + $($item_bound)*,
            $($s: $($s_bound)*,)?
        {
            fn get_type_meta() -> TypeMeta {
                let mut meta = TypeMeta::of::<Self>();
                meta.insert_trait(<TypeTraitDefault as FromType<Self>>::from_type());
                meta
            }

            fn register_dependencies(registry: &mut TypeRegistry) {
                registry.register::<T>();
            }
        }
    };
}

impl_reflect_set!(
    HashSet<T, S>,
    item: [Eq + Hash],
    hasher: [BuildHasher + Default + Send + Sync + 'static],
);

impl_reflect_set!(
    BTreeSet<T>,
    item: [Ord],
);

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::ops::Set;

    #[test]
    fn insert_reports_novelty() {
        let mut set: BTreeSet<i32> = BTreeSet::new();
        assert_eq!(Set::insert(&mut set, Box::new(4_i32)).ok(), Some(true));
        assert_eq!(Set::insert(&mut set, Box::new(4_i32)).ok(), Some(false));
        assert!(Set::insert(&mut set, Box::new(4_u32)).is_err());
        assert_eq!(Set::len(&set), 1);
    }
}
