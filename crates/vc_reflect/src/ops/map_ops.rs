use core::hash::{BuildHasher, Hash};
use std::collections::{BTreeMap, HashMap};

use crate::info::{GenericTypeInfoCell, MapInfo, TypeInfo, Typed};
use crate::ops::{ReflectMut, ReflectRef};
use crate::registry::{FromType, GetTypeMeta, TypeMeta, TypeRegistry, TypeTraitDefault};
use crate::{FromReflect, Reflect};

// -----------------------------------------------------------------------------
// Map

/// A key to value mapping.
pub trait Map: Reflect {
    fn len(&self) -> usize;

    /// Iterates entries in the map's own order.
    fn iter(&self) -> Box<dyn Iterator<Item = (&dyn Reflect, &dyn Reflect)> + '_>;

    fn get(&self, key: &dyn Reflect) -> Option<&dyn Reflect>;

    fn get_mut(&mut self, key: &dyn Reflect) -> Option<&mut dyn Reflect>;

    /// Inserts an entry, replacing any previous value for the key.
    ///
    /// On a type mismatch the offending key or value is handed back.
    fn insert(&mut self, key: Box<dyn Reflect>, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>>;
}

// -----------------------------------------------------------------------------
// Implementations

macro_rules! impl_reflect_map {
    (
        $ty:ident<K, V $(, $s:ident)?>,
        key: [$($key_bound:tt)*],
        $(hasher: [$($s_bound:tt)*],)?
    ) => {
        impl<K, V $(, $s)?> Reflect for $ty<K, V $(, $s)?>
        where
            K: FromReflect + GetTypeMeta + $($key_bound)*,
            V: FromReflect + GetTypeMeta,
            $($s: $($s_bound)*,)?
        {
            crate::impls::impl_reflect_common!();

            #[inline]
            fn reflect_ref(&self) -> ReflectRef<'_> {
                ReflectRef::Map(self)
            }

            #[inline]
            fn reflect_mut(&mut self) -> ReflectMut<'_> {
                ReflectMut::Map(self)
            }
        }

        impl<K, V $(, $s)?> Map for $ty<K, V $(, $s)?>
        where
            K: FromReflect + GetTypeMeta + $($key_bound)*,
            V: FromReflect + GetTypeMeta,
            $($s: $($s_bound)*,)?
        {
            #[inline]
            fn len(&self) -> usize {
                $ty::len(self)
            }

            fn iter(&self) -> Box<dyn Iterator<Item = (&dyn Reflect, &dyn Reflect)> + '_> {
                Box::new(
                    $ty::iter(self).map(|(key, value)| (key as &dyn Reflect, value as &dyn Reflect)),
                )
            }

            fn get(&self, key: &dyn Reflect) -> Option<&dyn Reflect> {
                let key = key.downcast_ref::<K>()?;
                $ty::get(self, key).map(|value| value as &dyn Reflect)
            }

            fn get_mut(&mut self, key: &dyn Reflect) -> Option<&mut dyn Reflect> {
                let key = key.downcast_ref::<K>()?;
                $ty::get_mut(self, key).map(|value| value as &mut dyn Reflect)
            }

            fn insert(
                &mut self,
                key: Box<dyn Reflect>,
                value: Box<dyn Reflect>,
            ) -> Result<(), Box<dyn Reflect>> {
                let key = K::from_reflect(key)?;
                let value = V::from_reflect(value)?;
                $ty::insert(self, key, value);
                Ok(())
            }
        }

        impl<K, V $(, $s)?> FromReflect for $ty<K, V $(, $s)?>
        where
            K: FromReflect + GetTypeMeta + $($key_bound)*,
            V: FromReflect + GetTypeMeta,
            $($s: $($s_bound)*,)?
        {
        }

        impl<K, V $(, $s)?> Typed for $ty<K, V $(, $s)?>
        where
            K: FromReflect + GetTypeMeta + $($key_bound)*,
            V: FromReflect + GetTypeMeta,
            $($s: $($s_bound)*,)?
        {
            fn type_info() -> &'static TypeInfo {
                static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
                CELL.get_or_insert::<Self>(|| TypeInfo::Map(MapInfo::new::<Self, K, V>()))
            }
        }

        impl<K, V $(, $s)?> GetTypeMeta for $ty<K, V $(, $s)?>
        where
            K: FromReflect + GetTypeMeta + $($key_bound)*,
            V: FromReflect + GetTypeMeta,
            $($s: $($s_bound)*,)?
        {
            fn get_type_meta() -> TypeMeta {
                let mut meta = TypeMeta::of::<Self>();
                meta.insert_trait(<TypeTraitDefault as FromType<Self>>::from_type());
                meta
            }

            fn register_dependencies(registry: &mut TypeRegistry) {
                registry.register::<K>();
                registry.register::<V>();
            }
        }
    };
}

impl_reflect_map!(
    HashMap<K, V, S>,
    key: [Eq + Hash],
    hasher: [BuildHasher + Default + Send + Sync + 'static],
);

impl_reflect_map!(
    BTreeMap<K, V>,
    key: [Ord],
);

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use crate::Reflect;
    use crate::ops::Map;

    #[test]
    fn insert_and_lookup() {
        let mut map: HashMap<String, i32> = HashMap::new();
        Map::insert(&mut map, Box::new(String::from("a")), Box::new(1_i32)).unwrap();
        assert!(Map::insert(&mut map, Box::new(1_u8), Box::new(1_i32)).is_err());

        let key: Box<dyn Reflect> = Box::new(String::from("a"));
        *Map::get_mut(&mut map, &*key)
            .and_then(|v| v.downcast_mut::<i32>())
            .unwrap() += 1;
        assert_eq!(map["a"], 2);
    }

    #[test]
    fn ordered_iteration() {
        let map: BTreeMap<u8, bool> = [(2, true), (1, false)].into_iter().collect();
        let keys: Vec<u8> = Map::iter(&map)
            .filter_map(|(k, _)| k.downcast_ref::<u8>().copied())
            .collect();
        assert_eq!(keys, [1, 2]);
    }
}
