use core::any::{Any, TypeId};
use std::sync::{OnceLock, PoisonError, RwLock};

use vc_utils::TypeIdMap;

use crate::info::TypeInfo;

// -----------------------------------------------------------------------------
// NonGenericTypeInfoCell

/// Lazily built [`TypeInfo`] for a non-generic type.
///
/// Meant to live in a `static` inside `Typed::type_info`.
pub struct NonGenericTypeInfoCell(OnceLock<TypeInfo>);

impl NonGenericTypeInfoCell {
    #[inline]
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    #[inline]
    pub fn get_or_init(&self, f: impl FnOnce() -> TypeInfo) -> &TypeInfo {
        self.0.get_or_init(f)
    }
}

// -----------------------------------------------------------------------------
// GenericTypeInfoCell

/// Lazily built [`TypeInfo`] for every instantiation of a generic type.
///
/// A `static` inside a generic function is shared by all instantiations, so
/// the cell keys the leaked infos by [`TypeId`].
///
/// `f` runs outside the lock, since building `Vec<Option<T>>` may need the
/// cell of `Option<T>` first. Concurrent first calls may both build an info;
/// the first insert wins and every caller receives that one.
pub struct GenericTypeInfoCell(RwLock<TypeIdMap<&'static TypeInfo>>);

impl GenericTypeInfoCell {
    #[inline]
    pub const fn new() -> Self {
        Self(RwLock::new(TypeIdMap::new()))
    }

    pub fn get_or_insert<T: Any + ?Sized>(&self, f: impl FnOnce() -> TypeInfo) -> &'static TypeInfo {
        let type_id = TypeId::of::<T>();
        {
            let map = self.0.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(info) = map.get(&type_id) {
                return *info;
            }
        }

        let built: &'static TypeInfo = Box::leak(Box::new(f()));

        let mut map = self.0.write().unwrap_or_else(PoisonError::into_inner);
        *map.get_or_insert_with(type_id, || built)
    }
}
