use core::marker::PhantomData;

use crate::info::{GenericTypeInfoCell, OpaqueInfo, TypeInfo, Typed};
use crate::ops::{ReflectMut, ReflectRef};
use crate::registry::{FromType, GetTypeMeta, TypeMeta, TypeTraitDefault};
use crate::{FromReflect, Reflect};

impl<T: ?Sized + 'static> Reflect for PhantomData<T> {
    crate::impls::impl_reflect_common!();

    #[inline]
    fn reflect_ref(&self) -> ReflectRef<'_> {
        ReflectRef::Opaque(self)
    }

    #[inline]
    fn reflect_mut(&mut self) -> ReflectMut<'_> {
        ReflectMut::Opaque(self)
    }
}

impl<T: ?Sized + 'static> FromReflect for PhantomData<T> {}

impl<T: ?Sized + 'static> Typed for PhantomData<T> {
    fn type_info() -> &'static TypeInfo {
        static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
        CELL.get_or_insert::<Self>(|| {
            TypeInfo::Opaque(OpaqueInfo::new::<Self>(core::any::type_name::<Self>()))
        })
    }
}

impl<T: ?Sized + 'static> GetTypeMeta for PhantomData<T> {
    fn get_type_meta() -> TypeMeta {
        let mut meta = TypeMeta::of::<Self>();
        meta.insert_trait(<TypeTraitDefault as FromType<Self>>::from_type());
        meta
    }
}
