use core::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::info::{GenericTypeInfoCell, SharedInfo, TypeInfo, Typed};
use crate::ops::{ReflectMut, ReflectRef};
use crate::registry::{GetTypeMeta, TypeMeta, TypeRegistry};
use crate::{FromReflect, Reflect};

/// A shared, interior-mutable handle.
///
/// Handles are the only values with identity: two handles are the same
/// object exactly when [`SharedHandle::handle_addr`] agrees, regardless of
/// what the pointee compares equal to.
pub type Shared<T> = Rc<RefCell<T>>;

// -----------------------------------------------------------------------------
// SharedHandle

/// Type-erased access to a [`Shared`] handle.
pub trait SharedHandle: Reflect {
    /// Address of the shared allocation.
    fn handle_addr(&self) -> usize;

    /// A new handle to the same allocation.
    fn share(&self) -> Box<dyn Reflect>;

    /// Borrows the pointee, or `None` while it is mutably borrowed.
    fn borrow_inner(&self) -> Option<Ref<'_, dyn Reflect>>;

    /// Mutably borrows the pointee, or `None` while it is borrowed.
    fn borrow_inner_mut(&self) -> Option<RefMut<'_, dyn Reflect>>;
}

fn wrap_shared<T: FromReflect>(value: Box<dyn Reflect>) -> Result<Box<dyn Reflect>, Box<dyn Reflect>>
where
    Shared<T>: Reflect,
{
    Ok(Box::new(Rc::new(RefCell::new(T::from_reflect(value)?))))
}

impl<T: FromReflect + GetTypeMeta> Reflect for Rc<RefCell<T>> {
    crate::impls::impl_reflect_common!();

    #[inline]
    fn reflect_ref(&self) -> ReflectRef<'_> {
        ReflectRef::Shared(self)
    }

    #[inline]
    fn reflect_mut(&mut self) -> ReflectMut<'_> {
        ReflectMut::Shared(self)
    }
}

impl<T: FromReflect + GetTypeMeta> SharedHandle for Rc<RefCell<T>> {
    #[inline]
    fn handle_addr(&self) -> usize {
        Rc::as_ptr(self).cast::<()>() as usize
    }

    #[inline]
    fn share(&self) -> Box<dyn Reflect> {
        Box::new(Rc::clone(self))
    }

    fn borrow_inner(&self) -> Option<Ref<'_, dyn Reflect>> {
        let inner = self.try_borrow().ok()?;
        Some(Ref::map(inner, |value| value as &dyn Reflect))
    }

    fn borrow_inner_mut(&self) -> Option<RefMut<'_, dyn Reflect>> {
        let inner = self.try_borrow_mut().ok()?;
        Some(RefMut::map(inner, |value| value as &mut dyn Reflect))
    }
}

impl<T: FromReflect + GetTypeMeta> FromReflect for Rc<RefCell<T>> {}

impl<T: FromReflect + GetTypeMeta> Typed for Rc<RefCell<T>> {
    fn type_info() -> &'static TypeInfo {
        static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
        CELL.get_or_insert::<Self>(|| TypeInfo::Shared(SharedInfo::new::<Self, T>(wrap_shared::<T>)))
    }
}

impl<T: FromReflect + GetTypeMeta> GetTypeMeta for Rc<RefCell<T>> {
    fn get_type_meta() -> TypeMeta {
        TypeMeta::of::<Self>()
    }

    fn register_dependencies(registry: &mut TypeRegistry) {
        registry.register::<T>();
    }
}
