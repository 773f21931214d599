use core::any::{Any, TypeId};
use core::fmt;

use crate::info::{DynInfo, NonGenericTypeInfoCell, ReflectKind, TypeInfo, Typed};
use crate::ops::{ReflectMut, ReflectRef};
use crate::registry::{FromType, GetTypeMeta, TypeMeta, TypeTraitDefault};

// -----------------------------------------------------------------------------
// Reflect

/// The foundational trait of runtime reflection.
///
/// A `Reflect` value knows its static [`TypeInfo`] and can be viewed as one of
/// the kind traits through [`reflect_ref`](Reflect::reflect_ref) and
/// [`reflect_mut`](Reflect::reflect_mut). The graph engine never needs anything
/// else from a type.
///
/// Prefer `#[derive(Reflect)]` over manual implementations.
///
/// # Type identification
///
/// [`Any::type_id`] on a `Box<dyn Reflect>` reports the box. Use
/// [`ty_id`](Self::ty_id) on the trait object instead:
///
/// ```
/// use core::any::TypeId;
/// use vc_reflect::Reflect;
///
/// let value: Box<dyn Reflect> = Box::new(7_u8);
/// assert_eq!(value.ty_id(), TypeId::of::<u8>());
/// ```
pub trait Reflect: Any {
    /// Returns the static type information of the underlying type.
    fn reflect_type_info(&self) -> &'static TypeInfo;

    fn as_reflect(&self) -> &dyn Reflect;

    fn as_reflect_mut(&mut self) -> &mut dyn Reflect;

    fn into_reflect(self: Box<Self>) -> Box<dyn Reflect>;

    /// Returns an immutable kind view of the value.
    fn reflect_ref(&self) -> ReflectRef<'_>;

    /// Returns a mutable kind view of the value.
    fn reflect_mut(&mut self) -> ReflectMut<'_>;

    /// Replaces `self` with `value`.
    ///
    /// Fails and hands `value` back if it has the wrong type. [`ReflectBox`]
    /// accepts every value.
    fn set(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>>;

    #[inline]
    fn reflect_kind(&self) -> ReflectKind {
        self.reflect_ref().kind()
    }

    #[inline]
    fn reflect_type_path(&self) -> &'static str {
        self.reflect_type_info().type_path()
    }
}

impl dyn Reflect {
    /// Returns the [`TypeId`] of the underlying value.
    #[inline]
    pub fn ty_id(&self) -> TypeId {
        let any: &dyn Any = self;
        any.type_id()
    }

    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        let any: &dyn Any = self;
        any.is::<T>()
    }

    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref::<T>()
    }

    #[inline]
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        let any: &mut dyn Any = self;
        any.downcast_mut::<T>()
    }

    /// Downcasts the box, returning it unchanged on a type mismatch.
    pub fn downcast<T: Any>(self: Box<Self>) -> Result<Box<T>, Box<dyn Reflect>> {
        if !self.is::<T>() {
            return Err(self);
        }
        let any: Box<dyn Any> = self;
        match any.downcast::<T>() {
            Ok(value) => Ok(value),
            Err(_) => unreachable!("type checked above"),
        }
    }

    /// Moves the value out of the box, returning it unchanged on a type mismatch.
    #[inline]
    pub fn take<T: Any>(self: Box<Self>) -> Result<T, Box<dyn Reflect>> {
        self.downcast::<T>().map(|value| *value)
    }
}

impl fmt::Debug for dyn Reflect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dyn Reflect<{}>", self.reflect_type_path())
    }
}

// -----------------------------------------------------------------------------
// FromReflect

/// Rebuilds a concrete value from a boxed reflected value.
///
/// The provided implementation only accepts a box that already holds `Self`.
/// [`ReflectBox`] overrides it to accept anything.
pub trait FromReflect: Reflect + Sized {
    #[inline]
    fn from_reflect(value: Box<dyn Reflect>) -> Result<Self, Box<dyn Reflect>> {
        value.take::<Self>()
    }
}

// -----------------------------------------------------------------------------
// ReflectBox

/// An owned value of any reflected type.
///
/// This is the supertype slot of the reflection world. A field declared as
/// `ReflectBox` may hold any concrete type, so the writer tags it with a type
/// name and the reader resolves that name through the registry. The empty
/// state holds `()`, which stands for null.
///
/// ```
/// use vc_reflect::ReflectBox;
///
/// let mut slot = ReflectBox::default();
/// assert!(slot.is_null());
///
/// slot.replace(Box::new(String::from("circle")));
/// assert_eq!(slot.get().downcast_ref::<String>().map(String::as_str), Some("circle"));
/// ```
pub struct ReflectBox(Box<dyn Reflect>);

impl ReflectBox {
    #[inline]
    pub fn new<T: Reflect>(value: T) -> Self {
        Self::from_boxed(Box::new(value))
    }

    /// Wraps a boxed value. A box that already holds a `ReflectBox` is unwrapped.
    pub fn from_boxed(value: Box<dyn Reflect>) -> Self {
        match value.downcast::<ReflectBox>() {
            Ok(inner) => *inner,
            Err(value) => Self(value),
        }
    }

    #[inline]
    pub fn null() -> Self {
        Self(Box::new(()))
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.0.is::<()>()
    }

    #[inline]
    pub fn get(&self) -> &dyn Reflect {
        &*self.0
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut dyn Reflect {
        &mut *self.0
    }

    #[inline]
    pub fn replace(&mut self, value: Box<dyn Reflect>) {
        *self = Self::from_boxed(value);
    }

    #[inline]
    pub fn into_inner(self) -> Box<dyn Reflect> {
        self.0
    }

    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl Default for ReflectBox {
    #[inline]
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for ReflectBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReflectBox")
            .field(&self.0.reflect_type_path())
            .finish()
    }
}

impl Reflect for ReflectBox {
    #[inline]
    fn reflect_type_info(&self) -> &'static TypeInfo {
        <Self as Typed>::type_info()
    }

    #[inline]
    fn as_reflect(&self) -> &dyn Reflect {
        self
    }

    #[inline]
    fn as_reflect_mut(&mut self) -> &mut dyn Reflect {
        self
    }

    #[inline]
    fn into_reflect(self: Box<Self>) -> Box<dyn Reflect> {
        self
    }

    #[inline]
    fn reflect_ref(&self) -> ReflectRef<'_> {
        ReflectRef::Dyn(self)
    }

    #[inline]
    fn reflect_mut(&mut self) -> ReflectMut<'_> {
        ReflectMut::Dyn(self)
    }

    #[inline]
    fn set(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
        self.replace(value);
        Ok(())
    }
}

impl FromReflect for ReflectBox {
    #[inline]
    fn from_reflect(value: Box<dyn Reflect>) -> Result<Self, Box<dyn Reflect>> {
        Ok(Self::from_boxed(value))
    }
}

impl Typed for ReflectBox {
    fn type_info() -> &'static TypeInfo {
        static CELL: NonGenericTypeInfoCell = NonGenericTypeInfoCell::new();
        CELL.get_or_init(|| TypeInfo::Dyn(DynInfo::new::<Self>("vc_reflect::ReflectBox")))
    }
}

impl GetTypeMeta for ReflectBox {
    fn get_type_meta() -> TypeMeta {
        let mut meta = TypeMeta::of::<Self>();
        meta.insert_trait(<TypeTraitDefault as FromType<Self>>::from_type());
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::{Reflect, ReflectBox};
    use core::any::TypeId;

    #[test]
    fn downcast_returns_box_on_mismatch() {
        let value: Box<dyn Reflect> = Box::new(5_i64);
        let value = value.downcast::<u32>().unwrap_err();
        assert_eq!(value.ty_id(), TypeId::of::<i64>());
        assert_eq!(value.take::<i64>().unwrap(), 5);
    }

    #[test]
    fn reflect_box_never_nests() {
        let inner = ReflectBox::new(3_u16);
        let outer = ReflectBox::from_boxed(Box::new(inner));
        assert_eq!(outer.downcast_ref::<u16>(), Some(&3));

        let mut slot = ReflectBox::default();
        slot.set(Box::new(ReflectBox::new(true))).unwrap();
        assert_eq!(slot.downcast_ref::<bool>(), Some(&true));
    }
}
