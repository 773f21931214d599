use core::any::Any;

use crate::info::{Type, TypeInfo, Typed};
use crate::{FromReflect, Reflect};

type InfoFn = fn() -> &'static TypeInfo;
type WrapFn = fn(Box<dyn Reflect>) -> Result<Box<dyn Reflect>, Box<dyn Reflect>>;

// -----------------------------------------------------------------------------
// ListInfo

/// An ordered sequence, e.g. `Vec<T>`.
#[derive(Debug)]
pub struct ListInfo {
    ty: Type,
    item: InfoFn,
}

impl ListInfo {
    #[inline]
    pub fn new<L: Reflect, T: Typed>() -> Self {
        Self {
            ty: Type::of::<L>(),
            item: T::type_info,
        }
    }

    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    #[inline]
    pub fn item_info(&self) -> &'static TypeInfo {
        (self.item)()
    }
}

// -----------------------------------------------------------------------------
// SetInfo

/// An unordered collection of distinct values.
#[derive(Debug)]
pub struct SetInfo {
    ty: Type,
    item: InfoFn,
}

impl SetInfo {
    #[inline]
    pub fn new<S: Reflect, T: Typed>() -> Self {
        Self {
            ty: Type::of::<S>(),
            item: T::type_info,
        }
    }

    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    #[inline]
    pub fn item_info(&self) -> &'static TypeInfo {
        (self.item)()
    }
}

// -----------------------------------------------------------------------------
// MapInfo

/// A key to value mapping.
#[derive(Debug)]
pub struct MapInfo {
    ty: Type,
    key: InfoFn,
    value: InfoFn,
}

impl MapInfo {
    #[inline]
    pub fn new<M: Reflect, K: Typed, V: Typed>() -> Self {
        Self::with_path::<M, K, V>(core::any::type_name::<M>())
    }

    #[inline]
    pub fn with_path<M: Reflect, K: Typed, V: Typed>(path: &'static str) -> Self {
        Self {
            ty: Type::with_path::<M>(path),
            key: K::type_info,
            value: V::type_info,
        }
    }

    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    #[inline]
    pub fn key_info(&self) -> &'static TypeInfo {
        (self.key)()
    }

    #[inline]
    pub fn value_info(&self) -> &'static TypeInfo {
        (self.value)()
    }
}

// -----------------------------------------------------------------------------
// OptionalInfo

/// `Option<T>`: the nullable form of `T`.
#[derive(Debug)]
pub struct OptionalInfo {
    ty: Type,
    some: InfoFn,
    none: fn() -> Box<dyn Reflect>,
    wrap: WrapFn,
}

fn none_of<T: Any>() -> Box<dyn Reflect>
where
    Option<T>: Reflect,
{
    Box::new(None::<T>)
}

fn some_of<T: FromReflect>(value: Box<dyn Reflect>) -> Result<Box<dyn Reflect>, Box<dyn Reflect>>
where
    Option<T>: Reflect,
{
    Ok(Box::new(Some(T::from_reflect(value)?)))
}

impl OptionalInfo {
    pub fn new<T: FromReflect + Typed>() -> Self
    where
        Option<T>: Reflect,
    {
        Self {
            ty: Type::of::<Option<T>>(),
            some: T::type_info,
            none: none_of::<T>,
            wrap: some_of::<T>,
        }
    }

    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    #[inline]
    pub fn some_info(&self) -> &'static TypeInfo {
        (self.some)()
    }

    /// Returns a boxed `None`.
    #[inline]
    pub fn none(&self) -> Box<dyn Reflect> {
        (self.none)()
    }

    /// Wraps a boxed `T` into a boxed `Some(T)`.
    #[inline]
    pub fn some(&self, value: Box<dyn Reflect>) -> Result<Box<dyn Reflect>, Box<dyn Reflect>> {
        (self.wrap)(value)
    }
}

// -----------------------------------------------------------------------------
// SharedInfo

/// A shared, mutable handle: `Rc<RefCell<T>>`.
#[derive(Debug)]
pub struct SharedInfo {
    ty: Type,
    inner: InfoFn,
    wrap: WrapFn,
}

impl SharedInfo {
    #[inline]
    pub fn new<H: Reflect, T: Typed>(wrap: WrapFn) -> Self {
        Self {
            ty: Type::of::<H>(),
            inner: T::type_info,
            wrap,
        }
    }

    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    #[inline]
    pub fn inner_info(&self) -> &'static TypeInfo {
        (self.inner)()
    }

    /// Moves a boxed `T` into a fresh handle.
    #[inline]
    pub fn wrap(&self, value: Box<dyn Reflect>) -> Result<Box<dyn Reflect>, Box<dyn Reflect>> {
        (self.wrap)(value)
    }
}

// -----------------------------------------------------------------------------
// DynInfo

/// A polymorphic slot that can hold any reflected value.
#[derive(Debug)]
pub struct DynInfo {
    ty: Type,
}

impl DynInfo {
    #[inline]
    pub fn new<T: Reflect>(path: &'static str) -> Self {
        Self {
            ty: Type::with_path::<T>(path),
        }
    }

    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }
}

// -----------------------------------------------------------------------------
// OpaqueInfo

/// A leaf value without reflected structure, converted as a whole.
#[derive(Debug)]
pub struct OpaqueInfo {
    ty: Type,
}

impl OpaqueInfo {
    #[inline]
    pub fn new<T: Reflect + ?Sized>(path: &'static str) -> Self {
        Self {
            ty: Type::with_path::<T>(path),
        }
    }

    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }
}
