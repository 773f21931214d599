use core::any::Any;

use crate::info::{TypeInfo, Typed};
use crate::ops::Shared;
use crate::{FromReflect, Reflect};

// -----------------------------------------------------------------------------
// TypeTrait

/// Data about a type that the registry can store in a [`TypeMeta`].
///
/// Each type trait is created for a concrete type through [`FromType`].
///
/// [`TypeMeta`]: crate::registry::TypeMeta
pub trait TypeTrait: Any + Send + Sync {}

/// Creates a [`TypeTrait`] for `T`.
pub trait FromType<T> {
    fn from_type() -> Self;
}

// -----------------------------------------------------------------------------
// TypeTraitDefault

/// Constructs the default value of a type.
///
/// Registered for types with `#[reflect(default)]` and for the built-in
/// containers.
#[derive(Clone, Copy, Debug)]
pub struct TypeTraitDefault {
    func: fn() -> Box<dyn Reflect>,
}

fn default_boxed<T: Default + Reflect>() -> Box<dyn Reflect> {
    Box::new(T::default())
}

impl TypeTraitDefault {
    #[inline]
    pub fn default_value(&self) -> Box<dyn Reflect> {
        (self.func)()
    }
}

impl<T: Default + Reflect> FromType<T> for TypeTraitDefault {
    #[inline]
    fn from_type() -> Self {
        Self {
            func: default_boxed::<T>,
        }
    }
}

impl TypeTrait for TypeTraitDefault {}

// -----------------------------------------------------------------------------
// TypeTraitShared

/// Moves a value of the type into a fresh [`Shared`] handle.
///
/// A polymorphic slot that receives an object with an identity needs a handle
/// even though its declared type names no handle type; this trait provides it.
#[derive(Clone, Copy, Debug)]
pub struct TypeTraitShared {
    wrap: fn(Box<dyn Reflect>) -> Result<Box<dyn Reflect>, Box<dyn Reflect>>,
    handle_info: fn() -> &'static TypeInfo,
}

fn wrap_boxed<T: FromReflect>(value: Box<dyn Reflect>) -> Result<Box<dyn Reflect>, Box<dyn Reflect>>
where
    Shared<T>: Reflect,
{
    let value = T::from_reflect(value)?;
    Ok(Box::new(Shared::new(core::cell::RefCell::new(value))))
}

impl TypeTraitShared {
    #[inline]
    pub fn wrap(&self, value: Box<dyn Reflect>) -> Result<Box<dyn Reflect>, Box<dyn Reflect>> {
        (self.wrap)(value)
    }

    /// Type information of `Shared<T>`.
    #[inline]
    pub fn handle_info(&self) -> &'static TypeInfo {
        (self.handle_info)()
    }
}

impl<T: FromReflect> FromType<T> for TypeTraitShared
where
    Shared<T>: Typed,
{
    #[inline]
    fn from_type() -> Self {
        Self {
            wrap: wrap_boxed::<T>,
            handle_info: <Shared<T> as Typed>::type_info,
        }
    }
}

impl TypeTrait for TypeTraitShared {}
