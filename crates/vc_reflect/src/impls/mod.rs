//! Reflection for built-in leaf types, and the macros that implement it.
//!
//! - `()` `bool` `char` `String`
//! - `i8`-`i128` `isize` `u8`-`u128` `usize` `f32` `f64`
//! - `PhantomData<T>`
//! - with the `chrono` feature: `NaiveDate` `NaiveTime` `NaiveDateTime`
//!   `DateTime<Utc>` `DateTime<FixedOffset>`
//!
//! Containers live next to their kind traits in [`crate::ops`].

// -----------------------------------------------------------------------------
// Modules

mod phantom;
mod primitives;

#[cfg(feature = "chrono")]
mod temporal;

// -----------------------------------------------------------------------------
// Macros

/// The `Reflect` methods that only depend on `Self: Typed + Sized`.
macro_rules! impl_reflect_common {
    () => {
        #[inline]
        fn reflect_type_info(&self) -> &'static $crate::info::TypeInfo {
            <Self as $crate::info::Typed>::type_info()
        }

        #[inline]
        fn as_reflect(&self) -> &dyn $crate::Reflect {
            self
        }

        #[inline]
        fn as_reflect_mut(&mut self) -> &mut dyn $crate::Reflect {
            self
        }

        #[inline]
        fn into_reflect(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn $crate::Reflect> {
            self
        }

        fn set(
            &mut self,
            value: ::std::boxed::Box<dyn $crate::Reflect>,
        ) -> ::core::result::Result<(), ::std::boxed::Box<dyn $crate::Reflect>> {
            *self = value.take::<Self>()?;
            Ok(())
        }
    };
}

/// Reflects a non-generic type as an opaque leaf with the given type path.
///
/// The `default` form also registers [`TypeTraitDefault`](crate::registry::TypeTraitDefault).
macro_rules! impl_reflect_opaque {
    (@impl $ty:ty => $path:expr; |$meta:ident| $extra:block) => {
        impl $crate::Reflect for $ty {
            $crate::impls::impl_reflect_common!();

            #[inline]
            fn reflect_ref(&self) -> $crate::ops::ReflectRef<'_> {
                $crate::ops::ReflectRef::Opaque(self)
            }

            #[inline]
            fn reflect_mut(&mut self) -> $crate::ops::ReflectMut<'_> {
                $crate::ops::ReflectMut::Opaque(self)
            }
        }

        impl $crate::FromReflect for $ty {}

        impl $crate::info::Typed for $ty {
            fn type_info() -> &'static $crate::info::TypeInfo {
                static CELL: $crate::info::NonGenericTypeInfoCell =
                    $crate::info::NonGenericTypeInfoCell::new();
                CELL.get_or_init(|| {
                    $crate::info::TypeInfo::Opaque($crate::info::OpaqueInfo::new::<Self>($path))
                })
            }
        }

        impl $crate::registry::GetTypeMeta for $ty {
            #[allow(unused_mut)]
            fn get_type_meta() -> $crate::registry::TypeMeta {
                let mut $meta = $crate::registry::TypeMeta::of::<Self>();
                $extra
                $meta
            }
        }
    };
    ($ty:ty => $path:expr) => {
        $crate::impls::impl_reflect_opaque!(@impl $ty => $path; |_meta| {});
    };
    ($ty:ty => $path:expr, default) => {
        $crate::impls::impl_reflect_opaque!(@impl $ty => $path; |meta| {
            meta.insert_trait(
                <$crate::registry::TypeTraitDefault as $crate::registry::FromType<$ty>>::from_type(),
            );
        });
    };
}

pub(crate) use impl_reflect_common;
pub(crate) use impl_reflect_opaque;
