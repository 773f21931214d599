//! `#[derive(Reflect)]` for `vc_reflect`.
#![allow(clippy::std_instead_of_core, reason = "proc-macro lib")]
#![allow(clippy::std_instead_of_alloc, reason = "proc-macro lib")]

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

static REFLECT_ATTRIBUTE_NAME: &str = "reflect";

// -----------------------------------------------------------------------------
// Modules

mod derive_data;
mod impls;
mod path;

// -----------------------------------------------------------------------------
// Macros

/// # Full Reflection Derivation
///
/// `#[derive(Reflect)]` implements `Reflect`, `FromReflect`, `Typed`,
/// `GetTypeMeta` and the kind trait of the type:
///
/// - `Struct` for `struct T { .. }` and for unit structs `struct T;`,
/// - `Enum` for enums whose variants are units or have named fields.
///
/// Tuple structs, tuple variants and generic types are rejected. Every field
/// type must be reflected itself. Enum variant fields must implement
/// `Default`, since reading a variant back starts from its default form.
///
/// ## Type attributes
///
/// ```rust, ignore
/// #[derive(Reflect, Default)]
/// #[reflect(
///     default,                     // register `TypeTraitDefault`
///     auto_register,               // collected by `TypeRegistry::auto_register`
///     type_path = "shapes::Circle", // replaces `module_path!()::Circle`
///     implements(Shape, Named),     // capability names, in priority order
///     getters(radius),              // `fn radius(&self) -> T`
///     setters(set_radius),          // `fn set_radius(&mut self, T)`
/// )]
/// struct Circle { .. }
/// ```
///
/// ## Field attributes
///
/// - `#[reflect(base)]`: the field embeds the parent type of an inheritance
///   chain. Its members are discovered as members of this type.
/// - `#[reflect(transient)]`: runtime-only state, never written.
/// - `#[reflect(synthetic)]`: generated state. `PhantomData` fields are
///   synthetic without the attribute.
/// - `#[reflect(global)]`: state shared by every instance.
///
/// The declared visibility of each field is recorded as well.
#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    match derive_data::ReflectDerive::from_input(&ast) {
        Ok(derive) => impls::impl_reflect(&derive).into(),
        Err(err) => err.into_compile_error().into(),
    }
}
