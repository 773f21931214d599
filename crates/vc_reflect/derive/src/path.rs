//! Paths into `vc_reflect` used by the generated code.

use proc_macro2::TokenStream;
use quote::quote;

/// The access path of the `vc_reflect` crate.
///
/// 1. Crates depending on `vc_reflect` get `::vc_reflect`.
/// 2. Crates depending on `vc_graphio` get `::vc_graphio::reflect`.
/// 3. Anything else gets `::vc_reflect`, which may be wrong.
///
/// Reading the manifest is expensive, so the path is resolved once per
/// derive and passed around.
pub(crate) fn vc_reflect() -> syn::Path {
    vc_macro_utils::Manifest::shared(|manifest| manifest.get_crate_path("vc_reflect"))
}

#[inline]
pub(crate) fn reflect_(vc_reflect_path: &syn::Path) -> TokenStream {
    quote!(#vc_reflect_path::Reflect)
}

#[inline]
pub(crate) fn from_reflect_(vc_reflect_path: &syn::Path) -> TokenStream {
    quote!(#vc_reflect_path::FromReflect)
}

#[inline]
pub(crate) fn info_(vc_reflect_path: &syn::Path) -> TokenStream {
    quote!(#vc_reflect_path::info)
}

#[inline]
pub(crate) fn ops_(vc_reflect_path: &syn::Path) -> TokenStream {
    quote!(#vc_reflect_path::ops)
}

#[inline]
pub(crate) fn registry_(vc_reflect_path: &syn::Path) -> TokenStream {
    quote!(#vc_reflect_path::registry)
}

#[cfg(feature = "auto_register")]
#[inline]
pub(crate) fn inventory_(vc_reflect_path: &syn::Path) -> TokenStream {
    quote!(#vc_reflect_path::__macro_exports::inventory)
}

#[inline]
pub(crate) fn boxed_() -> TokenStream {
    quote!(::std::boxed::Box)
}

#[inline]
pub(crate) fn option_() -> TokenStream {
    quote!(::core::option::Option)
}
