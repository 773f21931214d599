//! Code generation.

// -----------------------------------------------------------------------------
// Modules

mod common;
mod enum_kind;
mod struct_kind;

// -----------------------------------------------------------------------------
// Entry

use proc_macro2::TokenStream;
use quote::quote;

use crate::derive_data::ReflectDerive;

/// Expands a parsed derive input into every generated impl.
///
/// The impls are wrapped in an anonymous `const` so helper items never leak
/// into the caller's module.
pub(crate) fn impl_reflect(derive: &ReflectDerive) -> TokenStream {
    let vc_reflect_path = crate::path::vc_reflect();

    let kind_impls = match derive {
        ReflectDerive::Struct {
            ident,
            attrs,
            fields,
        } => struct_kind::impl_struct(&vc_reflect_path, ident, attrs, fields),
        ReflectDerive::Enum {
            ident,
            attrs,
            variants,
        } => enum_kind::impl_enum(&vc_reflect_path, ident, attrs, variants),
    };

    let get_type_meta = common::impl_trait_get_type_meta(&vc_reflect_path, derive);
    let auto_register = common::impl_auto_register(&vc_reflect_path, derive);

    quote! {
        const _: () = {
            #kind_impls
            #get_type_meta
            #auto_register
        };
    }
}
