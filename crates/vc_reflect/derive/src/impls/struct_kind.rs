use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;

use super::common;
use crate::derive_data::{ReflectField, TypeAttributes};

/// `Reflect`, `Struct` and `Typed` for a struct with named fields.
///
/// Unit structs are structs without fields.
pub(crate) fn impl_struct(
    vc_reflect_path: &syn::Path,
    ident: &Ident,
    attrs: &TypeAttributes,
    fields: &[ReflectField],
) -> TokenStream {
    let reflect_ = crate::path::reflect_(vc_reflect_path);
    let info_ = crate::path::info_(vc_reflect_path);
    let ops_ = crate::path::ops_(vc_reflect_path);
    let option_ = crate::path::option_();

    let reflect_impl =
        common::impl_trait_reflect(vc_reflect_path, ident, &Ident::new("Struct", Span::call_site()));

    let names: Vec<&String> = fields.iter().map(|field| &field.name).collect();
    let idents: Vec<&Ident> = fields.iter().map(|field| field.ident).collect();
    let indices: Vec<usize> = fields.iter().map(|field| field.index).collect();
    let field_len = fields.len();

    let struct_impl = quote! {
        impl #ops_::Struct for #ident {
            fn field(&self, name: &str) -> #option_<&dyn #reflect_> {
                match name {
                    #(#names => #option_::Some(&self.#idents as &dyn #reflect_),)*
                    _ => #option_::None,
                }
            }

            fn field_mut(&mut self, name: &str) -> #option_<&mut dyn #reflect_> {
                match name {
                    #(#names => #option_::Some(&mut self.#idents as &mut dyn #reflect_),)*
                    _ => #option_::None,
                }
            }

            fn field_at(&self, index: usize) -> #option_<&dyn #reflect_> {
                match index {
                    #(#indices => #option_::Some(&self.#idents as &dyn #reflect_),)*
                    _ => #option_::None,
                }
            }

            fn field_at_mut(&mut self, index: usize) -> #option_<&mut dyn #reflect_> {
                match index {
                    #(#indices => #option_::Some(&mut self.#idents as &mut dyn #reflect_),)*
                    _ => #option_::None,
                }
            }

            #[inline]
            fn field_len(&self) -> usize {
                #field_len
            }
        }
    };

    let type_path = common::type_path_expr(ident, attrs);
    let capabilities = common::capabilities_expr(attrs);
    let named_fields = fields
        .iter()
        .map(|field| common::named_field_expr(vc_reflect_path, field));

    let getters = attrs.getters.iter().map(|method| {
        let name = method.to_string();
        quote!(#info_::MethodInfo::getter::<Self, _>(#name, Self::#method))
    });
    let setters = attrs.setters.iter().map(|method| {
        let name = method.to_string();
        quote!(#info_::MethodInfo::setter::<Self, _>(#name, Self::#method))
    });

    let typed_impl = common::impl_trait_typed(
        vc_reflect_path,
        ident,
        quote! {
            #info_::TypeInfo::Struct(
                #info_::StructInfo::new::<Self>(
                    #type_path,
                    ::std::vec![#(#named_fields),*],
                )
                .with_methods(::std::vec![#(#getters,)* #(#setters,)*])
                .with_capabilities(#capabilities)
            )
        },
    );

    quote! {
        #reflect_impl
        #struct_impl
        #typed_impl
    }
}
