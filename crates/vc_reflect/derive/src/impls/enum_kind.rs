use proc_macro2::{Ident, Span, TokenStream};
use quote::{format_ident, quote};

use super::common;
use crate::derive_data::{ReflectVariant, TypeAttributes};

/// The local a variant field is bound to. Field names may shadow the
/// `name` and `index` parameters, so they are never bound directly.
fn binding(index: usize) -> Ident {
    format_ident!("__field_{}", index)
}

/// The pattern binding every field of a variant.
fn variant_pattern(ident: &Ident, variant: &ReflectVariant) -> TokenStream {
    let variant_ident = variant.ident;
    if variant.is_unit {
        return quote!(#ident::#variant_ident);
    }
    let fields = variant.fields.iter().map(|field| {
        let field_ident = field.ident;
        let local = binding(field.index);
        quote!(#field_ident: #local)
    });
    quote!(#ident::#variant_ident { #(#fields),* })
}

/// `Reflect`, `Enum` and `Typed` for an enum of unit and named-field variants.
pub(crate) fn impl_enum(
    vc_reflect_path: &syn::Path,
    ident: &Ident,
    attrs: &TypeAttributes,
    variants: &[ReflectVariant],
) -> TokenStream {
    let reflect_ = crate::path::reflect_(vc_reflect_path);
    let info_ = crate::path::info_(vc_reflect_path);
    let ops_ = crate::path::ops_(vc_reflect_path);
    let option_ = crate::path::option_();
    let boxed_ = crate::path::boxed_();

    let reflect_impl =
        common::impl_trait_reflect(vc_reflect_path, ident, &Ident::new("Enum", Span::call_site()));

    let patterns: Vec<TokenStream> = variants
        .iter()
        .map(|variant| variant_pattern(ident, variant))
        .collect();
    let names: Vec<&String> = variants.iter().map(|variant| &variant.name).collect();
    let indices: Vec<usize> = variants.iter().map(|variant| variant.index).collect();
    let lens: Vec<usize> = variants.iter().map(|variant| variant.fields.len()).collect();

    // `ref_kind` is `&` or `&mut`.
    let field_arms = |by_index: bool, ref_kind: TokenStream| -> Vec<TokenStream> {
        variants
            .iter()
            .zip(&patterns)
            .map(|(variant, pattern)| {
                let keys = variant.fields.iter().map(|field| {
                    if by_index {
                        let index = field.index;
                        quote!(#index)
                    } else {
                        let name = &field.name;
                        quote!(#name)
                    }
                });
                let fields = variant.fields.iter().map(|field| binding(field.index));
                let selector = if by_index { quote!(index) } else { quote!(name) };
                quote! {
                    #pattern => match #selector {
                        #(#keys => #option_::Some(#fields as #ref_kind dyn #reflect_),)*
                        _ => #option_::None,
                    }
                }
            })
            .collect()
    };

    let field_by_name = field_arms(false, quote!(&));
    let field_by_name_mut = field_arms(false, quote!(&mut));
    let field_by_index = field_arms(true, quote!(&));
    let field_by_index_mut = field_arms(true, quote!(&mut));

    let enum_impl = quote! {
        impl #ops_::Enum for #ident {
            #[allow(unused_variables)]
            fn variant_name(&self) -> &'static str {
                match self {
                    #(#patterns => #names,)*
                }
            }

            #[allow(unused_variables)]
            fn variant_index(&self) -> usize {
                match self {
                    #(#patterns => #indices,)*
                }
            }

            #[allow(unused_variables)]
            fn field(&self, name: &str) -> #option_<&dyn #reflect_> {
                match self {
                    #(#field_by_name,)*
                }
            }

            #[allow(unused_variables)]
            fn field_mut(&mut self, name: &str) -> #option_<&mut dyn #reflect_> {
                match self {
                    #(#field_by_name_mut,)*
                }
            }

            #[allow(unused_variables)]
            fn field_at(&self, index: usize) -> #option_<&dyn #reflect_> {
                match self {
                    #(#field_by_index,)*
                }
            }

            #[allow(unused_variables)]
            fn field_at_mut(&mut self, index: usize) -> #option_<&mut dyn #reflect_> {
                match self {
                    #(#field_by_index_mut,)*
                }
            }

            #[allow(unused_variables)]
            fn field_len(&self) -> usize {
                match self {
                    #(#patterns => #lens,)*
                }
            }
        }
    };

    let variant_infos = variants.iter().map(|variant| {
        let name = &variant.name;
        let index = variant.index;
        if variant.fields.is_empty() {
            quote!(#info_::VariantInfo::unit(#name, #index))
        } else {
            let fields = variant
                .fields
                .iter()
                .map(|field| common::named_field_expr(vc_reflect_path, field));
            quote!(#info_::VariantInfo::new(#name, #index, ::std::vec![#(#fields),*]))
        }
    });

    let constructors = variants.iter().map(|variant| {
        let variant_ident = variant.ident;
        let index = variant.index;
        let value = if variant.is_unit {
            quote!(#ident::#variant_ident)
        } else {
            let fields = variant.fields.iter().map(|field| field.ident);
            quote!(#ident::#variant_ident { #(#fields: ::core::default::Default::default()),* })
        };
        quote!(#index => #option_::Some(#boxed_::new(#value) as #boxed_<dyn #reflect_>))
    });

    let type_path = common::type_path_expr(ident, attrs);
    let capabilities = common::capabilities_expr(attrs);

    let typed_impl = common::impl_trait_typed(
        vc_reflect_path,
        ident,
        quote! {
            #info_::TypeInfo::Enum(
                #info_::EnumInfo::new::<Self>(
                    #type_path,
                    ::std::vec![#(#variant_infos),*],
                    |index: usize| -> #option_<#boxed_<dyn #reflect_>> {
                        match index {
                            #(#constructors,)*
                            _ => #option_::None,
                        }
                    },
                )
                .with_capabilities(#capabilities)
            )
        },
    );

    quote! {
        #reflect_impl
        #enum_impl
        #typed_impl
    }
}
