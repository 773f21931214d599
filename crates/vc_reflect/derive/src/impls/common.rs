use proc_macro2::{Ident, TokenStream};
use quote::{quote, quote_spanned};
use syn::ext::IdentExt;

use crate::derive_data::{ReflectDerive, ReflectField, TypeAttributes};

/// `Reflect` and `FromReflect` for a derived type.
///
/// `kind` is the `ReflectRef` / `ReflectMut` variant, `Struct` or `Enum`.
pub(crate) fn impl_trait_reflect(
    vc_reflect_path: &syn::Path,
    ident: &Ident,
    kind: &Ident,
) -> TokenStream {
    let reflect_ = crate::path::reflect_(vc_reflect_path);
    let from_reflect_ = crate::path::from_reflect_(vc_reflect_path);
    let info_ = crate::path::info_(vc_reflect_path);
    let ops_ = crate::path::ops_(vc_reflect_path);
    let boxed_ = crate::path::boxed_();

    quote! {
        impl #reflect_ for #ident {
            #[inline]
            fn reflect_type_info(&self) -> &'static #info_::TypeInfo {
                <Self as #info_::Typed>::type_info()
            }

            #[inline]
            fn as_reflect(&self) -> &dyn #reflect_ {
                self
            }

            #[inline]
            fn as_reflect_mut(&mut self) -> &mut dyn #reflect_ {
                self
            }

            #[inline]
            fn into_reflect(self: #boxed_<Self>) -> #boxed_<dyn #reflect_> {
                self
            }

            #[inline]
            fn reflect_ref(&self) -> #ops_::ReflectRef<'_> {
                #ops_::ReflectRef::#kind(self)
            }

            #[inline]
            fn reflect_mut(&mut self) -> #ops_::ReflectMut<'_> {
                #ops_::ReflectMut::#kind(self)
            }

            fn set(
                &mut self,
                value: #boxed_<dyn #reflect_>,
            ) -> ::core::result::Result<(), #boxed_<dyn #reflect_>> {
                *self = value.take::<Self>()?;
                ::core::result::Result::Ok(())
            }
        }

        impl #from_reflect_ for #ident {}
    }
}

/// `Typed` over a lazily built `TypeInfo`.
pub(crate) fn impl_trait_typed(
    vc_reflect_path: &syn::Path,
    ident: &Ident,
    info_expr: TokenStream,
) -> TokenStream {
    let info_ = crate::path::info_(vc_reflect_path);

    quote! {
        impl #info_::Typed for #ident {
            fn type_info() -> &'static #info_::TypeInfo {
                static CELL: #info_::NonGenericTypeInfoCell = #info_::NonGenericTypeInfoCell::new();
                CELL.get_or_init(|| #info_expr)
            }
        }
    }
}

/// The type path expression: `type_path = ".."` or `module_path!()::Ident`.
pub(crate) fn type_path_expr(ident: &Ident, attrs: &TypeAttributes) -> TokenStream {
    match &attrs.type_path {
        Some(lit) => quote!(#lit),
        None => {
            let name = ident.unraw().to_string();
            quote!(::core::concat!(::core::module_path!(), "::", #name))
        }
    }
}

/// `&["Shape", "Named"]`.
pub(crate) fn capabilities_expr(attrs: &TypeAttributes) -> TokenStream {
    let names = &attrs.capabilities;
    quote!(&[#(#names),*])
}

/// `NamedField::new::<T>("name", 0).with_flags(..).with_visibility(..)`.
pub(crate) fn named_field_expr(vc_reflect_path: &syn::Path, field: &ReflectField) -> TokenStream {
    let info_ = crate::path::info_(vc_reflect_path);
    let ty = field.ty;
    let name = &field.name;
    let index = field.index;
    let bits = field.attrs.bits();
    let visibility = match field.vis {
        syn::Visibility::Public(_) => quote!(Public),
        syn::Visibility::Restricted(restricted)
            if restricted.in_token.is_none() && restricted.path.is_ident("crate") =>
        {
            quote!(Crate)
        }
        syn::Visibility::Restricted(_) => quote!(Restricted),
        syn::Visibility::Inherited => quote!(Private),
    };

    quote! {
        #info_::NamedField::new::<#ty>(#name, #index)
            .with_flags(#info_::FieldFlags::from_bits_truncate(#bits))
            .with_visibility(#info_::Visibility::#visibility)
    }
}

/// `GetTypeMeta`: `TypeTraitShared` always, `TypeTraitDefault` on request,
/// and every field type as a dependency.
pub(crate) fn impl_trait_get_type_meta(
    vc_reflect_path: &syn::Path,
    derive: &ReflectDerive,
) -> TokenStream {
    let registry_ = crate::path::registry_(vc_reflect_path);
    let ident = derive.ident();

    let insert_default = derive.attrs().default.map(|span| {
        quote_spanned! { span =>
            meta.insert_trait(<#registry_::TypeTraitDefault as #registry_::FromType<Self>>::from_type());
        }
    });

    let mut seen: Vec<String> = Vec::new();
    let register_deps = derive.all_fields().filter_map(|field| {
        let ty = field.ty;
        let key = quote!(#ty).to_string();
        if seen.contains(&key) {
            return None;
        }
        seen.push(key);
        Some(quote! {
            registry.register::<#ty>();
        })
    });
    let register_deps: Vec<TokenStream> = register_deps.collect();

    quote! {
        impl #registry_::GetTypeMeta for #ident {
            fn get_type_meta() -> #registry_::TypeMeta {
                let mut meta = #registry_::TypeMeta::of::<Self>();
                meta.insert_trait(<#registry_::TypeTraitShared as #registry_::FromType<Self>>::from_type());
                #insert_default
                meta
            }

            #[allow(unused_variables)]
            fn register_dependencies(registry: &mut #registry_::TypeRegistry) {
                #(#register_deps)*
            }
        }
    }
}

/// Submits the type to `inventory` for `TypeRegistry::auto_register`.
#[cfg(feature = "auto_register")]
pub(crate) fn impl_auto_register(vc_reflect_path: &syn::Path, derive: &ReflectDerive) -> TokenStream {
    let Some(span) = derive.attrs().auto_register else {
        return TokenStream::new();
    };
    let inventory_ = crate::path::inventory_(vc_reflect_path);
    let registry_ = crate::path::registry_(vc_reflect_path);
    let ident = derive.ident();

    quote_spanned! { span =>
        fn __auto_register(registry: &mut #registry_::TypeRegistry) {
            registry.register::<#ident>();
        }

        #inventory_::submit! {
            #registry_::AutoRegister(__auto_register)
        }
    }
}

#[cfg(not(feature = "auto_register"))]
pub(crate) fn impl_auto_register(_: &syn::Path, _: &ReflectDerive) -> TokenStream {
    TokenStream::new()
}
