use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields, Ident, Type, Visibility};

use super::{FieldAttributes, TypeAttributes};

/// A named field of a struct or enum variant.
pub(crate) struct ReflectField<'a> {
    pub ident: &'a Ident,
    /// The field name without a raw identifier prefix.
    pub name: String,
    pub index: usize,
    pub ty: &'a Type,
    pub vis: &'a Visibility,
    pub attrs: FieldAttributes,
}

pub(crate) struct ReflectVariant<'a> {
    pub ident: &'a Ident,
    pub name: String,
    pub index: usize,
    pub fields: Vec<ReflectField<'a>>,
    /// `Variant` rather than `Variant {}`.
    pub is_unit: bool,
}

pub(crate) enum ReflectDerive<'a> {
    Struct {
        ident: &'a Ident,
        attrs: TypeAttributes,
        fields: Vec<ReflectField<'a>>,
    },
    Enum {
        ident: &'a Ident,
        attrs: TypeAttributes,
        variants: Vec<ReflectVariant<'a>>,
    },
}

fn collect_fields(fields: &Fields) -> syn::Result<Vec<ReflectField<'_>>> {
    match fields {
        Fields::Unit => Ok(Vec::new()),
        Fields::Unnamed(unnamed) => Err(syn::Error::new(
            unnamed.span(),
            "`Reflect` supports named fields only",
        )),
        Fields::Named(named) => named
            .named
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let ident = field
                    .ident
                    .as_ref()
                    .ok_or_else(|| syn::Error::new(field.span(), "expected a named field"))?;
                Ok(ReflectField {
                    ident,
                    name: ident.unraw().to_string(),
                    index,
                    ty: &field.ty,
                    vis: &field.vis,
                    attrs: FieldAttributes::parse(&field.attrs, &field.ty)?,
                })
            })
            .collect(),
    }
}

impl<'a> ReflectDerive<'a> {
    pub fn from_input(input: &'a DeriveInput) -> syn::Result<Self> {
        if !input.generics.params.is_empty() {
            return Err(syn::Error::new(
                input.generics.span(),
                "`Reflect` cannot be derived for generic types",
            ));
        }

        let attrs = TypeAttributes::parse(&input.attrs)?;
        let ident = &input.ident;

        match &input.data {
            Data::Struct(data) => Ok(ReflectDerive::Struct {
                ident,
                fields: collect_fields(&data.fields)?,
                attrs,
            }),
            Data::Enum(data) => {
                if data.variants.is_empty() {
                    return Err(syn::Error::new(
                        ident.span(),
                        "`Reflect` cannot be derived for enums without variants",
                    ));
                }
                if !attrs.getters.is_empty() || !attrs.setters.is_empty() {
                    return Err(syn::Error::new(
                        ident.span(),
                        "`getters` and `setters` are only supported on structs",
                    ));
                }
                let variants = data
                    .variants
                    .iter()
                    .enumerate()
                    .map(|(index, variant)| {
                        Ok(ReflectVariant {
                            ident: &variant.ident,
                            name: variant.ident.unraw().to_string(),
                            index,
                            is_unit: matches!(variant.fields, Fields::Unit),
                            fields: collect_fields(&variant.fields)?,
                        })
                    })
                    .collect::<syn::Result<Vec<_>>>()?;
                Ok(ReflectDerive::Enum {
                    ident,
                    attrs,
                    variants,
                })
            }
            Data::Union(data) => Err(syn::Error::new(
                data.union_token.span(),
                "`Reflect` cannot be derived for unions",
            )),
        }
    }

    pub fn ident(&self) -> &'a Ident {
        match self {
            ReflectDerive::Struct { ident, .. } | ReflectDerive::Enum { ident, .. } => ident,
        }
    }

    pub fn attrs(&self) -> &TypeAttributes {
        match self {
            ReflectDerive::Struct { attrs, .. } | ReflectDerive::Enum { attrs, .. } => attrs,
        }
    }

    /// Every field of the type, across all variants.
    pub fn all_fields(&self) -> Box<dyn Iterator<Item = &ReflectField<'a>> + '_> {
        match self {
            ReflectDerive::Struct { fields, .. } => Box::new(fields.iter()),
            ReflectDerive::Enum { variants, .. } => {
                Box::new(variants.iter().flat_map(|variant| variant.fields.iter()))
            }
        }
    }
}
