use proc_macro2::Span;
use syn::meta::ParseNestedMeta;
use syn::spanned::Spanned;
use syn::{Attribute, Ident, LitStr};

use crate::REFLECT_ATTRIBUTE_NAME;

/// Type level `#[reflect(..)]` options.
#[derive(Default)]
pub(crate) struct TypeAttributes {
    /// `default`: register `TypeTraitDefault`.
    pub default: Option<Span>,
    /// `auto_register`: submit the type to `inventory`.
    pub auto_register: Option<Span>,
    /// `type_path = ".."`.
    pub type_path: Option<LitStr>,
    /// `implements(A, B)`, in declaration order.
    pub capabilities: Vec<String>,
    /// `getters(a, b)`.
    pub getters: Vec<Ident>,
    /// `setters(c, d)`.
    pub setters: Vec<Ident>,
}

fn path_name(path: &syn::Path) -> String {
    path.segments
        .iter()
        .map(|segment| segment.ident.to_string())
        .collect::<Vec<_>>()
        .join("::")
}

fn parse_idents(meta: &ParseNestedMeta, out: &mut Vec<Ident>) -> syn::Result<()> {
    meta.parse_nested_meta(|inner| {
        out.push(inner.path.require_ident()?.clone());
        Ok(())
    })
}

impl TypeAttributes {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut this = Self::default();

        for attr in attrs {
            if !attr.path().is_ident(REFLECT_ATTRIBUTE_NAME) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("default") {
                    this.default = Some(meta.path.span());
                } else if meta.path.is_ident("auto_register") {
                    this.auto_register = Some(meta.path.span());
                } else if meta.path.is_ident("type_path") {
                    let lit: LitStr = meta.value()?.parse()?;
                    if lit.value().is_empty() {
                        return Err(syn::Error::new(lit.span(), "`type_path` must not be empty"));
                    }
                    this.type_path = Some(lit);
                } else if meta.path.is_ident("implements") {
                    meta.parse_nested_meta(|inner| {
                        let name = path_name(&inner.path);
                        if !this.capabilities.contains(&name) {
                            this.capabilities.push(name);
                        }
                        Ok(())
                    })?;
                } else if meta.path.is_ident("getters") {
                    parse_idents(&meta, &mut this.getters)?;
                } else if meta.path.is_ident("setters") {
                    parse_idents(&meta, &mut this.setters)?;
                } else {
                    return Err(meta.error(
                        "unknown type attribute, expected one of `default`, `auto_register`, \
                         `type_path`, `implements`, `getters`, `setters`",
                    ));
                }
                Ok(())
            })?;
        }

        Ok(this)
    }
}
