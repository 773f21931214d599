use syn::{Attribute, Type};

use crate::REFLECT_ATTRIBUTE_NAME;

/// Field level `#[reflect(..)]` markers.
#[derive(Default, Clone, Copy)]
pub(crate) struct FieldAttributes {
    pub base: bool,
    pub transient: bool,
    pub synthetic: bool,
    pub global: bool,
}

// Same bit layout as `vc_reflect::info::FieldFlags`.
const BASE: u8 = 1 << 0;
const TRANSIENT: u8 = 1 << 1;
const SYNTHETIC: u8 = 1 << 2;
const GLOBAL: u8 = 1 << 3;

fn is_phantom(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "PhantomData"),
        _ => false,
    }
}

impl FieldAttributes {
    pub fn parse(attrs: &[Attribute], ty: &Type) -> syn::Result<Self> {
        let mut this = Self {
            synthetic: is_phantom(ty),
            ..Self::default()
        };

        for attr in attrs {
            if !attr.path().is_ident(REFLECT_ATTRIBUTE_NAME) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("base") {
                    this.base = true;
                } else if meta.path.is_ident("transient") {
                    this.transient = true;
                } else if meta.path.is_ident("synthetic") {
                    this.synthetic = true;
                } else if meta.path.is_ident("global") {
                    this.global = true;
                } else {
                    return Err(meta.error(
                        "unknown field attribute, expected one of `base`, `transient`, \
                         `synthetic`, `global`",
                    ));
                }
                Ok(())
            })?;
        }

        Ok(this)
    }

    pub fn bits(self) -> u8 {
        let mut bits = 0;
        if self.base {
            bits |= BASE;
        }
        if self.transient {
            bits |= TRANSIENT;
        }
        if self.synthetic {
            bits |= SYNTHETIC;
        }
        if self.global {
            bits |= GLOBAL;
        }
        bits
    }
}
