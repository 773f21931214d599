//! Parsed form of a `#[derive(Reflect)]` input.

// -----------------------------------------------------------------------------
// Modules

mod field_attributes;
mod reflect_derive;
mod type_attributes;

// -----------------------------------------------------------------------------
// Internal API

pub(crate) use field_attributes::FieldAttributes;
pub(crate) use reflect_derive::{ReflectDerive, ReflectField, ReflectVariant};
pub(crate) use type_attributes::TypeAttributes;
