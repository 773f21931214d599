//! Type registration and per-type trait data.

// -----------------------------------------------------------------------------
// Modules

mod type_meta;
mod type_registry;
mod type_trait;

#[cfg(feature = "auto_register")]
mod auto_register;

// -----------------------------------------------------------------------------
// Exports

pub use type_meta::{GetTypeMeta, TypeMeta};
pub use type_registry::{TypeRegistry, TypeRegistryArc};
pub use type_trait::{FromType, TypeTrait, TypeTraitDefault, TypeTraitShared};

#[cfg(feature = "auto_register")]
pub use auto_register::AutoRegister;
