//! Static type information.
//!
//! Every reflected type owns exactly one [`TypeInfo`], created lazily on first
//! request and leaked for the process lifetime. Field and element types are
//! stored as function pointers, so self-referential types never recurse while
//! their information is being built.

// -----------------------------------------------------------------------------
// Modules

mod cell;
mod container_info;
mod enum_info;
mod method_info;
mod struct_info;
mod type_info;

// -----------------------------------------------------------------------------
// Exports

pub use cell::{GenericTypeInfoCell, NonGenericTypeInfoCell};
pub use container_info::{DynInfo, ListInfo, MapInfo, OpaqueInfo, OptionalInfo, SetInfo, SharedInfo};
pub use enum_info::{EnumInfo, VariantInfo};
pub use method_info::{AccessFault, MethodInfo, MethodKind};
pub use struct_info::{FieldFlags, NamedField, StructInfo, Visibility};
pub use type_info::{ReflectKind, Type, TypeInfo, Typed};
