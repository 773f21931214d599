//! Kind traits and the [`ReflectRef`] / [`ReflectMut`] views.

// -----------------------------------------------------------------------------
// Modules

mod dynamic_map;
mod enum_ops;
mod list_ops;
mod map_ops;
mod optional_ops;
mod set_ops;
mod shared_ops;
mod struct_ops;

// -----------------------------------------------------------------------------
// Exports

pub use dynamic_map::DynamicMap;
pub use enum_ops::Enum;
pub use list_ops::List;
pub use map_ops::Map;
pub use optional_ops::Optional;
pub use set_ops::Set;
pub use shared_ops::{Shared, SharedHandle};
pub use struct_ops::Struct;

use crate::info::ReflectKind;
use crate::{Reflect, ReflectBox};

// -----------------------------------------------------------------------------
// ReflectRef

/// An immutable view of a reflected value as its kind trait.
pub enum ReflectRef<'a> {
    Struct(&'a dyn Struct),
    Enum(&'a dyn Enum),
    List(&'a dyn List),
    Set(&'a dyn Set),
    Map(&'a dyn Map),
    Optional(&'a dyn Optional),
    Shared(&'a dyn SharedHandle),
    Dyn(&'a ReflectBox),
    Opaque(&'a dyn Reflect),
}

impl ReflectRef<'_> {
    pub fn kind(&self) -> ReflectKind {
        match self {
            ReflectRef::Struct(_) => ReflectKind::Struct,
            ReflectRef::Enum(_) => ReflectKind::Enum,
            ReflectRef::List(_) => ReflectKind::List,
            ReflectRef::Set(_) => ReflectKind::Set,
            ReflectRef::Map(_) => ReflectKind::Map,
            ReflectRef::Optional(_) => ReflectKind::Optional,
            ReflectRef::Shared(_) => ReflectKind::Shared,
            ReflectRef::Dyn(_) => ReflectKind::Dyn,
            ReflectRef::Opaque(_) => ReflectKind::Opaque,
        }
    }
}

// -----------------------------------------------------------------------------
// ReflectMut

/// A mutable view of a reflected value as its kind trait.
pub enum ReflectMut<'a> {
    Struct(&'a mut dyn Struct),
    Enum(&'a mut dyn Enum),
    List(&'a mut dyn List),
    Set(&'a mut dyn Set),
    Map(&'a mut dyn Map),
    Optional(&'a mut dyn Optional),
    Shared(&'a mut dyn SharedHandle),
    Dyn(&'a mut ReflectBox),
    Opaque(&'a mut dyn Reflect),
}

impl ReflectMut<'_> {
    pub fn kind(&self) -> ReflectKind {
        match self {
            ReflectMut::Struct(_) => ReflectKind::Struct,
            ReflectMut::Enum(_) => ReflectKind::Enum,
            ReflectMut::List(_) => ReflectKind::List,
            ReflectMut::Set(_) => ReflectKind::Set,
            ReflectMut::Map(_) => ReflectKind::Map,
            ReflectMut::Optional(_) => ReflectKind::Optional,
            ReflectMut::Shared(_) => ReflectKind::Shared,
            ReflectMut::Dyn(_) => ReflectKind::Dyn,
            ReflectMut::Opaque(_) => ReflectKind::Opaque,
        }
    }
}
