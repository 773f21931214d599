use core::any::{Any, TypeId};
use core::fmt;

use crate::Reflect;
use crate::info::{
    DynInfo, EnumInfo, ListInfo, MapInfo, OpaqueInfo, OptionalInfo, SetInfo, SharedInfo, StructInfo,
};

// -----------------------------------------------------------------------------
// Typed

/// Static access to a type's [`TypeInfo`].
///
/// Implemented by `#[derive(Reflect)]` and by every built-in reflected type.
pub trait Typed: Reflect {
    fn type_info() -> &'static TypeInfo;
}

// -----------------------------------------------------------------------------
// ReflectKind

/// The shape of a reflected type, as seen by the graph engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReflectKind {
    Struct,
    Enum,
    List,
    Set,
    Map,
    Optional,
    Shared,
    Dyn,
    Opaque,
}

impl fmt::Display for ReflectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReflectKind::Struct => "struct",
            ReflectKind::Enum => "enum",
            ReflectKind::List => "list",
            ReflectKind::Set => "set",
            ReflectKind::Map => "map",
            ReflectKind::Optional => "optional",
            ReflectKind::Shared => "shared",
            ReflectKind::Dyn => "dyn",
            ReflectKind::Opaque => "opaque",
        };
        f.write_str(name)
    }
}

// -----------------------------------------------------------------------------
// Type

/// Identity of a reflected type: its [`TypeId`], full path and short name.
///
/// The short name drops the module prefix of the outermost path segment, so
/// `my_app::shapes::Circle` becomes `Circle` and
/// `alloc::vec::Vec<my_app::shapes::Circle>` becomes `Vec<my_app::shapes::Circle>`.
#[derive(Clone, Copy, Debug)]
pub struct Type {
    id: TypeId,
    path: &'static str,
    name: &'static str,
}

impl Type {
    /// Uses [`core::any::type_name`] as the path.
    #[inline]
    pub fn of<T: Any + ?Sized>() -> Self {
        Self::with_path::<T>(core::any::type_name::<T>())
    }

    #[inline]
    pub fn with_path<T: Any + ?Sized>(path: &'static str) -> Self {
        Self {
            id: TypeId::of::<T>(),
            path,
            name: short_name(path),
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn path(&self) -> &'static str {
        self.path
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn is<T: Any + ?Sized>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

fn short_name(path: &'static str) -> &'static str {
    let head_end = path.find('<').unwrap_or(path.len());
    match path[..head_end].rfind("::") {
        Some(pos) => &path[pos + 2..],
        None => path,
    }
}

// -----------------------------------------------------------------------------
// TypeInfo

/// Compile-time information about a reflected type.
#[derive(Debug)]
pub enum TypeInfo {
    Struct(StructInfo),
    Enum(EnumInfo),
    List(ListInfo),
    Set(SetInfo),
    Map(MapInfo),
    Optional(OptionalInfo),
    Shared(SharedInfo),
    Dyn(DynInfo),
    Opaque(OpaqueInfo),
}

macro_rules! as_kind {
    ($($fn_name:ident => $variant:ident($info:ty);)*) => {
        $(
            #[inline]
            pub fn $fn_name(&self) -> Option<&$info> {
                match self {
                    TypeInfo::$variant(info) => Some(info),
                    _ => None,
                }
            }
        )*
    };
}

impl TypeInfo {
    pub fn ty(&self) -> &Type {
        match self {
            TypeInfo::Struct(info) => info.ty(),
            TypeInfo::Enum(info) => info.ty(),
            TypeInfo::List(info) => info.ty(),
            TypeInfo::Set(info) => info.ty(),
            TypeInfo::Map(info) => info.ty(),
            TypeInfo::Optional(info) => info.ty(),
            TypeInfo::Shared(info) => info.ty(),
            TypeInfo::Dyn(info) => info.ty(),
            TypeInfo::Opaque(info) => info.ty(),
        }
    }

    pub fn kind(&self) -> ReflectKind {
        match self {
            TypeInfo::Struct(_) => ReflectKind::Struct,
            TypeInfo::Enum(_) => ReflectKind::Enum,
            TypeInfo::List(_) => ReflectKind::List,
            TypeInfo::Set(_) => ReflectKind::Set,
            TypeInfo::Map(_) => ReflectKind::Map,
            TypeInfo::Optional(_) => ReflectKind::Optional,
            TypeInfo::Shared(_) => ReflectKind::Shared,
            TypeInfo::Dyn(_) => ReflectKind::Dyn,
            TypeInfo::Opaque(_) => ReflectKind::Opaque,
        }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.ty().id()
    }

    #[inline]
    pub fn type_path(&self) -> &'static str {
        self.ty().path()
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.ty().name()
    }

    #[inline]
    pub fn is<T: Any + ?Sized>(&self) -> bool {
        self.ty().is::<T>()
    }

    /// Capability names declared with `#[reflect(implements(..))]`.
    pub fn capabilities(&self) -> &'static [&'static str] {
        match self {
            TypeInfo::Struct(info) => info.capabilities(),
            TypeInfo::Enum(info) => info.capabilities(),
            _ => &[],
        }
    }

    as_kind! {
        as_struct => Struct(StructInfo);
        as_enum => Enum(EnumInfo);
        as_list => List(ListInfo);
        as_set => Set(SetInfo);
        as_map => Map(MapInfo);
        as_optional => Optional(OptionalInfo);
        as_shared => Shared(SharedInfo);
    }
}

#[cfg(test)]
mod tests {
    use super::Type;

    #[test]
    fn short_names() {
        assert_eq!(Type::with_path::<u8>("my_app::shapes::Circle").name(), "Circle");
        assert_eq!(Type::with_path::<u8>("u8").name(), "u8");
        assert_eq!(
            Type::with_path::<u8>("alloc::vec::Vec<my_app::Circle>").name(),
            "Vec<my_app::Circle>"
        );
    }
}
