use core::any::{Any, TypeId};

use vc_utils::TypeIdMap;

use crate::info::{TypeInfo, Typed};
use crate::registry::{TypeRegistry, TypeTrait};

// -----------------------------------------------------------------------------
// TypeMeta

/// A registry entry: the type's [`TypeInfo`] plus its [`TypeTrait`] data.
pub struct TypeMeta {
    type_info: &'static TypeInfo,
    traits: TypeIdMap<Box<dyn TypeTrait>>,
}

impl TypeMeta {
    #[inline]
    pub fn of<T: Typed>() -> Self {
        Self {
            type_info: T::type_info(),
            traits: TypeIdMap::new(),
        }
    }

    #[inline]
    pub fn type_info(&self) -> &'static TypeInfo {
        self.type_info
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_info.type_id()
    }

    #[inline]
    pub fn type_path(&self) -> &'static str {
        self.type_info.type_path()
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_info.type_name()
    }

    /// Inserts trait data, replacing data of the same type.
    #[inline]
    pub fn insert_trait<D: TypeTrait>(&mut self, data: D) {
        self.traits.insert_type::<D>(Box::new(data));
    }

    pub fn get_trait<D: TypeTrait>(&self) -> Option<&D> {
        let data = self.traits.get_type::<D>()?;
        let any: &dyn Any = &**data;
        any.downcast_ref::<D>()
    }

    #[inline]
    pub fn has_trait<D: TypeTrait>(&self) -> bool {
        self.traits.contains(&TypeId::of::<D>())
    }
}

impl core::fmt::Debug for TypeMeta {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TypeMeta")
            .field("type_path", &self.type_path())
            .field("traits", &self.traits.len())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// GetTypeMeta

/// Builds the [`TypeMeta`] of a type and registers the types it depends on.
///
/// Implemented by `#[derive(Reflect)]`, whose `register_dependencies`
/// registers every field type.
pub trait GetTypeMeta: Typed {
    fn get_type_meta() -> TypeMeta;

    #[inline]
    fn register_dependencies(_registry: &mut TypeRegistry) {}
}
