use core::any::TypeId;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use vc_utils::TypeIdMap;
use vc_utils::hash::{HashMap, HashSet};

use crate::info::TypeInfo;
use crate::registry::{FromType, GetTypeMeta, TypeMeta, TypeTrait};

// -----------------------------------------------------------------------------
// TypeRegistry

/// The central store of reflected types.
///
/// [Registering](TypeRegistry::register) a type stores its [`TypeMeta`] and
/// indexes it by full type path and by short type name. The graph reader
/// resolves `@type` tags through these indices.
///
/// # Example
///
/// ```
/// use vc_reflect::registry::{TypeRegistry, TypeTraitDefault};
///
/// let registry = TypeRegistry::new();
///
/// let default = registry
///     .get_with_type_name("String").unwrap()
///     .get_trait::<TypeTraitDefault>().unwrap();
///
/// let s = default.default_value().take::<String>().unwrap();
/// assert_eq!(s, "");
/// ```
pub struct TypeRegistry {
    metas: TypeIdMap<TypeMeta>,
    path_to_id: HashMap<&'static str, TypeId>,
    name_to_id: HashMap<&'static str, TypeId>,
    ambiguous_names: HashSet<&'static str>,
}

impl Default for TypeRegistry {
    /// See [`TypeRegistry::new`].
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Creates a registry without any registration.
    pub fn empty() -> Self {
        Self {
            metas: TypeIdMap::new(),
            path_to_id: HashMap::default(),
            name_to_id: HashMap::default(),
            ambiguous_names: HashSet::default(),
        }
    }

    /// Creates a registry with the built-in leaf types registered.
    ///
    /// - `()` `bool` `char` `String`
    /// - `i8 - i128` `isize` `u8 - u128` `usize` `f32` `f64`
    /// - [`ReflectBox`](crate::ReflectBox), `Vec<ReflectBox>` and [`DynamicMap`](crate::ops::DynamicMap)
    /// - with the `chrono` feature: `NaiveDate` `NaiveTime` `NaiveDateTime`
    ///   `DateTime<Utc>` `DateTime<FixedOffset>`
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register::<()>();
        registry.register::<bool>();
        registry.register::<char>();
        registry.register::<u8>();
        registry.register::<u16>();
        registry.register::<u32>();
        registry.register::<u64>();
        registry.register::<u128>();
        registry.register::<usize>();
        registry.register::<i8>();
        registry.register::<i16>();
        registry.register::<i32>();
        registry.register::<i64>();
        registry.register::<i128>();
        registry.register::<isize>();
        registry.register::<f32>();
        registry.register::<f64>();
        registry.register::<String>();
        registry.register::<crate::ReflectBox>();
        registry.register::<Vec<crate::ReflectBox>>();
        registry.register::<crate::ops::DynamicMap>();
        #[cfg(feature = "chrono")]
        {
            registry.register::<chrono::NaiveDate>();
            registry.register::<chrono::NaiveTime>();
            registry.register::<chrono::NaiveDateTime>();
            registry.register::<chrono::DateTime<chrono::Utc>>();
            registry.register::<chrono::DateTime<chrono::FixedOffset>>();
        }
        registry
    }

    // The type must not be registered yet.
    fn add_indices(&mut self, meta: &TypeMeta) {
        let ty = meta.type_info().ty();
        let name = ty.name();

        if !self.ambiguous_names.contains(name) {
            if self.name_to_id.remove(name).is_some() {
                self.ambiguous_names.insert(name);
            } else {
                self.name_to_id.insert(name, ty.id());
            }
        }

        self.path_to_id.insert(ty.path(), ty.id());
    }

    /// Registers `T` and, if it was new, the types it depends on.
    ///
    /// Registering an already known type does nothing, so dependency cycles
    /// terminate.
    pub fn register<T: GetTypeMeta>(&mut self) {
        let type_id = TypeId::of::<T>();
        if self.metas.contains(&type_id) {
            return;
        }
        let meta = T::get_type_meta();
        log::debug!("register reflected type `{}`", meta.type_path());
        self.add_indices(&meta);
        self.metas.insert(type_id, meta);
        T::register_dependencies(self);
    }

    /// Inserts a [`TypeMeta`], replacing the trait data of a known type.
    ///
    /// Dependencies are not registered.
    pub fn insert_type_meta(&mut self, meta: TypeMeta) {
        if !self.metas.contains(&meta.type_id()) {
            self.add_indices(&meta);
        }
        self.metas.insert(meta.type_id(), meta);
    }

    /// Adds the trait data `D` to the registered type `T`.
    ///
    /// Returns `false` if `T` is not registered.
    pub fn register_type_trait<T: GetTypeMeta, D: TypeTrait + FromType<T>>(&mut self) -> bool {
        match self.metas.get_mut(&TypeId::of::<T>()) {
            Some(meta) => {
                meta.insert_trait(D::from_type());
                true
            }
            None => false,
        }
    }

    /// Registers every type declared with `#[reflect(auto_register)]`.
    ///
    /// Returns `false` when the `auto_register` feature is disabled.
    pub fn auto_register(&mut self) -> bool {
        #[cfg(feature = "auto_register")]
        {
            crate::registry::auto_register::register_all(self);
            true
        }
        #[cfg(not(feature = "auto_register"))]
        {
            false
        }
    }

    #[inline]
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.metas.contains(&type_id)
    }

    #[inline]
    pub fn get(&self, type_id: TypeId) -> Option<&TypeMeta> {
        self.metas.get(&type_id)
    }

    pub fn get_with_type_path(&self, type_path: &str) -> Option<&TypeMeta> {
        let id = self.path_to_id.get(type_path)?;
        self.get(*id)
    }

    /// Looks a type up by its short name.
    ///
    /// Returns `None` if the name is ambiguous.
    pub fn get_with_type_name(&self, type_name: &str) -> Option<&TypeMeta> {
        let id = self.name_to_id.get(type_name)?;
        self.get(*id)
    }

    #[inline]
    pub fn is_ambiguous(&self, type_name: &str) -> bool {
        self.ambiguous_names.contains(type_name)
    }

    /// Resolves a type tag: first as a full path, then as an unambiguous
    /// short name.
    pub fn resolve_tag(&self, tag: &str) -> Option<&TypeMeta> {
        self.get_with_type_path(tag)
            .or_else(|| self.get_with_type_name(tag))
    }

    pub fn get_type_trait<D: TypeTrait>(&self, type_id: TypeId) -> Option<&D> {
        self.get(type_id)?.get_trait::<D>()
    }

    #[inline]
    pub fn get_type_info(&self, type_id: TypeId) -> Option<&'static TypeInfo> {
        self.get(type_id).map(TypeMeta::type_info)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.metas.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeMeta> {
        self.metas.values()
    }
}

impl core::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.path_to_id.keys()).finish()
    }
}

// -----------------------------------------------------------------------------
// TypeRegistryArc

/// A [`TypeRegistry`] shared between threads.
#[derive(Clone, Default)]
pub struct TypeRegistryArc {
    pub internal: Arc<RwLock<TypeRegistry>>,
}

impl TypeRegistryArc {
    #[inline]
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            internal: Arc::new(RwLock::new(registry)),
        }
    }

    /// Takes a read lock on the underlying [`TypeRegistry`].
    pub fn read(&self) -> RwLockReadGuard<'_, TypeRegistry> {
        self.internal.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes a write lock on the underlying [`TypeRegistry`].
    pub fn write(&self) -> RwLockWriteGuard<'_, TypeRegistry> {
        self.internal
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl core::fmt::Debug for TypeRegistryArc {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.read().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use core::any::TypeId;

    use super::TypeRegistry;
    use crate::info::{TypeInfo, Typed};
    use crate::registry::TypeTraitDefault;

    mod left {
        pub struct Token;
        crate::impls::impl_reflect_opaque!(Token => "left::Token");
    }

    mod right {
        pub struct Token;
        crate::impls::impl_reflect_opaque!(Token => "right::Token");
    }

    #[test]
    fn dependencies_are_registered() {
        let mut registry = TypeRegistry::empty();
        registry.register::<Vec<Option<String>>>();

        assert!(registry.contains(TypeId::of::<Option<String>>()));
        assert!(registry.contains(TypeId::of::<String>()));
        assert!(
            registry
                .get_type_trait::<TypeTraitDefault>(TypeId::of::<Vec<Option<String>>>())
                .is_some()
        );
    }

    #[test]
    fn short_names_may_be_ambiguous() {
        let mut registry = TypeRegistry::new();
        registry.register::<left::Token>();
        registry.register::<right::Token>();

        assert!(registry.is_ambiguous("Token"));
        assert!(registry.get_with_type_name("Token").is_none());
        assert!(registry.resolve_tag("right::Token").is_some());
        assert!(registry.resolve_tag("i64").is_some());
        assert!(registry.resolve_tag("nope").is_none());
    }

    #[test]
    fn opaque_info_is_stable() {
        let info: &TypeInfo = <left::Token as Typed>::type_info();
        assert!(matches!(info, TypeInfo::Opaque(_)));
        assert_eq!(info.type_path(), "left::Token");
        assert_eq!(info.type_name(), "Token");
    }
}
