use core::any::TypeId;
use core::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use vc_reflect::Reflect;
use vc_reflect::info::TypeInfo;
use vc_utils::hash::HashMap;

use crate::error::{ErrorKind, Result};
use crate::model::{NodeIndex, NodeView, Primitive};

// -----------------------------------------------------------------------------
// Extension points

/// Receives the members a [`CustomWriter`] emits.
pub trait MemberSink {
    /// Writes `value` under `name` with the regular rules.
    fn value(&mut self, name: &str, value: &dyn Reflect) -> Result<()>;

    /// Writes a scalar under `name`.
    fn primitive(&mut self, name: &str, value: Primitive) -> Result<()>;
}

/// Replaces the member-wise output of a type.
pub trait CustomWriter: Send + Sync {
    /// Whether [`write_primitive`](Self::write_primitive) is used instead of
    /// [`write`](Self::write).
    fn has_primitive_form(&self) -> bool {
        false
    }

    /// Writes the value as a single scalar.
    fn write_primitive(&self, value: &dyn Reflect) -> Result<Primitive> {
        Err(ErrorKind::unsupported(value.reflect_type_path(), "a custom scalar").into())
    }

    /// Writes the members of the value.
    fn write(&self, value: &dyn Reflect, sink: &mut dyn MemberSink) -> Result<()>;
}

/// Services of the resolver available to a [`CustomFactory`].
pub trait ResolverCallbacks {
    /// Materializes the node at `index` as `target` with the regular rules.
    fn materialize(
        &mut self,
        index: NodeIndex,
        target: &'static TypeInfo,
    ) -> Result<Box<dyn Reflect>>;

    /// Converts a scalar with the engine's [`Converter`](crate::Converter).
    fn convert(&self, value: &Primitive, target: &'static TypeInfo) -> Result<Box<dyn Reflect>>;
}

/// Replaces member-wise construction of a type.
pub trait CustomFactory: Send + Sync {
    fn instantiate(
        &self,
        node: NodeView<'_>,
        callbacks: &mut dyn ResolverCallbacks,
    ) -> Result<Box<dyn Reflect>>;
}

/// Takes a member of a document that the target type does not have.
///
/// Called instead of dropping the member, with the value under construction
/// and the member's node. Forward references cannot be patched from here.
pub trait MissingMemberHandler: Send + Sync {
    fn handle(
        &self,
        target: &mut dyn Reflect,
        name: &str,
        node: NodeView<'_>,
        callbacks: &mut dyn ResolverCallbacks,
    ) -> Result<()>;
}

/// What an extension is registered for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExtensionKey {
    /// One concrete type, and types that embed it as their base.
    Type(TypeId),
    /// Every type declaring the capability with `#[reflect(implements(..))]`.
    Capability(String),
}

impl ExtensionKey {
    #[inline]
    pub fn of<T: Reflect>() -> Self {
        ExtensionKey::Type(TypeId::of::<T>())
    }

    #[inline]
    pub fn capability(name: impl Into<String>) -> Self {
        ExtensionKey::Capability(name.into())
    }
}

// -----------------------------------------------------------------------------
// Table

struct Table<T: ?Sized> {
    by_type: HashMap<TypeId, Arc<T>>,
    by_capability: HashMap<String, Arc<T>>,
    resolved: HashMap<TypeId, Option<Arc<T>>>,
}

impl<T: ?Sized> Default for Table<T> {
    fn default() -> Self {
        Self {
            by_type: HashMap::default(),
            by_capability: HashMap::default(),
            resolved: HashMap::default(),
        }
    }
}

impl<T: ?Sized> Table<T> {
    fn insert(&mut self, key: ExtensionKey, value: Arc<T>) {
        match key {
            ExtensionKey::Type(type_id) => {
                self.by_type.insert(type_id, value);
            }
            ExtensionKey::Capability(name) => {
                self.by_capability.insert(name, value);
            }
        }
        self.resolved.clear();
    }

    /// Exact type, then the base chain, then capabilities along the chain.
    fn find(&self, info: &'static TypeInfo) -> Option<Arc<T>> {
        let mut chain = vec![info];
        while let Some(base) = chain
            .last()
            .copied()
            .and_then(TypeInfo::as_struct)
            .and_then(|info| info.base())
        {
            chain.push(base.type_info());
        }
        chain
            .iter()
            .find_map(|info| self.by_type.get(&info.type_id()))
            .or_else(|| {
                chain.iter().find_map(|info| {
                    info.capabilities()
                        .iter()
                        .find_map(|name| self.by_capability.get(*name))
                })
            })
            .cloned()
    }
}

fn lookup<T: ?Sized>(table: &RwLock<Table<T>>, info: &'static TypeInfo) -> Option<Arc<T>> {
    let type_id = info.type_id();
    if let Some(found) = table
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .resolved
        .get(&type_id)
    {
        return found.clone();
    }
    let mut table = table.write().unwrap_or_else(PoisonError::into_inner);
    let found = table.find(info);
    table.resolved.insert(type_id, found.clone());
    found
}

// -----------------------------------------------------------------------------
// ExtensionRegistry

/// Custom writers, factories and missing-member handlers, looked up per type.
///
/// A lookup tries the exact type first, then each `#[reflect(base)]` ancestor,
/// then the capability names of the type and its ancestors. Results are
/// cached per type until the next registration.
#[derive(Default)]
pub struct ExtensionRegistry {
    writers: RwLock<Table<dyn CustomWriter>>,
    factories: RwLock<Table<dyn CustomFactory>>,
    missing_members: RwLock<Table<dyn MissingMemberHandler>>,
}

impl ExtensionRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_writer(&self, key: ExtensionKey, writer: impl CustomWriter + 'static) {
        log::debug!("custom writer registered for {key:?}");
        self.writers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::new(writer));
    }

    pub fn register_factory(&self, key: ExtensionKey, factory: impl CustomFactory + 'static) {
        log::debug!("custom factory registered for {key:?}");
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::new(factory));
    }

    pub fn register_missing_member_handler(&self, key: ExtensionKey, handler: impl MissingMemberHandler + 'static) {
        log::debug!("missing-member handler registered for {key:?}");
        self.missing_members
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::new(handler));
    }

    #[inline]
    pub fn writer_for(&self, info: &'static TypeInfo) -> Option<Arc<dyn CustomWriter>> {
        lookup(&self.writers, info)
    }

    #[inline]
    pub fn factory_for(&self, info: &'static TypeInfo) -> Option<Arc<dyn CustomFactory>> {
        lookup(&self.factories, info)
    }

    #[inline]
    pub fn missing_member_handler_for(&self, info: &'static TypeInfo) -> Option<Arc<dyn MissingMemberHandler>> {
        lookup(&self.missing_members, info)
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let writers = self.writers.read().unwrap_or_else(PoisonError::into_inner);
        let factories = self.factories.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ExtensionRegistry")
            .field("writers", &(writers.by_type.len() + writers.by_capability.len()))
            .field("factories", &(factories.by_type.len() + factories.by_capability.len()))
            .finish()
    }
}
