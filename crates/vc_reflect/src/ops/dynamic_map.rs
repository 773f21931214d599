use crate::info::{MapInfo, NonGenericTypeInfoCell, TypeInfo, Typed};
use crate::ops::{Map, ReflectMut, ReflectRef};
use crate::registry::{FromType, GetTypeMeta, TypeMeta, TypeRegistry, TypeTraitDefault, TypeTraitShared};
use crate::{FromReflect, Reflect, ReflectBox};

/// An insertion-ordered map from member names to untyped values.
///
/// The reader materializes untagged objects in polymorphic slots as a
/// `DynamicMap`, so member order survives a round trip. Through the [`Map`]
/// trait the values are seen as their [`ReflectBox`] slots; the inherent
/// [`get`](DynamicMap::get) returns the boxed value itself.
///
/// A map may carry the type tag of the object it was read from, so that
/// writing it again reproduces the tag.
#[derive(Debug, Default)]
pub struct DynamicMap {
    type_tag: Option<String>,
    entries: Vec<(String, ReflectBox)>,
}

impl DynamicMap {
    #[inline]
    pub const fn new() -> Self {
        Self {
            type_tag: None,
            entries: Vec::new(),
        }
    }

    #[inline]
    pub fn with_type_tag(mut self, tag: impl Into<String>) -> Self {
        self.type_tag = Some(tag.into());
        self
    }

    #[inline]
    pub fn type_tag(&self) -> Option<&str> {
        self.type_tag.as_deref()
    }

    #[inline]
    pub fn set_type_tag(&mut self, tag: Option<String>) {
        self.type_tag = tag;
    }

    /// Inserts or replaces `name`. A replaced entry keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: Box<dyn Reflect>) {
        let name = name.into();
        let value = ReflectBox::from_boxed(value);
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Reflect> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.get())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }
}

impl Reflect for DynamicMap {
    crate::impls::impl_reflect_common!();

    #[inline]
    fn reflect_ref(&self) -> ReflectRef<'_> {
        ReflectRef::Map(self)
    }

    #[inline]
    fn reflect_mut(&mut self) -> ReflectMut<'_> {
        ReflectMut::Map(self)
    }
}

impl Map for DynamicMap {
    #[inline]
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&dyn Reflect, &dyn Reflect)> + '_> {
        Box::new(
            self.entries
                .iter()
                .map(|(key, value)| (key as &dyn Reflect, value as &dyn Reflect)),
        )
    }

    fn get(&self, key: &dyn Reflect) -> Option<&dyn Reflect> {
        let key = key.downcast_ref::<String>()?;
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value as &dyn Reflect)
    }

    fn get_mut(&mut self, key: &dyn Reflect) -> Option<&mut dyn Reflect> {
        let key = key.downcast_ref::<String>()?;
        self.entries
            .iter_mut()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value as &mut dyn Reflect)
    }

    fn insert(&mut self, key: Box<dyn Reflect>, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
        let key = key.take::<String>()?;
        DynamicMap::insert(self, key, value);
        Ok(())
    }
}

impl FromReflect for DynamicMap {}

impl Typed for DynamicMap {
    fn type_info() -> &'static TypeInfo {
        static CELL: NonGenericTypeInfoCell = NonGenericTypeInfoCell::new();
        CELL.get_or_init(|| {
            TypeInfo::Map(MapInfo::with_path::<Self, String, ReflectBox>("vc_reflect::DynamicMap"))
        })
    }
}

impl GetTypeMeta for DynamicMap {
    fn get_type_meta() -> TypeMeta {
        let mut meta = TypeMeta::of::<Self>();
        meta.insert_trait(<TypeTraitDefault as FromType<Self>>::from_type());
        meta.insert_trait(<TypeTraitShared as FromType<Self>>::from_type());
        meta
    }

    fn register_dependencies(registry: &mut TypeRegistry) {
        registry.register::<ReflectBox>();
    }
}

#[cfg(test)]
mod tests {
    use super::DynamicMap;
    use crate::ops::Map;

    #[test]
    fn keeps_insertion_order() {
        let mut map = DynamicMap::new();
        map.insert("z", Box::new(1_i64));
        map.insert("a", Box::new(true));
        map.insert("z", Box::new(2_i64));

        assert_eq!(map.names().collect::<Vec<_>>(), ["z", "a"]);
        assert_eq!(map.get("z").and_then(|v| v.downcast_ref::<i64>()), Some(&2));
        assert!(Map::insert(&mut map, Box::new(1_u8), Box::new(1_u8)).is_err());
    }

    #[test]
    fn type_tag() {
        let mut map = DynamicMap::new().with_type_tag("shapes::Circle");
        assert_eq!(map.type_tag(), Some("shapes::Circle"));
        map.set_type_tag(None);
        assert_eq!(map.type_tag(), None);
    }
}
