use core::any::TypeId;
use std::sync::{Arc, PoisonError, RwLock};

use vc_reflect::info::{
    FieldFlags, MethodInfo, MethodKind, NamedField, StructInfo, TypeInfo, Typed, Visibility,
};
use vc_utils::hash::{HashMap, HashSet};

use crate::access::{Access, MemberDescriptor};
use crate::config::EngineConfig;

/// Fields with any of these flags are never members.
const SKIPPED: FieldFlags = FieldFlags::TRANSIENT
    .union(FieldFlags::SYNTHETIC)
    .union(FieldFlags::GLOBAL);

/// The document name of an enum's variant.
pub(crate) const VARIANT_MEMBER: &str = "name";

// -----------------------------------------------------------------------------
// MemberCatalog

/// Discovers and caches the members of reflected types.
///
/// Discovery runs once per type (and per variant for enums) and is shared by
/// every later read and write. The members of a struct are its own fields,
/// followed by the members of its `#[reflect(base)]` chain. A name already
/// taken by a more derived type is renamed to `Base.name`, and to
/// `path::to::Base.name` if that is taken as well.
#[derive(Default)]
pub struct MemberCatalog {
    cache: RwLock<HashMap<(TypeId, Option<usize>), Arc<[MemberDescriptor]>>>,
}

impl MemberCatalog {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// The members of `info`, or of its variant `variant` for enums.
    ///
    /// Types without members (lists, maps, leaf values) yield an empty list.
    pub fn members(
        &self,
        info: &'static TypeInfo,
        variant: Option<usize>,
        config: &EngineConfig,
    ) -> Arc<[MemberDescriptor]> {
        let key = (info.type_id(), variant);
        if let Some(found) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return found.clone();
        }

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(found) = cache.get(&key) {
            return found.clone();
        }
        let members: Arc<[MemberDescriptor]> = discover(info, variant, config).into();
        log::debug!(
            "discovered {} members of `{}`",
            members.len(),
            info.type_path()
        );
        cache.insert(key, members.clone());
        members
    }

    /// Forgets every discovered type.
    pub fn clear(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl core::fmt::Debug for MemberCatalog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let len = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("MemberCatalog").field("cached", &len).finish()
    }
}

// -----------------------------------------------------------------------------
// Discovery

struct Discovery<'a> {
    target_type: TypeId,
    config: &'a EngineConfig,
    taken: HashSet<String>,
    members: Vec<MemberDescriptor>,
}

fn discover(
    info: &'static TypeInfo,
    variant: Option<usize>,
    config: &EngineConfig,
) -> Vec<MemberDescriptor> {
    let mut discovery = Discovery {
        target_type: info.type_id(),
        config,
        taken: HashSet::default(),
        members: Vec::new(),
    };
    match info {
        TypeInfo::Struct(_) => discovery.walk_struct(info, Vec::new()),
        TypeInfo::Enum(enum_info) => {
            let Some(variant) = variant.and_then(|index| enum_info.variant_at(index)) else {
                return Vec::new();
            };
            discovery.push(
                info,
                VARIANT_MEMBER,
                VARIANT_MEMBER,
                <String as Typed>::type_info,
                Visibility::Public,
                &[],
                Access::VariantName,
            );
            for field in variant.fields() {
                if discovery.skips(info, field) {
                    continue;
                }
                let access = Access::Direct {
                    index: field.index(),
                };
                let unique = discovery.unique_name(info, field.name());
                discovery.push(
                    info,
                    field.name(),
                    &unique,
                    field.type_info_fn(),
                    field.visibility(),
                    &[],
                    access,
                );
            }
        }
        _ => {}
    }
    discovery.members
}

impl Discovery<'_> {
    fn skips(&self, declaring: &'static TypeInfo, field: &NamedField) -> bool {
        field.flags().intersects(SKIPPED) || self.config.excludes(declaring.type_path(), field.name())
    }

    fn walk_struct(&mut self, declaring: &'static TypeInfo, route: Vec<usize>) {
        let Some(info) = declaring.as_struct() else {
            return;
        };
        let mut base = None;
        for field in info.fields() {
            if field.is_base() && field.type_info().as_struct().is_some() {
                base = Some(field);
                continue;
            }
            if self.skips(declaring, field) {
                continue;
            }
            let access = self.access_of(info, field);
            let unique = self.unique_name(declaring, field.name());
            self.push(
                declaring,
                field.name(),
                &unique,
                field.type_info_fn(),
                field.visibility(),
                &route,
                access,
            );
        }
        if let Some(base) = base {
            let mut route = route;
            route.push(base.index());
            self.walk_struct(base.type_info(), route);
        }
    }

    fn unique_name(&self, declaring: &'static TypeInfo, name: &str) -> String {
        if !self.taken.contains(name) {
            return String::from(name);
        }
        let short = format!("{}.{name}", declaring.type_name());
        if !self.taken.contains(&short) {
            return short;
        }
        format!("{}.{name}", declaring.type_path())
    }

    /// Accessor override first, then `get_x`/`is_x` with `set_x`, then the field.
    fn access_of(&self, info: &'static StructInfo, field: &NamedField) -> Access {
        let index = field.index();
        let (getter, setter) = match self.config.accessor_override(info.type_path(), field.name()) {
            Some(pair) => {
                let getter = pair.getter.as_deref().and_then(|name| method(info, name, MethodKind::Getter));
                let setter = pair.setter.as_deref().and_then(|name| method(info, name, MethodKind::Setter));
                (getter, setter)
            }
            None => {
                let getter = method(info, &format!("get_{}", field.name()), MethodKind::Getter)
                    .or_else(|| method(info, &format!("is_{}", field.name()), MethodKind::Getter));
                let setter = method(info, &format!("set_{}", field.name()), MethodKind::Setter);
                (getter, setter)
            }
        };
        let getter = getter.filter(|getter| getter.value_type().type_id() == field.type_id());
        if getter.is_none() && setter.is_none() {
            Access::Direct { index }
        } else {
            Access::Methods {
                getter,
                setter,
                index,
            }
        }
    }

    fn push(
        &mut self,
        declaring: &'static TypeInfo,
        name: &'static str,
        unique_name: &str,
        value_type: fn() -> &'static TypeInfo,
        visibility: Visibility,
        route: &[usize],
        access: Access,
    ) {
        self.taken.insert(String::from(unique_name));
        self.members.push(MemberDescriptor {
            target_type: self.target_type,
            declaring,
            name,
            unique_name: String::from(unique_name),
            value_type,
            visibility,
            route: route.into(),
            access,
        });
    }
}

fn method(info: &'static StructInfo, name: &str, kind: MethodKind) -> Option<&'static MethodInfo> {
    let found = info.method(name)?;
    if found.kind() != kind {
        log::warn!(
            "`{}::{name}` is a {}, expected a {kind}",
            info.type_path(),
            found.kind()
        );
        return None;
    }
    Some(found)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use vc_reflect::Reflect;
    use vc_reflect::info::{TypeInfo, Typed};

    use super::MemberCatalog;
    use crate::access::{Access, MemberValue};
    use crate::config::{AccessorPair, EngineConfig};
    use crate::error::ErrorKind;

    #[derive(Reflect, Default)]
    #[reflect(default)]
    struct Entity {
        id: u32,
        name: String,
    }

    #[derive(Reflect, Default)]
    #[reflect(default, getters(get_level), setters(set_level, set_title))]
    struct Player {
        #[reflect(base)]
        entity: Entity,
        id: String,
        level: u8,
        title: String,
        #[reflect(transient)]
        session: u64,
    }

    impl Player {
        fn get_level(&self) -> u8 {
            self.level
        }

        fn set_level(&mut self, level: u8) {
            self.level = level.min(99);
        }

        fn set_title(&mut self, title: String) {
            self.title = title.to_uppercase();
        }
    }

    #[derive(Reflect)]
    enum Shape {
        Empty,
        Square { name: String, side: f32 },
    }

    fn names(
        catalog: &MemberCatalog,
        info: &'static TypeInfo,
        variant: Option<usize>,
        config: &EngineConfig,
    ) -> Vec<String> {
        catalog
            .members(info, variant, config)
            .iter()
            .map(|member| String::from(member.unique_name()))
            .collect()
    }

    #[test]
    fn derived_fields_shadow_base_fields() {
        let catalog = MemberCatalog::new();
        let config = EngineConfig::default();
        assert_eq!(
            names(&catalog, Player::type_info(), None, &config),
            ["id", "level", "title", "Entity.id", "name"]
        );

        let members = catalog.members(Player::type_info(), None, &config);
        let shadowed = &members[3];
        assert_eq!(shadowed.name(), "id");
        assert!(shadowed.declaring_type().is::<Entity>());

        let mut player = Player::default();
        shadowed.set(&mut player, Box::new(7_u32)).unwrap();
        assert_eq!(player.entity.id, 7);
        let value = shadowed.get(&player).unwrap();
        assert_eq!(value.as_reflect().downcast_ref::<u32>(), Some(&7));
    }

    #[test]
    fn accessors_are_preferred() {
        let catalog = MemberCatalog::new();
        let config = EngineConfig::default();
        let members = catalog.members(Player::type_info(), None, &config);

        let level = &members[1];
        assert!(matches!(level.access(), Access::Methods { getter: Some(_), setter: Some(_), .. }));
        let mut player = Player::default();
        level.set(&mut player, Box::new(200_u8)).unwrap();
        assert_eq!(player.level, 99);
        assert!(matches!(level.get(&player).unwrap(), MemberValue::Owned(_)));

        let title = &members[2];
        assert!(matches!(title.access(), Access::Methods { getter: None, setter: Some(_), .. }));
        title.set(&mut player, Box::new(String::from("hero"))).unwrap();
        assert_eq!(player.title, "HERO");
        assert!(matches!(title.get(&player).unwrap(), MemberValue::Borrowed(_)));
    }

    #[test]
    fn overrides_and_exclusions() {
        let mut config = EngineConfig::default();
        let player_path = Player::type_info().type_path();
        config
            .excluded_members
            .insert(String::from(player_path), vec![String::from("title")]);
        config.accessor_overrides.insert(
            String::from(player_path),
            BTreeMap::from([(String::from("level"), AccessorPair::default())]),
        );

        let catalog = MemberCatalog::new();
        assert_eq!(
            names(&catalog, Player::type_info(), None, &config),
            ["id", "level", "Entity.id", "name"]
        );
        let members = catalog.members(Player::type_info(), None, &config);
        assert!(matches!(members[1].access(), Access::Direct { .. }));
    }

    #[test]
    fn enum_members_per_variant() {
        let catalog = MemberCatalog::new();
        let config = EngineConfig::default();
        assert_eq!(names(&catalog, Shape::type_info(), Some(0), &config), ["name"]);
        assert_eq!(
            names(&catalog, Shape::type_info(), Some(1), &config),
            ["name", "Shape.name", "side"]
        );

        let members = catalog.members(Shape::type_info(), Some(1), &config);
        let square = Shape::Square {
            name: String::from("tile"),
            side: 2.0,
        };
        let variant = members[0].get(&square).unwrap();
        assert_eq!(variant.as_reflect().downcast_ref::<String>().map(String::as_str), Some("Square"));
        let name = members[1].get(&square).unwrap();
        assert_eq!(name.as_reflect().downcast_ref::<String>().map(String::as_str), Some("tile"));
        assert!(!members[0].is_writable());
    }

    #[test]
    fn wrong_target_is_rejected() {
        let catalog = MemberCatalog::new();
        let members = catalog.members(Entity::type_info(), None, &EngineConfig::default());
        let err = members[0].get(&5_u8).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidTarget));
        assert!(catalog.members(u8::type_info(), None, &EngineConfig::default()).is_empty());
    }
}
