use std::collections::BTreeMap;

use serde::Deserialize;

/// Default nesting limit of reads and writes.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Member names excluded per declaring type path.
pub type Exclusions = BTreeMap<String, Vec<String>>;

fn is_excluded(exclusions: &Exclusions, type_path: &str, member: &str) -> bool {
    exclusions
        .get(type_path)
        .is_some_and(|names| names.iter().any(|name| name == member))
}

// -----------------------------------------------------------------------------
// EngineConfig

/// Getter and setter names that replace the conventional accessor pair.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AccessorPair {
    pub getter: Option<String>,
    pub setter: Option<String>,
}

/// Engine-wide configuration, fixed when an [`Engine`](crate::Engine) is built.
///
/// Usually loaded from a configuration file; every field has a default.
///
/// ```
/// use vc_graph::EngineConfig;
///
/// let config: EngineConfig = serde_json::from_str(r#"{
///     "excluded_members": { "shapes::Circle": ["cache"] },
///     "default_offset_seconds": 3600
/// }"#).unwrap();
///
/// assert!(config.excludes("shapes::Circle", "cache"));
/// assert_eq!(config.temporal_patterns, EngineConfig::default().temporal_patterns);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Members never discovered, per declaring type path.
    pub excluded_members: Exclusions,
    /// Accessor names per declaring type path and member name.
    pub accessor_overrides: BTreeMap<String, BTreeMap<String, AccessorPair>>,
    /// `chrono` format strings tried in order when parsing dates and times.
    pub temporal_patterns: Vec<String>,
    /// Offset from UTC applied to date-times written without one.
    pub default_offset_seconds: i32,
    /// Short names for `@type`, mapped to the type path they stand for.
    ///
    /// Readers accept either form; writers emit the alias.
    pub type_aliases: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            excluded_members: Exclusions::new(),
            accessor_overrides: BTreeMap::new(),
            temporal_patterns: [
                "%Y-%m-%dT%H:%M:%S%.f%:z",
                "%Y-%m-%dT%H:%M:%S%.f",
                "%Y-%m-%d %H:%M:%S%.f",
                "%Y-%m-%d",
                "%H:%M:%S%.f",
            ]
            .map(String::from)
            .to_vec(),
            default_offset_seconds: 0,
            type_aliases: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// The type path a tag stands for: the aliased path, or the tag itself.
    pub fn resolve_alias<'a>(&'a self, tag: &'a str) -> &'a str {
        self.type_aliases.get(tag).map_or(tag, String::as_str)
    }

    /// The alias written for `type_path`, if one is configured.
    pub fn alias_for(&self, type_path: &str) -> Option<&str> {
        self.type_aliases
            .iter()
            .find(|(_, path)| *path == type_path)
            .map(|(alias, _)| alias.as_str())
    }

    #[inline]
    pub fn excludes(&self, type_path: &str, member: &str) -> bool {
        is_excluded(&self.excluded_members, type_path, member)
    }

    pub fn accessor_override(&self, type_path: &str, member: &str) -> Option<&AccessorPair> {
        self.accessor_overrides.get(type_path)?.get(member)
    }
}

// -----------------------------------------------------------------------------
// ReadOptions

/// Per-call options of a read.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    pub max_depth: usize,
    /// Materialize untagged objects in polymorphic slots as `DynamicMap`.
    pub untyped_as_dynamic: bool,
    /// Abort on the first member-level error instead of collecting it.
    pub fail_fast: bool,
    /// Build no typed values: objects become `DynamicMap`s that keep their
    /// `@type`, arrays become `Vec<ReflectBox>`. Read into a `ReflectBox`.
    pub return_as_maps: bool,
    /// Record an issue for every member the target type does not have and
    /// no missing-member handler takes.
    pub reject_unknown_members: bool,
    pub excluded_members: Exclusions,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            untyped_as_dynamic: true,
            fail_fast: false,
            return_as_maps: false,
            reject_unknown_members: false,
            excluded_members: Exclusions::new(),
        }
    }
}

impl ReadOptions {
    #[inline]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[inline]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    #[inline]
    pub fn with_return_as_maps(mut self, return_as_maps: bool) -> Self {
        self.return_as_maps = return_as_maps;
        self
    }

    #[inline]
    pub fn with_reject_unknown_members(mut self, reject: bool) -> Self {
        self.reject_unknown_members = reject;
        self
    }

    #[inline]
    pub fn excludes(&self, type_path: &str, member: &str) -> bool {
        is_excluded(&self.excluded_members, type_path, member)
    }
}

// -----------------------------------------------------------------------------
// WriteOptions

/// When the writer emits `@type`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum ShowType {
    /// Only where the declared type cannot tell the reader what to build.
    #[default]
    Minimal,
    /// On every object.
    Always,
    /// Never. Polymorphic values then read back as untyped data.
    Never,
}

/// Per-call options of a write.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    pub max_depth: usize,
    pub show_type: ShowType,
    /// Drop `@id` from objects that no `@ref` points to.
    pub elide_unreferenced_ids: bool,
    /// Leave out members whose value is null.
    pub skip_nulls: bool,
    pub pretty: bool,
    pub excluded_members: Exclusions,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            show_type: ShowType::Minimal,
            elide_unreferenced_ids: true,
            skip_nulls: false,
            pretty: false,
            excluded_members: Exclusions::new(),
        }
    }
}

impl WriteOptions {
    #[inline]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[inline]
    pub fn with_show_type(mut self, show_type: ShowType) -> Self {
        self.show_type = show_type;
        self
    }

    #[inline]
    pub fn with_skip_nulls(mut self, skip_nulls: bool) -> Self {
        self.skip_nulls = skip_nulls;
        self
    }

    #[inline]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    #[inline]
    pub fn excludes(&self, type_path: &str, member: &str) -> bool {
        is_excluded(&self.excluded_members, type_path, member)
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineConfig, ReadOptions, ShowType, WriteOptions};

    #[test]
    fn options_from_ron() {
        let write: WriteOptions = ron::from_str(
            "(show_type: Always, skip_nulls: true, excluded_members: { \"shapes::Circle\": [\"cache\"] })",
        )
        .unwrap();
        assert_eq!(write.show_type, ShowType::Always);
        assert!(write.skip_nulls);
        assert!(write.elide_unreferenced_ids);
        assert!(write.excludes("shapes::Circle", "cache"));
        assert!(!write.excludes("shapes::Circle", "radius"));

        let read: ReadOptions = ron::from_str("(max_depth: 8, fail_fast: true)").unwrap();
        assert_eq!(read.max_depth, 8);
        assert!(read.fail_fast);
        assert!(read.untyped_as_dynamic);
        assert!(!read.return_as_maps);
        assert!(!read.reject_unknown_members);
    }

    #[test]
    fn engine_config_from_ron() {
        let config: EngineConfig = ron::from_str(
            "(accessor_overrides: { \"shapes::Circle\": { \"radius\": (getter: Some(\"radius\")) } })",
        )
        .unwrap();
        let pair = config.accessor_override("shapes::Circle", "radius").unwrap();
        assert_eq!(pair.getter.as_deref(), Some("radius"));
        assert_eq!(pair.setter, None);
        assert!(config.accessor_override("shapes::Circle", "center").is_none());
        assert_eq!(config.default_offset_seconds, 0);
    }

    #[test]
    fn type_aliases() {
        let config: EngineConfig = ron::from_str("(type_aliases: { \"Circle\": \"shapes::Circle\" })").unwrap();
        assert_eq!(config.resolve_alias("Circle"), "shapes::Circle");
        assert_eq!(config.resolve_alias("shapes::Square"), "shapes::Square");
        assert_eq!(config.alias_for("shapes::Circle"), Some("Circle"));
        assert_eq!(config.alias_for("shapes::Square"), None);
    }
}
