use std::sync::OnceLock;

use vc_reflect::registry::{GetTypeMeta, TypeRegistry, TypeRegistryArc};
use vc_reflect::{FromReflect, Reflect};

use crate::config::{EngineConfig, ReadOptions, WriteOptions};
use crate::convert::Converter;
use crate::error::{ErrorKind, GraphError, Result};
use crate::extension::ExtensionRegistry;
use crate::json::{JsonSink, JsonSource};
use crate::members::MemberCatalog;
use crate::model::Graph;
use crate::parse::parse;
use crate::print::print;
use crate::resolver::Resolver;
use crate::token::{TokenSink, TokenSource};
use crate::writer::GraphWriter;

// -----------------------------------------------------------------------------
// Outcomes

/// A materialized value and the member-level issues met on the way.
#[derive(Debug)]
pub struct ReadOutcome<T> {
    pub value: T,
    pub issues: Vec<GraphError>,
}

/// A written graph and the member-level issues met on the way.
#[derive(Debug)]
pub struct WriteOutcome {
    pub graph: Graph,
    pub issues: Vec<GraphError>,
}

// -----------------------------------------------------------------------------
// Engine

static GLOBAL: OnceLock<Engine> = OnceLock::new();

/// The registries and configuration shared by every read and write.
///
/// Everything an engine caches is read-mostly and guarded by `RwLock`s, so
/// one engine serves any number of threads. Per-call state lives in the
/// writer and resolver only.
pub struct Engine {
    registry: TypeRegistryArc,
    catalog: MemberCatalog,
    extensions: ExtensionRegistry,
    converter: Converter,
    config: EngineConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Creates an engine with the built-in types and every
    /// `#[reflect(auto_register)]` type.
    pub fn new(config: EngineConfig) -> Self {
        let mut registry = TypeRegistry::new();
        if registry.auto_register() {
            log::debug!("auto-registered types, {} known", registry.len());
        }
        Self::with_registry(TypeRegistryArc::new(registry), config)
    }

    pub fn with_registry(registry: TypeRegistryArc, config: EngineConfig) -> Self {
        Self {
            registry,
            catalog: MemberCatalog::new(),
            extensions: ExtensionRegistry::new(),
            converter: Converter::new(&config),
            config,
        }
    }

    /// Makes `engine` the process-wide engine. Fails if one is installed
    /// already, or if [`global`](Self::global) created the default one.
    pub fn install(engine: Engine) -> core::result::Result<(), Engine> {
        GLOBAL.set(engine)
    }

    /// The process-wide engine, created with defaults on first use.
    pub fn global() -> &'static Engine {
        GLOBAL.get_or_init(Engine::default)
    }

    #[inline]
    pub fn registry(&self) -> &TypeRegistryArc {
        &self.registry
    }

    #[inline]
    pub fn catalog(&self) -> &MemberCatalog {
        &self.catalog
    }

    #[inline]
    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    #[inline]
    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registers `T` and the types it depends on, so that tags naming them
    /// resolve and their constructors are found.
    pub fn register<T: GetTypeMeta>(&self) {
        self.registry.write().register::<T>();
    }

    // -------------------------------------------------------------------------
    // Writing

    /// Builds the graph of `value`. The root is written for its declared type.
    pub fn write(&self, value: &dyn Reflect, options: &WriteOptions) -> Result<WriteOutcome> {
        GraphWriter::new(self, options).write_root(value, false)
    }

    /// Builds the graph of `value` as if it sat in a polymorphic slot, so the
    /// root carries its type tag.
    pub fn write_dyn(&self, value: &dyn Reflect, options: &WriteOptions) -> Result<WriteOutcome> {
        GraphWriter::new(self, options).write_root(value, true)
    }

    /// Writes `value` into `sink` and returns the recorded issues.
    pub fn to_sink(
        &self,
        value: &dyn Reflect,
        options: &WriteOptions,
        sink: &mut dyn TokenSink,
    ) -> Result<Vec<GraphError>> {
        let outcome = self.write(value, options)?;
        print(&outcome.graph, sink)?;
        Ok(outcome.issues)
    }

    /// Writes `value` as JSON text.
    pub fn to_json(&self, value: &dyn Reflect, options: &WriteOptions) -> Result<String> {
        let outcome = self.write(value, options)?;
        Self::json_text(&outcome, options)
    }

    /// Writes `value` as JSON text with a tagged root.
    pub fn to_json_dyn(&self, value: &dyn Reflect, options: &WriteOptions) -> Result<String> {
        let outcome = self.write_dyn(value, options)?;
        Self::json_text(&outcome, options)
    }

    fn json_text(outcome: &WriteOutcome, options: &WriteOptions) -> Result<String> {
        let mut sink = JsonSink::new();
        print(&outcome.graph, &mut sink)?;
        sink.into_string(options.pretty)
    }

    // -------------------------------------------------------------------------
    // Reading

    /// Parses a token stream into a graph.
    #[inline]
    pub fn read_graph(&self, source: &mut dyn TokenSource, options: &ReadOptions) -> Result<Graph> {
        parse(source, options.max_depth)
    }

    /// Materializes `graph` as a `T`.
    ///
    /// Use [`ReflectBox`](vc_reflect::ReflectBox) as `T` to read a value of
    /// any tagged type.
    pub fn read<T: FromReflect + GetTypeMeta>(
        &self,
        graph: &Graph,
        options: &ReadOptions,
    ) -> Result<ReadOutcome<T>> {
        self.register::<T>();
        let target = T::type_info();
        let (value, issues) = Resolver::new(self, graph, options).resolve(target)?;
        let value = T::from_reflect(value).map_err(|value| {
            GraphError::from(ErrorKind::unsupported(
                value.reflect_type_path(),
                target.type_path(),
            ))
        })?;
        Ok(ReadOutcome { value, issues })
    }

    /// Reads a `T` from a token stream.
    pub fn read_source<T: FromReflect + GetTypeMeta>(
        &self,
        source: &mut dyn TokenSource,
        options: &ReadOptions,
    ) -> Result<ReadOutcome<T>> {
        let graph = self.read_graph(source, options)?;
        self.read(&graph, options)
    }

    /// Reads a `T` from JSON text and keeps the recorded issues.
    pub fn read_json<T: FromReflect + GetTypeMeta>(
        &self,
        text: &str,
        options: &ReadOptions,
    ) -> Result<ReadOutcome<T>> {
        let mut source = JsonSource::parse_bounded(text, options.max_depth)?;
        self.read_source(&mut source, options)
    }

    /// Reads a `T` from JSON text.
    pub fn from_json<T: FromReflect + GetTypeMeta>(&self, text: &str, options: &ReadOptions) -> Result<T> {
        self.read_json(text, options).map(|outcome| outcome.value)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use vc_reflect::info::{AccessFault, Typed};
    use vc_reflect::ops::{DynamicMap, Shared};
    use vc_reflect::{Reflect, ReflectBox};

    use super::Engine;
    use crate::config::{EngineConfig, ReadOptions, ShowType, WriteOptions};
    use crate::error::{ErrorKind, Result};
    use crate::extension::{
        CustomFactory, CustomWriter, ExtensionKey, MemberSink, MissingMemberHandler, ResolverCallbacks,
    };
    use crate::json::JsonSink;
    use crate::model::{NodeView, Primitive};

    #[derive(Reflect, Default, Debug, Clone, PartialEq)]
    #[reflect(default)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Reflect, Debug, PartialEq)]
    enum Shape {
        Circle { center: Point, radius: f64 },
        Polygon { points: Vec<Point> },
        Empty,
    }

    #[derive(Reflect, Default, Debug, PartialEq)]
    #[reflect(default)]
    struct Scene {
        name: String,
        shapes: Vec<Shape>,
        layers: BTreeMap<String, u32>,
        labels: BTreeMap<u8, String>,
        origin: Option<Point>,
    }

    #[derive(Reflect, Default, Debug)]
    #[reflect(default)]
    struct Node {
        label: String,
        next: Option<Shared<Node>>,
    }

    #[derive(Reflect, Default, Debug)]
    #[reflect(default)]
    struct Pair {
        a: Option<Shared<Node>>,
        b: Option<Shared<Node>>,
    }

    #[derive(Reflect, Default)]
    #[reflect(default)]
    struct Animal {
        name: String,
        legs: u8,
    }

    #[derive(Reflect, Default)]
    #[reflect(default)]
    struct Dog {
        #[reflect(base)]
        animal: Animal,
        name: String,
    }

    #[derive(Reflect, Default)]
    #[reflect(default)]
    struct Zoo {
        pet: ReflectBox,
        keeper: ReflectBox,
    }

    fn node(label: &str) -> Shared<Node> {
        Rc::new(RefCell::new(Node {
            label: String::from(label),
            next: None,
        }))
    }

    fn scene() -> Scene {
        Scene {
            name: String::from("demo"),
            shapes: vec![
                Shape::Circle {
                    center: Point { x: 1, y: 2 },
                    radius: 0.5,
                },
                Shape::Polygon {
                    points: vec![Point { x: 0, y: 0 }, Point { x: 3, y: 4 }],
                },
                Shape::Empty,
            ],
            layers: BTreeMap::from([(String::from("ground"), 0), (String::from("sky"), 9)]),
            labels: BTreeMap::from([(1, String::from("one")), (7, String::from("seven"))]),
            origin: Some(Point { x: -1, y: -1 }),
        }
    }

    #[test]
    fn acyclic_round_trip() {
        let engine = Engine::default();
        let scene = scene();
        for show_type in [ShowType::Minimal, ShowType::Always, ShowType::Never] {
            let options = WriteOptions::default().with_show_type(show_type);
            let json = engine.to_json(&scene, &options).unwrap();
            let back: Scene = engine.from_json(&json, &ReadOptions::default()).unwrap();
            assert_eq!(back, scene, "{json}");
        }
    }

    #[test]
    fn document_shape() {
        let engine = Engine::default();
        let json = engine.to_json(&scene(), &WriteOptions::default()).unwrap();
        assert!(json.contains(r#""shapes":[{"name":"Circle","center":{"x":1,"y":2},"radius":0.5}"#));
        assert!(json.contains(r#""Empty"]"#));
        assert!(json.contains(r#""layers":{"ground":0,"sky":9}"#));
        assert!(json.contains(r#""labels":{"@keys":[1,7],"@items":["one","seven"]}"#));
    }

    #[test]
    fn cycles_survive() {
        let engine = Engine::default();
        let a = node("a");
        a.borrow_mut().next = Some(a.clone());

        let json = engine.to_json(&a, &WriteOptions::default()).unwrap();
        assert_eq!(json, r#"{"@id":1,"label":"a","next":{"@ref":1}}"#);

        let back: Shared<Node> = engine.from_json(&json, &ReadOptions::default()).unwrap();
        let next = back.borrow().next.clone().unwrap();
        assert!(Rc::ptr_eq(&back, &next));

        a.borrow_mut().next = None;
        back.borrow_mut().next = None;
    }

    #[test]
    fn shared_references_are_kept() {
        let engine = Engine::default();
        let shared = node("x");
        let pair = Pair {
            a: Some(shared.clone()),
            b: Some(shared),
        };
        let json = engine.to_json(&pair, &WriteOptions::default()).unwrap();
        assert_eq!(json, r#"{"a":{"@id":1,"label":"x","next":null},"b":{"@ref":1}}"#);

        let back: Pair = engine.from_json(&json, &ReadOptions::default()).unwrap();
        assert!(Rc::ptr_eq(back.a.as_ref().unwrap(), back.b.as_ref().unwrap()));

        // Equal but distinct handles stay distinct.
        let pair = Pair {
            a: Some(node("x")),
            b: Some(node("x")),
        };
        let json = engine.to_json(&pair, &WriteOptions::default()).unwrap();
        assert!(!json.contains("@ref"));
    }

    #[test]
    fn forward_references_are_patched() {
        let engine = Engine::default();
        let json = r#"{"a":{"label":"first","next":{"@ref":2}},"b":{"@id":2,"label":"second","next":null}}"#;
        let back: Pair = engine.from_json(json, &ReadOptions::default()).unwrap();
        let next = back.a.as_ref().unwrap().borrow().next.clone().unwrap();
        assert!(Rc::ptr_eq(&next, back.b.as_ref().unwrap()));
        assert_eq!(next.borrow().label, "second");
    }

    #[test]
    fn dangling_references_are_rejected() {
        let engine = Engine::default();
        let err = engine
            .from_json::<Pair>(r#"{"a":{"@ref":9}}"#, &ReadOptions::default())
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::DanglingReference { ref ids } if ids == &[9]));
    }

    #[test]
    fn shadowed_members_are_independent() {
        let engine = Engine::default();
        let dog = Dog {
            animal: Animal {
                name: String::from("dog"),
                legs: 4,
            },
            name: String::from("rex"),
        };
        let json = engine.to_json(&dog, &WriteOptions::default()).unwrap();
        assert_eq!(json, r#"{"name":"rex","Animal.name":"dog","legs":4}"#);

        let back: Dog = engine
            .from_json(r#"{"Animal.name":"cat","name":"tom","legs":3}"#, &ReadOptions::default())
            .unwrap();
        assert_eq!(back.name, "tom");
        assert_eq!(back.animal.name, "cat");
        assert_eq!(back.animal.legs, 3);
    }

    #[test]
    fn enums_keep_their_variant() {
        let engine = Engine::default();
        for shape in scene().shapes {
            let json = engine.to_json(&shape, &WriteOptions::default()).unwrap();
            let back: Shape = engine.from_json(&json, &ReadOptions::default()).unwrap();
            assert_eq!(back, shape);
        }
        let err = engine
            .from_json::<Shape>(r#""Hexagon""#, &ReadOptions::default())
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnknownEnumConstant { .. }));
    }

    #[test]
    fn polymorphic_slots_are_tagged() {
        let engine = Engine::default();
        engine.register::<Point>();
        let zoo = Zoo {
            pet: ReflectBox::new(Point { x: 5, y: 6 }),
            keeper: ReflectBox::new(String::from("sam")),
        };
        let json = engine.to_json(&zoo, &WriteOptions::default()).unwrap();
        assert_eq!(
            json,
            r#"{"pet":{"@type":"vc_graph::engine::tests::Point","x":5,"y":6},"keeper":"sam"}"#
        );

        let back: Zoo = engine.from_json(&json, &ReadOptions::default()).unwrap();
        assert_eq!(back.pet.downcast_ref::<Point>(), Some(&Point { x: 5, y: 6 }));
        assert_eq!(back.keeper.downcast_ref::<String>().map(String::as_str), Some("sam"));

        let tagged = engine.to_json_dyn(&Point { x: 1, y: 1 }, &WriteOptions::default()).unwrap();
        let back: ReflectBox = engine.from_json(&tagged, &ReadOptions::default()).unwrap();
        assert_eq!(back.downcast_ref::<Point>(), Some(&Point { x: 1, y: 1 }));
    }

    #[test]
    fn untyped_documents_read_as_dynamic_maps() {
        let engine = Engine::default();
        let back: ReflectBox = engine
            .from_json(r#"{"k":[1,"two"],"flag":true}"#, &ReadOptions::default())
            .unwrap();
        let map = back.downcast_ref::<DynamicMap>().unwrap();
        assert_eq!(map.names().collect::<Vec<_>>(), ["k", "flag"]);
        let items = map
            .get("k")
            .and_then(|k| k.downcast_ref::<Vec<ReflectBox>>())
            .unwrap();
        assert_eq!(items[0].downcast_ref::<i64>(), Some(&1));
        assert_eq!(items[1].downcast_ref::<String>().map(String::as_str), Some("two"));
    }

    #[test]
    fn depth_is_bounded() {
        let engine = Engine::default();
        let nested = vec![vec![vec![1_u8]]];
        let options = WriteOptions::default().with_max_depth(2);
        let err = engine.to_json(&nested, &options).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::GraphTooDeep { limit: 2 }));

        let options = ReadOptions::default().with_max_depth(2);
        let err = engine
            .from_json::<Vec<Vec<Vec<u8>>>>("[[[1]]]", &options)
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::GraphTooDeep { limit: 2 }));
    }

    #[derive(Reflect, Default, Debug, PartialEq)]
    #[reflect(default)]
    struct Deep {
        child: Vec<Deep>,
    }

    #[test]
    fn deep_documents_round_trip() {
        let engine = Engine::default();
        let mut deep = Deep::default();
        for _ in 0..70 {
            deep = Deep { child: vec![deep] };
        }
        let json = engine.to_json(&deep, &WriteOptions::default()).unwrap();
        assert!(json.starts_with(&r#"{"child":["#.repeat(70)));

        let back: Deep = engine.from_json(&json, &ReadOptions::default()).unwrap();
        assert_eq!(back, deep);

        let err = engine
            .from_json::<Deep>(&json, &ReadOptions::default().with_max_depth(100))
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::GraphTooDeep { limit: 100 }));
    }

    #[derive(Reflect, Default, Debug, PartialEq)]
    #[reflect(default)]
    struct Reading {
        value: Option<i32>,
    }

    #[derive(Reflect, Default, Debug, PartialEq)]
    #[reflect(default)]
    struct Sensor {
        last: Option<Reading>,
        shared: Option<Shared<Reading>>,
        again: Option<Shared<Reading>>,
    }

    #[test]
    fn single_value_objects_are_not_scalars() {
        let engine = Engine::default();
        let reading = Rc::new(RefCell::new(Reading { value: None }));
        let sensor = Sensor {
            last: Some(Reading { value: None }),
            shared: Some(reading.clone()),
            again: Some(reading),
        };
        let json = engine.to_json(&sensor, &WriteOptions::default()).unwrap();
        assert_eq!(
            json,
            r#"{"last":{"value":null},"shared":{"@id":1,"value":null},"again":{"@ref":1}}"#
        );

        let back: Sensor = engine.from_json(&json, &ReadOptions::default()).unwrap();
        assert_eq!(back, sensor);
        assert!(Rc::ptr_eq(back.shared.as_ref().unwrap(), back.again.as_ref().unwrap()));
    }

    #[test]
    fn reserved_map_keys_round_trip() {
        let engine = Engine::default();
        let mut map = DynamicMap::new();
        map.insert("@x", Box::new(1_i64));
        let zoo = Zoo {
            pet: ReflectBox::new(map),
            keeper: ReflectBox::new(String::from("sam")),
        };
        let json = engine.to_json(&zoo, &WriteOptions::default()).unwrap();
        assert_eq!(json, r#"{"pet":{"@keys":["@x"],"@items":[1]},"keeper":"sam"}"#);

        let back: Zoo = engine.from_json(&json, &ReadOptions::default()).unwrap();
        let pet = back.pet.downcast_ref::<DynamicMap>().unwrap();
        assert_eq!(pet.get("@x").and_then(|x| x.downcast_ref::<i64>()), Some(&1));
    }

    #[test]
    fn maps_keep_tags_without_types() {
        let engine = Engine::default();
        let json = r#"{"pet":{"@type":"nowhere::Cat","lives":9},"keeper":"sam"}"#;
        let options = ReadOptions::default().with_return_as_maps(true);
        let back: ReflectBox = engine.from_json(json, &options).unwrap();

        let root = back.downcast_ref::<DynamicMap>().unwrap();
        assert_eq!(root.type_tag(), None);
        let pet = root.get("pet").and_then(|pet| pet.downcast_ref::<DynamicMap>()).unwrap();
        assert_eq!(pet.type_tag(), Some("nowhere::Cat"));
        assert_eq!(pet.get("lives").and_then(|lives| lives.downcast_ref::<i64>()), Some(&9));

        let again = engine.to_json(&back, &WriteOptions::default()).unwrap();
        assert_eq!(again, json);

        // Identity survives as shared maps.
        let json = r#"{"a":{"@id":1,"label":"x"},"b":{"@ref":1}}"#;
        let back: ReflectBox = engine.from_json(json, &options).unwrap();
        let root = back.downcast_ref::<DynamicMap>().unwrap();
        let a = root.get("a").and_then(|a| a.downcast_ref::<Shared<DynamicMap>>()).unwrap();
        let b = root.get("b").and_then(|b| b.downcast_ref::<Shared<DynamicMap>>()).unwrap();
        assert!(Rc::ptr_eq(a, b));
    }

    #[test]
    fn type_aliases_are_written_and_read() {
        let path = <Point as Typed>::type_info().type_path();
        let engine = Engine::new(EngineConfig {
            type_aliases: BTreeMap::from([(String::from("pt"), String::from(path))]),
            ..EngineConfig::default()
        });
        engine.register::<Point>();
        let zoo = Zoo {
            pet: ReflectBox::new(Point { x: 5, y: 6 }),
            keeper: ReflectBox::new(String::from("sam")),
        };
        let json = engine.to_json(&zoo, &WriteOptions::default()).unwrap();
        assert_eq!(json, r#"{"pet":{"@type":"pt","x":5,"y":6},"keeper":"sam"}"#);

        let back: Zoo = engine.from_json(&json, &ReadOptions::default()).unwrap();
        assert_eq!(back.pet.downcast_ref::<Point>(), Some(&Point { x: 5, y: 6 }));

        let full = json.replace(r#""pt""#, &format!("{path:?}"));
        let back: Zoo = engine.from_json(&full, &ReadOptions::default()).unwrap();
        assert_eq!(back.pet.downcast_ref::<Point>(), Some(&Point { x: 5, y: 6 }));
    }

    #[derive(Reflect, Default, Debug, PartialEq)]
    #[reflect(default)]
    struct Settings {
        name: String,
        extras: BTreeMap<String, String>,
    }

    struct KeepExtras;

    impl MissingMemberHandler for KeepExtras {
        fn handle(
            &self,
            target: &mut dyn Reflect,
            name: &str,
            node: NodeView<'_>,
            callbacks: &mut dyn ResolverCallbacks,
        ) -> Result<()> {
            let value = callbacks
                .materialize(node.index(), <String as Typed>::type_info())?
                .take::<String>()
                .map_err(|value| ErrorKind::unsupported(value.reflect_type_path(), "alloc::string::String"))?;
            let settings = target
                .downcast_mut::<Settings>()
                .ok_or(ErrorKind::InvalidTarget)?;
            settings.extras.insert(String::from(name), value);
            Ok(())
        }
    }

    #[test]
    fn unknown_members() {
        let engine = Engine::default();
        let json = r#"{"name":"main","theme":"dark","extras":{}}"#;

        let outcome = engine.read_json::<Settings>(json, &ReadOptions::default()).unwrap();
        assert!(outcome.issues.is_empty());
        assert!(outcome.value.extras.is_empty());

        let options = ReadOptions::default().with_reject_unknown_members(true);
        let outcome = engine.read_json::<Settings>(json, &options).unwrap();
        assert_eq!(outcome.issues.len(), 1);
        assert!(matches!(outcome.issues[0].kind, ErrorKind::UnknownMember { ref name } if name == "theme"));
        assert_eq!(outcome.value.name, "main");

        engine
            .extensions()
            .register_missing_member_handler(ExtensionKey::of::<Settings>(), KeepExtras);
        let outcome = engine.read_json::<Settings>(json, &options).unwrap();
        assert!(outcome.issues.is_empty());
        assert_eq!(outcome.value.extras.get("theme").map(String::as_str), Some("dark"));
    }

    #[derive(Reflect, Default, Debug, PartialEq)]
    #[reflect(default, getters(get_secret), setters(set_level))]
    struct Vault {
        label: String,
        secret: u32,
        level: u8,
    }

    impl Vault {
        fn get_secret(&self) -> u32 {
            assert!(self.secret < 1000, "secret out of range");
            self.secret
        }

        fn set_level(&mut self, level: u8) {
            assert!(level <= 10, "level out of range");
            self.level = level;
        }
    }

    #[test]
    fn failing_getters_leave_the_member_out() {
        let engine = Engine::default();
        let vault = Vault {
            label: String::from("v"),
            secret: 5000,
            level: 3,
        };
        let outcome = engine.write(&vault, &WriteOptions::default()).unwrap();
        assert_eq!(outcome.issues.len(), 1);
        assert!(matches!(
            outcome.issues[0].kind,
            ErrorKind::AccessorInvocation(AccessFault::Panicked { .. })
        ));
        assert_eq!(outcome.issues[0].site.member.as_deref(), Some("secret"));

        let json = engine.to_json(&vault, &WriteOptions::default()).unwrap();
        assert_eq!(json, r#"{"label":"v","level":3}"#);
    }

    #[test]
    fn failing_setters_are_recorded() {
        let engine = Engine::default();
        let outcome = engine
            .read_json::<Vault>(r#"{"label":"w","secret":7,"level":50}"#, &ReadOptions::default())
            .unwrap();
        assert_eq!(outcome.issues.len(), 1);
        assert!(matches!(
            outcome.issues[0].kind,
            ErrorKind::AccessorInvocation(AccessFault::Panicked { .. })
        ));
        assert_eq!(outcome.issues[0].site.member.as_deref(), Some("level"));
        assert_eq!(
            outcome.value,
            Vault {
                label: String::from("w"),
                secret: 7,
                level: 0,
            }
        );

        let err = engine
            .from_json::<Vault>(r#"{"label":"w","level":50}"#, &ReadOptions::default().with_fail_fast(true))
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::AccessorInvocation(_)));
    }

    #[test]
    fn global_engine_is_installed_once() {
        let first: *const Engine = Engine::global();
        assert!(Engine::install(Engine::default()).is_err());
        assert!(core::ptr::eq(first, Engine::global()));
    }

    // -------------------------------------------------------------------------
    // Extensions

    #[derive(Reflect, Default, Debug, PartialEq)]
    #[reflect(default)]
    struct Temperature {
        kelvin: f64,
    }

    #[derive(Reflect, Default, Debug, PartialEq)]
    #[reflect(default)]
    struct Weather {
        high: Temperature,
        low: Temperature,
        place: String,
    }

    struct KelvinWriter;

    impl CustomWriter for KelvinWriter {
        fn has_primitive_form(&self) -> bool {
            true
        }

        fn write_primitive(&self, value: &dyn Reflect) -> Result<Primitive> {
            let value = value
                .downcast_ref::<Temperature>()
                .ok_or(ErrorKind::InvalidTarget)?;
            if value.kelvin < 0.0 {
                return Err(ErrorKind::unsupported(value.kelvin, "a temperature").into());
            }
            Ok(Primitive::Str(format!("{}K", value.kelvin)))
        }

        fn write(&self, _value: &dyn Reflect, _sink: &mut dyn MemberSink) -> Result<()> {
            Ok(())
        }
    }

    struct KelvinFactory;

    impl CustomFactory for KelvinFactory {
        fn instantiate(
            &self,
            node: NodeView<'_>,
            _callbacks: &mut dyn ResolverCallbacks,
        ) -> Result<Box<dyn Reflect>> {
            let text = node
                .primitive()
                .and_then(Primitive::as_str)
                .ok_or(ErrorKind::InvalidTarget)?;
            let kelvin = text
                .strip_suffix('K')
                .and_then(|number| number.parse().ok())
                .ok_or_else(|| ErrorKind::unsupported(text, "a temperature"))?;
            Ok(Box::new(Temperature { kelvin }))
        }
    }

    fn weather_engine() -> Engine {
        let engine = Engine::default();
        engine
            .extensions()
            .register_writer(ExtensionKey::of::<Temperature>(), KelvinWriter);
        engine
            .extensions()
            .register_factory(ExtensionKey::of::<Temperature>(), KelvinFactory);
        engine
    }

    #[test]
    fn custom_writer_and_factory() {
        let engine = weather_engine();
        let weather = Weather {
            high: Temperature { kelvin: 300.5 },
            low: Temperature { kelvin: 280.0 },
            place: String::from("hill"),
        };
        let json = engine.to_json(&weather, &WriteOptions::default()).unwrap();
        assert_eq!(json, r#"{"high":"300.5K","low":"280K","place":"hill"}"#);

        let back: Weather = engine.from_json(&json, &ReadOptions::default()).unwrap();
        assert_eq!(back, weather);
    }

    #[test]
    fn failed_branches_become_null() {
        let engine = weather_engine();
        let weather = Weather {
            high: Temperature { kelvin: 300.5 },
            low: Temperature { kelvin: -1.0 },
            place: String::from("pole"),
        };
        let mut sink = JsonSink::new();
        let issues = engine
            .to_sink(&weather, &WriteOptions::default(), &mut sink)
            .unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].site.member.as_deref(), Some("low"));
        assert_eq!(
            sink.into_string(false).unwrap(),
            r#"{"high":"300.5K","low":null,"place":"pole"}"#
        );

        let outcome = engine
            .read_json::<Weather>(r#"{"high":"hot","low":"280K","place":"pole"}"#, &ReadOptions::default())
            .unwrap();
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.value.high, Temperature::default());
        assert_eq!(outcome.value.low, Temperature { kelvin: 280.0 });
        assert_eq!(outcome.value.place, "pole");
    }
}
