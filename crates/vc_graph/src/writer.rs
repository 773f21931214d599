use core::any::TypeId;

use vc_reflect::info::TypeInfo;
use vc_reflect::ops::{DynamicMap, ReflectRef};
use vc_reflect::{Reflect, ReflectBox};

use crate::access::MemberDescriptor;
use crate::config::{ShowType, WriteOptions};
use crate::engine::{Engine, WriteOutcome};
use crate::error::{ErrorKind, GraphError, Result};
use crate::extension::{CustomWriter, MemberSink};
use crate::model::{Graph, GraphNode, NodeBody, NodeIndex, Primitive};
use crate::tracker::{Visit, WriteTracker};

/// Types a reader produces on its own for an untagged value, so they never
/// need a tag.
fn is_natural(info: &TypeInfo) -> bool {
    const NATURAL: [fn() -> TypeId; 8] = [
        TypeId::of::<()>,
        TypeId::of::<bool>,
        TypeId::of::<i64>,
        TypeId::of::<u64>,
        TypeId::of::<f64>,
        TypeId::of::<String>,
        TypeId::of::<DynamicMap>,
        TypeId::of::<Vec<ReflectBox>>,
    ];
    NATURAL.iter().any(|type_id| type_id() == info.type_id())
}

/// Builds a [`Graph`] from a value.
///
/// Shared handles are tracked by address: the first visit renders the
/// pointee and gives it an id, later visits emit a reference. A member that
/// fails to write is recorded as an issue and written as null, unless the
/// failure concerns the whole graph.
pub(crate) struct GraphWriter<'e> {
    engine: &'e Engine,
    options: &'e WriteOptions,
    graph: Graph,
    tracker: WriteTracker,
    issues: Vec<GraphError>,
    depth: usize,
}

impl<'e> GraphWriter<'e> {
    pub fn new(engine: &'e Engine, options: &'e WriteOptions) -> Self {
        Self {
            engine,
            options,
            graph: Graph::new(),
            tracker: WriteTracker::new(),
            issues: Vec::new(),
            depth: 0,
        }
    }

    /// Writes `value` as the root. A polymorphic root is tagged like a
    /// `ReflectBox` slot.
    pub fn write_root(mut self, value: &dyn Reflect, polymorphic: bool) -> Result<WriteOutcome> {
        let root = self.write_value(value, polymorphic)?;
        self.graph.set_root(root);
        if self.options.elide_unreferenced_ids {
            self.graph.elide_unreferenced_ids();
        }
        log::trace!(
            "wrote {} nodes with {} issues",
            self.graph.len(),
            self.issues.len()
        );
        Ok(WriteOutcome {
            graph: self.graph,
            issues: self.issues,
        })
    }

    fn write_value(&mut self, value: &dyn Reflect, polymorphic: bool) -> Result<NodeIndex> {
        self.depth += 1;
        let result = if self.depth > self.options.max_depth {
            Err(ErrorKind::GraphTooDeep {
                limit: self.options.max_depth,
            }
            .into())
        } else {
            self.write_kind(value, polymorphic)
        };
        self.depth -= 1;
        result
    }

    /// Writes a child of `owner`. Failures local to the child are recorded
    /// and the child becomes null.
    fn write_child(
        &mut self,
        value: &dyn Reflect,
        polymorphic: bool,
        owner: &'static str,
        member: &str,
    ) -> Result<NodeIndex> {
        let checkpoint = self.tracker.checkpoint();
        match self.write_value(value, polymorphic) {
            Ok(index) => Ok(index),
            Err(err) if err.is_graph_level() => Err(err),
            Err(err) => {
                self.tracker.rollback(checkpoint);
                self.record(err.at(owner, member));
                Ok(self.graph.push(GraphNode::null()))
            }
        }
    }

    fn record(&mut self, err: GraphError) {
        log::warn!("write issue: {err}");
        self.issues.push(err);
    }

    fn write_kind(&mut self, value: &dyn Reflect, polymorphic: bool) -> Result<NodeIndex> {
        match value.reflect_ref() {
            ReflectRef::Dyn(slot) if slot.is_null() => return Ok(self.graph.push(GraphNode::null())),
            ReflectRef::Dyn(slot) => return self.write_value(slot.get(), true),
            ReflectRef::Optional(optional) => {
                return match optional.value() {
                    Some(inner) => self.write_value(inner, polymorphic),
                    None => Ok(self.graph.push(GraphNode::null())),
                };
            }
            ReflectRef::Shared(handle) => {
                let id = match self.tracker.visit(handle.handle_addr()) {
                    Visit::Repeat(id) => return Ok(self.graph.push(GraphNode::reference(id))),
                    Visit::First(id) => id,
                };
                let inner = handle.borrow_inner().ok_or_else(|| {
                    ErrorKind::unsupported("a mutably borrowed handle", value.reflect_type_path())
                })?;
                let index = self.write_value(&*inner, polymorphic)?;
                if self.graph[index].id.is_some() {
                    return Err(
                        ErrorKind::unsupported("a handle to a handle", value.reflect_type_path()).into(),
                    );
                }
                self.graph.register_id(id, index)?;
                return Ok(index);
            }
            _ => {}
        }

        let info = value.reflect_type_info();
        let index = match self.engine.extensions().writer_for(info) {
            Some(writer) => self.write_custom(&*writer, value, info)?,
            None => self.write_structure(value, info, polymorphic)?,
        };
        self.annotate(index, value, info, polymorphic);
        Ok(index)
    }

    fn write_custom(
        &mut self,
        writer: &dyn CustomWriter,
        value: &dyn Reflect,
        info: &'static TypeInfo,
    ) -> Result<NodeIndex> {
        if writer.has_primitive_form() {
            let primitive = writer.write_primitive(value)?;
            return Ok(self.graph.push(GraphNode::primitive(primitive)));
        }
        let mut sink = Collector {
            writer: self,
            owner: info.type_path(),
            members: Vec::new(),
        };
        writer.write(value, &mut sink)?;
        let members = sink.members;
        Ok(self.graph.push(GraphNode::new(NodeBody::Members(members))))
    }

    fn write_structure(
        &mut self,
        value: &dyn Reflect,
        info: &'static TypeInfo,
        polymorphic: bool,
    ) -> Result<NodeIndex> {
        let owner = info.type_path();
        let body = match value.reflect_ref() {
            ReflectRef::Struct(_) => {
                let members = self.engine.catalog().members(info, None, self.engine.config());
                NodeBody::Members(self.write_members(value, &members)?)
            }
            ReflectRef::Enum(variant) => {
                // A tagged unit variant needs the member form to carry the tag.
                if variant.field_len() == 0 && !self.is_tagged(info, false, polymorphic) {
                    let name = Primitive::Str(String::from(variant.variant_name()));
                    return Ok(self.graph.push(GraphNode::primitive(name)));
                }
                let members = self.engine.catalog().members(
                    info,
                    Some(variant.variant_index()),
                    self.engine.config(),
                );
                NodeBody::Members(self.write_members(value, &members)?)
            }
            ReflectRef::List(list) => {
                let mut items = Vec::with_capacity(list.len());
                for (position, item) in list.iter().enumerate() {
                    items.push(self.write_child(item, false, owner, &format!("[{position}]"))?);
                }
                NodeBody::Array(items)
            }
            ReflectRef::Set(set) => {
                let mut items = Vec::with_capacity(set.len());
                for (position, item) in set.iter().enumerate() {
                    items.push(self.write_child(item, false, owner, &format!("[{position}]"))?);
                }
                NodeBody::Array(items)
            }
            ReflectRef::Map(map) => {
                let string_keys = info.as_map().is_some_and(|map| map.key_info().is::<String>())
                    && map
                        .iter()
                        .all(|(key, _)| key.downcast_ref::<String>().is_some_and(|key| !key.starts_with('@')));
                if string_keys {
                    let mut members = Vec::with_capacity(map.len());
                    for (key, item) in map.iter() {
                        let name = key.downcast_ref::<String>().cloned().unwrap_or_default();
                        let child = self.write_child(item, false, owner, &name)?;
                        if !(self.options.skip_nulls && self.graph[child].is_null()) {
                            members.push((name, child));
                        }
                    }
                    NodeBody::Members(members)
                } else {
                    let mut entries = Vec::with_capacity(map.len());
                    for (position, (key, item)) in map.iter().enumerate() {
                        let member = format!("[{position}]");
                        let key = self.write_child(key, false, owner, &member)?;
                        let item = self.write_child(item, false, owner, &member)?;
                        entries.push((key, item));
                    }
                    NodeBody::Entries(entries)
                }
            }
            ReflectRef::Opaque(_) => NodeBody::Primitive(self.engine.converter().to_primitive(value)?),
            ReflectRef::Dyn(_) | ReflectRef::Optional(_) | ReflectRef::Shared(_) => {
                return Err(ErrorKind::unsupported("a wrapper value", owner).into());
            }
        };
        Ok(self.graph.push(GraphNode::new(body)))
    }

    fn write_members(
        &mut self,
        value: &dyn Reflect,
        members: &[MemberDescriptor],
    ) -> Result<Vec<(String, NodeIndex)>> {
        let mut written = Vec::with_capacity(members.len());
        for member in members {
            let owner = member.declaring_type().type_path();
            if self.options.excludes(owner, member.name()) {
                continue;
            }
            let member_value = match member.get(value) {
                Ok(member_value) => member_value,
                Err(err) => {
                    // An unreadable member is left out rather than nulled.
                    self.record(err.at(owner, member.unique_name()));
                    continue;
                }
            };
            let child = self.write_child(member_value.as_reflect(), false, owner, member.unique_name())?;
            if self.options.skip_nulls && self.graph[child].is_null() {
                continue;
            }
            written.push((String::from(member.unique_name()), child));
        }
        Ok(written)
    }

    /// Whether a value of `info` is tagged under the current [`ShowType`].
    fn is_tagged(&self, info: &TypeInfo, composite: bool, polymorphic: bool) -> bool {
        let natural = is_natural(info);
        match self.options.show_type {
            ShowType::Never => false,
            ShowType::Always => composite || !natural,
            ShowType::Minimal => polymorphic && !natural,
        }
    }

    fn annotate(&mut self, index: NodeIndex, value: &dyn Reflect, info: &'static TypeInfo, polymorphic: bool) {
        let engine = self.engine;
        // A map read without types keeps the tag of its object.
        let kept = value.downcast_ref::<DynamicMap>().and_then(DynamicMap::type_tag);
        let tag = match kept {
            Some(tag) if self.options.show_type != ShowType::Never => tag,
            _ => {
                let composite = !matches!(self.graph[index].body, NodeBody::Primitive(_));
                if !self.is_tagged(info, composite, polymorphic) {
                    return;
                }
                let path = info.type_path();
                engine.config().alias_for(path).unwrap_or(path)
            }
        };
        if let Some(node) = self.graph.node_mut(index) {
            node.type_tag = Some(String::from(tag));
        }
    }
}

// -----------------------------------------------------------------------------
// Collector

/// The [`MemberSink`] handed to custom writers.
struct Collector<'w, 'e> {
    writer: &'w mut GraphWriter<'e>,
    owner: &'static str,
    members: Vec<(String, NodeIndex)>,
}

impl Collector<'_, '_> {
    fn push(&mut self, name: &str, child: NodeIndex) {
        if self.writer.options.skip_nulls && self.writer.graph[child].is_null() {
            return;
        }
        self.members.push((String::from(name), child));
    }
}

impl MemberSink for Collector<'_, '_> {
    fn value(&mut self, name: &str, value: &dyn Reflect) -> Result<()> {
        let child = self.writer.write_child(value, false, self.owner, name)?;
        self.push(name, child);
        Ok(())
    }

    fn primitive(&mut self, name: &str, value: Primitive) -> Result<()> {
        let child = self.writer.graph.push(GraphNode::primitive(value));
        self.push(name, child);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use vc_reflect::ops::{DynamicMap, Shared};
    use vc_reflect::{Reflect, ReflectBox};

    use vc_reflect::info::Typed;

    use super::{GraphWriter, is_natural};
    use crate::config::{EngineConfig, ShowType, WriteOptions};
    use crate::engine::Engine;
    use crate::error::ErrorKind;
    use crate::model::{NodeBody, Primitive};

    #[derive(Reflect, Default)]
    #[reflect(default)]
    struct Leaf {
        label: String,
    }

    #[derive(Reflect, Default)]
    #[reflect(default)]
    struct Pair {
        a: Shared<Leaf>,
        b: Shared<Leaf>,
        extra: ReflectBox,
    }

    fn write(value: &dyn Reflect, options: &WriteOptions) -> crate::WriteOutcome {
        let engine = Engine::default();
        GraphWriter::new(&engine, options)
            .write_root(value, false)
            .unwrap()
    }

    #[test]
    fn natural_types() {
        assert!(is_natural(<String as Typed>::type_info()));
        assert!(is_natural(<DynamicMap as Typed>::type_info()));
        assert!(!is_natural(<i32 as Typed>::type_info()));
    }

    #[test]
    fn shared_handles_get_ids() {
        let leaf = Rc::new(RefCell::new(Leaf {
            label: String::from("x"),
        }));
        let pair = Pair {
            a: Rc::clone(&leaf),
            b: leaf,
            extra: ReflectBox::new(7_i32),
        };
        let outcome = write(&pair, &WriteOptions::default());
        let graph = &outcome.graph;
        let root = graph.view(graph.root().unwrap());

        assert_eq!(root.member("a").unwrap().id(), Some(1));
        assert_eq!(root.member("b").unwrap().reference(), Some(1));
        let extra = root.member("extra").unwrap();
        assert_eq!(extra.type_tag(), Some("i32"));
        assert_eq!(extra.primitive(), Some(&Primitive::Int(7)));
        assert!(outcome.issues.is_empty());
    }

    #[test]
    fn show_type_modes() {
        let pair = Pair::default();

        let never = write(&pair, &WriteOptions::default().with_show_type(ShowType::Never));
        let root = never.graph.view(never.graph.root().unwrap());
        assert_eq!(root.type_tag(), None);

        let always = write(&pair, &WriteOptions::default().with_show_type(ShowType::Always));
        let root = always.graph.view(always.graph.root().unwrap());
        assert!(root.type_tag().unwrap().ends_with("Pair"));
        let label = root.member("a").unwrap().member("label").unwrap();
        assert_eq!(label.type_tag(), None);
    }

    #[test]
    fn depth_limit_is_fatal() {
        let engine = Engine::default();
        let nested = vec![vec![vec![1_u8]]];
        let options = WriteOptions::default().with_max_depth(3);
        let err = GraphWriter::new(&engine, &options)
            .write_root(&nested, false)
            .err()
            .unwrap();
        assert!(matches!(err.kind, ErrorKind::GraphTooDeep { limit: 3 }));
    }

    #[test]
    fn skip_nulls() {
        let mut map = DynamicMap::new();
        map.insert("gone", Box::new(ReflectBox::null()));
        map.insert("kept", Box::new(1_i64));
        let outcome = write(&map, &WriteOptions::default().with_skip_nulls(true));
        let root = outcome.graph.view(outcome.graph.root().unwrap());
        let NodeBody::Members(members) = &root.node().body else {
            panic!("expected members");
        };
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].0, "kept");
    }

    #[test]
    fn aliases_and_kept_tags() {
        let leaf_path = <Leaf as Typed>::type_info().type_path();
        let engine = Engine::new(EngineConfig {
            type_aliases: BTreeMap::from([(String::from("Leaf"), String::from(leaf_path))]),
            ..EngineConfig::default()
        });
        let options = WriteOptions::default();
        let boxed = ReflectBox::new(Leaf::default());
        let outcome = GraphWriter::new(&engine, &options)
            .write_root(&boxed, false)
            .unwrap();
        let root = outcome.graph.view(outcome.graph.root().unwrap());
        assert_eq!(root.type_tag(), Some("Leaf"));

        let map = DynamicMap::new().with_type_tag("shapes::Circle");
        let outcome = write(&map, &options);
        let root = outcome.graph.view(outcome.graph.root().unwrap());
        assert_eq!(root.type_tag(), Some("shapes::Circle"));

        let outcome = write(&map, &WriteOptions::default().with_show_type(ShowType::Never));
        let root = outcome.graph.view(outcome.graph.root().unwrap());
        assert_eq!(root.type_tag(), None);
    }
}
