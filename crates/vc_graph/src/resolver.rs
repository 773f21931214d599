use core::mem;
use std::sync::RwLockReadGuard;

use vc_reflect::info::{SharedInfo, TypeInfo, Typed};
use vc_reflect::ops::{DynamicMap, List, Map, ReflectMut, ReflectRef};
use vc_reflect::registry::{TypeRegistry, TypeTraitDefault, TypeTraitShared};
use vc_reflect::{Reflect, ReflectBox};

use crate::access::find_member;
use crate::config::ReadOptions;
use crate::engine::Engine;
use crate::error::{ErrorKind, GraphError, Result};
use crate::extension::ResolverCallbacks;
use crate::model::{Graph, NodeBody, NodeIndex, NodeView, Primitive, keys};
use crate::tracker::{Anchor, Patch, ReadTracker, Step};

// -----------------------------------------------------------------------------
// Helpers

/// The result of materializing one node.
enum Built {
    Value(Box<dyn Reflect>),
    /// A reference to a handle that does not exist yet.
    Pending(u64),
}

enum Applied {
    Done,
    /// The target is not registered or the anchor is borrowed.
    Waiting,
    Failed(GraphError),
}

type Saved = (Anchor, Vec<Step>);

fn describe(view: NodeView<'_>) -> String {
    match &view.node().body {
        NodeBody::Primitive(value) => value.to_string(),
        NodeBody::Array(_) => String::from("an array"),
        NodeBody::Members(_) => String::from("an object"),
        NodeBody::Entries(_) => String::from("a map"),
        NodeBody::Reference(id) => format!("a reference to object {id}"),
    }
}

fn unsupported(view: NodeView<'_>, target: &'static TypeInfo) -> GraphError {
    ErrorKind::unsupported(describe(view), target.type_path()).into()
}

fn mismatch(value: &dyn Reflect, target: &'static TypeInfo) -> GraphError {
    ErrorKind::unsupported(value.reflect_type_path(), target.type_path()).into()
}

fn forward(id: u64, target: &'static TypeInfo) -> GraphError {
    ErrorKind::unsupported(format!("a forward reference to object {id}"), target.type_path()).into()
}

/// The scalar of a plain or a wrapped primitive node.
///
/// Only a tagged or identified object is a wrapper, `{"@type":..,"value":..}`.
/// A bare `{"value":..}` is an object with one member.
fn scalar_of<'g>(view: NodeView<'g>) -> Option<&'g Primitive> {
    match &view.node().body {
        NodeBody::Primitive(value) => Some(value),
        NodeBody::Members(members)
            if members.len() == 1
                && members[0].0 == keys::VALUE
                && (view.type_tag().is_some() || view.id().is_some()) =>
        {
            view.member(keys::VALUE)?.primitive()
        }
        _ => None,
    }
}

/// Slots that receive the registered handle itself rather than a copy.
fn is_handle_slot(slot: &TypeInfo) -> bool {
    match slot {
        TypeInfo::Shared(_) | TypeInfo::Dyn(_) => true,
        TypeInfo::Optional(info) => matches!(info.some_info(), TypeInfo::Shared(_) | TypeInfo::Dyn(_)),
        _ => false,
    }
}

/// Fits a handle into a handle slot.
fn coerce(handle: Box<dyn Reflect>, slot: &'static TypeInfo) -> Result<Box<dyn Reflect>> {
    match slot {
        TypeInfo::Optional(info) => {
            let inner = coerce(handle, info.some_info())?;
            info.some(inner).map_err(|value| mismatch(&*value, slot))
        }
        TypeInfo::Dyn(_) => Ok(Box::new(ReflectBox::from_boxed(handle))),
        _ => Ok(handle),
    }
}

// -----------------------------------------------------------------------------
// Resolver

/// Materializes a parsed [`Graph`] into typed values.
///
/// The walk is depth-first from the root. Shared handles are registered
/// before their members are populated, so back references link at once. A
/// reference to a handle that does not exist yet leaves a placeholder and a
/// [`Patch`] that is applied as soon as the handle registers and its anchor
/// is free, or at the end of the walk.
pub(crate) struct Resolver<'a> {
    engine: &'a Engine,
    registry: RwLockReadGuard<'a, TypeRegistry>,
    options: &'a ReadOptions,
    graph: &'a Graph,
    tracker: ReadTracker,
    issues: Vec<GraphError>,
    depth: usize,
    anchor: Anchor,
    path: Vec<Step>,
    /// Declaring nodes being copied into value slots.
    copying: Vec<NodeIndex>,
}

impl<'a> Resolver<'a> {
    pub fn new(engine: &'a Engine, graph: &'a Graph, options: &'a ReadOptions) -> Self {
        Self {
            engine,
            registry: engine.registry().read(),
            options,
            graph,
            tracker: ReadTracker::default(),
            issues: Vec::new(),
            depth: 0,
            anchor: Anchor::Root,
            path: Vec::new(),
            copying: Vec::new(),
        }
    }

    /// Materializes the root as `target`. Returns the value and the issues
    /// recorded on the way.
    pub fn resolve(mut self, target: &'static TypeInfo) -> Result<(Box<dyn Reflect>, Vec<GraphError>)> {
        let dangling = self.graph.dangling_references();
        if !dangling.is_empty() {
            return Err(ErrorKind::DanglingReference { ids: dangling }.into());
        }
        let root = self
            .graph
            .root()
            .ok_or_else(|| ErrorKind::malformed("graph has no root"))?;
        let target = if self.options.return_as_maps {
            <ReflectBox as Typed>::type_info()
        } else {
            target
        };
        let mut value = match self.materialize_as(root, target, true)? {
            Built::Value(value) => value,
            Built::Pending(id) => return Err(ErrorKind::DanglingReference { ids: vec![id] }.into()),
        };
        self.finish(&mut *value)?;
        log::debug!(
            "materialized `{}` with {} handles and {} issues",
            target.type_path(),
            self.tracker.handle_count(),
            self.issues.len()
        );
        Ok((value, self.issues))
    }

    // -------------------------------------------------------------------------
    // Bookkeeping

    fn record(&mut self, err: GraphError) -> Result<()> {
        if self.options.fail_fast {
            return Err(err);
        }
        log::warn!("read issue: {err}");
        self.issues.push(err);
        Ok(())
    }

    /// Records a failure inside `view`, or aborts on a graph-level one.
    fn fail(&mut self, err: GraphError, view: NodeView<'_>) -> Result<()> {
        if err.is_graph_level() {
            return Err(err);
        }
        let err = match view.id() {
            Some(id) => err.with_identity(id),
            None => err,
        };
        self.record(err)
    }

    fn enter(&mut self, anchor: Anchor) -> Saved {
        (
            mem::replace(&mut self.anchor, anchor),
            mem::take(&mut self.path),
        )
    }

    #[inline]
    fn detach(&mut self) -> Saved {
        self.enter(Anchor::Detached)
    }

    fn restore(&mut self, (anchor, path): Saved) {
        self.anchor = anchor;
        self.path = path;
    }

    fn default_of(&self, target: &'static TypeInfo) -> Result<Box<dyn Reflect>> {
        self.registry
            .get_type_trait::<TypeTraitDefault>(target.type_id())
            .map(TypeTraitDefault::default_value)
            .ok_or_else(|| {
                ErrorKind::MissingConstructor {
                    type_path: target.type_path(),
                }
                .into()
            })
    }

    /// A stand-in for a slot whose handle is still pending.
    fn placeholder(&self, slot: &'static TypeInfo) -> Result<Box<dyn Reflect>> {
        match slot {
            TypeInfo::Optional(info) => Ok(info.none()),
            TypeInfo::Dyn(_) => Ok(Box::new(ReflectBox::null())),
            TypeInfo::Shared(info) => {
                let inner = self.placeholder(info.inner_info())?;
                info.wrap(inner).map_err(|value| mismatch(&*value, slot))
            }
            _ => self.default_of(slot),
        }
    }

    /// Queues a patch for the slot reached by `step` from the current path.
    fn defer(&mut self, id: u64, step: Step, slot: &'static TypeInfo) -> Result<()> {
        if self.anchor == Anchor::Detached {
            return Err(forward(id, slot));
        }
        let mut path = self.path.clone();
        path.push(step);
        self.tracker.pending.push(Patch {
            anchor: self.anchor.clone(),
            path,
            target: id,
            slot,
        });
        Ok(())
    }

    fn register(&mut self, id: u64, handle: &dyn Reflect) -> Result<()> {
        if self.tracker.register(id, handle) {
            self.retry(id)?;
        }
        Ok(())
    }

    /// Applies the waiting patches that target or are anchored at `id`.
    fn retry(&mut self, id: u64) -> Result<()> {
        if !self.tracker.pending.iter().any(|patch| patch.involves(id)) {
            return Ok(());
        }
        let pending = mem::take(&mut self.tracker.pending);
        let mut waiting = Vec::with_capacity(pending.len());
        let mut failures = Vec::new();
        for patch in pending {
            if !patch.involves(id) {
                waiting.push(patch);
                continue;
            }
            match self.try_apply(&patch, None) {
                Applied::Done => log::trace!("patched object {} into {:?}", patch.target, patch.anchor),
                Applied::Waiting => waiting.push(patch),
                Applied::Failed(err) => failures.push(err.with_identity(patch.target)),
            }
        }
        self.tracker.pending.extend(waiting);
        for err in failures {
            self.record(err)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Patching

    fn try_apply(&self, patch: &Patch, root: Option<&mut dyn Reflect>) -> Applied {
        let Some(handle) = self.tracker.share(patch.target) else {
            return Applied::Waiting;
        };
        let value = match coerce(handle, patch.slot) {
            Ok(value) => value,
            Err(err) => return Applied::Failed(err),
        };
        match patch.anchor {
            Anchor::Root => match root {
                Some(root) => self.apply_steps(root, &patch.path, value),
                None => Applied::Waiting,
            },
            Anchor::Handle(anchor) => {
                let Some(handle) = self.tracker.handle(anchor) else {
                    return Applied::Waiting;
                };
                let Some(mut inner) = handle.borrow_inner_mut() else {
                    return Applied::Waiting;
                };
                self.apply_steps(&mut *inner, &patch.path, value)
            }
            Anchor::Detached => Applied::Failed(forward(patch.target, patch.slot)),
        }
    }

    fn apply_steps(&self, target: &mut dyn Reflect, steps: &[Step], value: Box<dyn Reflect>) -> Applied {
        let Some((step, rest)) = steps.split_first() else {
            return Applied::Failed(ErrorKind::InvalidTarget.into());
        };
        if rest.is_empty() {
            return match self.assign(target, step, value) {
                Ok(()) => Applied::Done,
                Err(err) => Applied::Failed(err),
            };
        }
        if let Step::SharedInner = step {
            let ReflectMut::Shared(handle) = target.reflect_mut() else {
                return Applied::Failed(ErrorKind::InvalidTarget.into());
            };
            let Some(mut inner) = handle.borrow_inner_mut() else {
                return Applied::Waiting;
            };
            return self.apply_steps(&mut *inner, rest, value);
        }
        match self.descend(target, step) {
            Ok(next) => self.apply_steps(next, rest, value),
            Err(err) => Applied::Failed(err),
        }
    }

    fn descend<'t>(&self, target: &'t mut dyn Reflect, step: &Step) -> Result<&'t mut dyn Reflect> {
        let missing = || GraphError::from(ErrorKind::InvalidTarget);
        match step {
            Step::Member { members, index } => members
                .get(*index)
                .and_then(|member| member.get_mut(target))
                .ok_or_else(missing),
            Step::Index(position) => match target.reflect_mut() {
                ReflectMut::List(list) => list.get_mut(*position).ok_or_else(missing),
                _ => Err(missing()),
            },
            Step::MapKey { key, key_type } => {
                let key = self.engine.converter().convert(key, *key_type)?;
                match target.reflect_mut() {
                    ReflectMut::Map(map) => map.get_mut(&*key).ok_or_else(missing),
                    _ => Err(missing()),
                }
            }
            Step::OptionSome => match target.reflect_mut() {
                ReflectMut::Optional(optional) => optional.value_mut().ok_or_else(missing),
                _ => Err(missing()),
            },
            Step::Boxed => match target.reflect_mut() {
                ReflectMut::Dyn(slot) => Ok(slot.get_mut()),
                _ => Err(missing()),
            },
            Step::SharedInner => Err(missing()),
        }
    }

    fn assign(&self, target: &mut dyn Reflect, step: &Step, value: Box<dyn Reflect>) -> Result<()> {
        if let Step::Member { members, index } = step {
            let member = members.get(*index).ok_or(ErrorKind::InvalidTarget)?;
            return member.set(target, value);
        }
        let expected = target.reflect_type_info();
        match (step, target.reflect_mut()) {
            (Step::Index(position), ReflectMut::List(list)) => list
                .replace(*position, value)
                .map_err(|value| mismatch(&*value, expected)),
            (Step::MapKey { key, key_type }, ReflectMut::Map(map)) => {
                let key = self.engine.converter().convert(key, *key_type)?;
                map.insert(key, value)
                    .map_err(|value| mismatch(&*value, expected))
            }
            (Step::OptionSome, ReflectMut::Optional(optional)) => optional
                .set_some(value)
                .map_err(|value| mismatch(&*value, expected)),
            (Step::Boxed, ReflectMut::Dyn(slot)) => {
                slot.replace(value);
                Ok(())
            }
            _ => Err(ErrorKind::InvalidTarget.into()),
        }
    }

    /// Materializes the targets of patches whose handles were never reached,
    /// then applies every remaining patch.
    fn finish(&mut self, root: &mut dyn Reflect) -> Result<()> {
        loop {
            let mut missing: Vec<(u64, &'static TypeInfo)> = Vec::new();
            for patch in &self.tracker.pending {
                if !self.tracker.is_registered(patch.target)
                    && !missing.iter().any(|(id, _)| *id == patch.target)
                {
                    missing.push((patch.target, patch.slot));
                }
            }
            let mut progressed = false;
            for (id, slot) in missing {
                if !self.tracker.is_registered(id) && self.materialize_detached(id, slot)? {
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }

        let mut unresolved = Vec::new();
        for patch in mem::take(&mut self.tracker.pending) {
            match self.try_apply(&patch, Some(&mut *root)) {
                Applied::Done => log::trace!("patched object {} into {:?}", patch.target, patch.anchor),
                Applied::Waiting if !self.tracker.is_registered(patch.target) => {
                    unresolved.push(patch.target);
                }
                Applied::Waiting => {
                    log::trace!("dropped patch of object {}: its container was discarded", patch.target);
                }
                Applied::Failed(err) => self.record(err.with_identity(patch.target))?,
            }
        }
        if !unresolved.is_empty() {
            unresolved.sort_unstable();
            unresolved.dedup();
            return Err(ErrorKind::DanglingReference { ids: unresolved }.into());
        }
        Ok(())
    }

    /// Builds the handle of `id` from its declaring node. Returns whether a
    /// handle got registered.
    fn materialize_detached(&mut self, id: u64, slot: &'static TypeInfo) -> Result<bool> {
        let Some(index) = self.graph.lookup(id) else {
            return Ok(false);
        };
        let target = match slot {
            TypeInfo::Optional(info) => info.some_info(),
            _ => slot,
        };
        let saved = self.detach();
        let built = self.materialize_as(index, target, true);
        self.restore(saved);
        match built {
            Ok(Built::Value(value)) => {
                if !self.tracker.is_registered(id) {
                    self.register(id, &*value)?;
                }
            }
            Ok(Built::Pending(_)) => {}
            Err(err) if err.is_graph_level() => return Err(err),
            Err(err) => self.record(err.with_identity(id))?,
        }
        Ok(self.tracker.is_registered(id))
    }

    // -------------------------------------------------------------------------
    // Materialization

    fn materialize_as(&mut self, index: NodeIndex, target: &'static TypeInfo, identity: bool) -> Result<Built> {
        self.depth += 1;
        let result = if self.depth > self.options.max_depth {
            Err(ErrorKind::GraphTooDeep {
                limit: self.options.max_depth,
            }
            .into())
        } else {
            self.materialize_kind(index, target, identity)
        };
        self.depth -= 1;
        result
    }

    fn materialize_kind(&mut self, index: NodeIndex, target: &'static TypeInfo, identity: bool) -> Result<Built> {
        let view = self.graph.view(index);
        if let Some(id) = view.reference() {
            return self.resolve_reference(id, target);
        }

        match target {
            TypeInfo::Optional(info) => {
                // An identified wrapper belongs to a handle inside the option.
                let wrapped_null = view.id().is_none() && scalar_of(view).is_some_and(Primitive::is_null);
                if view.is_null() || wrapped_null {
                    return Ok(Built::Value(info.none()));
                }
                self.path.push(Step::OptionSome);
                let inner = self.materialize_as(index, info.some_info(), identity);
                self.path.pop();
                return match inner? {
                    Built::Value(value) => info
                        .some(value)
                        .map(Built::Value)
                        .map_err(|value| mismatch(&*value, target)),
                    pending => Ok(pending),
                };
            }
            TypeInfo::Dyn(_) => return self.materialize_dyn(view, target, identity),
            TypeInfo::Shared(info) => return self.materialize_shared(view, info, identity),
            _ => {}
        }

        if let Some(factory) = self.engine.extensions().factory_for(target) {
            let saved = self.detach();
            let value = factory.instantiate(view, self);
            self.restore(saved);
            return value.map(Built::Value);
        }

        if view.is_null() && !matches!(target, TypeInfo::Opaque(_)) {
            return self
                .default_of(target)
                .map(Built::Value)
                .map_err(|_| unsupported(view, target));
        }

        let value = match target {
            TypeInfo::Enum(_) if scalar_of(view).is_some() => self.build_scalar(view, target)?,
            TypeInfo::Struct(_) | TypeInfo::Enum(_) => {
                let mut value = self.construct(view, target)?;
                self.populate(&mut *value, view, target)?;
                value
            }
            TypeInfo::List(info) => self.build_list(view, target, info.item_info())?,
            TypeInfo::Set(info) => {
                let saved = self.detach();
                let value = self.build_set(view, target, info.item_info());
                self.restore(saved);
                value?
            }
            TypeInfo::Map(info) => self.build_map(view, target, info.key_info(), info.value_info())?,
            _ => self.build_scalar(view, target)?,
        };
        Ok(Built::Value(value))
    }

    fn resolve_reference(&mut self, id: u64, target: &'static TypeInfo) -> Result<Built> {
        let Some(declaring) = self.graph.lookup(id) else {
            return Err(ErrorKind::DanglingReference { ids: vec![id] }.into());
        };
        if is_handle_slot(target) {
            return match self.tracker.share(id) {
                Some(handle) => coerce(handle, target).map(Built::Value),
                None => Ok(Built::Pending(id)),
            };
        }
        // A value slot gets its own copy of the referenced object.
        if self.copying.contains(&declaring) {
            return Err(ErrorKind::unsupported("a cyclic reference", target.type_path()).into());
        }
        self.copying.push(declaring);
        let built = self.materialize_as(declaring, target, false);
        self.copying.pop();
        built
    }

    fn materialize_dyn(&mut self, view: NodeView<'_>, target: &'static TypeInfo, identity: bool) -> Result<Built> {
        let maps = self.options.return_as_maps;
        let tagged = match view.type_tag() {
            Some(tag) if !maps => {
                let meta = self
                    .registry
                    .resolve_tag(self.engine.config().resolve_alias(tag))
                    .ok_or_else(|| ErrorKind::UnresolvableType { tag: String::from(tag) })?;
                Some(meta.type_info()).filter(|info| !matches!(info, TypeInfo::Dyn(_)))
            }
            _ => None,
        };
        let concrete = match (tagged, &view.node().body) {
            (Some(info), _) => info,
            (None, NodeBody::Primitive(value)) => {
                let value = self.engine.converter().convert(value, target)?;
                return Ok(Built::Value(Box::new(ReflectBox::from_boxed(value))));
            }
            (None, _) if !self.options.untyped_as_dynamic && !maps => {
                return Err(ErrorKind::UnresolvableType {
                    tag: String::from("(untagged)"),
                }
                .into());
            }
            // Map entries carry their keys as nodes; a `DynamicMap` stringifies them.
            (None, NodeBody::Members(_) | NodeBody::Entries(_)) => <DynamicMap as Typed>::type_info(),
            (None, NodeBody::Array(_)) => <Vec<ReflectBox> as Typed>::type_info(),
            (None, NodeBody::Reference(_)) => return Err(unsupported(view, target)),
        };

        // An identified value in a polymorphic slot becomes a handle.
        let handle_info = match (identity, view.id()) {
            (true, Some(_)) => self
                .registry
                .get_type_trait::<TypeTraitShared>(concrete.type_id())
                .map(TypeTraitShared::handle_info)
                .and_then(TypeInfo::as_shared),
            _ => None,
        };

        self.path.push(Step::Boxed);
        let built = match handle_info {
            Some(info) => self.materialize_shared(view, info, true),
            None => self.materialize_as(view.index(), concrete, identity),
        };
        self.path.pop();
        match built? {
            Built::Value(value) => Ok(Built::Value(Box::new(ReflectBox::from_boxed(value)))),
            pending => Ok(pending),
        }
    }

    fn materialize_shared(&mut self, view: NodeView<'_>, info: &'static SharedInfo, identity: bool) -> Result<Built> {
        let id = if identity { view.id() } else { None };
        if let Some(handle) = id.and_then(|id| self.tracker.share(id)) {
            return Ok(Built::Value(handle));
        }
        let saved = match id {
            Some(id) => Some(self.enter(Anchor::Handle(id))),
            None => {
                self.path.push(Step::SharedInner);
                None
            }
        };
        let built = self.build_shared(view, info, id);
        match saved {
            Some(saved) => self.restore(saved),
            None => {
                self.path.pop();
            }
        }
        built.map(Built::Value)
    }

    fn build_shared(&mut self, view: NodeView<'_>, info: &'static SharedInfo, id: Option<u64>) -> Result<Box<dyn Reflect>> {
        let inner = info.inner_info();
        let wrap = |value: Box<dyn Reflect>| info.wrap(value).map_err(|value| mismatch(&*value, inner));

        // Register before populating so that members can refer back.
        let in_place = match inner {
            TypeInfo::Struct(_) => true,
            // A wrapped unit variant is built from its scalar.
            TypeInfo::Enum(_) => scalar_of(view).is_none(),
            _ => false,
        } && matches!(view.node().body, NodeBody::Members(_))
            && self.engine.extensions().factory_for(inner).is_none();
        if let (true, Some(id)) = (in_place, id) {
            let handle = wrap(self.construct(view, inner)?)?;
            self.register(id, &*handle)?;
            {
                let ReflectRef::Shared(shared) = handle.reflect_ref() else {
                    return Err(ErrorKind::InvalidTarget.into());
                };
                let mut value = shared.borrow_inner_mut().ok_or(ErrorKind::InvalidTarget)?;
                self.populate(&mut *value, view, inner)?;
            }
            // Patches anchored inside waited for the borrow above.
            self.retry(id)?;
            return Ok(handle);
        }

        let value = match self.materialize_as(view.index(), inner, false)? {
            Built::Value(value) => value,
            Built::Pending(target) => return Err(forward(target, inner)),
        };
        let handle = wrap(value)?;
        if let Some(id) = id {
            self.register(id, &*handle)?;
        }
        Ok(handle)
    }

    /// The default form of a struct, or the variant named by the `name`
    /// member of an enum.
    fn construct(&self, view: NodeView<'_>, target: &'static TypeInfo) -> Result<Box<dyn Reflect>> {
        let TypeInfo::Enum(info) = target else {
            return self.default_of(target);
        };
        let name = view
            .member(crate::members::VARIANT_MEMBER)
            .and_then(scalar_of)
            .and_then(Primitive::as_str)
            .ok_or_else(|| unsupported(view, target))?;
        let variant = info.variant(name).ok_or_else(|| ErrorKind::UnknownEnumConstant {
            enum_path: info.type_path(),
            name: String::from(name),
        })?;
        info.construct(variant.index()).ok_or_else(|| {
            ErrorKind::MissingConstructor {
                type_path: info.type_path(),
            }
            .into()
        })
    }

    /// Injects the members of `view` into `value`. Unknown members go to
    /// [`unknown_member`](Self::unknown_member).
    fn populate(&mut self, value: &mut dyn Reflect, view: NodeView<'_>, target: &'static TypeInfo) -> Result<()> {
        if !matches!(view.node().body, NodeBody::Members(_)) {
            return Err(unsupported(view, target));
        }
        let variant = match value.reflect_ref() {
            ReflectRef::Enum(variant) => Some(variant.variant_index()),
            _ => None,
        };
        let members = self
            .engine
            .catalog()
            .members(target, variant, self.engine.config());
        let owner = target.type_path();

        for (name, child) in view.members() {
            let Some((position, member)) = find_member(&members, name) else {
                self.unknown_member(value, view, target, name, child)?;
                continue;
            };
            if !member.is_writable()
                || self
                    .options
                    .excludes(member.declaring_type().type_path(), member.name())
            {
                continue;
            }
            let slot = member.set_type();
            let step = Step::Member {
                members: members.clone(),
                index: position,
            };
            self.path.push(step.clone());
            let built = self.materialize_as(child.index(), slot, true);
            self.path.pop();
            let result = match built {
                Ok(Built::Value(child)) => member.set(value, child),
                Ok(Built::Pending(id)) => self.defer(id, step, slot),
                Err(err) => Err(err),
            };
            if let Err(err) = result {
                self.fail(err.at(owner, name), view)?;
            }
        }
        Ok(())
    }

    /// Hands a member the target does not have to the registered handler.
    /// Without one it is dropped, or recorded if unknown members are rejected.
    fn unknown_member(
        &mut self,
        value: &mut dyn Reflect,
        view: NodeView<'_>,
        target: &'static TypeInfo,
        name: &str,
        child: NodeView<'_>,
    ) -> Result<()> {
        let owner = target.type_path();
        let result = match self.engine.extensions().missing_member_handler_for(target) {
            Some(handler) => {
                let saved = self.detach();
                let handled = handler.handle(value, name, child, self);
                self.restore(saved);
                handled
            }
            None if self.options.reject_unknown_members => Err(ErrorKind::UnknownMember {
                name: String::from(name),
            }
            .into()),
            None => {
                log::trace!("ignoring unknown member `{name}` of `{owner}`");
                Ok(())
            }
        };
        match result {
            Ok(()) => Ok(()),
            Err(err) => self.fail(err.at(owner, name), view),
        }
    }

    fn build_list(&mut self, view: NodeView<'_>, target: &'static TypeInfo, item: &'static TypeInfo) -> Result<Box<dyn Reflect>> {
        if !matches!(view.node().body, NodeBody::Array(_)) {
            return Err(unsupported(view, target));
        }
        let mut value = self.default_of(target)?;
        let ReflectMut::List(list) = value.reflect_mut() else {
            return Err(unsupported(view, target));
        };
        for (position, element) in view.items().enumerate() {
            if let Err(err) = self.push_element(list, element, item) {
                self.fail(err.at(target.type_path(), &format!("[{position}]")), view)?;
            }
        }
        Ok(value)
    }

    fn push_element(&mut self, list: &mut dyn List, element: NodeView<'_>, item: &'static TypeInfo) -> Result<()> {
        let step = Step::Index(list.len());
        self.path.push(step.clone());
        let built = self.materialize_as(element.index(), item, true);
        self.path.pop();
        match built? {
            Built::Value(element) => list.push(element).map_err(|element| mismatch(&*element, item)),
            Built::Pending(id) => {
                let placeholder = self.placeholder(item)?;
                list.push(placeholder)
                    .map_err(|placeholder| mismatch(&*placeholder, item))?;
                self.defer(id, step, item)
            }
        }
    }

    /// Elements of a set are hashed on insertion, so they are built detached
    /// and never patched later.
    fn build_set(&mut self, view: NodeView<'_>, target: &'static TypeInfo, item: &'static TypeInfo) -> Result<Box<dyn Reflect>> {
        if !matches!(view.node().body, NodeBody::Array(_)) {
            return Err(unsupported(view, target));
        }
        let mut value = self.default_of(target)?;
        let ReflectMut::Set(set) = value.reflect_mut() else {
            return Err(unsupported(view, target));
        };
        for (position, element) in view.items().enumerate() {
            let result = match self.materialize_as(element.index(), item, true) {
                Ok(Built::Value(element)) => set
                    .insert(element)
                    .map(|_| ())
                    .map_err(|element| mismatch(&*element, item)),
                Ok(Built::Pending(id)) => Err(forward(id, item)),
                Err(err) => Err(err),
            };
            if let Err(err) = result {
                self.fail(err.at(target.type_path(), &format!("[{position}]")), view)?;
            }
        }
        Ok(value)
    }

    fn build_map(
        &mut self,
        view: NodeView<'_>,
        target: &'static TypeInfo,
        key_type: &'static TypeInfo,
        slot: &'static TypeInfo,
    ) -> Result<Box<dyn Reflect>> {
        let mut value = self.default_of(target)?;
        let ReflectMut::Map(map) = value.reflect_mut() else {
            return Err(unsupported(view, target));
        };
        let owner = target.type_path();

        match &view.node().body {
            NodeBody::Members(_) => {
                for (name, child) in view.members() {
                    let key = Primitive::Str(String::from(name));
                    let result = match self.engine.converter().convert(&key, key_type) {
                        Ok(key) => self.insert_entry(map, key, key_type, child, slot),
                        Err(err) => Err(err),
                    };
                    if let Err(err) = result {
                        self.fail(err.at(owner, name), view)?;
                    }
                }
            }
            NodeBody::Entries(_) => {
                for (position, (key, child)) in view.entries().enumerate() {
                    let saved = self.detach();
                    let built = self.materialize_as(key.index(), key_type, true);
                    self.restore(saved);
                    let result = match built {
                        Ok(Built::Value(key)) => self.insert_entry(map, key, key_type, child, slot),
                        Ok(Built::Pending(id)) => Err(forward(id, key_type)),
                        Err(err) => Err(err),
                    };
                    if let Err(err) = result {
                        self.fail(err.at(owner, &format!("[{position}]")), view)?;
                    }
                }
            }
            _ => return Err(unsupported(view, target)),
        }
        if self.options.return_as_maps
            && let Some(map) = value.downcast_mut::<DynamicMap>()
        {
            map.set_type_tag(view.type_tag().map(String::from));
        }
        Ok(value)
    }

    fn insert_entry(
        &mut self,
        map: &mut dyn Map,
        key: Box<dyn Reflect>,
        key_type: &'static TypeInfo,
        child: NodeView<'_>,
        slot: &'static TypeInfo,
    ) -> Result<()> {
        // Only keys with a scalar form can be found again by a patch.
        let step = self
            .engine
            .converter()
            .to_primitive(&*key)
            .ok()
            .map(|key| Step::MapKey { key, key_type });
        let built = match &step {
            Some(step) => {
                self.path.push(step.clone());
                let built = self.materialize_as(child.index(), slot, true);
                self.path.pop();
                built
            }
            None => {
                let saved = self.detach();
                let built = self.materialize_as(child.index(), slot, true);
                self.restore(saved);
                built
            }
        };
        match built? {
            Built::Value(value) => map.insert(key, value).map_err(|value| mismatch(&*value, slot)),
            Built::Pending(id) => {
                let step = step.ok_or_else(|| forward(id, slot))?;
                let placeholder = self.placeholder(slot)?;
                map.insert(key, placeholder)
                    .map_err(|placeholder| mismatch(&*placeholder, slot))?;
                self.defer(id, step, slot)
            }
        }
    }

    fn build_scalar(&self, view: NodeView<'_>, target: &'static TypeInfo) -> Result<Box<dyn Reflect>> {
        match scalar_of(view) {
            Some(value) => self.engine.converter().convert(value, target),
            None => Err(unsupported(view, target)),
        }
    }
}

impl ResolverCallbacks for Resolver<'_> {
    fn materialize(&mut self, index: NodeIndex, target: &'static TypeInfo) -> Result<Box<dyn Reflect>> {
        match self.materialize_as(index, target, true)? {
            Built::Value(value) => Ok(value),
            Built::Pending(id) => Err(forward(id, target)),
        }
    }

    #[inline]
    fn convert(&self, value: &Primitive, target: &'static TypeInfo) -> Result<Box<dyn Reflect>> {
        self.engine.converter().convert(value, target)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::rc::Rc;

    use vc_reflect::info::Typed;
    use vc_reflect::ops::{DynamicMap, Shared};
    use vc_reflect::registry::GetTypeMeta;
    use vc_reflect::{Reflect, ReflectBox};

    use super::Resolver;
    use crate::config::ReadOptions;
    use crate::engine::Engine;
    use crate::error::{ErrorKind, Result};
    use crate::json::JsonSource;
    use crate::model::Graph;
    use crate::parse::parse;

    #[derive(Reflect, Default)]
    #[reflect(default)]
    struct Node {
        label: String,
        next: Option<Shared<Node>>,
    }

    #[derive(Reflect, Default)]
    #[reflect(default)]
    struct Holder {
        first: Shared<Node>,
        all: Vec<Shared<Node>>,
    }

    #[derive(Reflect, Default)]
    #[reflect(default)]
    struct Tags {
        names: BTreeSet<String>,
        count: u8,
    }

    fn graph(text: &str) -> Graph {
        let mut source: JsonSource = text.parse().unwrap();
        parse(&mut source, 64).unwrap()
    }

    fn resolve<T: Typed + GetTypeMeta>(text: &str, options: &ReadOptions) -> Result<(Box<dyn Reflect>, usize)> {
        let engine = Engine::default();
        engine.register::<T>();
        let graph = graph(text);
        let (value, issues) = Resolver::new(&engine, &graph, options).resolve(T::type_info())?;
        Ok((value, issues.len()))
    }

    #[test]
    fn back_references_share_handles() {
        let text = r#"{"first":{"@id":1,"label":"a","next":{"@ref":1}},"all":[{"@ref":1}]}"#;
        let (value, issues) = resolve::<Holder>(text, &ReadOptions::default()).unwrap();
        assert_eq!(issues, 0);
        let holder = value.downcast_ref::<Holder>().unwrap();
        let next = holder.first.borrow().next.clone().unwrap();
        assert!(Rc::ptr_eq(&holder.first, &next));
        assert!(Rc::ptr_eq(&holder.first, &holder.all[0]));
    }

    #[test]
    fn forward_references_are_patched() {
        let text = r#"{"all":[{"@ref":2},{"@id":2,"label":"b"}],"first":{"label":"a","next":{"@ref":2}}}"#;
        let (value, issues) = resolve::<Holder>(text, &ReadOptions::default()).unwrap();
        assert_eq!(issues, 0);
        let holder = value.downcast_ref::<Holder>().unwrap();
        assert_eq!(holder.all.len(), 2);
        assert!(Rc::ptr_eq(&holder.all[0], &holder.all[1]));
        assert_eq!(holder.all[0].borrow().label, "b");
        let next = holder.first.borrow().next.clone().unwrap();
        assert!(Rc::ptr_eq(&next, &holder.all[1]));
    }

    #[test]
    fn unreached_targets_are_built_at_the_end() {
        let text = r#"{"first":{"label":"a","next":{"@ref":5}}}"#;
        let err = resolve::<Holder>(text, &ReadOptions::default()).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::DanglingReference { ref ids } if ids == &[5]));

        // Declared inside a member the target does not have.
        let text = r#"{"first":{"label":"a","next":{"@ref":5}},"extra":{"@id":5,"label":"z"}}"#;
        let (value, issues) = resolve::<Holder>(text, &ReadOptions::default()).unwrap();
        assert_eq!(issues, 0);
        let holder = value.downcast_ref::<Holder>().unwrap();
        let next = holder.first.borrow().next.clone().unwrap();
        assert_eq!(next.borrow().label, "z");
    }

    #[test]
    fn failed_members_are_recorded() {
        let text = r#"{"names":["x","y",3],"count":"many"}"#;
        let (value, issues) = resolve::<Tags>(text, &ReadOptions::default()).unwrap();
        assert_eq!(issues, 1);
        let tags = value.downcast_ref::<Tags>().unwrap();
        assert_eq!(tags.names.len(), 3);
        assert_eq!(tags.count, 0);

        let options = ReadOptions {
            fail_fast: true,
            ..ReadOptions::default()
        };
        let err = resolve::<Tags>(text, &options).unwrap_err();
        assert_eq!(err.site.member.as_deref(), Some("count"));
    }

    #[test]
    fn untyped_values_become_dynamic() {
        let text = r#"{"a":1,"b":[true,"x"],"c":{"d":null}}"#;
        let (value, _) = resolve::<ReflectBox>(text, &ReadOptions::default()).unwrap();
        let value = value.downcast_ref::<ReflectBox>().unwrap();
        let map = value.downcast_ref::<DynamicMap>().unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("a").and_then(|a| a.downcast_ref::<i64>()), Some(&1));

        let options = ReadOptions {
            untyped_as_dynamic: false,
            ..ReadOptions::default()
        };
        let err = resolve::<ReflectBox>(text, &options).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnresolvableType { .. }));
    }

    #[test]
    fn unknown_tags_are_rejected() {
        let text = r#"{"@type":"nowhere::Missing","x":1}"#;
        let err = resolve::<ReflectBox>(text, &ReadOptions::default()).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnresolvableType { ref tag } if tag == "nowhere::Missing"));
    }
}
