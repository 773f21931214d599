//! Per-call identity bookkeeping of the writer and the resolver.

use std::sync::Arc;

use vc_reflect::Reflect;
use vc_reflect::info::TypeInfo;
use vc_reflect::ops::{ReflectRef, SharedHandle};
use vc_utils::hash::HashMap;

use crate::access::MemberDescriptor;
use crate::model::Primitive;

// -----------------------------------------------------------------------------
// WriteTracker

/// Outcome of visiting a shared handle while writing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Visit {
    /// Seen for the first time; render it under this id.
    First(u64),
    /// Already rendered or being rendered; emit a reference.
    Repeat(u64),
}

/// Assigns ids to handle addresses in visiting order, starting at 1.
///
/// First visits are journaled so that a failed branch can forget the handles
/// it introduced. Ids are never reused, even after a rollback.
#[derive(Debug)]
pub(crate) struct WriteTracker {
    ids: HashMap<usize, u64>,
    journal: Vec<usize>,
    next_id: u64,
}

impl WriteTracker {
    pub fn new() -> Self {
        Self {
            ids: HashMap::default(),
            journal: Vec::new(),
            next_id: 1,
        }
    }

    pub fn visit(&mut self, addr: usize) -> Visit {
        if let Some(id) = self.ids.get(&addr) {
            return Visit::Repeat(*id);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.ids.insert(addr, id);
        self.journal.push(addr);
        Visit::First(id)
    }

    #[inline]
    pub fn checkpoint(&self) -> usize {
        self.journal.len()
    }

    /// Forgets every first visit made after `checkpoint`.
    pub fn rollback(&mut self, checkpoint: usize) {
        for addr in self.journal.drain(checkpoint..) {
            self.ids.remove(&addr);
        }
    }
}

// -----------------------------------------------------------------------------
// Patches

/// The object a patch path starts from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Anchor {
    /// The value being returned to the caller, available once the walk ends.
    Root,
    /// The pointee of the handle registered under this id.
    Handle(u64),
    /// A place patches cannot reach, such as a set element or a map key.
    Detached,
}

/// One navigation step from an anchor to the slot of a patch.
#[derive(Clone, Debug)]
pub(crate) enum Step {
    Member {
        members: Arc<[MemberDescriptor]>,
        index: usize,
    },
    Index(usize),
    MapKey {
        key: Primitive,
        key_type: &'static TypeInfo,
    },
    OptionSome,
    Boxed,
    SharedInner,
}

/// A deferred injection of the handle registered under `target`.
#[derive(Debug)]
pub(crate) struct Patch {
    pub anchor: Anchor,
    pub path: Vec<Step>,
    pub target: u64,
    /// Declared type of the slot at the end of `path`.
    pub slot: &'static TypeInfo,
}

impl Patch {
    #[inline]
    pub fn involves(&self, id: u64) -> bool {
        self.target == id || self.anchor == Anchor::Handle(id)
    }
}

// -----------------------------------------------------------------------------
// ReadTracker

/// Handles materialized so far, and the patches waiting for handles.
#[derive(Default)]
pub(crate) struct ReadTracker {
    handles: HashMap<u64, Box<dyn Reflect>>,
    pub pending: Vec<Patch>,
}

impl ReadTracker {
    /// Keeps a share of `handle` under `id`. Returns `false` when `value` is
    /// not a shared handle or `id` is taken.
    pub fn register(&mut self, id: u64, value: &dyn Reflect) -> bool {
        let ReflectRef::Shared(handle) = value.reflect_ref() else {
            return false;
        };
        if self.handles.contains_key(&id) {
            return false;
        }
        self.handles.insert(id, handle.share());
        true
    }

    #[inline]
    pub fn is_registered(&self, id: u64) -> bool {
        self.handles.contains_key(&id)
    }

    pub fn handle(&self, id: u64) -> Option<&dyn SharedHandle> {
        match self.handles.get(&id)?.reflect_ref() {
            ReflectRef::Shared(handle) => Some(handle),
            _ => None,
        }
    }

    /// A new handle to the object registered under `id`.
    #[inline]
    pub fn share(&self, id: u64) -> Option<Box<dyn Reflect>> {
        self.handle(id).map(|handle| handle.share())
    }

    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;
    use std::rc::Rc;

    use vc_reflect::ops::Shared;

    use super::{Anchor, Patch, ReadTracker, Visit, WriteTracker};
    use crate::model::Primitive;

    #[test]
    fn visits_and_rollback() {
        let mut tracker = WriteTracker::new();
        assert_eq!(tracker.visit(0x10), Visit::First(1));
        assert_eq!(tracker.visit(0x10), Visit::Repeat(1));

        let checkpoint = tracker.checkpoint();
        assert_eq!(tracker.visit(0x20), Visit::First(2));
        assert_eq!(tracker.visit(0x30), Visit::First(3));
        tracker.rollback(checkpoint);

        assert_eq!(tracker.visit(0x10), Visit::Repeat(1));
        assert_eq!(tracker.visit(0x20), Visit::First(4));
    }

    #[test]
    fn handles_are_shared() {
        let mut tracker = ReadTracker::default();
        let value: Shared<i32> = Rc::new(RefCell::new(5));
        assert!(tracker.register(1, &value));
        assert!(!tracker.register(1, &value));
        assert!(!tracker.register(2, &5_i32));

        let shared = tracker.share(1).unwrap().take::<Shared<i32>>().unwrap();
        assert!(Rc::ptr_eq(&value, &shared));
        assert!(tracker.share(2).is_none());
        assert_eq!(tracker.handle_count(), 1);
    }

    #[test]
    fn patch_involvement() {
        let patch = Patch {
            anchor: Anchor::Handle(4),
            path: vec![super::Step::MapKey {
                key: Primitive::Str("k".into()),
                key_type: <String as vc_reflect::info::Typed>::type_info(),
            }],
            target: 9,
            slot: <Shared<i32> as vc_reflect::info::Typed>::type_info(),
        };
        assert!(patch.involves(4));
        assert!(patch.involves(9));
        assert!(!patch.involves(1));
    }
}
