//! The intermediate graph shared by the writer, printer, parser and resolver.

use core::fmt;
use core::ops::Index;

use slotmap::SlotMap;
use vc_utils::hash::{HashMap, HashSet};

use crate::error::{ErrorKind, Result};

/// Reserved member names of the document format.
pub(crate) mod keys {
    pub const TYPE: &str = "@type";
    pub const ID: &str = "@id";
    pub const REF: &str = "@ref";
    pub const ITEMS: &str = "@items";
    pub const KEYS: &str = "@keys";
    /// Holds the scalar of a tagged or identified primitive.
    pub const VALUE: &str = "value";
}

slotmap::new_key_type! {
    /// Index of a node in a [`Graph`].
    pub struct NodeIndex;
}

// -----------------------------------------------------------------------------
// Primitive

/// A scalar value of the document.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
}

impl Primitive {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Primitive::Null)
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Primitive::Str(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Null => f.write_str("null"),
            Primitive::Bool(value) => write!(f, "{value}"),
            Primitive::Int(value) => write!(f, "{value}"),
            Primitive::UInt(value) => write!(f, "{value}"),
            Primitive::Float(value) => write!(f, "{value}"),
            Primitive::Str(value) => write!(f, "{value:?}"),
        }
    }
}

// -----------------------------------------------------------------------------
// GraphNode

/// The content of a node.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeBody {
    Primitive(Primitive),
    /// Elements of a list or set.
    Array(Vec<NodeIndex>),
    /// Named members of an object, in document order.
    Members(Vec<(String, NodeIndex)>),
    /// Key/value pairs of a map whose keys are not strings.
    Entries(Vec<(NodeIndex, NodeIndex)>),
    /// A back or forward reference to the node declaring this id.
    Reference(u64),
}

/// A node of a [`Graph`].
#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
    pub type_tag: Option<String>,
    pub id: Option<u64>,
    pub body: NodeBody,
}

impl GraphNode {
    #[inline]
    pub fn new(body: NodeBody) -> Self {
        Self {
            type_tag: None,
            id: None,
            body,
        }
    }

    #[inline]
    pub fn primitive(value: Primitive) -> Self {
        Self::new(NodeBody::Primitive(value))
    }

    #[inline]
    pub fn null() -> Self {
        Self::primitive(Primitive::Null)
    }

    #[inline]
    pub fn reference(id: u64) -> Self {
        Self::new(NodeBody::Reference(id))
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self.body, NodeBody::Primitive(Primitive::Null))
    }

    /// The direct children, references excluded.
    pub fn children(&self) -> Vec<NodeIndex> {
        match &self.body {
            NodeBody::Array(items) => items.clone(),
            NodeBody::Members(members) => members.iter().map(|(_, child)| *child).collect(),
            NodeBody::Entries(entries) => {
                entries.iter().flat_map(|(key, value)| [*key, *value]).collect()
            }
            NodeBody::Primitive(_) | NodeBody::Reference(_) => Vec::new(),
        }
    }
}

// -----------------------------------------------------------------------------
// Graph

/// An arena of nodes with an identity index.
///
/// The graph is the hand-off point between the two halves of both directions:
/// the writer fills it and the printer emits it, the parser fills it and the
/// resolver materializes it.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: SlotMap<NodeIndex, GraphNode>,
    ids: HashMap<u64, NodeIndex>,
    root: Option<NodeIndex>,
}

impl Graph {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, node: GraphNode) -> NodeIndex {
        self.nodes.insert(node)
    }

    #[inline]
    pub fn node(&self, index: NodeIndex) -> Option<&GraphNode> {
        self.nodes.get(index)
    }

    #[inline]
    pub fn node_mut(&mut self, index: NodeIndex) -> Option<&mut GraphNode> {
        self.nodes.get_mut(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Records that the node at `index` declares `id`.
    pub fn register_id(&mut self, id: u64, index: NodeIndex) -> Result<()> {
        if self.ids.contains_key(&id) {
            return Err(ErrorKind::DuplicateIdentity { id }.into());
        }
        self.ids.insert(id, index);
        if let Some(node) = self.nodes.get_mut(index) {
            node.id = Some(id);
        }
        Ok(())
    }

    /// The node declaring `id`.
    #[inline]
    pub fn lookup(&self, id: u64) -> Option<NodeIndex> {
        self.ids.get(&id).copied()
    }

    #[inline]
    pub fn root(&self) -> Option<NodeIndex> {
        self.root
    }

    #[inline]
    pub fn set_root(&mut self, root: NodeIndex) {
        self.root = Some(root);
    }

    #[inline]
    pub fn view(&self, index: NodeIndex) -> NodeView<'_> {
        NodeView { graph: self, index }
    }

    /// Nodes reachable from the root, in depth-first order.
    pub fn reachable(&self) -> Vec<NodeIndex> {
        let mut visited = HashSet::default();
        let mut order = Vec::new();
        let mut stack: Vec<NodeIndex> = self.root.into_iter().collect();
        while let Some(index) = stack.pop() {
            if !visited.insert(index) {
                continue;
            }
            let Some(node) = self.nodes.get(index) else {
                continue;
            };
            order.push(index);
            stack.extend(node.children().into_iter().rev());
        }
        order
    }

    /// Ids that a reachable reference points to.
    pub fn referenced_ids(&self) -> HashSet<u64> {
        self.reachable()
            .into_iter()
            .filter_map(|index| match self.nodes[index].body {
                NodeBody::Reference(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Referenced ids that no node declares, ascending.
    pub fn dangling_references(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .nodes
            .values()
            .filter_map(|node| match node.body {
                NodeBody::Reference(id) if !self.ids.contains_key(&id) => Some(id),
                _ => None,
            })
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Clears `@id` from every node that no reachable reference points to.
    pub fn elide_unreferenced_ids(&mut self) {
        let referenced = self.referenced_ids();
        self.ids.retain(|id, _| referenced.contains(id));
        for node in self.nodes.values_mut() {
            if node.id.is_some_and(|id| !referenced.contains(&id)) {
                node.id = None;
            }
        }
    }
}

impl Index<NodeIndex> for Graph {
    type Output = GraphNode;

    #[inline]
    fn index(&self, index: NodeIndex) -> &GraphNode {
        &self.nodes[index]
    }
}

// -----------------------------------------------------------------------------
// NodeView

/// A read-only cursor into a [`Graph`], handed to custom factories.
#[derive(Clone, Copy)]
pub struct NodeView<'g> {
    graph: &'g Graph,
    index: NodeIndex,
}

impl<'g> NodeView<'g> {
    #[inline]
    pub fn index(&self) -> NodeIndex {
        self.index
    }

    #[inline]
    pub fn node(&self) -> &'g GraphNode {
        &self.graph[self.index]
    }

    #[inline]
    pub fn type_tag(&self) -> Option<&'g str> {
        self.node().type_tag.as_deref()
    }

    #[inline]
    pub fn id(&self) -> Option<u64> {
        self.node().id
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.node().is_null()
    }

    pub fn primitive(&self) -> Option<&'g Primitive> {
        match &self.node().body {
            NodeBody::Primitive(value) => Some(value),
            _ => None,
        }
    }

    pub fn reference(&self) -> Option<u64> {
        match self.node().body {
            NodeBody::Reference(id) => Some(id),
            _ => None,
        }
    }

    /// Follows a reference to the node declaring its id.
    pub fn resolve(self) -> Self {
        match self.reference().and_then(|id| self.graph.lookup(id)) {
            Some(index) => self.graph.view(index),
            None => self,
        }
    }

    pub fn member(&self, name: &str) -> Option<Self> {
        self.members()
            .find(|(member, _)| *member == name)
            .map(|(_, view)| view)
    }

    pub fn members(self) -> impl Iterator<Item = (&'g str, NodeView<'g>)> + 'g {
        let graph = self.graph;
        let members: &'g [(String, NodeIndex)] = match &self.node().body {
            NodeBody::Members(members) => members,
            _ => &[],
        };
        members
            .iter()
            .map(move |(name, index)| (name.as_str(), graph.view(*index)))
    }

    pub fn items(self) -> impl Iterator<Item = NodeView<'g>> + 'g {
        let graph = self.graph;
        let items: &'g [NodeIndex] = match &self.node().body {
            NodeBody::Array(items) => items,
            _ => &[],
        };
        items.iter().map(move |index| graph.view(*index))
    }

    pub fn entries(self) -> impl Iterator<Item = (NodeView<'g>, NodeView<'g>)> + 'g {
        let graph = self.graph;
        let entries: &'g [(NodeIndex, NodeIndex)] = match &self.node().body {
            NodeBody::Entries(entries) => entries,
            _ => &[],
        };
        entries
            .iter()
            .map(move |(key, value)| (graph.view(*key), graph.view(*value)))
    }
}

impl fmt::Debug for NodeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeView").field(self.node()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{Graph, GraphNode, NodeBody, NodeIndex, Primitive};
    use crate::error::ErrorKind;

    fn object(graph: &mut Graph, members: Vec<(&str, NodeIndex)>) -> NodeIndex {
        let members = members
            .into_iter()
            .map(|(name, index)| (String::from(name), index))
            .collect();
        graph.push(GraphNode::new(NodeBody::Members(members)))
    }

    #[test]
    fn identity_index() {
        let mut graph = Graph::new();
        let a = graph.push(GraphNode::null());
        let b = graph.push(GraphNode::null());
        graph.register_id(1, a).unwrap();
        assert_eq!(graph.lookup(1), Some(a));
        assert_eq!(graph[a].id, Some(1));

        let err = graph.register_id(1, b).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::DuplicateIdentity { id: 1 }));
    }

    #[test]
    fn dangling_and_elision() {
        let mut graph = Graph::new();
        let shared = object(&mut graph, vec![]);
        let lonely = object(&mut graph, vec![]);
        let back = graph.push(GraphNode::reference(1));
        let missing = graph.push(GraphNode::reference(9));
        let root = object(
            &mut graph,
            vec![("a", shared), ("b", back), ("c", lonely), ("d", missing)],
        );
        graph.set_root(root);
        graph.register_id(1, shared).unwrap();
        graph.register_id(2, lonely).unwrap();

        assert_eq!(graph.dangling_references(), vec![9]);
        assert_eq!(graph.reachable(), vec![root, shared, back, lonely, missing]);

        graph.elide_unreferenced_ids();
        assert_eq!(graph[shared].id, Some(1));
        assert_eq!(graph[lonely].id, None);
        assert_eq!(graph.lookup(2), None);
    }

    #[test]
    fn views_follow_references() {
        let mut graph = Graph::new();
        let leaf = graph.push(GraphNode::primitive(Primitive::Str("x".into())));
        let target = object(&mut graph, vec![("label", leaf)]);
        graph.register_id(5, target).unwrap();
        let back = graph.push(GraphNode::reference(5));
        let root = object(&mut graph, vec![("first", target), ("second", back)]);
        graph.set_root(root);

        let view = graph.view(root);
        let second = view.member("second").unwrap();
        assert_eq!(second.reference(), Some(5));
        let label = second.resolve().member("label").unwrap();
        assert_eq!(label.primitive(), Some(&Primitive::Str("x".into())));
        assert_eq!(view.members().count(), 2);
    }
}
