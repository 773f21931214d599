use crate::error::{ErrorKind, Result};
use crate::model::{Graph, GraphNode, NodeBody, NodeIndex, Primitive, keys};
use crate::token::TokenSink;

/// Emits the graph reachable from its root as tokens.
///
/// Objects carry `@type` and `@id` first. A tagged or identified scalar is
/// wrapped as `{"@type":..,"value":..}` and a tagged or identified array as
/// `{"@type":..,"@items":[..]}`. Maps with non-string keys print as parallel
/// `@keys` / `@items` arrays.
///
/// # Errors
///
/// [`ErrorKind::MalformedInput`] when the graph has no root, or whatever the
/// sink reports.
///
/// ```
/// use vc_graph::json::JsonSink;
/// use vc_graph::{Graph, GraphNode, NodeBody, Primitive, print};
///
/// let mut graph = Graph::new();
/// let item = graph.push(GraphNode::primitive(Primitive::Int(1)));
/// let root = graph.push(GraphNode::new(NodeBody::Array(vec![item])));
/// graph.set_root(root);
///
/// let mut sink = JsonSink::new();
/// print(&graph, &mut sink).unwrap();
/// assert_eq!(sink.into_string(false).unwrap(), "[1]");
/// ```
pub fn print(graph: &Graph, sink: &mut dyn TokenSink) -> Result<()> {
    let root = graph
        .root()
        .ok_or_else(|| ErrorKind::malformed("graph has no root"))?;
    Printer { graph, sink }.node(root)
}

struct Printer<'a> {
    graph: &'a Graph,
    sink: &'a mut dyn TokenSink,
}

impl Printer<'_> {
    fn node(&mut self, index: NodeIndex) -> Result<()> {
        let graph = self.graph;
        let node = graph
            .node(index)
            .ok_or_else(|| ErrorKind::malformed("node is missing from the graph"))?;
        let annotated = node.type_tag.is_some() || node.id.is_some();

        match &node.body {
            NodeBody::Reference(id) => {
                self.sink.open_object()?;
                self.sink.key(keys::REF)?;
                self.sink.emit_u64(*id)?;
                self.sink.close_object()
            }
            NodeBody::Primitive(value) if !annotated => self.primitive(value),
            NodeBody::Primitive(value) => {
                self.open_annotated(node)?;
                self.sink.key(keys::VALUE)?;
                self.primitive(value)?;
                self.sink.close_object()
            }
            NodeBody::Array(items) if !annotated => self.array(items),
            NodeBody::Array(items) => {
                self.open_annotated(node)?;
                self.sink.key(keys::ITEMS)?;
                self.array(items)?;
                self.sink.close_object()
            }
            NodeBody::Members(members) => {
                self.open_annotated(node)?;
                for (name, child) in members {
                    self.sink.key(name)?;
                    self.node(*child)?;
                }
                self.sink.close_object()
            }
            NodeBody::Entries(entries) => {
                self.open_annotated(node)?;
                self.sink.key(keys::KEYS)?;
                self.sink.open_array()?;
                for (key, _) in entries {
                    self.node(*key)?;
                }
                self.sink.close_array()?;
                self.sink.key(keys::ITEMS)?;
                self.sink.open_array()?;
                for (_, value) in entries {
                    self.node(*value)?;
                }
                self.sink.close_array()?;
                self.sink.close_object()
            }
        }
    }

    fn open_annotated(&mut self, node: &GraphNode) -> Result<()> {
        self.sink.open_object()?;
        if let Some(tag) = &node.type_tag {
            self.sink.key(keys::TYPE)?;
            self.sink.emit_str(tag)?;
        }
        if let Some(id) = node.id {
            self.sink.key(keys::ID)?;
            self.sink.emit_u64(id)?;
        }
        Ok(())
    }

    fn array(&mut self, items: &[NodeIndex]) -> Result<()> {
        self.sink.open_array()?;
        for item in items {
            self.node(*item)?;
        }
        self.sink.close_array()
    }

    fn primitive(&mut self, value: &Primitive) -> Result<()> {
        match value {
            Primitive::Null => self.sink.emit_null(),
            Primitive::Bool(value) => self.sink.emit_bool(*value),
            Primitive::Int(value) => self.sink.emit_i64(*value),
            Primitive::UInt(value) => self.sink.emit_u64(*value),
            Primitive::Float(value) => self.sink.emit_f64(*value),
            Primitive::Str(value) => self.sink.emit_str(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::print;
    use crate::json::{JsonSink, JsonSource};
    use crate::model::{Graph, GraphNode, NodeBody, Primitive};
    use crate::parse::parse;

    fn to_text(graph: &Graph) -> String {
        let mut sink = JsonSink::new();
        print(graph, &mut sink).unwrap();
        sink.into_string(false).unwrap()
    }

    #[test]
    fn annotated_nodes() {
        let mut graph = Graph::new();
        let mut tagged = GraphNode::primitive(Primitive::Int(7));
        tagged.type_tag = Some(String::from("i32"));
        let tagged = graph.push(tagged);
        let one = graph.push(GraphNode::primitive(Primitive::Int(1)));
        let list = graph.push(GraphNode::new(NodeBody::Array(vec![one])));
        graph.register_id(2, list).unwrap();
        let back = graph.push(GraphNode::reference(2));
        let key = graph.push(GraphNode::primitive(Primitive::Int(4)));
        let value = graph.push(GraphNode::primitive(Primitive::Str("four".into())));
        let map = graph.push(GraphNode::new(NodeBody::Entries(vec![(key, value)])));
        let root = graph.push(GraphNode::new(NodeBody::Members(vec![
            (String::from("n"), tagged),
            (String::from("list"), list),
            (String::from("again"), back),
            (String::from("map"), map),
        ])));
        graph.set_root(root);

        assert_eq!(
            to_text(&graph),
            r#"{"n":{"@type":"i32","value":7},"list":{"@id":2,"@items":[1]},"again":{"@ref":2},"map":{"@keys":[4],"@items":["four"]}}"#
        );
    }

    #[test]
    fn parse_then_print_keeps_the_document() {
        let text = r#"{"@type":"Scene","@id":1,"children":[{"@id":2,"parent":{"@ref":1}},{"@ref":2}]}"#;
        let mut source: JsonSource = text.parse().unwrap();
        let graph = parse(&mut source, 32).unwrap();
        assert_eq!(to_text(&graph), text);
    }

    #[test]
    fn rootless_graph() {
        let mut sink = JsonSink::new();
        assert!(print(&Graph::new(), &mut sink).is_err());
    }
}
