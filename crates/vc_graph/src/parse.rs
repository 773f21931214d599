use crate::error::{ErrorKind, Result};
use crate::model::{Graph, GraphNode, NodeBody, NodeIndex, Primitive, keys};
use crate::token::{Token, TokenSource, require};

/// Builds a [`Graph`] from one document.
///
/// Meta members are recognized anywhere in an object: `@type` becomes the
/// node's tag, `@id` registers the node, `@ref` turns the object into a
/// reference and `@items` / `@keys` carry array and map bodies. Ids are
/// registered in document order; references are not followed here.
///
/// # Errors
///
/// [`ErrorKind::MalformedInput`] for an unexpected token or inconsistent meta
/// members, [`ErrorKind::DuplicateIdentity`] for an id declared twice and
/// [`ErrorKind::GraphTooDeep`] when nesting exceeds `max_depth`.
///
/// ```
/// use vc_graph::json::JsonSource;
/// use vc_graph::{NodeBody, parse};
///
/// let mut source: JsonSource = r#"{"a":{"@id":1,"x":2},"b":{"@ref":1}}"#.parse().unwrap();
/// let graph = parse(&mut source, 64).unwrap();
///
/// let root = graph.view(graph.root().unwrap());
/// assert_eq!(root.member("a").unwrap().id(), Some(1));
/// assert_eq!(root.member("b").unwrap().reference(), Some(1));
/// assert!(graph.dangling_references().is_empty());
/// ```
pub fn parse(source: &mut dyn TokenSource, max_depth: usize) -> Result<Graph> {
    let mut parser = Parser {
        source,
        graph: Graph::new(),
        max_depth,
    };
    let Some(first) = parser.source.next_token()? else {
        return Err(ErrorKind::malformed("empty input").into());
    };
    let root = parser.value(first, 1)?;
    if let Some(token) = parser.source.next_token()? {
        return Err(ErrorKind::malformed(format!("trailing {token:?} after the root value")).into());
    }
    parser.graph.set_root(root);
    log::trace!("parsed {} nodes", parser.graph.len());
    Ok(parser.graph)
}

struct Parser<'s> {
    source: &'s mut dyn TokenSource,
    graph: Graph,
    max_depth: usize,
}

/// Meta members collected while reading an object.
#[derive(Default)]
struct Meta {
    tag: Option<String>,
    id: Option<u64>,
    reference: Option<u64>,
    items: Option<Vec<NodeIndex>>,
    keys: Option<Vec<NodeIndex>>,
}

impl Parser<'_> {
    fn next(&mut self) -> Result<Token> {
        require(self.source.next_token()?)
    }

    fn enter(&self, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            return Err(ErrorKind::GraphTooDeep {
                limit: self.max_depth,
            }
            .into());
        }
        Ok(())
    }

    fn value(&mut self, token: Token, depth: usize) -> Result<NodeIndex> {
        let primitive = match token {
            Token::Null => Primitive::Null,
            Token::Bool(value) => Primitive::Bool(value),
            Token::I64(value) => Primitive::Int(value),
            Token::U64(value) => Primitive::UInt(value),
            Token::F64(value) => Primitive::Float(value),
            Token::Str(value) => Primitive::Str(value),
            Token::BeginArray => {
                self.enter(depth)?;
                let items = self.items(depth)?;
                return Ok(self.graph.push(GraphNode::new(NodeBody::Array(items))));
            }
            Token::BeginObject => {
                self.enter(depth)?;
                return self.object(depth);
            }
            other => {
                return Err(ErrorKind::malformed(format!("unexpected {other:?}")).into());
            }
        };
        Ok(self.graph.push(GraphNode::primitive(primitive)))
    }

    /// Elements up to the closing bracket. The opening one is consumed.
    fn items(&mut self, depth: usize) -> Result<Vec<NodeIndex>> {
        let mut items = Vec::new();
        loop {
            match self.next()? {
                Token::EndArray => return Ok(items),
                token => items.push(self.value(token, depth + 1)?),
            }
        }
    }

    fn array_member(&mut self, key: &str, depth: usize) -> Result<Vec<NodeIndex>> {
        match self.next()? {
            Token::BeginArray => self.items(depth),
            other => Err(ErrorKind::malformed(format!("`{key}` must be an array, found {other:?}")).into()),
        }
    }

    fn id_member(&mut self, key: &str) -> Result<u64> {
        match self.next()? {
            Token::U64(id) => Ok(id),
            Token::I64(id) => u64::try_from(id)
                .map_err(|_| ErrorKind::malformed(format!("`{key}` must not be negative")).into()),
            other => Err(ErrorKind::malformed(format!("`{key}` must be an integer, found {other:?}")).into()),
        }
    }

    fn object(&mut self, depth: usize) -> Result<NodeIndex> {
        let mut meta = Meta::default();
        let mut members = Vec::new();
        loop {
            let key = match self.next()? {
                Token::EndObject => break,
                Token::Key(key) => key,
                other => {
                    return Err(ErrorKind::malformed(format!("expected a member name, found {other:?}")).into());
                }
            };
            match key.as_str() {
                keys::TYPE => match self.next()? {
                    Token::Str(tag) => meta.tag = Some(tag),
                    other => {
                        return Err(ErrorKind::malformed(format!("`@type` must be a string, found {other:?}")).into());
                    }
                },
                keys::ID => meta.id = Some(self.id_member(keys::ID)?),
                keys::REF => meta.reference = Some(self.id_member(keys::REF)?),
                keys::ITEMS => meta.items = Some(self.array_member(keys::ITEMS, depth + 1)?),
                keys::KEYS => meta.keys = Some(self.array_member(keys::KEYS, depth + 1)?),
                _ => {
                    let token = self.next()?;
                    let child = self.value(token, depth + 1)?;
                    members.push((key, child));
                }
            }
        }
        self.finish_object(meta, members)
    }

    fn finish_object(&mut self, meta: Meta, members: Vec<(String, NodeIndex)>) -> Result<NodeIndex> {
        if let Some(id) = meta.reference {
            if meta.id.is_some() || meta.items.is_some() || meta.keys.is_some() || !members.is_empty() {
                return Err(ErrorKind::malformed(format!("reference to {id} carries content")).into());
            }
            return Ok(self.graph.push(GraphNode::reference(id)));
        }

        let body = match (meta.keys, meta.items) {
            (Some(keys), Some(items)) if keys.len() == items.len() && members.is_empty() => {
                NodeBody::Entries(keys.into_iter().zip(items).collect())
            }
            (Some(_), _) => {
                return Err(ErrorKind::malformed("`@keys` needs `@items` of the same length and no other members").into());
            }
            (None, Some(items)) if members.is_empty() => NodeBody::Array(items),
            (None, Some(_)) => {
                return Err(ErrorKind::malformed("`@items` cannot be mixed with other members").into());
            }
            (None, None) => NodeBody::Members(members),
        };

        let index = self.graph.push(GraphNode {
            type_tag: meta.tag,
            id: None,
            body,
        });
        if let Some(id) = meta.id {
            self.graph.register_id(id, index)?;
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::parse;
    use crate::error::ErrorKind;
    use crate::json::JsonSource;
    use crate::model::{Graph, NodeBody, Primitive};
    use crate::token::{Token, TokenBuffer};

    fn parse_json(text: &str, max_depth: usize) -> crate::error::Result<Graph> {
        let mut source: JsonSource = text.parse()?;
        parse(&mut source, max_depth)
    }

    #[test]
    fn meta_members() {
        let graph = parse_json(
            r#"{"@type":"Scene","@id":3,"items":{"@items":[1,2]},"lookup":{"@keys":[1],"@items":["one"]}}"#,
            16,
        )
        .unwrap();
        let root = graph.view(graph.root().unwrap());
        assert_eq!(root.type_tag(), Some("Scene"));
        assert_eq!(root.id(), Some(3));
        assert_eq!(graph.lookup(3), Some(root.index()));
        assert_eq!(root.member("items").unwrap().items().count(), 2);

        let lookup = root.member("lookup").unwrap();
        let (key, value) = lookup.entries().next().unwrap();
        assert_eq!(key.primitive(), Some(&Primitive::Int(1)));
        assert_eq!(value.primitive(), Some(&Primitive::Str("one".into())));
    }

    #[test]
    fn forward_references_are_kept() {
        let graph = parse_json(r#"[{"@ref":2},{"@id":2,"v":null}]"#, 16).unwrap();
        let root = graph.view(graph.root().unwrap());
        let first = root.items().next().unwrap();
        assert_eq!(first.reference(), Some(2));
        assert!(matches!(first.resolve().node().body, NodeBody::Members(_)));
    }

    #[test]
    fn malformed_documents() {
        for text in [
            r#"{"@ref":1,"x":2}"#,
            r#"{"@id":-1}"#,
            r#"{"@id":"1"}"#,
            r#"{"@type":5}"#,
            r#"{"@keys":[1,2],"@items":[1]}"#,
            r#"{"@items":[1],"x":1}"#,
            r#"{"@items":1}"#,
        ] {
            let err = parse_json(text, 16).unwrap_err();
            assert!(matches!(err.kind, ErrorKind::MalformedInput { .. }), "{text}: {err}");
        }

        let err = parse_json(r#"[{"@id":1},{"@id":1}]"#, 16).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::DuplicateIdentity { id: 1 }));
    }

    #[test]
    fn token_stream_errors() {
        let mut empty = TokenBuffer::new();
        let err = parse(&mut empty, 16).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MalformedInput { .. }));

        let mut trailing: TokenBuffer = [Token::Null, Token::Null].into_iter().collect();
        assert!(parse(&mut trailing, 16).is_err());

        let mut truncated: TokenBuffer = [Token::BeginArray, Token::I64(1)].into_iter().collect();
        assert!(parse(&mut truncated, 16).is_err());
    }

    #[test]
    fn depth_limit() {
        assert!(parse_json("[[[1]]]", 3).is_ok());
        let err = parse_json("[[[[1]]]]", 3).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::GraphTooDeep { limit: 3 }));
    }
}
