//! Source Tree for the styles injector
//!
//! An owned, allocator-free view of one module's syntax. Only the node kinds
//! the query engine descends into (plus the identifiers and literals needed to
//! match on them) get a dedicated variant; everything else collapses into an
//! [`NodeKind::Other`] leaf that keeps its ESTree type name and span.
//!
//! Offsets are UTF-8 byte offsets into the module source, exactly as reported
//! by the parser, so they can be used directly to slice and splice `&str`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

impl From<oxc_span::Span> for Span {
    fn from(span: oxc_span::Span) -> Self {
        Self::new(span.start, span.end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

impl Identifier {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }

    fn to_value(&self) -> Value {
        json!({
            "type": "Identifier",
            "name": self.name,
            "start": self.span.start,
            "end": self.span.end,
        })
    }
}

/// A block comment or line comment, text without its delimiters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub span: Span,
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Program {
        body: Vec<Node>,
    },
    ImportDeclaration {
        source: Box<Node>,
        specifiers: Vec<Node>,
    },
    ImportSpecifier {
        imported: Identifier,
        local: Identifier,
    },
    ImportDefaultSpecifier {
        local: Identifier,
    },
    ImportNamespaceSpecifier {
        local: Identifier,
    },
    ExportNamedDeclaration {
        declaration: Option<Box<Node>>,
        source: Option<Box<Node>>,
    },
    ExportDefaultDeclaration {
        declaration: Box<Node>,
    },
    FunctionDeclaration {
        id: Option<Identifier>,
        /// Span of the `{ ... }` body, absent for overload signatures.
        body: Option<Span>,
        is_async: bool,
        generator: bool,
    },
    ExpressionStatement {
        expression: Box<Node>,
    },
    CallExpression {
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
    ArrayExpression {
        elements: Vec<Node>,
    },
    AssignmentExpression {
        operator: String,
        left: Box<Node>,
        right: Box<Node>,
    },
    Identifier {
        name: String,
    },
    Literal {
        value: Value,
    },
    /// Any other syntax: a traversal leaf carrying only its type name.
    Other {
        tag: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

/// One step of an attribute lookup: either still inside the typed node graph
/// or already inside plain data.
pub enum Attr<'n> {
    Node(&'n Node),
    Nodes(&'n [Node]),
    Value(Value),
}

impl<'n> Attr<'n> {
    pub fn into_value(self) -> Value {
        match self {
            Attr::Node(node) => node.to_value(),
            Attr::Nodes(nodes) => Value::Array(nodes.iter().map(Node::to_value).collect()),
            Attr::Value(value) => value,
        }
    }

    /// Resolve one path segment. `None` means the segment does not exist.
    pub fn get(self, segment: &str) -> Option<Attr<'n>> {
        match self {
            Attr::Node(node) => node.field(segment),
            Attr::Nodes(nodes) => segment
                .parse::<usize>()
                .ok()
                .and_then(|i| nodes.get(i))
                .map(Attr::Node),
            Attr::Value(Value::Object(map)) => map.get(segment).cloned().map(Attr::Value),
            Attr::Value(Value::Array(items)) => segment
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .map(Attr::Value),
            Attr::Value(_) => None,
        }
    }
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn other(tag: &str, span: Span) -> Self {
        Self::new(NodeKind::Other { tag: tag.to_string() }, span)
    }

    /// ESTree-style discriminant of the node.
    pub fn tag(&self) -> &str {
        match &self.kind {
            NodeKind::Program { .. } => "Program",
            NodeKind::ImportDeclaration { .. } => "ImportDeclaration",
            NodeKind::ImportSpecifier { .. } => "ImportSpecifier",
            NodeKind::ImportDefaultSpecifier { .. } => "ImportDefaultSpecifier",
            NodeKind::ImportNamespaceSpecifier { .. } => "ImportNamespaceSpecifier",
            NodeKind::ExportNamedDeclaration { .. } => "ExportNamedDeclaration",
            NodeKind::ExportDefaultDeclaration { .. } => "ExportDefaultDeclaration",
            NodeKind::FunctionDeclaration { .. } => "FunctionDeclaration",
            NodeKind::ExpressionStatement { .. } => "ExpressionStatement",
            NodeKind::CallExpression { .. } => "CallExpression",
            NodeKind::ArrayExpression { .. } => "ArrayExpression",
            NodeKind::AssignmentExpression { .. } => "AssignmentExpression",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::Literal { .. } => "Literal",
            NodeKind::Other { tag } => tag,
        }
    }

    /// Named field of this node, following ESTree field names.
    ///
    /// `type`, `start` and `end` exist on every node; the rest depend on the
    /// tag. Unknown fields resolve to `None` rather than `null` so a missing
    /// path never matches anything.
    pub fn field(&self, name: &str) -> Option<Attr<'_>> {
        match name {
            "type" => return Some(Attr::Value(Value::from(self.tag()))),
            "start" => return Some(Attr::Value(Value::from(self.span.start))),
            "end" => return Some(Attr::Value(Value::from(self.span.end))),
            _ => {}
        }

        match (&self.kind, name) {
            (NodeKind::Program { body }, "body") => Some(Attr::Nodes(body)),
            (NodeKind::Program { .. }, "sourceType") => Some(Attr::Value(json!("module"))),
            (NodeKind::ImportDeclaration { source, .. }, "source") => Some(Attr::Node(source)),
            (NodeKind::ImportDeclaration { specifiers, .. }, "specifiers") => {
                Some(Attr::Nodes(specifiers))
            }
            (NodeKind::ImportSpecifier { imported, .. }, "imported") => {
                Some(Attr::Value(imported.to_value()))
            }
            (NodeKind::ImportSpecifier { local, .. }, "local")
            | (NodeKind::ImportDefaultSpecifier { local }, "local")
            | (NodeKind::ImportNamespaceSpecifier { local }, "local") => {
                Some(Attr::Value(local.to_value()))
            }
            (NodeKind::ExportNamedDeclaration { declaration, .. }, "declaration") => Some(
                declaration
                    .as_deref()
                    .map_or(Attr::Value(Value::Null), Attr::Node),
            ),
            (NodeKind::ExportNamedDeclaration { source, .. }, "source") => Some(
                source
                    .as_deref()
                    .map_or(Attr::Value(Value::Null), Attr::Node),
            ),
            (NodeKind::ExportDefaultDeclaration { declaration }, "declaration") => {
                Some(Attr::Node(declaration))
            }
            (NodeKind::FunctionDeclaration { id, .. }, "id") => Some(Attr::Value(
                id.as_ref().map_or(Value::Null, Identifier::to_value),
            )),
            (NodeKind::FunctionDeclaration { body, .. }, "body") => {
                Some(Attr::Value(body.map_or(Value::Null, |span| {
                    json!({ "type": "BlockStatement", "start": span.start, "end": span.end })
                })))
            }
            (NodeKind::FunctionDeclaration { is_async, .. }, "async") => {
                Some(Attr::Value(Value::Bool(*is_async)))
            }
            (NodeKind::FunctionDeclaration { generator, .. }, "generator") => {
                Some(Attr::Value(Value::Bool(*generator)))
            }
            (NodeKind::ExpressionStatement { expression }, "expression") => {
                Some(Attr::Node(expression))
            }
            (NodeKind::CallExpression { callee, .. }, "callee") => Some(Attr::Node(callee)),
            (NodeKind::CallExpression { arguments, .. }, "arguments") => {
                Some(Attr::Nodes(arguments))
            }
            (NodeKind::ArrayExpression { elements }, "elements") => Some(Attr::Nodes(elements)),
            (NodeKind::AssignmentExpression { operator, .. }, "operator") => {
                Some(Attr::Value(Value::from(operator.as_str())))
            }
            (NodeKind::AssignmentExpression { left, .. }, "left") => Some(Attr::Node(left)),
            (NodeKind::AssignmentExpression { right, .. }, "right") => Some(Attr::Node(right)),
            (NodeKind::Identifier { name }, "name") => Some(Attr::Value(Value::from(name.as_str()))),
            (NodeKind::Literal { value }, "value") => Some(Attr::Value(value.clone())),
            _ => None,
        }
    }

    /// Plain-data rendering of the node and everything below it.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".into(), Value::from(self.tag()));
        map.insert("start".into(), Value::from(self.span.start));
        map.insert("end".into(), Value::from(self.span.end));

        let fields: &[&str] = match &self.kind {
            NodeKind::Program { .. } => &["body", "sourceType"],
            NodeKind::ImportDeclaration { .. } => &["specifiers", "source"],
            NodeKind::ImportSpecifier { .. } => &["imported", "local"],
            NodeKind::ImportDefaultSpecifier { .. } | NodeKind::ImportNamespaceSpecifier { .. } => {
                &["local"]
            }
            NodeKind::ExportNamedDeclaration { .. } => &["declaration", "source"],
            NodeKind::ExportDefaultDeclaration { .. } => &["declaration"],
            NodeKind::FunctionDeclaration { .. } => &["id", "async", "generator", "body"],
            NodeKind::ExpressionStatement { .. } => &["expression"],
            NodeKind::CallExpression { .. } => &["callee", "arguments"],
            NodeKind::ArrayExpression { .. } => &["elements"],
            NodeKind::AssignmentExpression { .. } => &["operator", "left", "right"],
            NodeKind::Identifier { .. } => &["name"],
            NodeKind::Literal { .. } => &["value"],
            NodeKind::Other { .. } => &[],
        };
        for name in fields {
            if let Some(attr) = self.field(name) {
                map.insert((*name).to_string(), attr.into_value());
            }
        }
        Value::Object(map)
    }
}

/// Parsed module: the root `Program` node plus its comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTree {
    pub root: Node,
    pub comments: Vec<Comment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_fn() -> Node {
        Node::new(
            NodeKind::FunctionDeclaration {
                id: Some(Identifier::new("_sfc_render", Span::new(9, 20))),
                body: Some(Span::new(30, 40)),
                is_async: false,
                generator: false,
            },
            Span::new(0, 40),
        )
    }

    #[test]
    fn test_field_lookup_through_identifier() {
        let node = render_fn();
        let name = node.field("id").and_then(|a| a.get("name")).map(Attr::into_value);
        assert_eq!(name, Some(json!("_sfc_render")));
        assert_eq!(
            node.field("body").and_then(|a| a.get("start")).map(Attr::into_value),
            Some(json!(30))
        );
    }

    #[test]
    fn test_unknown_field_is_none() {
        let node = render_fn();
        assert!(node.field("params").is_none());
        assert!(node.field("id").and_then(|a| a.get("missing")).is_none());
    }

    #[test]
    fn test_other_keeps_tag() {
        let node = Node::other("VariableDeclaration", Span::new(0, 10));
        assert_eq!(node.tag(), "VariableDeclaration");
        assert_eq!(node.to_value()["type"], json!("VariableDeclaration"));
    }

    #[test]
    fn test_nodes_indexed_by_position() {
        let program = Node::new(
            NodeKind::Program {
                body: vec![render_fn()],
            },
            Span::new(0, 40),
        );
        let tag = program
            .field("body")
            .and_then(|a| a.get("0"))
            .and_then(|a| a.get("type"))
            .map(Attr::into_value);
        assert_eq!(tag, Some(json!("FunctionDeclaration")));
        assert!(program.field("body").and_then(|a| a.get("1")).is_none());
    }
}
