//! Query Module for the styles injector
//!
//! Attribute-path search over a [`Node`] graph, built on [`traverse`].

use std::ops::ControlFlow;

use serde_json::Value;

use crate::tree::{Attr, Node};
use crate::visitor::traverse;

/// A dot-separated attribute path such as `id.name` or `imported.name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrPath {
    segments: Vec<String>,
}

impl AttrPath {
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path.split('.').map(str::to_string).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Read the value at this path. A missing value at any segment yields
    /// `None`, which never matches.
    pub fn resolve(&self, node: &Node) -> Option<Value> {
        let mut current = Attr::Node(node);
        for segment in &self.segments {
            current = current.get(segment)?;
        }
        Some(current.into_value())
    }
}

/// Every node tagged `tag` whose attributes at each path deep-equal the
/// expected value, in traversal order.
pub fn search<'n>(root: &'n Node, tag: &str, attributes: &[(&str, Value)]) -> Vec<&'n Node> {
    let constraints: Vec<(AttrPath, &Value)> = attributes
        .iter()
        .map(|(path, expected)| (AttrPath::parse(path), expected))
        .collect();

    let mut results = Vec::new();
    traverse(root, &mut |node: &'n Node| {
        if node.tag() == tag && matches_all(node, &constraints) {
            results.push(node);
        }
        ControlFlow::Continue(())
    });
    results
}

fn matches_all(node: &Node, constraints: &[(AttrPath, &Value)]) -> bool {
    constraints.iter().all(|(path, expected)| {
        path.resolve(node)
            .is_some_and(|actual| are_equal(&actual, expected))
    })
}

/// Structural equality with JS-like primitive semantics.
///
/// Primitives are equal when they have the same kind and value (numbers are
/// compared numerically, so `1` equals `1.0`). Arrays and objects are equal
/// when they have the same length and every entry is recursively equal. Values
/// of different kinds are never equal.
pub fn are_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| are_equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, value)| y.get(key).is_some_and(|other| are_equal(value, other)))
        }
        _ => false,
    }
}
