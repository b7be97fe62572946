use std::ops::ControlFlow;

use crate::tree::{Node, NodeKind};

/// Children the traversal descends into, in source order.
///
/// Only the shapes that can carry a declaration we look for are opened up:
/// the program body, import specifiers, the declaration wrapped by an export,
/// expression statements, call arguments, array elements and the right-hand
/// side of assignments. Everything else is a leaf.
pub fn walk_children(node: &Node) -> Vec<&Node> {
    match &node.kind {
        NodeKind::Program { body } => body.iter().collect(),
        NodeKind::ImportDeclaration { specifiers, .. } => specifiers.iter().collect(),
        NodeKind::ExportNamedDeclaration { declaration, .. } => {
            declaration.as_deref().into_iter().collect()
        }
        NodeKind::ExportDefaultDeclaration { declaration } => vec![declaration.as_ref()],
        NodeKind::ExpressionStatement { expression } => vec![expression.as_ref()],
        NodeKind::CallExpression { arguments, .. } => arguments.iter().collect(),
        NodeKind::ArrayExpression { elements } => elements.iter().collect(),
        NodeKind::AssignmentExpression { right, .. } => vec![right.as_ref()],
        _ => Vec::new(),
    }
}

/// Pre-order, depth-first walk from `root`.
///
/// `visit` sees every node before its children. Returning
/// `ControlFlow::Break(())` ends the whole walk and hands back the node that
/// stopped it; a walk that runs to completion yields `None`.
pub fn traverse<'n, F>(root: &'n Node, visit: &mut F) -> Option<&'n Node>
where
    F: FnMut(&'n Node) -> ControlFlow<()>,
{
    if visit(root).is_break() {
        return Some(root);
    }
    for child in walk_children(root) {
        if let Some(stopped) = traverse(child, visit) {
            return Some(stopped);
        }
    }
    None
}
