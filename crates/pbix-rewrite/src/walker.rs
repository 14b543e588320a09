//! Generic traversal over the heterogeneous layout tree.
//!
//! The walker is purely structural: it visits every object, array, and
//! scalar in depth-first pre-order, tracking the path from the root, and
//! knows nothing about bindings or field references. That ignorance is what
//! lets the rest of the system tolerate visual types it has never seen.
//!
//! Traversal order is deterministic — object keys in stored order, array
//! elements in index order — so repeated runs over unchanged input produce
//! identical visitation sequences.

use pbix_model::{NodePath, PathSegment};
use serde_json::Value;

/// What the visitor wants done with the node it was just shown.
#[derive(Debug)]
pub enum VisitAction {
    /// Keep the node as-is and descend into its children.
    Keep,
    /// Substitute `node` in place of the current node. The walker descends
    /// into the replacement's children only when `descend` is set; skipping
    /// them is the default the engine relies on for termination, since a
    /// replacement may be structurally similar to what it replaced.
    Replace { node: Value, descend: bool },
}

/// Walk `tree` mutably, calling `visitor` for every node exactly once.
pub fn walk<F>(tree: &mut Value, visitor: &mut F)
where
    F: FnMut(&Value, &NodePath) -> VisitAction,
{
    let mut path = NodePath::root();
    walk_node(tree, &mut path, visitor);
}

fn walk_node<F>(node: &mut Value, path: &mut NodePath, visitor: &mut F)
where
    F: FnMut(&Value, &NodePath) -> VisitAction,
{
    match visitor(node, path) {
        VisitAction::Keep => {}
        VisitAction::Replace {
            node: replacement,
            descend,
        } => {
            *node = replacement;
            if !descend {
                return;
            }
        }
    }
    match node {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                path.push(PathSegment::Key(key.clone()));
                walk_node(child, path, visitor);
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter_mut().enumerate() {
                path.push(PathSegment::Index(index));
                walk_node(child, path, visitor);
                path.pop();
            }
        }
        _ => {}
    }
}

/// Read-only walk. The visitor returns whether to descend into the node's
/// children, which lets callers treat a consumed subtree as a single unit.
pub fn walk_ref<F>(tree: &Value, visitor: &mut F)
where
    F: FnMut(&Value, &NodePath) -> bool,
{
    let mut path = NodePath::root();
    walk_ref_node(tree, &mut path, visitor);
}

fn walk_ref_node<F>(node: &Value, path: &mut NodePath, visitor: &mut F)
where
    F: FnMut(&Value, &NodePath) -> bool,
{
    if !visitor(node, path) {
        return;
    }
    match node {
        Value::Object(map) => {
            for (key, child) in map {
                path.push(PathSegment::Key(key.clone()));
                walk_ref_node(child, path, visitor);
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                path.push(PathSegment::Index(index));
                walk_ref_node(child, path, visitor);
                path.pop();
            }
        }
        _ => {}
    }
}
