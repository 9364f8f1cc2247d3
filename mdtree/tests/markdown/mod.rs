//! Markdown format tests
//!
//! Tests for bidirectional Markdown ↔ Document Tree conversion.

mod export;
mod import;
mod plugins;
mod roundtrip;
mod table;

use mdtree::{ElementKind, Leaf, Node};

/// The element kinds of `nodes`, leaves reported as `None`.
pub fn kinds(nodes: &[Node]) -> Vec<Option<&ElementKind>> {
    nodes.iter().map(Node::kind).collect()
}

/// The leaves directly under the element at `nodes[index]`.
pub fn leaves(nodes: &[Node], index: usize) -> Vec<&Leaf> {
    nodes[index]
        .as_element()
        .expect("element")
        .children
        .iter()
        .filter_map(Node::as_leaf)
        .collect()
}
