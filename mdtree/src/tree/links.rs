//! Hyperlink index over a Document Tree.
//!
//! Editors use the flat list to jump between links without walking the tree. A record is
//! produced for every leaf carrying a `url` and for every link card, in document order.

use super::nodes::{ElementKind, LinkRecord, Node};

/// Collect `{path, target}` records for every hyperlink in `nodes`.
///
/// # Example
///
/// ```ignore
/// let doc = mdtree::markdown_to_tree("see [docs](https://example.com)");
/// assert_eq!(doc.links[0].path, vec![0, 1]);
/// ```
pub fn collect_links(nodes: &[Node]) -> Vec<LinkRecord> {
    let mut links = Vec::new();
    let mut path = Vec::new();
    for (index, node) in nodes.iter().enumerate() {
        path.push(index);
        walk(node, &mut path, &mut links);
        path.pop();
    }
    links
}

fn walk(node: &Node, path: &mut Vec<usize>, links: &mut Vec<LinkRecord>) {
    match node {
        Node::Leaf(leaf) => {
            if let Some(url) = leaf.url.as_ref().filter(|url| !url.is_empty()) {
                links.push(LinkRecord {
                    path: path.clone(),
                    target: url.clone(),
                });
            }
        }
        Node::Element(element) => {
            if let ElementKind::LinkCard { url, .. } = &element.kind {
                links.push(LinkRecord {
                    path: path.clone(),
                    target: url.clone(),
                });
                return;
            }
            for (index, child) in element.children.iter().enumerate() {
                path.push(index);
                walk(child, path, links);
                path.pop();
            }
        }
    }
}
