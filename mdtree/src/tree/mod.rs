//! The Document Tree
//!
//! A forest of structural [`Element`]s and inline [`Leaf`] runs. The JSON shape produced by
//! serde is the interchange format editors consume.

mod links;
mod nodes;

pub use links::collect_links;
pub use nodes::{Align, Document, Element, ElementKind, Leaf, LinkRecord, Media, Mention, Node};
