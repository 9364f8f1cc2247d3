//! Bidirectional conversion between Markdown and an editable document tree
//!
//!     This crate turns Markdown text into the Document Tree an editor operates on, and turns
//!     such a tree back into stable, diffable Markdown. Both directions are synchronous, pure
//!     and re-entrant: every call allocates its own traversal state, so independent documents
//!     can be converted in parallel.
//!
//!     This is a pure lib, that is, it powers the mdtree cli but is shell agnostic: no code here
//!     prints, reads env vars or touches files. Diagnostics go through the `log` facade.
//!
//! Architecture
//!
//!     raw text → preprocess → comrak → forward converter (± plugins, ± table engine)
//!              → Document Tree → reverse converter (± plugins, ± table engine) → Markdown
//!
//!     The file structure:
//!     .
//!     ├── error.rs
//!     ├── format.rs               # Format trait definition
//!     ├── registry.rs             # FormatRegistry for discovery and selection
//!     ├── options.rs              # ConvertOptions, the tunable constants
//!     ├── plugin.rs               # Parse and serialize rule hooks
//!     ├── tree                    # The Document Tree data model
//!     ├── common                  # Format agnostic helpers (html, json, width, tables, languages)
//!     └── formats
//!         ├── markdown
//!         │   ├── preprocess.rs   # Text level normalization passes
//!         │   ├── parser.rs       # Forward converter (block level)
//!         │   ├── inline.rs       # Forward converter (inline runs)
//!         │   └── serializer.rs   # Reverse converter
//!         ├── json                # The tree as JSON
//!         └── treeviz             # Human readable outline
//!
//! Testing
//!
//!     tests
//!     ├── lib.rs
//!     ├── preprocess.rs
//!     └── markdown
//!         ├── import.rs
//!         ├── export.rs
//!         ├── table.rs
//!         ├── roundtrip.rs
//!         └── plugins.rs
//!
//!     Rust does not discover tests in subdirectories by default, so they are included from
//!     tests/lib.rs.
//!
//! Infallibility
//!
//!     Conversion never fails. Malformed configuration comments, ragged tables, unknown code
//!     languages and undecodable URLs all degrade to a best effort value. The only errors in
//!     this crate belong to the format registry surface (unknown format, invalid JSON tree).

pub mod common;
pub mod error;
pub mod format;
pub mod formats;
pub mod options;
pub mod plugin;
pub mod registry;
pub mod tree;

pub use error::FormatError;
pub use format::Format;
pub use formats::markdown::parser::{parse_markdown, ParseContext};
pub use formats::markdown::preprocess::{
    extract_tagged_blocks, normalize_spacing, normalize_table_newlines, preprocess,
    strip_custom_tags,
};
pub use formats::markdown::serializer::{to_markdown, SerializeContext};
pub use options::ConvertOptions;
pub use plugin::{ParseRule, PluginSet, SerializeRule};
pub use registry::FormatRegistry;
pub use tree::{Align, Document, Element, ElementKind, Leaf, LinkRecord, Media, Mention, Node};

/// Convert Markdown to a Document Tree with default options and no plugins.
pub fn markdown_to_tree(text: &str) -> Document {
    parse_markdown(text, &PluginSet::default(), &ConvertOptions::default())
}

/// Convert a Document Tree back to Markdown with default options and no plugins.
pub fn tree_to_markdown(nodes: &[Node]) -> String {
    to_markdown(
        nodes,
        "",
        &[],
        &PluginSet::default(),
        &ConvertOptions::default(),
    )
}
