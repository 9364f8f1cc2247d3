//! JSON format: the Document Tree in its serde shape
//!
//! Serialization writes `{"tree": [...], "links": [...]}`. Parsing accepts that object or a
//! bare array of nodes; link records are recomputed when absent.

use crate::error::FormatError;
use crate::format::Format;
use crate::tree::{collect_links, Document, Node};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonInput {
    Document(Document),
    Nodes(Vec<Node>),
}

/// Parse a JSON Document Tree.
pub fn parse_json(source: &str) -> Result<Document, FormatError> {
    let mut doc = match serde_json::from_str::<JsonInput>(source)? {
        JsonInput::Document(doc) => doc,
        JsonInput::Nodes(nodes) => Document {
            nodes,
            links: Vec::new(),
        },
    };
    if doc.links.is_empty() {
        doc.links = collect_links(&doc.nodes);
    }
    Ok(doc)
}

/// Format implementation for JSON trees
pub struct JsonFormat;

impl Format for JsonFormat {
    fn name(&self) -> &str {
        "json"
    }

    fn description(&self) -> &str {
        "Document Tree as JSON"
    }

    fn file_extensions(&self) -> &[&str] {
        &["json"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Document, FormatError> {
        parse_json(source)
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        Ok(serde_json::to_string_pretty(doc)?)
    }

    /// `compact=true` writes the tree on a single line.
    fn serialize_with_options(
        &self,
        doc: &Document,
        options: &HashMap<String, String>,
    ) -> Result<String, FormatError> {
        if let Some(key) = options.keys().find(|key| key.as_str() != "compact") {
            return Err(FormatError::NotSupported(format!(
                "Format 'json' has no parameter '{key}'"
            )));
        }
        let compact = options
            .get("compact")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        if compact {
            Ok(serde_json::to_string(doc)?)
        } else {
            self.serialize(doc)
        }
    }
}
