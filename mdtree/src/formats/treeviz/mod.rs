//! Treeviz formatter for Document Trees
//!
//! A visual outline of the tree, one node per line:
//!
//! <prefix><connector> <icon> <label> (truncated to 30 characters)
//!
//! Example:
//!
//! ⧉ Document (3 nodes, 1 links)
//! ├─ § h1
//! │ └─ ◦ "Title"
//! ├─ ☰ 2 items
//! │ ├─ • item
//! │ │ └─ ¶ paragraph
//! │ │   └─ ◦ "first" [b]
//! │ └─ • item
//! │   └─ ¶ paragraph
//! │     └─ ◦ "second"
//! └─ ▦ table 2x2

use super::icons::get_icon;
use crate::common::table::visible_props;
use crate::error::FormatError;
use crate::format::Format;
use crate::tree::{Document, Element, ElementKind, Leaf, Node};
use std::collections::HashMap;

const MAX_LABEL: usize = 30;

fn truncate(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL {
        return label.to_string();
    }
    let head: String = label.chars().take(MAX_LABEL - 1).collect();
    format!("{head}…")
}

fn leaf_label(leaf: &Leaf) -> String {
    let text = leaf.text.replace('\n', "↵");
    let mut marks = Vec::new();
    if leaf.bold {
        marks.push("b");
    }
    if leaf.italic {
        marks.push("i");
    }
    if leaf.strikethrough {
        marks.push("s");
    }
    if leaf.code {
        marks.push("code");
    }
    if leaf.url.is_some() {
        marks.push("link");
    }
    if leaf.high_color.is_some() {
        marks.push("color");
    }
    if leaf.identifier.is_some() {
        marks.push("fn");
    }
    if leaf.tag {
        marks.push("tag");
    }
    let quoted = truncate(&format!("\"{text}\""));
    if marks.is_empty() {
        quoted
    } else {
        format!("{quoted} [{}]", marks.join(","))
    }
}

fn element_label(element: &Element) -> String {
    let label = match &element.kind {
        ElementKind::Heading { level } => format!("h{level}"),
        ElementKind::List { order, task, .. } => {
            let count = element.children.len();
            let noun = if count == 1 { "item" } else { "items" };
            match (order, task) {
                (_, true) => format!("{count} task {noun}"),
                (true, false) => format!("{count} ordered {noun}"),
                (false, false) => format!("{count} {noun}"),
            }
        }
        ElementKind::ListItem { checked, .. } => match checked {
            Some(true) => "item [x]".to_string(),
            Some(false) => "item [ ]".to_string(),
            None => "item".to_string(),
        },
        ElementKind::Code {
            language,
            value,
            frontmatter,
            is_config,
            raw_html,
        } => {
            let what = if *frontmatter {
                "frontmatter".to_string()
            } else if *is_config {
                "config comment".to_string()
            } else if *raw_html {
                "raw html".to_string()
            } else {
                language.clone().unwrap_or_else(|| "code".to_string())
            };
            format!("{what} ({} lines)", value.lines().count())
        }
        ElementKind::Schema { language, .. } => format!("schema {language}"),
        ElementKind::KatexBlock { value } => value.clone(),
        ElementKind::Table | ElementKind::Chart => {
            let cols = element
                .children
                .first()
                .and_then(Node::as_element)
                .map(|row| row.children.len())
                .unwrap_or(0);
            format!(
                "{} {}x{cols}",
                element.kind.type_name(),
                element.children.len()
            )
        }
        ElementKind::TableRow { rows } => format!("row {rows}"),
        ElementKind::TableCell {
            rows, cols, hidden, ..
        } => {
            if *hidden {
                format!("cell {rows}:{cols} (hidden)")
            } else {
                format!("cell {rows}:{cols}")
            }
        }
        ElementKind::Media(media) => format!("{} {}", media.media_type, media.url),
        ElementKind::Attach { name, .. } => name.clone(),
        ElementKind::LinkCard { name, .. } => name.clone(),
        ElementKind::FootnoteDefinition { identifier, .. } => format!("[^{identifier}]"),
        kind => kind.type_name().to_string(),
    };
    truncate(&label)
}

fn format_node(node: &Node, prefix: &str, is_last: bool, show_props: bool, out: &mut String) {
    let connector = if is_last { "└─" } else { "├─" };
    let (icon, label) = match node {
        Node::Leaf(leaf) => (get_icon("leaf"), leaf_label(leaf)),
        Node::Element(element) => (get_icon(element.kind.type_name()), element_label(element)),
    };
    out.push_str(&format!("{prefix}{connector} {icon} {label}\n"));

    let Node::Element(element) = node else {
        return;
    };
    let child_prefix = format!("{prefix}{}", if is_last { "  " } else { "│ " });

    let props = show_props
        .then(|| visible_props(element.other_props.as_ref()))
        .flatten();
    if let Some(props) = &props {
        let connector = if element.children.is_empty() {
            "└─"
        } else {
            "├─"
        };
        let keys: Vec<&str> = props.keys().map(String::as_str).collect();
        out.push_str(&format!(
            "{child_prefix}{connector} {} {}\n",
            get_icon("props"),
            truncate(&keys.join(", "))
        ));
    }

    format_children(&element.children, &child_prefix, show_props, out);
}

fn format_children(children: &[Node], prefix: &str, show_props: bool, out: &mut String) {
    let count = children.len();
    for (index, child) in children.iter().enumerate() {
        format_node(child, prefix, index + 1 == count, show_props, out);
    }
}

pub fn to_treeviz_str(doc: &Document) -> String {
    to_treeviz_str_with_params(doc, &HashMap::new())
}

/// Convert a document to a treeviz string with optional parameters
///
/// # Parameters
///
/// - `"props"`: when `"true"`, lists the configuration keys carried in `otherProps` (without
///   the derived `columns`/`dataSource` projection) as a synthetic child line.
pub fn to_treeviz_str_with_params(doc: &Document, params: &HashMap<String, String>) -> String {
    let show_props = params
        .get("props")
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false);

    let mut out = format!(
        "{} Document ({} nodes, {} links)\n",
        get_icon("document"),
        doc.nodes.len(),
        doc.links.len()
    );
    format_children(&doc.nodes, "", show_props, &mut out);
    out
}

/// Format implementation for treeviz format
pub struct TreevizFormat;

impl Format for TreevizFormat {
    fn name(&self) -> &str {
        "treeviz"
    }

    fn description(&self) -> &str {
        "Visual tree representation with indentation and Unicode icons"
    }

    fn file_extensions(&self) -> &[&str] {
        &["tree", "treeviz"]
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        Ok(to_treeviz_str(doc))
    }

    fn serialize_with_options(
        &self,
        doc: &Document,
        options: &HashMap<String, String>,
    ) -> Result<String, FormatError> {
        if let Some(key) = options.keys().find(|key| key.as_str() != "props") {
            return Err(FormatError::NotSupported(format!(
                "Format 'treeviz' has no parameter '{key}'"
            )));
        }
        Ok(to_treeviz_str_with_params(doc, options))
    }
}
