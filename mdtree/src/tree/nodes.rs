//! Core data structures of the Document Tree.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A node of the Document Tree: either a structural element or an inline leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Element(Element),
    Leaf(Leaf),
}

/// A structural node. Its `children` are never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(flatten)]
    pub kind: ElementKind,
    pub children: Vec<Node>,
    /// Sidecar configuration recovered from a preceding `<!--{...}-->` comment.
    #[serde(rename = "otherProps", default, skip_serializing_if = "Option::is_none")]
    pub other_props: Option<Map<String, Value>>,
}

/// The closed set of structural node kinds with their type-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ElementKind {
    Paragraph,
    Heading {
        level: u8,
    },
    Blockquote,
    List {
        order: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<u64>,
        #[serde(default, skip_serializing_if = "is_false")]
        task: bool,
    },
    ListItem {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checked: Option<bool>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        mentions: Vec<Mention>,
    },
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        value: String,
        #[serde(default, skip_serializing_if = "is_false")]
        frontmatter: bool,
        #[serde(default, skip_serializing_if = "is_false")]
        is_config: bool,
        /// Raw HTML kept verbatim; emitted without a fence.
        #[serde(default, skip_serializing_if = "is_false")]
        raw_html: bool,
    },
    /// A structured configuration block decoded from a schema-like code fence.
    Schema {
        language: String,
        value: Value,
    },
    KatexBlock {
        value: String,
    },
    InlineKatex,
    Table,
    TableRow {
        rows: usize,
    },
    TableCell {
        rows: usize,
        cols: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        align: Option<Align>,
        #[serde(default, skip_serializing_if = "is_false")]
        title: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        row_span: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        col_span: Option<usize>,
        #[serde(default, skip_serializing_if = "is_false")]
        hidden: bool,
    },
    Chart,
    ColumnGroup,
    ColumnCell,
    Description,
    Media(Media),
    Attach {
        url: String,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<String>,
    },
    LinkCard {
        url: String,
        name: String,
    },
    FootnoteDefinition {
        identifier: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        url: String,
        value: String,
    },
    Hr,
    Break,
}

/// Column or cell alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
}

/// A mention recovered from a list item that starts with a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub avatar: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// An image, video, audio clip or embedded frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub url: String,
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub controls: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub autoplay: bool,
    #[serde(rename = "loop", default, skip_serializing_if = "is_false")]
    pub looping: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub muted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
}

/// An inline run of text. Marks compose independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaf {
    pub text: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub code: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_color: Option<String>,
    /// Footnote reference identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub tag: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<String>,
}

/// Where a hyperlink leaf sits in the tree and what it points to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub path: Vec<usize>,
    pub target: String,
}

/// The result of a forward conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "tree")]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ElementKind {
    /// The serialized `type` tag of this kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            ElementKind::Paragraph => "paragraph",
            ElementKind::Heading { .. } => "heading",
            ElementKind::Blockquote => "blockquote",
            ElementKind::List { .. } => "list",
            ElementKind::ListItem { .. } => "list-item",
            ElementKind::Code { .. } => "code",
            ElementKind::Schema { .. } => "schema",
            ElementKind::KatexBlock { .. } => "katex-block",
            ElementKind::InlineKatex => "inline-katex",
            ElementKind::Table => "table",
            ElementKind::TableRow { .. } => "table-row",
            ElementKind::TableCell { .. } => "table-cell",
            ElementKind::Chart => "chart",
            ElementKind::ColumnGroup => "column-group",
            ElementKind::ColumnCell => "column-cell",
            ElementKind::Description => "description",
            ElementKind::Media(_) => "media",
            ElementKind::Attach { .. } => "attach",
            ElementKind::LinkCard { .. } => "link-card",
            ElementKind::FootnoteDefinition { .. } => "footnote-definition",
            ElementKind::Hr => "hr",
            ElementKind::Break => "break",
        }
    }

    /// Kinds whose children are inline leaves rather than blocks.
    pub fn holds_inline(&self) -> bool {
        matches!(
            self,
            ElementKind::Paragraph
                | ElementKind::Heading { .. }
                | ElementKind::TableCell { .. }
                | ElementKind::ColumnCell
                | ElementKind::InlineKatex
                | ElementKind::FootnoteDefinition { .. }
        )
    }
}

impl Element {
    /// Create an element, filling empty children with the canonical empty content.
    pub fn new(kind: ElementKind, children: Vec<Node>) -> Self {
        let children = if children.is_empty() {
            if kind.holds_inline() || is_void(&kind) {
                vec![Node::Leaf(Leaf::default())]
            } else {
                vec![Node::Element(Element::empty_paragraph())]
            }
        } else {
            children
        };
        Self {
            kind,
            children,
            other_props: None,
        }
    }

    /// A void element (media, code, hr...) whose only child is an empty leaf.
    pub fn void(kind: ElementKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn empty_paragraph() -> Self {
        Self::new(ElementKind::Paragraph, vec![Node::Leaf(Leaf::default())])
    }

    pub fn with_props(mut self, props: Option<Map<String, Value>>) -> Self {
        self.other_props = props;
        self
    }

    /// True for a paragraph whose leaves carry no text.
    pub fn is_empty_paragraph(&self) -> bool {
        matches!(self.kind, ElementKind::Paragraph)
            && self.children.iter().all(|child| match child {
                Node::Leaf(leaf) => leaf.text.is_empty() && leaf.identifier.is_none(),
                Node::Element(_) => false,
            })
    }
}

fn is_void(kind: &ElementKind) -> bool {
    matches!(
        kind,
        ElementKind::Code { .. }
            | ElementKind::Schema { .. }
            | ElementKind::KatexBlock { .. }
            | ElementKind::Media(_)
            | ElementKind::Attach { .. }
            | ElementKind::LinkCard { .. }
            | ElementKind::Hr
            | ElementKind::Break
    )
}

impl Leaf {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Number of the boolean emphasis marks set on this leaf.
    pub fn mark_count(&self) -> usize {
        [self.bold, self.italic, self.strikethrough, self.code]
            .iter()
            .filter(|set| **set)
            .count()
    }
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Leaf(Leaf::new(text))
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Node::Element(Element::new(ElementKind::Paragraph, children))
    }

    pub fn element(kind: ElementKind, children: Vec<Node>) -> Self {
        Node::Element(Element::new(kind, children))
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            Node::Element(_) => None,
        }
    }

    pub fn kind(&self) -> Option<&ElementKind> {
        self.as_element().map(|element| &element.kind)
    }

    pub fn other_props(&self) -> Option<&Map<String, Value>> {
        self.as_element()
            .and_then(|element| element.other_props.as_ref())
    }

    /// Concatenated text of every leaf below this node.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(node: &Node, out: &mut String) {
    match node {
        Node::Leaf(leaf) => out.push_str(&leaf.text),
        Node::Element(element) => {
            for child in &element.children {
                collect_text(child, out);
            }
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<Leaf> for Node {
    fn from(leaf: Leaf) -> Self {
        Node::Leaf(leaf)
    }
}
