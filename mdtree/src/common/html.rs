//! HTML fragment helpers
//!
//! Markdown carries raw HTML through untouched, so the forward converter needs to recognise a
//! handful of tags (media, download anchors, inline marks) and map simple container markup onto
//! the Document Tree. Fragments are parsed with html5ever into a small owned tree first, which
//! keeps everything downstream free of `Rc`/`RefCell` plumbing.

use crate::tree::{Element, ElementKind, Leaf, Media, Node};
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use once_cell::sync::Lazy;
use regex::Regex;

/// Standard HTML element names. Anything else is treated as a custom tag.
pub const STANDARD_TAGS: &[&str] = &[
    "a", "abbr", "address", "article", "aside", "audio", "b", "bdi", "bdo", "blockquote", "body",
    "br", "button", "caption", "center", "cite", "code", "col", "colgroup", "dd", "del", "details",
    "dfn", "div", "dl", "dt", "em", "embed", "fieldset", "figcaption", "figure", "font", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hr", "html", "i", "iframe",
    "img", "input", "ins", "kbd", "label", "legend", "li", "main", "mark", "nav", "ol", "option",
    "p", "picture", "pre", "q", "s", "section", "select", "small", "source", "span", "strike",
    "strong", "sub", "summary", "sup", "table", "tbody", "td", "textarea", "tfoot", "th", "thead",
    "tr", "u", "ul", "video",
];

/// Tags that only contribute marks to the text they wrap.
const MARK_TAGS: &[&str] = &[
    "b", "strong", "i", "em", "del", "s", "strike", "code", "kbd", "span", "font", "a", "sup",
    "sub", "u", "ins", "mark", "small",
];

/// Case-insensitive membership in [`STANDARD_TAGS`].
pub fn is_standard_tag(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    STANDARD_TAGS.contains(&name.as_str())
}

pub fn is_mark_tag(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    MARK_TAGS.contains(&name.as_str())
}

static TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<(/)?([A-Za-z][A-Za-z0-9-]*)((?:\s[^<>]*?)?)\s*(/)?>$").expect("valid tag regex")
});
static ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("valid attribute regex")
});
static STYLE_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|;)\s*color\s*:\s*([^;]+)").expect("valid color regex")
});
static COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^<!--(.*?)-->$").expect("valid comment regex"));
static BR_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:\s*<br\s*/?>\s*)+$").expect("valid br regex")
});
static MEDIA_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^<(img|video|iframe|audio)\b").expect("valid media regex")
});
static DOWNLOAD_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^<a\b[^>]*\bdownload\b[^>]*>.*</a>$").expect("valid anchor regex")
});

/// A single opening, closing or self-closing tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagToken {
    pub name: String,
    pub closing: bool,
    pub self_closing: bool,
    pub attrs: Vec<(String, String)>,
}

impl TagToken {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }
}

/// Parse a lone tag such as `<span style="color:red">` or `</b>`.
pub fn parse_tag(html: &str) -> Option<TagToken> {
    let caps = TAG.captures(html.trim())?;
    let name = caps.get(2)?.as_str().to_ascii_lowercase();
    let attrs = caps
        .get(3)
        .map(|raw| parse_attributes(raw.as_str()))
        .unwrap_or_default();
    Some(TagToken {
        self_closing: caps.get(4).is_some() || name == "br" || name == "hr" || name == "img",
        closing: caps.get(1).is_some(),
        name,
        attrs,
    })
}

/// Extract `name="value"` pairs; bare attributes get an empty value.
pub fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    ATTR.captures_iter(raw)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            Some((name, value))
        })
        .collect()
}

/// Body of an HTML comment, if `html` is exactly one comment.
pub fn comment_body(html: &str) -> Option<&str> {
    COMMENT
        .captures(html.trim())
        .and_then(|caps| caps.get(1))
        .map(|body| body.as_str())
}

/// Whether `html` consists only of `<br>` tags.
pub fn is_break_only(html: &str) -> bool {
    BR_ONLY.is_match(html.trim())
}

pub fn is_media_html(html: &str) -> bool {
    MEDIA_START.is_match(html.trim_start())
}

pub fn is_download_anchor(html: &str) -> bool {
    DOWNLOAD_ANCHOR.is_match(html.trim())
}

/// Colour declared by an inline `style` attribute.
pub fn style_color(style: &str) -> Option<String> {
    STYLE_COLOR
        .captures(style)
        .and_then(|caps| caps.get(1))
        .map(|color| color.as_str().trim().to_string())
        .filter(|color| !color.is_empty())
}

/// Inline marks accumulated from enclosing formatting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Marks {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub code: bool,
    pub url: Option<String>,
    pub high_color: Option<String>,
}

impl Marks {
    /// Fold the marks implied by an inline tag into `self`.
    /// Returns false when the tag is not a mark tag.
    pub fn apply_tag(&mut self, name: &str, attr: impl Fn(&str) -> Option<String>) -> bool {
        match name {
            "b" | "strong" => self.bold = true,
            "i" | "em" => self.italic = true,
            "del" | "s" | "strike" => self.strikethrough = true,
            "code" | "kbd" => self.code = true,
            "span" => {
                if let Some(color) = attr("style").as_deref().and_then(style_color) {
                    self.high_color = Some(color);
                }
            }
            "font" => {
                if let Some(color) = attr("color").filter(|color| !color.is_empty()) {
                    self.high_color = Some(color);
                }
            }
            "a" => {
                if let Some(href) = attr("href") {
                    self.url = Some(href);
                }
            }
            "sup" | "sub" | "u" | "ins" | "mark" | "small" => {}
            _ => return false,
        }
        true
    }

    pub fn leaf(&self, text: impl Into<String>) -> Leaf {
        Leaf {
            text: text.into(),
            bold: self.bold,
            italic: self.italic,
            strikethrough: self.strikethrough,
            code: self.code,
            url: self.url.clone(),
            high_color: self.high_color.clone(),
            ..Leaf::default()
        }
    }
}

/// Owned, simplified view of a parsed HTML fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum HtmlNode {
    Element {
        name: String,
        attrs: Vec<(String, String)>,
        children: Vec<HtmlNode>,
    },
    Text(String),
}

impl HtmlNode {
    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            HtmlNode::Element { attrs, .. } => attrs
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.as_str()),
            HtmlNode::Text(_) => None,
        }
    }

    pub fn has_attr(&self, key: &str) -> bool {
        self.attr(key).is_some()
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            HtmlNode::Element { name, .. } => Some(name),
            HtmlNode::Text(_) => None,
        }
    }

    pub fn children(&self) -> &[HtmlNode] {
        match self {
            HtmlNode::Element { children, .. } => children,
            HtmlNode::Text(_) => &[],
        }
    }

    pub fn text_content(&self) -> String {
        match self {
            HtmlNode::Text(text) => text.clone(),
            HtmlNode::Element { children, .. } => {
                children.iter().map(HtmlNode::text_content).collect()
            }
        }
    }

    fn find(&self, wanted: &[&str]) -> Option<&HtmlNode> {
        if self.name().is_some_and(|name| wanted.contains(&name)) {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(wanted))
    }
}

/// Parse an HTML fragment into owned nodes (contents of `<head>` and `<body>`).
pub fn parse_fragment(html: &str) -> Vec<HtmlNode> {
    let dom = match html5ever::parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
    {
        Ok(dom) => dom,
        Err(err) => {
            log::debug!("html fragment could not be read: {err}");
            return Vec::new();
        }
    };

    let mut out = Vec::new();
    for child in dom.document.children.borrow().iter() {
        if element_name(child).as_deref() == Some("html") {
            for section in child.children.borrow().iter() {
                for node in section.children.borrow().iter() {
                    if let Some(converted) = convert_handle(node) {
                        out.push(converted);
                    }
                }
            }
        }
    }
    out
}

fn element_name(handle: &Handle) -> Option<String> {
    match handle.data {
        NodeData::Element { ref name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

fn convert_handle(handle: &Handle) -> Option<HtmlNode> {
    match handle.data {
        NodeData::Element {
            ref name,
            ref attrs,
            ..
        } => {
            let attrs = attrs
                .borrow()
                .iter()
                .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                .collect();
            let children = handle
                .children
                .borrow()
                .iter()
                .filter_map(convert_handle)
                .collect();
            Some(HtmlNode::Element {
                name: name.local.to_string(),
                attrs,
                children,
            })
        }
        NodeData::Text { ref contents } => Some(HtmlNode::Text(contents.borrow().to_string())),
        _ => None,
    }
}

/// Build a media node from an `img`, `video`, `audio` or `iframe` fragment.
pub fn media_from_html(html: &str) -> Option<Media> {
    let nodes = parse_fragment(html);
    let element = nodes
        .iter()
        .find_map(|node| node.find(&["img", "video", "audio", "iframe"]))?;
    let name = element.name()?;

    let url = element
        .attr("src")
        .map(str::to_string)
        .or_else(|| {
            element
                .find(&["source"])
                .and_then(|source| source.attr("src"))
                .map(str::to_string)
        })
        .unwrap_or_default();
    if url.is_empty() {
        return None;
    }

    let media_type = match name {
        "img" => "image",
        other => other,
    };
    let owned = |key: &str| element.attr(key).map(str::to_string);
    Some(Media {
        url,
        media_type: media_type.to_string(),
        width: owned("width"),
        height: owned("height"),
        align: owned("align").or_else(|| owned("data-align")),
        alt: owned("alt"),
        controls: element.has_attr("controls"),
        autoplay: element.has_attr("autoplay"),
        looping: element.has_attr("loop"),
        muted: element.has_attr("muted"),
        poster: owned("poster"),
    })
}

/// Build an `attach` kind from `<a href download data-size>` markup.
pub fn attach_from_html(html: &str) -> Option<ElementKind> {
    let nodes = parse_fragment(html);
    let anchor = nodes.iter().find_map(|node| node.find(&["a"]))?;
    let url = anchor.attr("href")?.to_string();
    let name = anchor
        .attr("download")
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| anchor.text_content().trim().to_string());
    Some(ElementKind::Attach {
        url,
        name,
        size: anchor.attr("data-size").map(str::to_string),
    })
}

/// Map simple container markup onto Document Tree blocks.
///
/// Returns `None` when the fragment uses elements that have no tree counterpart; the caller
/// then keeps the markup as raw HTML.
pub fn html_to_nodes(html: &str) -> Option<Vec<Node>> {
    let fragment = parse_fragment(html);
    let blocks = blocks_from(&fragment)?;
    if blocks.is_empty() {
        None
    } else {
        Some(blocks)
    }
}

fn is_inline(node: &HtmlNode) -> bool {
    match node {
        HtmlNode::Text(_) => true,
        HtmlNode::Element { name, .. } => is_mark_tag(name),
    }
}

fn blocks_from(nodes: &[HtmlNode]) -> Option<Vec<Node>> {
    let mut blocks = Vec::new();
    let mut inline = Vec::new();
    for node in nodes {
        if is_inline(node) {
            collect_inline(node, &Marks::default(), &mut inline)?;
            continue;
        }
        flush_inline(&mut inline, &mut blocks);
        blocks.extend(block_from(node)?);
    }
    flush_inline(&mut inline, &mut blocks);
    Some(blocks)
}

fn flush_inline(inline: &mut Vec<Node>, blocks: &mut Vec<Node>) {
    let has_text = inline
        .iter()
        .any(|node| node.as_leaf().is_some_and(|leaf| !leaf.text.trim().is_empty()));
    if has_text {
        blocks.push(Node::paragraph(std::mem::take(inline)));
    } else {
        inline.clear();
    }
}

fn block_from(node: &HtmlNode) -> Option<Vec<Node>> {
    let HtmlNode::Element { name, children, .. } = node else {
        return Some(Vec::new());
    };
    let block = match name.as_str() {
        "p" => Node::paragraph(inline_from(children)?),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..].parse().unwrap_or(1);
            Node::element(ElementKind::Heading { level }, inline_from(children)?)
        }
        "blockquote" => Node::element(ElementKind::Blockquote, blocks_from(children)?),
        "ul" | "ol" => {
            let items = children
                .iter()
                .filter(|child| child.name() == Some("li"))
                .map(|item| {
                    blocks_from(item.children()).map(|blocks| {
                        Node::element(
                            ElementKind::ListItem {
                                checked: None,
                                mentions: Vec::new(),
                            },
                            blocks,
                        )
                    })
                })
                .collect::<Option<Vec<_>>>()?;
            Node::element(
                ElementKind::List {
                    order: name == "ol",
                    start: node.attr("start").and_then(|start| start.parse().ok()),
                    task: false,
                },
                items,
            )
        }
        "pre" => {
            let language = node
                .find(&["code"])
                .and_then(|code| code.attr("class"))
                .and_then(|class| class.strip_prefix("language-"))
                .map(str::to_string);
            let value = node.text_content().trim_end_matches('\n').to_string();
            Node::Element(Element::void(ElementKind::Code {
                language,
                value,
                frontmatter: false,
                is_config: false,
                raw_html: false,
            }))
        }
        "hr" => Node::Element(Element::void(ElementKind::Hr)),
        "br" => Node::Element(Element::empty_paragraph()),
        "div" | "section" | "article" | "header" | "footer" | "main" | "center" | "aside"
        | "nav" | "figure" => return blocks_from(children),
        _ => return None,
    };
    Some(vec![block])
}

fn inline_from(nodes: &[HtmlNode]) -> Option<Vec<Node>> {
    let mut out = Vec::new();
    for node in nodes {
        collect_inline(node, &Marks::default(), &mut out)?;
    }
    Some(out)
}

fn collect_inline(node: &HtmlNode, marks: &Marks, out: &mut Vec<Node>) -> Option<()> {
    match node {
        HtmlNode::Text(text) => {
            out.push(Node::Leaf(marks.leaf(text.clone())));
            Some(())
        }
        HtmlNode::Element { name, children, .. } => {
            if name == "br" {
                out.push(Node::Leaf(marks.leaf("\n")));
                return Some(());
            }
            let mut inner = marks.clone();
            if !inner.apply_tag(name, |key| node.attr(key).map(str::to_string)) {
                return None;
            }
            for child in children {
                collect_inline(child, &inner, out)?;
            }
            Some(())
        }
    }
}
