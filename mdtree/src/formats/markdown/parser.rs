//! Markdown parsing (Markdown → Document Tree)
//!
//! Pipeline: Markdown string → preprocessing → comrak AST → Document Tree.
//!
//! Block nodes are handled here; inline runs live in `inline.rs`. Every call to
//! [`parse_markdown`] owns a fresh [`ParseContext`], so no traversal state is shared between
//! documents.

use super::preprocess::preprocess;
use crate::common::html::{
    attach_from_html, comment_body, html_to_nodes, is_break_only, is_download_anchor,
    is_media_html, is_standard_tag, media_from_html, parse_tag, Marks,
};
use crate::common::json::{config_object, parse_config};
use crate::common::languages::LanguageRegistry;
use crate::common::table::{build_table, TableInput};
use crate::options::ConvertOptions;
use crate::plugin::PluginSet;
use crate::tree::{collect_links, Align, Document, Element, ElementKind, Leaf, Mention, Node};
use comrak::nodes::{AstNode, ListType, NodeValue, TableAlignment};
use comrak::{parse_document, Arena, Options};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static HTML_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^<>]+>").expect("valid html token regex"));
static TASK_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([ xX])\](?:\s+|$)").expect("valid task token regex"));

/// Parse Markdown into a Document Tree.
///
/// Conversion is infallible: whatever comrak recovers from malformed input is converted, and
/// the result always holds at least one node.
pub fn parse_markdown(text: &str, plugins: &PluginSet, options: &ConvertOptions) -> Document {
    let source = preprocess(text, options);
    let arena = Arena::new();
    let root = parse_document(&arena, &source, &comrak_options());

    let mut ctx = ParseContext::new(plugins, options);
    let mut nodes = ctx.convert_top_level(root);
    nodes.retain(|node| !is_newline_paragraph(node));
    if nodes.is_empty() {
        nodes.push(Element::empty_paragraph().into());
    }

    let links = collect_links(&nodes);
    Document { nodes, links }
}

/// The comrak extensions the converter relies on.
pub fn comrak_options() -> Options<'static> {
    let mut options = Options::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.superscript = true;
    options.extension.footnotes = true;
    options.extension.math_dollars = true;
    options.extension.front_matter_delimiter = Some("---".to_string());
    options
}

fn is_newline_paragraph(node: &Node) -> bool {
    match node.as_element() {
        Some(element) => {
            element.kind == ElementKind::Paragraph
                && element.children.len() == 1
                && element.children[0]
                    .as_leaf()
                    .is_some_and(|leaf| leaf.text == "\n")
        }
        None => false,
    }
}

fn line_span<'a>(node: &'a AstNode<'a>) -> (usize, usize) {
    let pos = node.data.borrow().sourcepos;
    (pos.start.line, pos.end.line.max(pos.start.line))
}

/// Move footnote definitions to the end, keeping relative order otherwise.
pub(crate) fn sort_footnotes(nodes: &mut [Node]) {
    nodes.sort_by_key(|node| {
        matches!(
            node.kind(),
            Some(ElementKind::FootnoteDefinition { .. })
        )
    });
}

/// Traversal state of one forward conversion.
///
/// Plugins receive the context so they can convert children explicitly.
pub struct ParseContext<'p> {
    pub(super) plugins: &'p PluginSet,
    pub(super) options: &'p ConvertOptions,
    pub(super) languages: LanguageRegistry,
    think_block: Option<Regex>,
    /// Configuration from the last config comment, waiting for the next block.
    pending_config: Option<Map<String, Value>>,
}

impl<'p> ParseContext<'p> {
    pub fn new(plugins: &'p PluginSet, options: &'p ConvertOptions) -> Self {
        let think_block = Regex::new(&format!(
            r"(?s)^<{0}>(.*?)</{0}>$",
            regex::escape(&options.think_tag)
        ))
        .ok();
        Self {
            plugins,
            options,
            languages: LanguageRegistry::with_options(options),
            think_block,
            pending_config: None,
        }
    }

    pub fn options(&self) -> &ConvertOptions {
        self.options
    }

    fn convert_top_level<'a>(&mut self, root: &'a AstNode<'a>) -> Vec<Node> {
        let mut out = Vec::new();
        let mut previous_end: Option<usize> = None;
        for child in root.children() {
            let (start, end) = line_span(child);
            if let Some(previous_end) = previous_end {
                let gap = start.saturating_sub(previous_end);
                if gap >= self.options.blank_line_gap {
                    for _ in 0..(gap - 2) / 2 {
                        out.push(Element::empty_paragraph().into());
                    }
                }
            }
            let is_front_matter = matches!(child.data.borrow().value, NodeValue::FrontMatter(_));
            previous_end = (!is_front_matter).then_some(end);
            out.extend(self.convert_block(child));
        }
        sort_footnotes(&mut out);
        out
    }

    /// Convert every block child of `node`.
    ///
    /// A config comment only ever applies to a following sibling: configuration left over
    /// after the last child is dropped.
    pub fn convert_children<'a>(&mut self, node: &'a AstNode<'a>) -> Vec<Node> {
        let outer = self.pending_config.take();
        let mut out: Vec<Node> = node
            .children()
            .flat_map(|child| self.convert_block(child))
            .collect();
        self.pending_config = outer;
        sort_footnotes(&mut out);
        out
    }

    /// Convert the inline children of `node` into leaves.
    pub fn convert_inlines<'a>(&mut self, node: &'a AstNode<'a>) -> Vec<Node> {
        self.inline_children(node, &Marks::default())
    }

    /// Convert one block node, consulting plugins first.
    pub fn convert_block<'a>(&mut self, node: &'a AstNode<'a>) -> Vec<Node> {
        let mut config = self.pending_config.take();

        let plugins = self.plugins;
        if let Some(rule) = plugins.find_parse_rule(node) {
            log::debug!("parse rule '{}' intercepted a block", rule.name());
            let mut out = rule.convert(node, self);
            attach_config(&mut out, config);
            return out;
        }

        let value = node.data.borrow().value.clone();
        let mut out = match value {
            NodeValue::Document => self.convert_children(node),
            NodeValue::FrontMatter(raw) => vec![front_matter(&raw)],
            NodeValue::BlockQuote => {
                vec![Node::element(
                    ElementKind::Blockquote,
                    self.convert_children(node),
                )]
            }
            NodeValue::List(list) => {
                let order = list.list_type == ListType::Ordered;
                let items: Vec<Node> = node
                    .children()
                    .map(|item| self.convert_list_item(item))
                    .collect();
                let task = items.iter().any(|item| {
                    matches!(
                        item.kind(),
                        Some(ElementKind::ListItem {
                            checked: Some(_),
                            ..
                        })
                    )
                });
                vec![Node::element(
                    ElementKind::List {
                        order,
                        start: order.then_some(list.start as u64),
                        task,
                    },
                    items,
                )]
            }
            NodeValue::Item(_) | NodeValue::TaskItem(_) => vec![self.convert_list_item(node)],
            NodeValue::CodeBlock(block) => {
                let language = block
                    .info
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_string();
                let literal = block.literal.strip_suffix('\n').unwrap_or(&block.literal);
                vec![self.code_node(&language, literal)]
            }
            NodeValue::HtmlBlock(block) => self.convert_html(&block.literal),
            NodeValue::Paragraph => self.convert_paragraph(node),
            NodeValue::Heading(heading) => vec![Node::element(
                ElementKind::Heading {
                    level: heading.level,
                },
                self.convert_inlines(node),
            )],
            NodeValue::ThematicBreak => vec![Element::void(ElementKind::Hr).into()],
            NodeValue::FootnoteDefinition(definition) => {
                vec![self.convert_footnote_definition(node, &definition.name)]
            }
            NodeValue::Table(table) => {
                let alignments = table
                    .alignments
                    .iter()
                    .map(|align| match align {
                        TableAlignment::Left => Some(Align::Left),
                        TableAlignment::Center => Some(Align::Center),
                        TableAlignment::Right => Some(Align::Right),
                        TableAlignment::None => None,
                    })
                    .collect();
                vec![self.convert_table(node, alignments, config.take())]
            }
            _ => {
                let children = self.convert_children(node);
                if children.is_empty() {
                    vec![Node::paragraph(self.convert_inlines(node))]
                } else {
                    children
                }
            }
        };
        attach_config(&mut out, config);
        out
    }

    fn code_node(&self, language: &str, value: &str) -> Node {
        if let Some(element) = self.languages.to_node(language, value) {
            return element.into();
        }
        Element::void(ElementKind::Code {
            language: (!language.is_empty()).then(|| language.to_string()),
            value: value.to_string(),
            frontmatter: false,
            is_config: false,
            raw_html: false,
        })
        .into()
    }

    fn convert_list_item<'a>(&mut self, node: &'a AstNode<'a>) -> Node {
        let mut checked = match &node.data.borrow().value {
            NodeValue::TaskItem(symbol) => Some(symbol.is_some_and(|c| c != ' ')),
            _ => None,
        };
        let mut children = self.convert_children(node);
        if checked.is_none() {
            checked = take_task_token(&mut children);
        }
        let mentions = take_mention(&mut children).into_iter().collect();
        Node::element(ElementKind::ListItem { checked, mentions }, children)
    }

    fn convert_paragraph<'a>(&mut self, node: &'a AstNode<'a>) -> Vec<Node> {
        let children: Vec<_> = node.children().collect();

        if let Some(html) = paragraph_html(&children) {
            if is_media_html(&html)
                || is_download_anchor(&html)
                || comment_body(&html).is_some()
                || self.is_think_block(&html)
            {
                return self.convert_html(&html);
            }
        }

        if let [only] = children.as_slice() {
            let value = only.data.borrow().value.clone();
            match value {
                NodeValue::Link(link) if link.title == "card" => {
                    let name = self
                        .convert_inlines(only)
                        .iter()
                        .map(Node::plain_text)
                        .collect();
                    return vec![Element::void(ElementKind::LinkCard {
                        url: link.url,
                        name,
                    })
                    .into()];
                }
                NodeValue::Math(math) if math.display_math => {
                    return vec![Element::void(ElementKind::KatexBlock {
                        value: math.literal.trim().to_string(),
                    })
                    .into()];
                }
                _ => {}
            }
        }

        hoist_blocks(self.convert_inlines(node))
    }

    fn is_think_block(&self, html: &str) -> bool {
        self.think_block
            .as_ref()
            .is_some_and(|re| re.is_match(html.trim()))
    }

    /// Classify a raw HTML fragment.
    fn convert_html(&mut self, literal: &str) -> Vec<Node> {
        let html = literal.trim();

        if let Some(body) = comment_body(html) {
            let body = body.trim();
            let config = (body.starts_with('{') || body.starts_with('['))
                .then(|| parse_config(body))
                .flatten();
            let is_config = config.is_some();
            if let Some(config) = config {
                self.pending_config = Some(config_object(config));
            }
            return vec![Element::void(ElementKind::Code {
                language: Some("html".to_string()),
                value: html.to_string(),
                frontmatter: false,
                is_config,
                raw_html: !is_config,
            })
            .into()];
        }

        if is_break_only(html) {
            return vec![Element::empty_paragraph().into()];
        }

        if is_media_html(html) {
            if let Some(media) = media_from_html(html) {
                return vec![Element::void(ElementKind::Media(media)).into()];
            }
        }

        if is_download_anchor(html) {
            if let Some(kind) = attach_from_html(html) {
                return vec![Element::void(kind).into()];
            }
        }

        if let Some(caps) = self.think_block.as_ref().and_then(|re| re.captures(html)) {
            let value = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            return vec![Element::void(ElementKind::Code {
                language: Some(self.options.think_tag.clone()),
                value: value.to_string(),
                frontmatter: false,
                is_config: false,
                raw_html: false,
            })
            .into()];
        }

        let custom = html
            .find('>')
            .and_then(|end| parse_tag(&html[..=end]))
            .is_some_and(|tag| !tag.closing && !is_standard_tag(&tag.name));
        if custom {
            return vec![Node::paragraph(html_as_text(html))];
        }

        match html_to_nodes(html) {
            Some(nodes) => nodes,
            None => vec![Element::void(ElementKind::Code {
                language: Some("html".to_string()),
                value: html.to_string(),
                frontmatter: false,
                is_config: false,
                raw_html: true,
            })
            .into()],
        }
    }

    fn convert_footnote_definition<'a>(&mut self, node: &'a AstNode<'a>, name: &str) -> Node {
        let leaves: Vec<Node> = node
            .children()
            .flat_map(|child| self.convert_inlines(child))
            .collect();
        let link = leaves
            .iter()
            .filter_map(Node::as_leaf)
            .find(|leaf| leaf.url.is_some())
            .cloned();
        let (url, value) = match link {
            Some(leaf) => (leaf.url.clone().unwrap_or_default(), leaf.text.clone()),
            None => (
                String::new(),
                leaves.iter().map(Node::plain_text).collect::<String>(),
            ),
        };
        let child = Leaf {
            text: value.clone(),
            url: (!url.is_empty()).then(|| url.clone()),
            ..Leaf::default()
        };
        Node::element(
            ElementKind::FootnoteDefinition {
                identifier: name.to_string(),
                url,
                value,
            },
            vec![child.into()],
        )
    }

    fn convert_table<'a>(
        &mut self,
        node: &'a AstNode<'a>,
        alignments: Vec<Option<Align>>,
        config: Option<Map<String, Value>>,
    ) -> Node {
        let mut rows: Vec<Vec<Vec<Node>>> = node
            .children()
            .map(|row| {
                row.children()
                    .map(|cell| self.convert_inlines(cell))
                    .collect()
            })
            .collect();
        let header = if rows.is_empty() {
            Vec::new()
        } else {
            rows.remove(0)
        };
        let input = TableInput {
            header,
            rows,
            alignments,
        };
        build_table(input, config, self.options).into()
    }
}

fn attach_config(out: &mut [Node], config: Option<Map<String, Value>>) {
    let Some(config) = config else {
        return;
    };
    let target = out.iter_mut().find_map(|node| match node {
        Node::Element(element) => Some(element),
        Node::Leaf(_) => None,
    });
    if let Some(element) = target {
        match &mut element.other_props {
            Some(props) => props.extend(config),
            None => element.other_props = Some(config),
        }
    }
}

fn front_matter(raw: &str) -> Node {
    let mut lines: Vec<&str> = raw.trim().lines().collect();
    if lines.first().is_some_and(|line| line.trim() == "---") {
        lines.remove(0);
    }
    if lines.last().is_some_and(|line| line.trim() == "---") {
        lines.pop();
    }
    Element::void(ElementKind::Code {
        language: Some("yaml".to_string()),
        value: lines.join("\n"),
        frontmatter: true,
        is_config: false,
        raw_html: false,
    })
    .into()
}

/// The concatenated source of a paragraph made only of raw HTML and text, starting with HTML.
fn paragraph_html<'a>(children: &[&'a AstNode<'a>]) -> Option<String> {
    let first = children.first()?;
    if !matches!(first.data.borrow().value, NodeValue::HtmlInline(_)) {
        return None;
    }
    let mut html = String::new();
    for child in children {
        match &child.data.borrow().value {
            NodeValue::HtmlInline(raw) | NodeValue::Text(raw) => html.push_str(raw),
            NodeValue::SoftBreak | NodeValue::LineBreak => html.push('\n'),
            _ => return None,
        }
    }
    Some(html)
}

/// Split raw HTML into tag and text leaves, keeping everything verbatim.
fn html_as_text(html: &str) -> Vec<Node> {
    let mut leaves = Vec::new();
    let mut last = 0;
    for tag in HTML_TOKEN.find_iter(html) {
        if tag.start() > last {
            leaves.push(Node::text(&html[last..tag.start()]));
        }
        leaves.push(Node::text(tag.as_str()));
        last = tag.end();
    }
    if last < html.len() {
        leaves.push(Node::text(&html[last..]));
    }
    leaves
}

/// Split inline content around block-level nodes (media) so paragraphs only hold inline runs.
pub(crate) fn hoist_blocks(inlines: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::new();
    let mut run: Vec<Node> = Vec::new();
    let flush = |run: &mut Vec<Node>, out: &mut Vec<Node>| {
        let meaningful = run.iter().any(|node| match node {
            Node::Leaf(leaf) => !leaf.text.trim().is_empty() || leaf.identifier.is_some(),
            Node::Element(_) => true,
        });
        if meaningful {
            out.push(Node::paragraph(std::mem::take(run)));
        } else {
            run.clear();
        }
    };

    let had_blocks = inlines
        .iter()
        .any(|node| matches!(node.kind(), Some(ElementKind::Media(_))));
    if !had_blocks {
        return vec![Node::paragraph(inlines)];
    }

    for node in inlines {
        if matches!(node.kind(), Some(ElementKind::Media(_))) {
            flush(&mut run, &mut out);
            out.push(node);
        } else {
            run.push(node);
        }
    }
    flush(&mut run, &mut out);
    out
}

/// Leading text leaf of the first paragraph of a list item.
fn first_paragraph_mut(children: &mut [Node]) -> Option<&mut Element> {
    match children.first_mut()? {
        Node::Element(element) if element.kind == ElementKind::Paragraph => Some(element),
        _ => None,
    }
}

fn take_task_token(children: &mut [Node]) -> Option<bool> {
    let paragraph = first_paragraph_mut(children)?;
    let Some(Node::Leaf(leaf)) = paragraph.children.first_mut() else {
        return None;
    };
    let caps = TASK_TOKEN.captures(&leaf.text)?;
    let checked = caps.get(1).is_some_and(|mark| mark.as_str() != " ");
    let token_len = caps.get(0).map(|m| m.end()).unwrap_or_default();
    leaf.text = leaf.text[token_len..].to_string();
    Some(checked)
}

/// Detect a leading `[name](avatar?id=..)` link followed by more content.
fn take_mention(children: &mut [Node]) -> Option<Mention> {
    let paragraph = first_paragraph_mut(children)?;
    if paragraph.children.len() < 2 {
        return None;
    }
    let link = paragraph.children[0].as_leaf()?;
    let url = link.url.clone()?;
    let name = link.text.clone();

    let (avatar, id) = split_id_param(&url);
    paragraph.children.remove(0);
    if let Some(Node::Leaf(next)) = paragraph.children.first_mut() {
        next.text = next.text.trim_start().to_string();
    }
    Some(Mention { avatar, name, id })
}

/// Separate the `id` query parameter from a URL. Unparseable URLs are kept raw.
fn split_id_param(raw: &str) -> (String, Option<String>) {
    match url::Url::parse(raw) {
        Ok(mut parsed) => {
            let pairs: Vec<(String, String)> = parsed
                .query_pairs()
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();
            let id = pairs
                .iter()
                .find(|(key, _)| key == "id")
                .map(|(_, value)| value.clone());
            let rest: Vec<_> = pairs.iter().filter(|(key, _)| key != "id").collect();
            if rest.is_empty() {
                parsed.set_query(None);
            } else {
                parsed.query_pairs_mut().clear().extend_pairs(rest);
            }
            (parsed.to_string(), id)
        }
        Err(err) => {
            log::trace!("mention url '{raw}' kept raw: {err}");
            match raw.split_once("?id=") {
                Some((base, id)) if !id.contains('&') => (base.to_string(), Some(id.to_string())),
                _ => (raw.to_string(), None),
            }
        }
    }
}
