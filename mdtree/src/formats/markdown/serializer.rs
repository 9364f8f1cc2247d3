//! Markdown serialization (Document Tree → Markdown)
//!
//! The reverse converter writes Markdown text directly rather than building a comrak AST: the
//! tree carries constructs comrak's CommonMark writer cannot express (configuration comments,
//! merged table cells, mark combinations that need HTML).
//!
//! Blocks render without any outer prefix. A container prefixes every line of its children
//! (`"> "` for quotes, the item marker and its continuation indent for lists), and the caller's
//! `initial_indent` is applied last to the whole output. The input tree is never mutated.

use super::inline::image_media;
use crate::common::html::{comment_body, is_standard_tag};
use crate::common::json::{config_object, parse_config};
use crate::common::languages::LanguageRegistry;
use crate::common::table::{serialize_table, visible_props};
use crate::options::ConvertOptions;
use crate::plugin::PluginSet;
use crate::tree::{Element, ElementKind, Leaf, Media, Mention, Node};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);")
        .expect("valid entity regex")
});
static ORDERED_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{1,9})[.)](?:\s|$)").expect("valid ordered marker regex"));
static TAG_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^</?([A-Za-z][A-Za-z0-9-]*)").expect("valid tag start regex"));
static RULE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:-+|=+)\s*$").expect("valid rule line regex"));

/// Serialize Document Tree nodes to Markdown.
///
/// `initial_indent` prefixes every output line; `ancestors` is the stack of nodes enclosing
/// `nodes` (outermost first), visible to serialize rules through [`SerializeContext`].
pub fn to_markdown(
    nodes: &[Node],
    initial_indent: &str,
    ancestors: &[Node],
    plugins: &PluginSet,
    options: &ConvertOptions,
) -> String {
    let languages = LanguageRegistry::with_options(options);
    let ctx = SerializeContext {
        plugins,
        options,
        languages: &languages,
        ancestors: ancestors.iter().collect(),
    };
    let markdown = ctx.render_blocks(nodes);
    if initial_indent.is_empty() {
        markdown
    } else {
        indent_lines(&markdown, initial_indent, initial_indent)
    }
}

/// Where a node sits during reverse conversion, and the means to render its children.
///
/// Serialize rules receive this context; a rule that wants default rendering for children
/// calls [`render_blocks`](Self::render_blocks) or [`render_inline`](Self::render_inline).
pub struct SerializeContext<'t> {
    plugins: &'t PluginSet,
    options: &'t ConvertOptions,
    languages: &'t LanguageRegistry,
    ancestors: Vec<&'t Node>,
}

impl<'t> SerializeContext<'t> {
    pub fn options(&self) -> &ConvertOptions {
        self.options
    }

    /// Enclosing nodes, outermost first.
    pub fn ancestors(&self) -> &[&'t Node] {
        &self.ancestors
    }

    pub fn parent(&self) -> Option<&'t Node> {
        self.ancestors.last().copied()
    }

    fn within<'n>(&'n self, node: &'n Node) -> SerializeContext<'n> {
        let mut ancestors: Vec<&'n Node> = self.ancestors.clone();
        ancestors.push(node);
        SerializeContext {
            plugins: self.plugins,
            options: self.options,
            languages: self.languages,
            ancestors,
        }
    }

    /// Render sibling blocks, separated by blank lines.
    pub fn render_blocks(&self, nodes: &[Node]) -> String {
        let in_item = matches!(
            self.parent().and_then(Node::kind),
            Some(ElementKind::ListItem { .. })
        );
        let mut out = String::new();
        let mut previous: Option<&Node> = None;
        let mut alternate = false;

        for (index, node) in nodes.iter().enumerate() {
            let next = nodes.get(index + 1);
            if is_config_comment(node)
                && next.is_some_and(|next| visible_props(next.other_props()).is_some())
            {
                continue;
            }

            let is_list = is_list(node);
            if is_list {
                // Adjacent lists of one kind would merge; switch the marker style instead.
                alternate = previous.is_some_and(|prev| same_list_kind(prev, node)) && !alternate;
            }

            let text = if is_sandwiched_break(nodes, index) {
                "<br/>".to_string()
            } else {
                self.render_with_config(nodes, index, alternate)
            };

            if let Some(prev) = previous {
                let tight =
                    in_item && is_list && matches!(prev.kind(), Some(ElementKind::Paragraph));
                out.push_str(if tight { "\n" } else { "\n\n" });
            }
            out.push_str(&text);
            previous = Some(node);
        }
        out
    }

    /// Render a run of leaves and inline elements.
    pub fn render_inline(&self, nodes: &[Node]) -> String {
        let mut out = String::new();
        for (index, node) in nodes.iter().enumerate() {
            if let Some(rule) = self.plugins.find_serialize_rule(node, self) {
                log::debug!("serialize rule '{}' intercepted an inline node", rule.name());
                out.push_str(&rule.convert(node, self));
                continue;
            }
            match node {
                Node::Leaf(leaf) => {
                    let composed = compose_leaf(leaf);
                    let next_abuts = nodes
                        .get(index + 1)
                        .and_then(Node::as_leaf)
                        .and_then(|next| next.text.chars().next())
                        .is_some_and(|first| !first.is_whitespace());
                    let gap = leaf.mark_count() >= 2
                        && !uses_html(leaf)
                        && next_abuts
                        && !composed.ends_with(char::is_whitespace);
                    out.push_str(&composed);
                    if gap {
                        out.push(' ');
                    }
                }
                Node::Element(element) => match &element.kind {
                    ElementKind::InlineKatex => out.push_str(&format!("${}$", node.plain_text())),
                    ElementKind::Media(media) => out.push_str(&render_media(media)),
                    _ => out.push_str(&self.render_node(node)),
                },
            }
        }
        out
    }

    /// Render one node with default handling, unless a serialize rule claims it.
    pub fn render_node(&self, node: &Node) -> String {
        self.render_block(node, false)
    }

    fn render_block(&self, node: &Node, alternate: bool) -> String {
        if let Some(rule) = self.plugins.find_serialize_rule(node, self) {
            log::debug!(
                "serialize rule '{}' intercepted a {} node",
                rule.name(),
                node.kind().map(ElementKind::type_name).unwrap_or("leaf")
            );
            return rule.convert(node, self);
        }
        match node {
            Node::Leaf(_) => self.render_inline(std::slice::from_ref(node)),
            Node::Element(element) => self.render_element(node, element, alternate),
        }
    }

    fn render_with_config(&self, nodes: &[Node], index: usize, alternate: bool) -> String {
        let node = &nodes[index];
        let body = self.render_block(node, alternate);
        let Some(props) = visible_props(node.other_props()) else {
            return body;
        };
        let comment = index
            .checked_sub(1)
            .and_then(|prev| nodes.get(prev))
            .and_then(|prev| original_comment(prev, &props))
            .unwrap_or_else(|| format!("<!--{}-->", Value::Object(props)));
        format!("{comment}\n{body}")
    }

    fn render_element(&self, node: &Node, element: &Element, alternate: bool) -> String {
        let ctx = self.within(node);
        match &element.kind {
            ElementKind::Paragraph => escape_line_starts(&ctx.render_inline(&element.children)),
            ElementKind::Heading { level } => {
                let hashes = "#".repeat(usize::from((*level).clamp(1, 6)));
                let text = ctx.render_inline(&element.children);
                if text.is_empty() {
                    hashes
                } else {
                    format!("{hashes} {text}")
                }
            }
            ElementKind::Blockquote => {
                indent_lines(&ctx.render_blocks(&element.children), "> ", "> ")
            }
            ElementKind::List { order, start, .. } => {
                let first = start.unwrap_or(1);
                element
                    .children
                    .iter()
                    .enumerate()
                    .map(|(index, item)| {
                        let marker = match (order, alternate) {
                            (true, false) => format!("{}. ", first + index as u64),
                            (true, true) => format!("{}) ", first + index as u64),
                            (false, false) => "- ".to_string(),
                            (false, true) => "* ".to_string(),
                        };
                        let body = ctx.render_block(item, false);
                        indent_lines(&body, &marker, &" ".repeat(marker.len()))
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            ElementKind::ListItem { checked, mentions } => {
                let mut prefix = String::new();
                match checked {
                    Some(true) => prefix.push_str("[x] "),
                    Some(false) => prefix.push_str("[ ] "),
                    None => {}
                }
                for mention in mentions {
                    prefix.push_str(&mention_link(mention));
                    prefix.push(' ');
                }
                let body = ctx.render_blocks(&element.children);
                if body.is_empty() {
                    prefix.trim_end().to_string()
                } else {
                    format!("{prefix}{body}")
                }
            }
            ElementKind::Code {
                language,
                value,
                frontmatter,
                is_config,
                raw_html,
            } => {
                if *raw_html || *is_config {
                    value.clone()
                } else if *frontmatter {
                    format!("---\n{value}\n---")
                } else {
                    fenced(language.as_deref().unwrap_or_default(), value)
                }
            }
            ElementKind::Schema { .. } | ElementKind::KatexBlock { .. } => {
                match self.languages.from_node(element) {
                    Some((language, body)) => fenced(&language, &body),
                    None => match &element.kind {
                        ElementKind::KatexBlock { value } => format!("$$\n{value}\n$$"),
                        _ => String::new(),
                    },
                }
            }
            ElementKind::InlineKatex => format!("${}$", node.plain_text()),
            ElementKind::Table
            | ElementKind::Chart
            | ElementKind::ColumnGroup
            | ElementKind::Description => {
                serialize_table(element, &|cells: &[Node]| ctx.render_inline(cells))
            }
            ElementKind::TableRow { .. }
            | ElementKind::TableCell { .. }
            | ElementKind::ColumnCell => ctx.render_inline(&element.children),
            ElementKind::Media(media) => render_media(media),
            ElementKind::Attach { url, name, size } => {
                let size = size
                    .as_deref()
                    .map(|size| format!(" data-size=\"{}\"", escape_attr(size)))
                    .unwrap_or_default();
                format!(
                    "<a href=\"{}\" download=\"{}\"{size}>{}</a>",
                    escape_attr(url),
                    escape_attr(name),
                    escape_html(name)
                )
            }
            ElementKind::LinkCard { url, name } => {
                format!("[{}]({} \"card\")", escape_text(name), link_destination(url))
            }
            ElementKind::FootnoteDefinition {
                identifier,
                url,
                value,
            } => {
                if url.is_empty() {
                    format!("[^{identifier}]: {}", escape_text(value))
                } else {
                    format!(
                        "[^{identifier}]: [{}]({})",
                        escape_text(value),
                        link_destination(url)
                    )
                }
            }
            ElementKind::Hr => "---".to_string(),
            ElementKind::Break => "<br/>".to_string(),
        }
    }
}

fn is_list(node: &Node) -> bool {
    matches!(node.kind(), Some(ElementKind::List { .. }))
}

fn same_list_kind(a: &Node, b: &Node) -> bool {
    match (a.kind(), b.kind()) {
        (Some(ElementKind::List { order: x, .. }), Some(ElementKind::List { order: y, .. })) => {
            x == y
        }
        _ => false,
    }
}

fn is_config_comment(node: &Node) -> bool {
    matches!(
        node.kind(),
        Some(ElementKind::Code {
            is_config: true,
            ..
        })
    )
}

/// An empty paragraph between two lists becomes `<br/>` so the lists stay apart.
fn is_sandwiched_break(nodes: &[Node], index: usize) -> bool {
    index > 0
        && nodes
            .get(index)
            .and_then(Node::as_element)
            .is_some_and(Element::is_empty_paragraph)
        && nodes.get(index - 1).is_some_and(is_list)
        && nodes.get(index + 1).is_some_and(is_list)
}

/// The verbatim config comment preceding a node, if it still decodes to `props`.
fn original_comment(prev: &Node, props: &Map<String, Value>) -> Option<String> {
    let Some(ElementKind::Code {
        value,
        is_config: true,
        ..
    }) = prev.kind()
    else {
        return None;
    };
    let config = config_object(parse_config(comment_body(value.trim())?)?);
    let nested = Map::from_iter([("config".to_string(), Value::Object(config.clone()))]);
    (config == *props || nested == *props).then(|| value.clone())
}

/// Prefix the first line with `first` and the others with `rest`; blank lines get no padding.
fn indent_lines(text: &str, first: &str, rest: &str) -> String {
    text.split('\n')
        .enumerate()
        .map(|(index, line)| {
            let prefix = if index == 0 { first } else { rest };
            if line.is_empty() {
                prefix.trim_end().to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn fenced(language: &str, value: &str) -> String {
    let longest = value
        .lines()
        .map(|line| {
            let line = line.trim_start();
            line.len() - line.trim_start_matches('`').len()
        })
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest.max(2) + 1);
    if value.is_empty() {
        format!("{fence}{language}\n{fence}")
    } else {
        format!("{fence}{language}\n{value}\n{fence}")
    }
}

fn render_media(media: &Media) -> String {
    let plain = media.width.is_none()
        && media.height.is_none()
        && media.align.is_none()
        && media.poster.is_none()
        && !(media.controls || media.autoplay || media.looping || media.muted)
        && image_media(&media.url, "").media_type == media.media_type;
    if plain {
        return format!(
            "![{}]({})",
            escape_text(media.alt.as_deref().unwrap_or_default()),
            link_destination(&media.url)
        );
    }

    let tag = match media.media_type.as_str() {
        "video" => "video",
        "audio" => "audio",
        "iframe" => "iframe",
        _ => "img",
    };
    let mut attrs = vec![format!("src=\"{}\"", escape_attr(&media.url))];
    let valued = [
        ("alt", &media.alt),
        ("width", &media.width),
        ("height", &media.height),
        ("align", &media.align),
        ("poster", &media.poster),
    ];
    for (key, value) in valued {
        if let Some(value) = value {
            attrs.push(format!("{key}=\"{}\"", escape_attr(value)));
        }
    }
    let flags = [
        ("controls", media.controls),
        ("autoplay", media.autoplay),
        ("loop", media.looping),
        ("muted", media.muted),
    ];
    attrs.extend(flags.iter().filter(|(_, on)| *on).map(|(key, _)| key.to_string()));

    if tag == "img" {
        format!("<img {} />", attrs.join(" "))
    } else {
        format!("<{tag} {}></{tag}>", attrs.join(" "))
    }
}

fn mention_link(mention: &Mention) -> String {
    let url = match &mention.id {
        Some(id) => {
            let separator = if mention.avatar.contains('?') { '&' } else { '?' };
            format!("{}{separator}id={id}", mention.avatar)
        }
        None => mention.avatar.clone(),
    };
    format!("[{}]({})", escape_text(&mention.name), link_destination(&url))
}

/// Leaves that Markdown punctuation cannot express unambiguously.
fn uses_html(leaf: &Leaf) -> bool {
    leaf.high_color.is_some() || (leaf.strikethrough && (leaf.bold || leaf.italic || leaf.code))
}

fn compose_leaf(leaf: &Leaf) -> String {
    if leaf.tag {
        return placeholder_span(leaf);
    }
    if let Some(identifier) = &leaf.identifier {
        return format!("[^{identifier}]");
    }
    if uses_html(leaf) {
        return compose_html(leaf);
    }
    compose_markdown(leaf)
}

fn placeholder_span(leaf: &Leaf) -> String {
    let placeholder = leaf.placeholder.as_deref().unwrap_or_default();
    let body = if leaf.text.is_empty() && leaf.initial_value.is_none() {
        format!("${{placeholder:{placeholder}}}")
    } else {
        format!("${{placeholder:{placeholder},initialValue:{}}}", leaf.text)
    };
    code_span(&body)
}

/// Innermost first: color, code, italic, bold, strikethrough, link.
fn compose_html(leaf: &Leaf) -> String {
    let mut out = escape_text(&leaf.text);
    if let Some(color) = &leaf.high_color {
        out = format!("<span style=\"color:{}\">{out}</span>", escape_attr(color));
    }
    if leaf.code {
        out = format!("<code>{out}</code>");
    }
    if leaf.italic {
        out = format!("<i>{out}</i>");
    }
    if leaf.bold {
        out = format!("<b>{out}</b>");
    }
    if leaf.strikethrough {
        out = format!("<del>{out}</del>");
    }
    if let Some(url) = &leaf.url {
        out = format!("<a href=\"{}\">{out}</a>", escape_attr(url));
    }
    out
}

fn compose_markdown(leaf: &Leaf) -> String {
    let emphasized = leaf.italic || leaf.bold || leaf.strikethrough;
    if !emphasized && leaf.url.is_none() {
        return if leaf.code {
            code_span(&leaf.text)
        } else {
            escape_text(&leaf.text)
        };
    }
    if let Some(url) = &leaf.url {
        if !emphasized && !leaf.code && leaf.text == *url && is_autolink(url) {
            return format!("<{url}>");
        }
    }

    let text = leaf.text.as_str();
    let core = text.trim();
    if core.is_empty() {
        return escape_text(text);
    }
    let lead = &text[..text.len() - text.trim_start().len()];
    let trail = &text[text.trim_end().len()..];

    let mut out = if leaf.code {
        code_span(core)
    } else {
        escape_text(core)
    };
    if leaf.italic {
        out = format!("*{out}*");
    }
    if leaf.bold {
        out = format!("**{out}**");
    }
    if leaf.strikethrough {
        out = format!("~~{out}~~");
    }
    if let Some(url) = &leaf.url {
        out = format!("[{out}]({})", link_destination(url));
    }
    format!("{lead}{out}{trail}")
}

fn is_autolink(url: &str) -> bool {
    (url.starts_with("http://") || url.starts_with("https://"))
        && !url.contains(|c: char| c.is_whitespace() || c == '<' || c == '>')
}

fn code_span(text: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for ch in text.chars() {
        run = if ch == '`' { run + 1 } else { 0 };
        longest = longest.max(run);
    }
    let fence = "`".repeat(longest + 1);
    let padded = text.starts_with('`')
        || text.ends_with('`')
        || (text.starts_with(' ') && text.ends_with(' ') && !text.trim().is_empty());
    if padded {
        format!("{fence} {text} {fence}")
    } else {
        format!("{fence}{text}{fence}")
    }
}

fn link_destination(url: &str) -> String {
    let bracketed = url.is_empty()
        || url.contains(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | '<' | '>'));
    if bracketed {
        format!("<{}>", url.replace('<', "%3C").replace('>', "%3E"))
    } else {
        url.to_string()
    }
}

/// Backslash-escape the characters that would start inline Markdown constructs.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (index, ch) in text.char_indices() {
        match ch {
            '\\' | '*' | '_' | '`' | '[' | ']' | '~' | '$' => {
                out.push('\\');
                out.push(ch);
            }
            '&' if ENTITY.is_match(&text[index..]) => out.push_str("\\&"),
            '<' if starts_standard_tag(&text[index..]) => out.push_str("\\<"),
            _ => out.push(ch),
        }
    }
    out
}

/// Whether `text` opens with a tag the parser would read as HTML markup.
///
/// Non-standard tags stay literal: they re-parse as text anyway.
fn starts_standard_tag(text: &str) -> bool {
    TAG_START
        .captures(text)
        .and_then(|caps| caps.get(1))
        .is_some_and(|name| is_standard_tag(name.as_str()))
}

/// Escape block markers (`#`, `>`, `-`, `+`, `1.`) at the start of each paragraph line.
fn escape_line_starts(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            let block_start = line.starts_with('#')
                || line.starts_with('>')
                || line.starts_with("+ ")
                || line == "+"
                || line.starts_with("- ")
                || RULE_LINE.is_match(line);
            if block_start {
                return format!("\\{line}");
            }
            match ORDERED_MARKER.captures(line).and_then(|caps| caps.get(1)) {
                Some(digits) => format!("{}\\{}", digits.as_str(), &line[digits.end()..]),
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
