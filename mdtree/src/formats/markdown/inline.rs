//! Inline runs (comrak inline nodes → leaves)
//!
//! Marks accumulate on the way down: a text node inside `**_x_**` becomes one leaf carrying
//! both `bold` and `italic`. Inline HTML tags (`<b>`, `<span style="color:…">`, `<a href>`…)
//! open and close marks through a tag stack that belongs to a single container's children,
//! so an unbalanced tag never leaks into sibling paragraphs.

use super::parser::ParseContext;
use crate::common::html::{
    comment_body, is_mark_tag, is_media_html, media_from_html, parse_tag, Marks,
};
use crate::tree::{Element, ElementKind, Leaf, Media, Node};
use comrak::nodes::{AstNode, NodeValue};
use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\$\{placeholder:([^,}]*)(?:,initialValue:([^}]*))?\}$")
        .expect("valid placeholder regex")
});

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "m4v", "ogv", "m3u8"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "flac"];

/// A tag opened by inline HTML and the marks in effect inside it.
struct TagFrame {
    name: String,
    marks: Marks,
}

impl<'p> ParseContext<'p> {
    /// Convert the inline children of `node`, inheriting `marks`.
    pub(super) fn inline_children<'a>(
        &mut self,
        node: &'a AstNode<'a>,
        marks: &Marks,
    ) -> Vec<Node> {
        let mut out = Vec::new();
        let mut stack: Vec<TagFrame> = Vec::new();
        for child in node.children() {
            let current = stack
                .last()
                .map(|frame| frame.marks.clone())
                .unwrap_or_else(|| marks.clone());
            let raw = match &child.data.borrow().value {
                NodeValue::HtmlInline(raw) => Some(raw.clone()),
                _ => None,
            };
            match raw {
                Some(raw) => self.inline_html(&raw, &current, &mut stack, &mut out),
                None => out.extend(self.inline_node(child, &current)),
            }
        }
        out
    }

    fn inline_node<'a>(&mut self, node: &'a AstNode<'a>, marks: &Marks) -> Vec<Node> {
        let plugins = self.plugins;
        if let Some(rule) = plugins.find_parse_rule(node) {
            log::debug!("parse rule '{}' intercepted an inline node", rule.name());
            return rule.convert(node, self);
        }

        let value = node.data.borrow().value.clone();
        match value {
            NodeValue::Text(text) => vec![marks.leaf(text).into()],
            NodeValue::SoftBreak | NodeValue::LineBreak => vec![Node::text("\n")],
            NodeValue::Code(code) => vec![code_leaf(&code.literal, marks).into()],
            NodeValue::Emph => {
                let marks = Marks {
                    italic: true,
                    ..marks.clone()
                };
                self.inline_children(node, &marks)
            }
            NodeValue::Strong => {
                let marks = Marks {
                    bold: true,
                    ..marks.clone()
                };
                self.inline_children(node, &marks)
            }
            NodeValue::Strikethrough => {
                let marks = Marks {
                    strikethrough: true,
                    ..marks.clone()
                };
                self.inline_children(node, &marks)
            }
            NodeValue::Link(link) => {
                let marks = Marks {
                    url: Some(link.url),
                    ..marks.clone()
                };
                self.inline_children(node, &marks)
            }
            NodeValue::Image(link) => {
                let alt: String = self
                    .inline_children(node, &Marks::default())
                    .iter()
                    .map(Node::plain_text)
                    .collect();
                vec![Element::void(ElementKind::Media(image_media(&link.url, &alt))).into()]
            }
            NodeValue::FootnoteReference(reference) => vec![Leaf {
                text: reference.name.clone(),
                identifier: Some(reference.name),
                ..Leaf::default()
            }
            .into()],
            NodeValue::Math(math) => vec![Node::element(
                ElementKind::InlineKatex,
                vec![Node::text(math.literal)],
            )],
            _ => self.inline_children(node, marks),
        }
    }

    fn inline_html(
        &mut self,
        raw: &str,
        marks: &Marks,
        stack: &mut Vec<TagFrame>,
        out: &mut Vec<Node>,
    ) {
        if comment_body(raw).is_some() {
            return;
        }
        if is_media_html(raw) {
            if let Some(media) = media_from_html(raw) {
                out.push(Element::void(ElementKind::Media(media)).into());
                return;
            }
        }

        let Some(tag) = parse_tag(raw) else {
            out.push(marks.leaf(raw).into());
            return;
        };
        if tag.name == "br" {
            out.push(Node::text("\n"));
            return;
        }
        if !is_mark_tag(&tag.name) {
            out.push(marks.leaf(raw).into());
            return;
        }

        if tag.closing {
            if let Some(index) = stack.iter().rposition(|frame| frame.name == tag.name) {
                stack.truncate(index);
            }
        } else if !tag.self_closing {
            let mut inner = marks.clone();
            inner.apply_tag(&tag.name, |key| tag.attr(key).map(str::to_string));
            stack.push(TagFrame {
                name: tag.name.clone(),
                marks: inner,
            });
        }
    }
}

/// A code span, or a placeholder tag written as `` `${placeholder:Name,initialValue:V}` ``.
fn code_leaf(literal: &str, marks: &Marks) -> Leaf {
    if let Some(caps) = PLACEHOLDER.captures(literal) {
        let placeholder = caps.get(1).map(|m| m.as_str().to_string());
        let initial_value = caps.get(2).map(|m| m.as_str().to_string());
        return Leaf {
            text: initial_value.clone().unwrap_or_default(),
            tag: true,
            placeholder,
            initial_value,
            ..Leaf::default()
        };
    }
    Leaf {
        code: true,
        ..marks.leaf(literal)
    }
}

/// Media for a Markdown image; the extension decides between image, video and audio.
pub(crate) fn image_media(url: &str, alt: &str) -> Media {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let media_type = if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        "video"
    } else if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        "audio"
    } else {
        "image"
    };
    Media {
        url: url.to_string(),
        media_type: media_type.to_string(),
        alt: (!alt.is_empty()).then(|| alt.to_string()),
        ..Media::default()
    }
}
