//! Plugin rules
//!
//! Callers can intercept the conversion of individual nodes in either direction. A rule is a
//! match/convert pair; rules are tried in registration order and the first match wins, skipping
//! the built-in handling for that node entirely.
//!
//! Children are not automatically plugin-processed. A rule that wants recursive conversion calls
//! back into the converter through the context it receives:
//!
//! ```ignore
//! struct Callout;
//!
//! impl ParseRule for Callout {
//!     fn matches<'a>(&self, node: &'a AstNode<'a>) -> bool {
//!         matches!(node.data.borrow().value, NodeValue::BlockQuote)
//!     }
//!
//!     fn convert<'a>(&self, node: &'a AstNode<'a>, ctx: &mut ParseContext<'_>) -> Vec<Node> {
//!         let children = ctx.convert_children(node);
//!         vec![Node::element(ElementKind::ColumnCell, children)]
//!     }
//! }
//!
//! let plugins = PluginSet::new().with_parse_rule(Callout);
//! ```

use crate::formats::markdown::parser::ParseContext;
use crate::formats::markdown::serializer::SerializeContext;
use crate::tree::Node;
use comrak::nodes::AstNode;
use std::fmt;

/// Intercepts the forward conversion of one external parse node.
pub trait ParseRule: Send + Sync {
    /// Short identifier used in log output.
    fn name(&self) -> &str {
        "parse-rule"
    }

    fn matches<'a>(&self, node: &'a AstNode<'a>) -> bool;

    /// Produce the Document Tree nodes replacing `node`. The result is used verbatim.
    fn convert<'a>(&self, node: &'a AstNode<'a>, ctx: &mut ParseContext<'_>) -> Vec<Node>;
}

/// Intercepts the reverse conversion of one Document Tree node.
pub trait SerializeRule: Send + Sync {
    /// Short identifier used in log output.
    fn name(&self) -> &str {
        "serialize-rule"
    }

    fn matches(&self, node: &Node, ctx: &SerializeContext<'_>) -> bool;

    /// Produce the Markdown for `node`, without the surrounding indentation prefix.
    fn convert(&self, node: &Node, ctx: &SerializeContext<'_>) -> String;
}

/// Ordered, caller-supplied conversion rules for both directions.
#[derive(Default)]
pub struct PluginSet {
    parse_rules: Vec<Box<dyn ParseRule>>,
    serialize_rules: Vec<Box<dyn SerializeRule>>,
}

impl PluginSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a forward rule; earlier rules take precedence.
    pub fn register_parse_rule<R: ParseRule + 'static>(&mut self, rule: R) {
        self.parse_rules.push(Box::new(rule));
    }

    /// Append a reverse rule; earlier rules take precedence.
    pub fn register_serialize_rule<R: SerializeRule + 'static>(&mut self, rule: R) {
        self.serialize_rules.push(Box::new(rule));
    }

    pub fn with_parse_rule<R: ParseRule + 'static>(mut self, rule: R) -> Self {
        self.register_parse_rule(rule);
        self
    }

    pub fn with_serialize_rule<R: SerializeRule + 'static>(mut self, rule: R) -> Self {
        self.register_serialize_rule(rule);
        self
    }

    /// First forward rule that matches `node`.
    pub fn find_parse_rule<'a>(&self, node: &'a AstNode<'a>) -> Option<&dyn ParseRule> {
        self.parse_rules
            .iter()
            .map(|rule| rule.as_ref())
            .find(|rule| rule.matches(node))
    }

    /// First reverse rule that matches `node`.
    pub fn find_serialize_rule(
        &self,
        node: &Node,
        ctx: &SerializeContext<'_>,
    ) -> Option<&dyn SerializeRule> {
        self.serialize_rules
            .iter()
            .map(|rule| rule.as_ref())
            .find(|rule| rule.matches(node, ctx))
    }

    pub fn is_empty(&self) -> bool {
        self.parse_rules.is_empty() && self.serialize_rules.is_empty()
    }
}

impl fmt::Debug for PluginSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parse: Vec<_> = self.parse_rules.iter().map(|rule| rule.name()).collect();
        let serialize: Vec<_> = self
            .serialize_rules
            .iter()
            .map(|rule| rule.name())
            .collect();
        f.debug_struct("PluginSet")
            .field("parse_rules", &parse)
            .field("serialize_rules", &serialize)
            .finish()
    }
}
