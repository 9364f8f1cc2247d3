use comrak::nodes::{AstNode, NodeValue};
use mdtree::{
    parse_markdown, to_markdown, ConvertOptions, ElementKind, Node, ParseContext, ParseRule,
    PluginSet, SerializeContext, SerializeRule,
};
use pretty_assertions::assert_eq;

/// Turns block quotes into column cells, converting their children recursively.
struct QuoteAsColumn;

impl ParseRule for QuoteAsColumn {
    fn name(&self) -> &str {
        "quote-as-column"
    }

    fn matches<'a>(&self, node: &'a AstNode<'a>) -> bool {
        matches!(node.data.borrow().value, NodeValue::BlockQuote)
    }

    fn convert<'a>(&self, node: &'a AstNode<'a>, ctx: &mut ParseContext<'_>) -> Vec<Node> {
        let children = ctx.convert_children(node);
        vec![Node::element(ElementKind::ColumnCell, children)]
    }
}

/// Claims every thematic break.
struct StarRule;

impl SerializeRule for StarRule {
    fn matches(&self, node: &Node, _ctx: &SerializeContext<'_>) -> bool {
        node.kind() == Some(&ElementKind::Hr)
    }

    fn convert(&self, _node: &Node, _ctx: &SerializeContext<'_>) -> String {
        "* * *".to_string()
    }
}

/// Renders code leaves inside list items as `<kbd>`.
struct KbdInLists;

impl SerializeRule for KbdInLists {
    fn matches(&self, node: &Node, ctx: &SerializeContext<'_>) -> bool {
        let in_item = ctx
            .ancestors()
            .iter()
            .any(|ancestor| matches!(ancestor.kind(), Some(ElementKind::ListItem { .. })));
        in_item && node.as_leaf().is_some_and(|leaf| leaf.code)
    }

    fn convert(&self, node: &Node, _ctx: &SerializeContext<'_>) -> String {
        format!("<kbd>{}</kbd>", node.plain_text())
    }
}

#[test]
fn test_parse_rule_intercepts_block() {
    let plugins = PluginSet::new().with_parse_rule(QuoteAsColumn);
    let doc = parse_markdown("> inside **quote**", &plugins, &ConvertOptions::default());
    assert_eq!(doc.nodes.len(), 1);
    assert_eq!(doc.nodes[0].kind(), Some(&ElementKind::ColumnCell));
    assert_eq!(doc.nodes[0].plain_text(), "inside quote");
}

#[test]
fn test_parse_rule_does_not_touch_other_nodes() {
    let plugins = PluginSet::new().with_parse_rule(QuoteAsColumn);
    let doc = parse_markdown("plain", &plugins, &ConvertOptions::default());
    assert_eq!(doc.nodes[0].kind(), Some(&ElementKind::Paragraph));
}

#[test]
fn test_serialize_rules() {
    let plugins = PluginSet::new()
        .with_serialize_rule(StarRule)
        .with_serialize_rule(KbdInLists);
    let options = ConvertOptions::default();
    let doc = parse_markdown("Use `ls`\n\n---\n\n- run `ls`", &PluginSet::default(), &options);
    let out = to_markdown(&doc.nodes, "", &[], &plugins, &options);
    assert_eq!(out, "Use `ls`\n\n* * *\n\n- run <kbd>ls</kbd>");
}

#[test]
fn test_serialize_rule_sees_caller_ancestors() {
    struct ParentProbe;

    impl SerializeRule for ParentProbe {
        fn matches(&self, node: &Node, ctx: &SerializeContext<'_>) -> bool {
            node.as_leaf().is_some() && ctx.ancestors().len() >= 2
        }

        fn convert(&self, node: &Node, ctx: &SerializeContext<'_>) -> String {
            format!("{}@{}", node.plain_text(), ctx.ancestors().len())
        }
    }

    let options = ConvertOptions::default();
    let outer = parse_markdown("> x", &PluginSet::default(), &options).nodes;
    let plugins = PluginSet::new().with_serialize_rule(ParentProbe);
    let out = to_markdown(
        &[Node::paragraph(vec![Node::text("y")])],
        "",
        &outer,
        &plugins,
        &options,
    );
    assert_eq!(out, "y@2");
}
