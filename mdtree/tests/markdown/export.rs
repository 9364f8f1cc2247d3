use mdtree::format::Format;
use mdtree::formats::markdown::MarkdownFormat;
use mdtree::{
    markdown_to_tree, to_markdown, tree_to_markdown, ConvertOptions, Element, ElementKind, Leaf,
    Media, Node, PluginSet,
};
use pretty_assertions::assert_eq;

fn normalize(markdown: &str) -> String {
    tree_to_markdown(&markdown_to_tree(markdown).nodes)
}

#[test]
fn test_basic_blocks() {
    assert_eq!(
        normalize("# Title\n\nSome **bold** text\n\n* a\n* b\n\n***"),
        "# Title\n\nSome **bold** text\n\n- a\n- b\n\n---"
    );
}

#[test]
fn test_code_fence_keeps_language() {
    assert_eq!(
        normalize("~~~rust\nfn main() {}\n~~~"),
        "```rust\nfn main() {}\n```"
    );
}

#[test]
fn test_strikethrough_with_bold_falls_back_to_html() {
    let leaf = Leaf {
        text: "gone".into(),
        bold: true,
        strikethrough: true,
        ..Leaf::default()
    };
    let out = tree_to_markdown(&[Node::paragraph(vec![leaf.into()])]);
    assert_eq!(out, "<del><b>gone</b></del>");
    assert!(!out.contains("~~"));

    assert_eq!(normalize("<del><b>gone</b></del>"), "<del><b>gone</b></del>");
}

#[test]
fn test_color_falls_back_to_html() {
    assert_eq!(
        normalize("<span style=\"color:red\">hot</span> take"),
        "<span style=\"color:red\">hot</span> take"
    );
}

#[test]
fn test_plain_strikethrough_stays_markdown() {
    assert_eq!(normalize("~~old~~ new"), "~~old~~ new");
}

#[test]
fn test_front_matter_and_placeholder() {
    let source = "---\ntitle: x\n---\n\nHi `${placeholder:Name,initialValue:Bob}`";
    assert_eq!(normalize(source), source);
}

#[test]
fn test_footnotes() {
    assert_eq!(
        normalize("Claim[^a].\n\n[^a]: [source](https://s.io)"),
        "Claim[^a].\n\n[^a]: [source](https://s.io)"
    );
}

#[test]
fn test_mention_and_task() {
    assert_eq!(
        normalize("- [x] [Ann](https://a.io/ann.png?id=3) reviewed"),
        "- [x] [Ann](https://a.io/ann.png?id=3) reviewed"
    );
}

#[test]
fn test_chart_config_comment_is_kept_verbatim() {
    let source =
        "<!--{\"chartType\":\"bar\"}-->\n| m   | v   |\n| --- | --- |\n| jan | 1   |\n| feb | 2   |";
    let doc = markdown_to_tree(source);
    assert!(doc
        .nodes
        .iter()
        .any(|node| node.kind() == Some(&ElementKind::Chart)));
    assert_eq!(tree_to_markdown(&doc.nodes), source);
}

#[test]
fn test_props_without_comment_are_written_as_json() {
    let mut props = serde_json::Map::new();
    props.insert("align".into(), serde_json::json!("center"));
    let paragraph = Element::new(ElementKind::Paragraph, vec![Node::text("centered")])
        .with_props(Some(props));
    assert_eq!(
        tree_to_markdown(&[paragraph.into()]),
        "<!--{\"align\":\"center\"}-->\ncentered"
    );
}

#[test]
fn test_media_with_size_uses_html() {
    let media = Media {
        url: "clip.mp4".into(),
        media_type: "video".into(),
        controls: true,
        ..Media::default()
    };
    assert_eq!(
        tree_to_markdown(&[Element::void(ElementKind::Media(media)).into()]),
        "<video src=\"clip.mp4\" controls></video>"
    );
}

#[test]
fn test_attach() {
    let attach = Element::void(ElementKind::Attach {
        url: "/f/a.zip".into(),
        name: "a.zip".into(),
        size: None,
    });
    assert_eq!(
        tree_to_markdown(&[attach.into()]),
        "<a href=\"/f/a.zip\" download=\"a.zip\">a.zip</a>"
    );
}

#[test]
fn test_lists_separated_by_break_stay_apart() {
    let list = |text: &str| {
        Node::element(
            ElementKind::List {
                order: false,
                start: None,
                task: false,
            },
            vec![Node::element(
                ElementKind::ListItem {
                    checked: None,
                    mentions: Vec::new(),
                },
                vec![Node::paragraph(vec![Node::text(text)])],
            )],
        )
    };
    let tree = vec![list("a"), Element::empty_paragraph().into(), list("b")];
    let out = tree_to_markdown(&tree);
    assert_eq!(out, "- a\n\n<br/>\n\n- b");

    let lists = markdown_to_tree(&out)
        .nodes
        .iter()
        .filter(|node| matches!(node.kind(), Some(ElementKind::List { .. })))
        .count();
    assert_eq!(lists, 2);
}

#[test]
fn test_initial_indent() {
    let tree = markdown_to_tree("one\n\n- two").nodes;
    let out = to_markdown(
        &tree,
        "    ",
        &[],
        &PluginSet::default(),
        &ConvertOptions::default(),
    );
    assert_eq!(out, "    one\n\n    - two");
}

#[test]
fn test_format_trait_serialize() {
    let doc = markdown_to_tree("> quoted");
    let out = MarkdownFormat::default().serialize(&doc).unwrap();
    assert_eq!(out, "> quoted");
}
