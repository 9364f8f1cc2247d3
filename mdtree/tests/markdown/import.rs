use super::{kinds, leaves};
use insta::assert_snapshot;
use mdtree::formats::treeviz::to_treeviz_str;
use mdtree::{markdown_to_tree, ElementKind, Mention, Node};
use pretty_assertions::assert_eq;
use serde_json::json;

fn texts(nodes: &[Node], index: usize) -> Vec<String> {
    leaves(nodes, index)
        .iter()
        .map(|leaf| leaf.text.clone())
        .collect()
}

#[test]
fn test_heading_and_marks() {
    let doc = markdown_to_tree("# Title\n\nSome **bold** and *italic*.");
    assert_eq!(
        kinds(&doc.nodes),
        vec![
            Some(&ElementKind::Heading { level: 1 }),
            Some(&ElementKind::Paragraph)
        ]
    );

    let runs = leaves(&doc.nodes, 1);
    assert_eq!(texts(&doc.nodes, 1), vec!["Some ", "bold", " and ", "italic", "."]);
    assert!(runs[1].bold && !runs[1].italic);
    assert!(runs[3].italic && !runs[3].bold);
}

#[test]
fn test_nested_marks_compose() {
    let doc = markdown_to_tree("***both*** and ~~gone~~");
    let runs = leaves(&doc.nodes, 0);
    assert!(runs[0].bold && runs[0].italic);
    assert_eq!(runs[0].text, "both");
    assert!(runs[2].strikethrough);
}

#[test]
fn test_html_marks_become_leaf_marks() {
    let doc = markdown_to_tree("a <b>bold <i>both</i></b> <span style=\"color: red\">red</span>");
    let runs = leaves(&doc.nodes, 0);
    let bold = runs.iter().find(|leaf| leaf.text == "bold ").unwrap();
    assert!(bold.bold);
    let both = runs.iter().find(|leaf| leaf.text == "both").unwrap();
    assert!(both.bold && both.italic);
    let red = runs.iter().find(|leaf| leaf.text == "red").unwrap();
    assert_eq!(red.high_color.as_deref(), Some("red"));
    assert!(!red.bold);
}

#[test]
fn test_think_block_becomes_code() {
    let doc = markdown_to_tree("<think>abc</think>");
    assert_eq!(doc.nodes.len(), 1);
    assert_eq!(
        doc.nodes[0].kind(),
        Some(&ElementKind::Code {
            language: Some("think".into()),
            value: "abc".into(),
            frontmatter: false,
            is_config: false,
            raw_html: false,
        })
    );
}

#[test]
fn test_custom_tag_is_kept_as_text() {
    let doc = markdown_to_tree("<foo>bar</foo>");
    assert_eq!(kinds(&doc.nodes), vec![Some(&ElementKind::Paragraph)]);
    assert_eq!(texts(&doc.nodes, 0), vec!["<foo>", "bar", "</foo>"]);
}

#[test]
fn test_empty_input() {
    let doc = markdown_to_tree("");
    assert_eq!(doc.nodes.len(), 1);
    assert!(doc.nodes[0].as_element().unwrap().is_empty_paragraph());
    assert!(doc.links.is_empty());
}

#[test]
fn test_blank_line_gap() {
    let doc = markdown_to_tree("a\n\n\nb");
    assert_eq!(doc.nodes.len(), 2);

    let doc = markdown_to_tree("a\n\n\n\n\n\nb");
    assert_eq!(doc.nodes.len(), 4);
    assert!(doc.nodes[1].as_element().unwrap().is_empty_paragraph());
    assert!(doc.nodes[2].as_element().unwrap().is_empty_paragraph());
}

#[test]
fn test_task_list() {
    let doc = markdown_to_tree("- [x] done\n- [ ] todo");
    let list = doc.nodes[0].as_element().unwrap();
    assert_eq!(
        list.kind,
        ElementKind::List {
            order: false,
            start: None,
            task: true
        }
    );
    let checked: Vec<_> = list
        .children
        .iter()
        .map(|item| match item.kind() {
            Some(ElementKind::ListItem { checked, .. }) => *checked,
            _ => None,
        })
        .collect();
    assert_eq!(checked, vec![Some(true), Some(false)]);
    assert_eq!(list.children[0].plain_text(), "done");
}

#[test]
fn test_ordered_list_start() {
    let doc = markdown_to_tree("3. three\n4. four");
    assert!(matches!(
        doc.nodes[0].kind(),
        Some(ElementKind::List {
            order: true,
            start: Some(3),
            ..
        })
    ));
}

#[test]
fn test_list_item_mention() {
    let doc = markdown_to_tree("- [Alice](https://a.io/alice.png?id=7) joined the team");
    let item = doc.nodes[0].as_element().unwrap().children[0]
        .as_element()
        .unwrap();
    let ElementKind::ListItem { mentions, .. } = &item.kind else {
        panic!("expected a list item, got {:?}", item.kind);
    };
    assert_eq!(
        mentions,
        &vec![Mention {
            avatar: "https://a.io/alice.png".into(),
            name: "Alice".into(),
            id: Some("7".into()),
        }]
    );
    assert_eq!(item.children[0].plain_text(), "joined the team");
}

#[test]
fn test_front_matter() {
    let doc = markdown_to_tree("---\ntitle: Notes\ntags: [a]\n---\n\nBody");
    assert!(matches!(
        doc.nodes[0].kind(),
        Some(ElementKind::Code {
            frontmatter: true,
            value,
            ..
        }) if value == "title: Notes\ntags: [a]"
    ));
    assert_eq!(doc.nodes[1].plain_text(), "Body");
}

#[test]
fn test_media_is_hoisted_out_of_paragraph() {
    let doc = markdown_to_tree("before ![pic](a.png) after");
    let names: Vec<_> = doc
        .nodes
        .iter()
        .map(|node| node.kind().map(ElementKind::type_name))
        .collect();
    assert_eq!(
        names,
        vec![Some("paragraph"), Some("media"), Some("paragraph")]
    );
    let Some(ElementKind::Media(media)) = doc.nodes[1].kind() else {
        panic!("expected media");
    };
    assert_eq!(media.url, "a.png");
    assert_eq!(media.media_type, "image");
    assert_eq!(media.alt.as_deref(), Some("pic"));
}

#[test]
fn test_html_video() {
    let doc = markdown_to_tree("<video src=\"clip.mp4\" controls width=\"320\"></video>");
    let Some(ElementKind::Media(media)) = doc.nodes[0].kind() else {
        panic!("expected media, got {:?}", doc.nodes[0]);
    };
    assert_eq!(media.media_type, "video");
    assert_eq!(media.url, "clip.mp4");
    assert_eq!(media.width.as_deref(), Some("320"));
    assert!(media.controls);
}

#[test]
fn test_download_anchor_becomes_attach() {
    let doc = markdown_to_tree(
        "<a href=\"/files/q3.pdf\" download=\"q3.pdf\" data-size=\"2MB\">Q3 report</a>",
    );
    assert_eq!(
        doc.nodes[0].kind(),
        Some(&ElementKind::Attach {
            url: "/files/q3.pdf".into(),
            name: "q3.pdf".into(),
            size: Some("2MB".into()),
        })
    );
}

#[test]
fn test_link_card() {
    let doc = markdown_to_tree("[Docs](https://docs.example.com \"card\")");
    assert_eq!(
        doc.nodes[0].kind(),
        Some(&ElementKind::LinkCard {
            url: "https://docs.example.com".into(),
            name: "Docs".into(),
        })
    );
}

#[test]
fn test_placeholder_tag() {
    let doc = markdown_to_tree("Hello `${placeholder:Name,initialValue:World}`!");
    let runs = leaves(&doc.nodes, 0);
    let tag = runs.iter().find(|leaf| leaf.tag).unwrap();
    assert_eq!(tag.placeholder.as_deref(), Some("Name"));
    assert_eq!(tag.text, "World");
    assert!(!tag.code);
}

#[test]
fn test_footnotes_move_to_end() {
    let doc = markdown_to_tree("[^1]: See [spec](https://example.com/spec)\n\nClaim[^1].\n\nMore.");
    let last = doc.nodes.last().unwrap();
    assert_eq!(
        last.kind(),
        Some(&ElementKind::FootnoteDefinition {
            identifier: "1".into(),
            url: "https://example.com/spec".into(),
            value: "spec".into(),
        })
    );
    let claim = leaves(&doc.nodes, 0);
    assert_eq!(claim[1].identifier.as_deref(), Some("1"));
}

#[test]
fn test_math() {
    let doc = markdown_to_tree("Inline $a+b$ here.\n\n```math\nE = mc^2\n```");
    let inline = doc.nodes[0].as_element().unwrap();
    assert!(inline
        .children
        .iter()
        .any(|child| child.kind() == Some(&ElementKind::InlineKatex) && child.plain_text() == "a+b"));
    assert_eq!(
        doc.nodes[1].kind(),
        Some(&ElementKind::KatexBlock {
            value: "E = mc^2".into()
        })
    );
}

#[test]
fn test_schema_fence_tolerates_partial_json() {
    let doc = markdown_to_tree("```schema\n{\"type\": \"form\", \"fields\": [\"na");
    assert_eq!(
        doc.nodes[0].kind(),
        Some(&ElementKind::Schema {
            language: "schema".into(),
            value: json!({"type": "form", "fields": ["na"]}),
        })
    );
}

#[test]
fn test_config_comment_attaches_to_next_block() {
    let doc = markdown_to_tree("<!--{\"align\":\"center\"}-->\nHello");
    assert!(matches!(
        doc.nodes[0].kind(),
        Some(ElementKind::Code {
            is_config: true,
            ..
        })
    ));
    let props = doc.nodes[1].other_props().unwrap();
    assert_eq!(props["align"], json!("center"));
}

#[test]
fn test_config_comment_stays_inside_its_container() {
    let doc = markdown_to_tree("> <!--{\"a\":1}-->\n\npara");
    assert_eq!(
        kinds(&doc.nodes),
        vec![Some(&ElementKind::Blockquote), Some(&ElementKind::Paragraph)]
    );
    assert_eq!(doc.nodes[1].other_props(), None);

    let doc = markdown_to_tree("- item\n\n  <!--{\"a\":1}-->\n\nafter");
    assert_eq!(doc.nodes.last().unwrap().other_props(), None);
}

#[test]
fn test_plain_comment_is_raw_html() {
    let doc = markdown_to_tree("<!-- just a note -->");
    assert!(matches!(
        doc.nodes[0].kind(),
        Some(ElementKind::Code {
            raw_html: true,
            is_config: false,
            ..
        })
    ));
}

#[test]
fn test_links_are_recorded() {
    let doc = markdown_to_tree("Intro\n\n- see [docs](https://d.io) and <https://x.io>");
    let targets: Vec<_> = doc.links.iter().map(|link| link.target.as_str()).collect();
    assert_eq!(targets, vec!["https://d.io", "https://x.io"]);
}

#[test]
fn test_outline_snapshot() {
    let doc = markdown_to_tree("## Plan\n\n1. **ship**\n2. rest");
    assert_snapshot!(to_treeviz_str(&doc).trim_end(), @r###"
    ⧉ Document (2 nodes, 0 links)
    ├─ § h2
    │ └─ ◦ "Plan"
    └─ ☰ 2 ordered items
      ├─ • item
      │ └─ ¶ paragraph
      │   └─ ◦ "ship" [b]
      └─ • item
        └─ ¶ paragraph
          └─ ◦ "rest"
    "###);
}
