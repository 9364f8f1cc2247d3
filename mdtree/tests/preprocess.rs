//! Text level passes, exercised through the public API.

use mdtree::{
    extract_tagged_blocks, markdown_to_tree, normalize_spacing, normalize_table_newlines,
    preprocess, strip_custom_tags, ConvertOptions,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn test_spacing_examples() {
    assert_eq!(normalize_spacing("用Go写（示例）"), "用 Go 写（示例）");
    assert_eq!(normalize_spacing("`中文abc` 和abc"), "`中文abc` 和 abc");
}

#[test]
fn test_spacing_leaves_destinations_tags_and_math_alone() {
    assert_eq!(
        normalize_spacing("[链接](https://a.com/路径a)"),
        "[链接](https://a.com/路径a)"
    );
    assert_eq!(
        normalize_spacing("![图](img/图片a.png)说明a"),
        "![图](img/图片a.png)说明 a"
    );
    assert_eq!(
        normalize_spacing("<!--{\"title\":\"销售额Q1\"}-->\n| a |"),
        "<!--{\"title\":\"销售额Q1\"}-->\n| a |"
    );
    assert_eq!(
        normalize_spacing("<span title=\"中文a\">文本</span>"),
        "<span title=\"中文a\">文本</span>"
    );
    assert_eq!(normalize_spacing("公式$a中b$结束"), "公式$a中b$结束");
    assert_eq!(normalize_spacing("<https://x.io/中文a>"), "<https://x.io/中文a>");
}

#[test]
fn test_spacing_skips_multiline_comments() {
    let text = "<!--\n说明a\n-->\n中文a";
    assert_eq!(normalize_spacing(text), "<!--\n说明a\n-->\n中文 a");
}

#[test]
fn test_cjk_link_destination_survives_parsing() {
    let doc = markdown_to_tree("[链接](https://a.com/路径a)");
    assert_eq!(doc.links.len(), 1);
    assert_eq!(doc.links[0].target, "https://a.com/路径a");
    assert_eq!(doc.nodes[0].plain_text(), "链接");
}

#[test]
fn test_think_block_is_fenced() {
    assert_eq!(
        extract_tagged_blocks("<think>abc</think>", "think"),
        "```think\nabc\n```"
    );
}

#[test]
fn test_answer_tag_survives_stripping() {
    let stripped = strip_custom_tags("<answer><box>42</box></answer>", "answer");
    assert_eq!(stripped, "<answer>42</answer>");
}

#[test]
fn test_table_gets_trailing_blank_line() {
    assert_eq!(
        normalize_table_newlines("| a |\n|---|\n| 1 |\ntext"),
        "| a |\n|---|\n| 1 |\n\ntext"
    );
}

#[test]
fn test_passes_can_be_disabled() {
    let options = ConvertOptions {
        normalize_spacing: false,
        extract_tagged_blocks: false,
        ..ConvertOptions::default()
    };
    assert_eq!(preprocess("中文abc <think>x</think>", &options), "中文abc <think>x</think>");
}

fn mixed_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("中文".to_string()),
            Just("abc".to_string()),
            Just("12".to_string()),
            Just(" ".to_string()),
            Just("（".to_string()),
            Just("`".to_string()),
            Just("\n".to_string()),
            Just("```".to_string()),
        ],
        0..24,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn spacing_is_idempotent(text in mixed_text()) {
        let once = normalize_spacing(&text);
        prop_assert_eq!(normalize_spacing(&once), once);
    }

    #[test]
    fn table_normalization_is_idempotent(rows in prop::collection::vec("[a-z0-9 ]{0,6}", 1..5)) {
        let mut text = String::from("| h |\n|---|\n");
        for row in &rows {
            text.push_str(&format!("| {row} |\n"));
        }
        text.push_str("\n\n\nafter");
        let once = normalize_table_newlines(&text);
        prop_assert_eq!(normalize_table_newlines(&once), once);
    }
}
