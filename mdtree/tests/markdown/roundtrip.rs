//! Markdown → tree → Markdown → tree must reproduce the first tree.

use mdtree::{markdown_to_tree, tree_to_markdown};
use pretty_assertions::assert_eq;

const CORPUS: &[&str] = &[
    "# Title\n\nSome *em* and **strong** text.",
    "- one\n- two\n\n1. a\n2. b",
    "> quote\n>\n> second paragraph",
    "```rust\nfn main() {}\n```",
    "| A | B |\n|:--|--:|\n| x | 1 |\n| y | 2 |",
    "A [link](https://example.com) and <https://auto.example.com> here.\n\n---\n\nEnd.",
    "中文 Rust 混排\n\n- [x] done\n- [ ] todo",
    "Text with footnote[^1].\n\n[^1]: Note text",
    "$$E = mc^2$$",
    "Inline `code` and $x^2$ math.",
    "1. outer\n   - inner one\n   - inner two\n2. next",
    "<!--{\"chartType\":\"line\"}-->\n| month | value |\n|---|---|\n| jan | 10 |\n| feb | 20 |",
    "```schema\n{\"type\": \"object\"}\n```",
    "---\ntitle: Doc\n---\n\n## Body",
    "<think>\nreasoning\n</think>\n\nAnswer.",
    "<del><b>gone</b></del> but <span style=\"color:#f00\">red</span>",
    "Escaped \\*stars\\* and \\_underscores\\_",
    "first\n\n\n\n\n\nsecond",
    "> <!--{\"a\":1}-->\n\npara",
    "a \\<b>bold and \\<span style=\"color:red\">x",
];

#[test]
fn test_round_trip_is_stable() {
    for source in CORPUS {
        let first = markdown_to_tree(source);
        let markdown = tree_to_markdown(&first.nodes);
        let second = markdown_to_tree(&markdown);
        assert_eq!(
            first.nodes, second.nodes,
            "source {source:?} re-serialized as {markdown:?}"
        );
        assert_eq!(first.links, second.links);
    }
}

#[test]
fn test_second_serialization_is_identical() {
    for source in CORPUS {
        let once = tree_to_markdown(&markdown_to_tree(source).nodes);
        let twice = tree_to_markdown(&markdown_to_tree(&once).nodes);
        assert_eq!(once, twice, "source {source:?}");
    }
}
