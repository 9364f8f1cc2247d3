use mdtree::{markdown_to_tree, tree_to_markdown, Align, Element, ElementKind, Node};
use pretty_assertions::assert_eq;
use serde_json::json;

fn table(nodes: &[Node]) -> &Element {
    nodes
        .iter()
        .filter_map(Node::as_element)
        .find(|element| {
            matches!(
                element.kind,
                ElementKind::Table | ElementKind::Chart | ElementKind::Description
            )
        })
        .expect("a table-like node")
}

fn cells(row: &Node) -> &[Node] {
    &row.as_element().expect("row").children
}

fn header_alignments(nodes: &[Node]) -> Vec<Option<Align>> {
    cells(&table(nodes).children[0])
        .iter()
        .map(|cell| match cell.kind() {
            Some(ElementKind::TableCell { align, .. }) => *align,
            _ => None,
        })
        .collect()
}

#[test]
fn test_table_example() {
    let doc = markdown_to_tree("| A | B |\n|:--|:-:|\n| 1 | 2 |");
    let table = table(&doc.nodes);
    assert_eq!(table.kind, ElementKind::Table);
    assert_eq!(table.children.len(), 2);

    let header = cells(&table.children[0]);
    assert_eq!(header.len(), 2);
    assert_eq!(
        header[0].kind(),
        Some(&ElementKind::TableCell {
            rows: 0,
            cols: 0,
            align: Some(Align::Left),
            title: true,
            row_span: None,
            col_span: None,
            hidden: false,
        })
    );
    assert!(matches!(
        header[1].kind(),
        Some(ElementKind::TableCell {
            align: Some(Align::Center),
            ..
        })
    ));
    let body: Vec<_> = cells(&table.children[1])
        .iter()
        .map(Node::plain_text)
        .collect();
    assert_eq!(body, vec!["1", "2"]);

    let props = table.other_props.as_ref().unwrap();
    assert_eq!(props["columns"][1], json!({"title": "B", "dataIndex": "B", "key": "B"}));
    assert_eq!(props["dataSource"], json!([{"A": "1", "B": "2"}]));

    assert_eq!(
        tree_to_markdown(&doc.nodes),
        "| A   |  B  |\n| :-- | :-: |\n| 1   |  2  |"
    );
}

#[test]
fn test_numeric_column_is_right_aligned() {
    let doc = markdown_to_tree("| n | name |\n|---|---|\n| 10 | a |\n| 2,000 | b |\n| 3 | c |");
    assert_eq!(header_alignments(&doc.nodes), vec![Some(Align::Right), None]);
    assert!(tree_to_markdown(&doc.nodes).contains("| ----: |"));
}

#[test]
fn test_alignment_does_not_flicker_while_typing() {
    let typing = markdown_to_tree("| n |\n|---|\n| 10 |\n| 20 |\n| x |");
    let finished = markdown_to_tree("| n |\n|---|\n| 10 |\n| 20 |\n| 30 |");
    assert_eq!(
        header_alignments(&typing.nodes),
        header_alignments(&finished.nodes)
    );
    assert_eq!(header_alignments(&finished.nodes), vec![Some(Align::Right)]);

    let partial = markdown_to_tree("| n |\n|---|\n| 10 |\n| 1. |\n| 3 |");
    assert_eq!(header_alignments(&partial.nodes), vec![Some(Align::Right)]);
}

#[test]
fn test_merge_cells_hide_covered_cells() {
    let doc = markdown_to_tree(concat!(
        "<!--{\"mergeCells\":[{\"row\":1,\"col\":0,\"rowSpan\":2,\"colSpan\":2}]}-->\n",
        "| A | B | C |\n",
        "|---|---|---|\n",
        "| 1 | 2 | 3 |\n",
        "| 4 | 5 | 6 |",
    ));
    let table = table(&doc.nodes);
    let mut hidden = Vec::new();
    for row in &table.children {
        for cell in cells(row) {
            if let Some(ElementKind::TableCell {
                rows,
                cols,
                hidden: true,
                ..
            }) = cell.kind()
            {
                hidden.push((*rows, *cols));
                assert_eq!(cell.plain_text(), "");
            }
        }
    }
    hidden.sort();
    assert_eq!(hidden, vec![(1, 1), (2, 0), (2, 1)]);
    assert!(matches!(
        cells(&table.children[1])[0].kind(),
        Some(ElementKind::TableCell {
            row_span: Some(2),
            col_span: Some(2),
            hidden: false,
            ..
        })
    ));
}

#[test]
fn test_merge_cells_round_trip_comment() {
    let source = concat!(
        "<!--{\"mergeCells\":[{\"row\":1,\"col\":0,\"rowSpan\":1,\"colSpan\":2}]}-->\n",
        "| A   | B   |\n",
        "| --- | --- |\n",
        "| 1   |     |",
    );
    let doc = markdown_to_tree(source);
    assert_eq!(tree_to_markdown(&doc.nodes), source);
}

#[test]
fn test_single_wide_row_is_description() {
    let doc = markdown_to_tree("| a | b | c | d | e |\n|---|---|---|---|---|\n| 1 | 2 | 3 | 4 | 5 |");
    let description = table(&doc.nodes);
    assert_eq!(description.kind, ElementKind::Description);
    assert_eq!(description.children.len(), 10);
    assert_eq!(
        tree_to_markdown(&doc.nodes),
        concat!(
            "| a   | b   | c   | d   | e   |\n",
            "| --- | --- | --- | --- | --- |\n",
            "| 1   | 2   | 3   | 4   | 5   |",
        )
    );
}

#[test]
fn test_column_layout() {
    let doc = markdown_to_tree(
        "<!--{\"elementType\":\"column\"}-->\n| left | right |\n|---|---|\n| L | R |",
    );
    let group = doc
        .nodes
        .iter()
        .find(|node| node.kind() == Some(&ElementKind::ColumnGroup))
        .unwrap();
    let texts: Vec<_> = group
        .as_element()
        .unwrap()
        .children
        .iter()
        .map(Node::plain_text)
        .collect();
    assert_eq!(texts, vec!["L", "R"]);

    let out = tree_to_markdown(&doc.nodes);
    assert!(out.starts_with("<!--{\"elementType\":\"column\"}-->\n| left | right |"));
    assert!(out.ends_with("| L    | R     |"));
}

#[test]
fn test_cell_newlines_and_pipes() {
    let doc = markdown_to_tree("| k | v |\n|---|---|\n| a | first\nsecond |\n\nafter");
    let table = table(&doc.nodes);
    assert_eq!(table.children.len(), 2);
    let value = &cells(&table.children[1])[1];
    assert_eq!(value.plain_text(), "first\nsecond");
    assert_eq!(doc.nodes.last().unwrap().plain_text(), "after");

    let out = tree_to_markdown(&doc.nodes);
    assert!(out.contains("first<br>second"), "{out}");
}

#[test]
fn test_ragged_rows_are_padded() {
    let doc = markdown_to_tree("| a | b |\n|---|---|\n| 1 |");
    let table = table(&doc.nodes);
    assert_eq!(cells(&table.children[1]).len(), 2);
}

#[test]
fn test_cjk_width() {
    let doc = markdown_to_tree("| 名称 | x |\n|---|---|\n| 中文字 | 1 |");
    let out = tree_to_markdown(&doc.nodes);
    assert_eq!(
        out,
        "| 名称   | x   |\n| ------ | --- |\n| 中文字 | 1   |"
    );
}

#[test]
fn test_out_of_range_merge_cells_are_ignored() {
    let doc = markdown_to_tree(concat!(
        "<!--{\"mergeCells\":[{\"row\":18446744073709551615,\"col\":0,\"rowSpan\":2},",
        "{\"row\":1,\"col\":0,\"rowSpan\":30000,\"colSpan\":30000}]}-->\n",
        "| A | B |\n",
        "|---|---|\n",
        "| 1 | 2 |",
    ));
    let table = table(&doc.nodes);
    assert_eq!(table.children.len(), 2);
    assert!(matches!(
        cells(&table.children[1])[0].kind(),
        Some(ElementKind::TableCell {
            row_span: Some(1),
            col_span: Some(2),
            ..
        })
    ));
}
