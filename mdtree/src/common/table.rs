//! Table/chart engine
//!
//! Tables get a columns/dataSource projection (the shape charting widgets consume), inferred or
//! explicit column alignment, and merged-cell spans. Depending on the configuration comment
//! preceding them they become a `table`, a `chart`, a `column-group` or a `description`.
//!
//! The projection lives in `otherProps` under [`COLUMNS_KEY`] and [`DATA_SOURCE_KEY`]; it is
//! derived data and is stripped again when the tree goes back to Markdown.

use super::width::display_width;
use crate::options::ConvertOptions;
use crate::tree::{Align, Element, ElementKind, Node};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};

pub const COLUMNS_KEY: &str = "columns";
pub const DATA_SOURCE_KEY: &str = "dataSource";

static NUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?|\.\d+)(?:[eE][+-]?\d+)?$")
        .expect("valid numeric regex")
});
static IN_PROGRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[+-]|[+-]?[\d,]*\d[\d,]*(?:\.\d*)?\.|[+-]?[\d,.]*\d[eE][+-]?)$")
        .expect("valid partial number regex")
});

/// A GFM table as read from the external parse tree.
#[derive(Debug, Clone, Default)]
pub struct TableInput {
    /// Inline content of each header cell.
    pub header: Vec<Vec<Node>>,
    /// Inline content of each body cell, row by row.
    pub rows: Vec<Vec<Vec<Node>>>,
    /// Alignment declared by the separator row.
    pub alignments: Vec<Option<Align>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    row_span: usize,
    col_span: usize,
}

/// Whether `value` is a complete number (signs, thousands separators, decimals, exponents).
pub fn is_numeric(value: &str) -> bool {
    NUMERIC.is_match(value)
}

/// Whether `value` looks like a number that is still being typed.
fn is_in_progress(value: &str, in_last_row: bool, digits: usize) -> bool {
    if IN_PROGRESS.is_match(value) {
        return true;
    }
    in_last_row && value.len() <= digits && value.chars().all(|c| c.is_ascii_digit())
}

/// Infer the alignment of one column from its body values.
///
/// The last row is left out while there are at least two, since it is the one being typed.
/// In-progress values leave the running decision untouched, so the result does not flicker
/// while a number is entered one keystroke at a time.
pub fn infer_alignment(values: &[&str], options: &ConvertOptions) -> Option<Align> {
    let considered = if values.len() >= 2 {
        &values[..values.len() - 1]
    } else {
        values
    };
    let last = considered.len().saturating_sub(1);
    let mut decision = None;
    for (index, value) in considered.iter().enumerate() {
        let value = value.trim();
        if value.is_empty()
            || is_in_progress(value, index == last, options.partial_number_digits)
        {
            continue;
        }
        if is_numeric(value) {
            decision = Some(Align::Right);
        } else {
            return None;
        }
    }
    decision
}

/// Plain text of a cell, with Markdown escapes for `_` and `"` removed.
pub fn cell_text(nodes: &[Node]) -> String {
    let text: String = nodes.iter().map(Node::plain_text).collect();
    text.trim().replace("\\_", "_").replace("\\\"", "\"")
}

/// Column descriptors; duplicate titles get a `_n` suffix on `dataIndex`/`key`.
pub fn build_columns(titles: &[String]) -> Vec<Value> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    titles
        .iter()
        .enumerate()
        .map(|(index, title)| {
            let base = if title.is_empty() {
                format!("column_{index}")
            } else {
                title.clone()
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let key = if *count == 0 {
                base.clone()
            } else {
                format!("{base}_{count}")
            };
            *count += 1;
            json!({ "title": title, "dataIndex": key, "key": key })
        })
        .collect()
}

fn config_lookup<'a>(config: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    config.get(key).or_else(|| {
        config
            .get("config")
            .and_then(Value::as_object)
            .and_then(|inner| inner.get(key))
    })
}

fn is_chart(config: &Map<String, Value>) -> bool {
    config_lookup(config, "chartType").is_some_and(|value| !value.is_null())
}

fn is_column_layout(config: &Map<String, Value>) -> bool {
    config_lookup(config, "elementType").and_then(Value::as_str) == Some("column")
}

/// Merge entries keyed by anchor cell, clamped to the `height` x `width` grid.
///
/// Entries anchored outside the grid are dropped.
fn merge_spans(
    config: &Map<String, Value>,
    height: usize,
    width: usize,
) -> HashMap<(usize, usize), Span> {
    let Some(entries) = config_lookup(config, "mergeCells").and_then(Value::as_array) else {
        return HashMap::new();
    };
    let field = |entry: &Value, key: &str| {
        entry
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|value| usize::try_from(value).ok())
    };
    entries
        .iter()
        .filter_map(|entry| {
            let row = field(entry, "row")?;
            let col = field(entry, "col")?;
            if row >= height || col >= width {
                log::debug!("merge cell ({row}, {col}) lies outside the table, ignored");
                return None;
            }
            let row_span = field(entry, "rowSpan")
                .unwrap_or(1)
                .clamp(1, height - row);
            let col_span = field(entry, "colSpan").unwrap_or(1).clamp(1, width - col);
            Some(((row, col), Span { row_span, col_span }))
        })
        .collect()
}

fn covered_cells(spans: &HashMap<(usize, usize), Span>) -> HashSet<(usize, usize)> {
    let mut hidden = HashSet::new();
    for (&(row, col), span) in spans {
        for r in row..row.saturating_add(span.row_span) {
            for c in col..col.saturating_add(span.col_span) {
                if (r, c) != (row, col) {
                    hidden.insert((r, c));
                }
            }
        }
    }
    hidden
}

fn cell_kind(
    row: usize,
    col: usize,
    align: Option<Align>,
    span: Option<&Span>,
    hidden: bool,
) -> ElementKind {
    ElementKind::TableCell {
        rows: row,
        cols: col,
        align,
        title: row == 0,
        row_span: span.map(|span| span.row_span),
        col_span: span.map(|span| span.col_span),
        hidden,
    }
}

/// Build the tree node for a table and its optional configuration comment.
pub fn build_table(
    input: TableInput,
    config: Option<Map<String, Value>>,
    options: &ConvertOptions,
) -> Element {
    let width = input.header.len().max(1);
    let mut grid: Vec<Vec<Vec<Node>>> = std::iter::once(input.header)
        .chain(input.rows)
        .map(|mut row| {
            row.truncate(width);
            row.resize_with(width, Vec::new);
            row
        })
        .collect();

    let mut config = config.unwrap_or_default();
    let spans = merge_spans(&config, grid.len(), width);
    let hidden = covered_cells(&spans);
    for &(row, col) in &hidden {
        if let Some(cell) = grid.get_mut(row).and_then(|cells| cells.get_mut(col)) {
            cell.clear();
        }
    }

    let titles: Vec<String> = grid[0].iter().map(|cell| cell_text(cell)).collect();
    let columns = build_columns(&titles);
    let keys: Vec<String> = columns
        .iter()
        .map(|column| column["dataIndex"].as_str().unwrap_or_default().to_string())
        .collect();
    let texts: Vec<Vec<String>> = grid[1..]
        .iter()
        .map(|row| row.iter().map(|cell| cell_text(cell)).collect())
        .collect();
    let data_source: Vec<Value> = texts
        .iter()
        .map(|row| {
            let record: Map<String, Value> = keys
                .iter()
                .zip(row)
                .map(|(key, text)| (key.clone(), Value::String(text.clone())))
                .collect();
            Value::Object(record)
        })
        .collect();

    let mut alignments = input.alignments;
    alignments.resize(width, None);
    if alignments.iter().all(Option::is_none) {
        alignments = (0..width)
            .map(|col| {
                let values: Vec<&str> = texts.iter().map(|row| row[col].as_str()).collect();
                infer_alignment(&values, options)
            })
            .collect();
    }

    let chart = is_chart(&config);
    let column_layout = !chart && is_column_layout(&config);
    if chart && !config.contains_key("config") {
        log::debug!("table re-shaped into chart");
        config = Map::from_iter([("config".to_string(), Value::Object(config))]);
    }
    config.insert(COLUMNS_KEY.to_string(), Value::Array(columns));
    config.insert(DATA_SOURCE_KEY.to_string(), Value::Array(data_source));

    if column_layout {
        log::debug!("table re-shaped into column group");
        let cells = grid
            .get(1)
            .cloned()
            .unwrap_or_else(|| vec![Vec::new(); width])
            .into_iter()
            .map(|cell| Node::element(ElementKind::ColumnCell, cell))
            .collect();
        return Element::new(ElementKind::ColumnGroup, cells).with_props(Some(config));
    }

    if !chart && grid.len() == 2 && width >= options.description_min_columns {
        log::debug!("single row table re-shaped into description");
        let mut cells = Vec::with_capacity(width * 2);
        let mut body = grid.pop().unwrap_or_default();
        let header = grid.pop().unwrap_or_default();
        for (col, term) in header.into_iter().enumerate() {
            let value = std::mem::take(&mut body[col]);
            cells.push(Node::element(cell_kind(0, col * 2, None, None, false), term));
            let mut value_kind = cell_kind(0, col * 2 + 1, None, None, false);
            if let ElementKind::TableCell { title, .. } = &mut value_kind {
                *title = false;
            }
            cells.push(Node::element(value_kind, value));
        }
        return Element::new(ElementKind::Description, cells).with_props(Some(config));
    }

    let rows = grid
        .into_iter()
        .enumerate()
        .map(|(row, cells)| {
            let cells = cells
                .into_iter()
                .enumerate()
                .map(|(col, content)| {
                    let kind = cell_kind(
                        row,
                        col,
                        alignments[col],
                        spans.get(&(row, col)),
                        hidden.contains(&(row, col)),
                    );
                    Node::element(kind, content)
                })
                .collect();
            Node::element(ElementKind::TableRow { rows: row }, cells)
        })
        .collect();
    let kind = if chart {
        ElementKind::Chart
    } else {
        ElementKind::Table
    };
    Element::new(kind, rows).with_props(Some(config))
}

/// `otherProps` without the derived table projection; `None` when nothing remains.
pub fn visible_props(props: Option<&Map<String, Value>>) -> Option<Map<String, Value>> {
    let mut props = props?.clone();
    props.remove(COLUMNS_KEY);
    props.remove(DATA_SOURCE_KEY);
    if props.is_empty() {
        None
    } else {
        Some(props)
    }
}

/// A table reduced to rendered strings, ready for pipe-table layout.
struct Grid {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    alignments: Vec<Option<Align>>,
}

fn is_hidden(node: &Node) -> bool {
    matches!(
        node.kind(),
        Some(ElementKind::TableCell { hidden: true, .. })
    )
}

fn cell_align(node: &Node) -> Option<Align> {
    match node.kind() {
        Some(ElementKind::TableCell { align, .. }) => *align,
        _ => None,
    }
}

fn grid_from(element: &Element, render: &dyn Fn(&[Node]) -> String) -> Grid {
    let render_cell = |node: &Node| {
        if is_hidden(node) {
            String::new()
        } else {
            node.as_element()
                .map(|cell| render(&cell.children))
                .unwrap_or_else(|| render(std::slice::from_ref(node)))
        }
    };

    match &element.kind {
        ElementKind::ColumnGroup => {
            let titles = projected_titles(element);
            let row: Vec<String> = element.children.iter().map(render_cell).collect();
            let header = (0..row.len())
                .map(|col| titles.get(col).cloned().unwrap_or_default())
                .collect();
            Grid {
                alignments: vec![None; row.len()],
                header,
                rows: vec![row],
            }
        }
        ElementKind::Description => {
            let mut header = Vec::new();
            let mut row = Vec::new();
            for pair in element.children.chunks(2) {
                header.push(render_cell(&pair[0]));
                row.push(pair.get(1).map(render_cell).unwrap_or_default());
            }
            Grid {
                alignments: vec![None; header.len()],
                header,
                rows: vec![row],
            }
        }
        _ => {
            let mut rows = element.children.iter().map(|row| {
                row.as_element()
                    .map(|row| row.children.as_slice())
                    .unwrap_or_default()
            });
            let header_cells = rows.next().unwrap_or_default();
            Grid {
                header: header_cells.iter().map(render_cell).collect(),
                alignments: header_cells.iter().map(cell_align).collect(),
                rows: rows
                    .map(|cells| cells.iter().map(render_cell).collect())
                    .collect(),
            }
        }
    }
}

fn projected_titles(element: &Element) -> Vec<String> {
    element
        .other_props
        .as_ref()
        .and_then(|props| props.get(COLUMNS_KEY))
        .and_then(Value::as_array)
        .map(|columns| {
            columns
                .iter()
                .map(|column| column["title"].as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Escape a rendered cell for a pipe table.
fn escape_cell(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.trim().chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '|' => out.push_str("\\|"),
            '\n' => out.push_str("<br>"),
            '\\' if chars.peek() == Some(&'|') => {
                chars.next();
                out.push_str("\\|");
            }
            _ => out.push(ch),
        }
    }
    out
}

fn justify(text: &str, width: usize, align: Option<Align>) -> String {
    let pad = width.saturating_sub(display_width(text));
    match align {
        Some(Align::Right) => format!("{}{text}", " ".repeat(pad)),
        Some(Align::Center) => {
            let left = pad / 2;
            format!("{}{text}{}", " ".repeat(left), " ".repeat(pad - left))
        }
        _ => format!("{text}{}", " ".repeat(pad)),
    }
}

/// Render a table-like element as a pipe table.
///
/// `render` turns a cell's inline children into Markdown.
pub fn serialize_table(element: &Element, render: &dyn Fn(&[Node]) -> String) -> String {
    let grid = grid_from(element, render);
    let columns = grid
        .rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(grid.header.len()))
        .max()
        .unwrap_or(0)
        .max(1);

    let normalize = |cells: &[String]| -> Vec<String> {
        (0..columns)
            .map(|col| cells.get(col).map(|cell| escape_cell(cell)).unwrap_or_default())
            .collect()
    };
    let header = normalize(&grid.header);
    let rows: Vec<Vec<String>> = grid.rows.iter().map(|row| normalize(row)).collect();

    let mut widths = vec![3; columns];
    for row in std::iter::once(&header).chain(rows.iter()) {
        for (col, cell) in row.iter().enumerate() {
            widths[col] = widths[col].max(display_width(cell));
        }
    }
    let align = |col: usize| grid.alignments.get(col).copied().flatten();

    let mut lines = Vec::with_capacity(rows.len() + 2);
    let render_row = |cells: &[String]| {
        let mut line = String::from("|");
        for (col, cell) in cells.iter().enumerate() {
            line.push_str(&format!(" {} |", justify(cell, widths[col], align(col))));
        }
        line
    };
    lines.push(render_row(&header));

    let mut separator = String::from("|");
    for (col, width) in widths.iter().enumerate() {
        let dashes = "-".repeat(width.saturating_sub(2));
        match align(col) {
            Some(Align::Left) => separator.push_str(&format!(" :{dashes}- |")),
            Some(Align::Right) => separator.push_str(&format!(" -{dashes}: |")),
            Some(Align::Center) => separator.push_str(&format!(" :{dashes}: |")),
            None => separator.push_str(&format!(" -{dashes}- |")),
        }
    }
    lines.push(separator);

    for row in &rows {
        lines.push(render_row(row));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(text: &str) -> Vec<Node> {
        vec![Node::text(text)]
    }

    fn input(header: &[&str], rows: &[&[&str]]) -> TableInput {
        TableInput {
            header: header.iter().map(|text| cell(text)).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|text| cell(text)).collect())
                .collect(),
            alignments: vec![None; header.len()],
        }
    }

    fn plain(nodes: &[Node]) -> String {
        nodes.iter().map(Node::plain_text).collect()
    }

    #[test]
    fn test_numeric_detection() {
        for value in ["1", "-2.5", "+3", "1,234,567.89", "6.02e23", ".5", "1E-3"] {
            assert!(is_numeric(value), "{value} should be numeric");
        }
        for value in ["abc", "1,23", "1.2.3", "-", "12.", "", "1e"] {
            assert!(!is_numeric(value), "{value} should not be numeric");
        }
    }

    #[test]
    fn test_alignment_ignores_value_being_typed() {
        let options = ConvertOptions::default();
        assert_eq!(
            infer_alignment(&["10", "20", "ab"], &options),
            Some(Align::Right)
        );
        assert_eq!(
            infer_alignment(&["10", "20", "30"], &options),
            Some(Align::Right)
        );
        assert_eq!(infer_alignment(&["10", "x", "30"], &options), None);
        assert_eq!(
            infer_alignment(&["10", "12.", "3"], &options),
            Some(Align::Right)
        );
        assert_eq!(infer_alignment(&["-", "1"], &options), None);
    }

    #[test]
    fn test_duplicate_columns_get_suffix() {
        let columns = build_columns(&["a".into(), "a".into(), "".into()]);
        assert_eq!(columns[0]["dataIndex"], "a");
        assert_eq!(columns[1]["dataIndex"], "a_1");
        assert_eq!(columns[1]["title"], "a");
        assert_eq!(columns[2]["key"], "column_2");
    }

    #[test]
    fn test_merge_cells_hide_covered_cells() {
        let config = json!({"mergeCells": [{"row": 1, "col": 0, "rowSpan": 2, "colSpan": 2}]});
        let table = build_table(
            input(&["a", "b", "c"], &[&["1", "2", "3"], &["4", "5", "6"]]),
            config.as_object().cloned(),
            &ConvertOptions::default(),
        );
        let mut hidden = Vec::new();
        for row in &table.children {
            for cell in &row.as_element().unwrap().children {
                if let Some(ElementKind::TableCell {
                    rows,
                    cols,
                    hidden: true,
                    ..
                }) = cell.kind()
                {
                    hidden.push((*rows, *cols));
                }
            }
        }
        hidden.sort();
        assert_eq!(hidden, vec![(1, 1), (2, 0), (2, 1)]);

        let primary = table.children[1].as_element().unwrap().children[0].kind();
        assert!(matches!(
            primary,
            Some(ElementKind::TableCell {
                row_span: Some(2),
                col_span: Some(2),
                hidden: false,
                ..
            })
        ));
    }

    #[test]
    fn test_merge_cells_are_clamped_to_the_grid() {
        let config = json!({"mergeCells": [
            {"row": u64::MAX, "col": 0, "rowSpan": 2},
            {"row": 0, "col": 9, "colSpan": 2},
            {"row": 1, "col": 1, "rowSpan": 30000, "colSpan": 30000},
        ]});
        let table = build_table(
            input(&["a", "b", "c"], &[&["1", "2", "3"]]),
            config.as_object().cloned(),
            &ConvertOptions::default(),
        );
        assert_eq!(table.children.len(), 2);
        let cells = &table.children[1].as_element().unwrap().children;
        assert_eq!(cells.len(), 3);
        assert!(matches!(
            cells[1].kind(),
            Some(ElementKind::TableCell {
                row_span: Some(1),
                col_span: Some(2),
                hidden: false,
                ..
            })
        ));
        assert!(matches!(
            cells[2].kind(),
            Some(ElementKind::TableCell { hidden: true, .. })
        ));
        assert!(matches!(
            cells[0].kind(),
            Some(ElementKind::TableCell { hidden: false, row_span: None, .. })
        ));
    }

    #[test]
    fn test_chart_config_is_nested() {
        let config = json!({"chartType": "bar"});
        let chart = build_table(
            input(&["m", "v"], &[&["jan", "1"], &["feb", "2"]]),
            config.as_object().cloned(),
            &ConvertOptions::default(),
        );
        assert_eq!(chart.kind, ElementKind::Chart);
        let props = chart.other_props.unwrap();
        assert_eq!(props["config"], json!({"chartType": "bar"}));
        assert_eq!(props[DATA_SOURCE_KEY][1], json!({"m": "feb", "v": "2"}));
    }

    #[test]
    fn test_single_wide_row_becomes_description() {
        let description = build_table(
            input(&["a", "b", "c", "d", "e"], &[&["1", "2", "3", "4", "5"]]),
            None,
            &ConvertOptions::default(),
        );
        assert_eq!(description.kind, ElementKind::Description);
        assert_eq!(description.children.len(), 10);
        assert_eq!(plain(&description.children[2..4]), "b2");
    }

    #[test]
    fn test_column_layout() {
        let config = json!({"elementType": "column"});
        let group = build_table(
            input(&["left", "right"], &[&["L", "R"]]),
            config.as_object().cloned(),
            &ConvertOptions::default(),
        );
        assert_eq!(group.kind, ElementKind::ColumnGroup);
        assert_eq!(group.children.len(), 2);
        assert_eq!(plain(&group.children), "LR");
    }

    #[test]
    fn test_excess_cells_dropped() {
        let table = build_table(
            input(&["a"], &[&["1", "2", "3"]]),
            None,
            &ConvertOptions::default(),
        );
        assert_eq!(table.children[1].as_element().unwrap().children.len(), 1);
    }

    #[test]
    fn test_serialize_alignments() {
        let mut table = input(&["A", "B"], &[&["1", "2"]]);
        table.alignments = vec![Some(Align::Left), Some(Align::Center)];
        let element = build_table(table, None, &ConvertOptions::default());
        let render = |nodes: &[Node]| plain(nodes);
        assert_eq!(
            serialize_table(&element, &render),
            "| A   |  B  |\n| :-- | :-: |\n| 1   |  2  |"
        );
    }

    #[test]
    fn test_serialize_cjk_and_pipes() {
        let element = build_table(
            input(&["名称", "x"], &[&["a|b", "中文字"]]),
            None,
            &ConvertOptions::default(),
        );
        let render = |nodes: &[Node]| plain(nodes);
        assert_eq!(
            serialize_table(&element, &render),
            "| 名称 | x      |\n| ---- | ------ |\n| a\\|b | 中文字 |"
        );
    }

    #[test]
    fn test_visible_props_strip_projection() {
        let element = build_table(input(&["a"], &[&["1"]]), None, &ConvertOptions::default());
        assert_eq!(visible_props(element.other_props.as_ref()), None);
    }
}
