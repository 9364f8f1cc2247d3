//! Icon mapping for tree visualization
//!
//! Keys are the serialized `type` tags of the Document Tree, plus `document` and `leaf`.

/// Get the Unicode icon for a node type tag
pub fn get_icon(node_type: &str) -> &'static str {
    match node_type {
        "document" => "⧉",
        "paragraph" => "¶",
        "heading" => "§",
        "blockquote" => "❝",
        "list" => "☰",
        "list-item" => "•",
        "code" => "𝒱",
        "schema" => "⚙",
        "katex-block" | "inline-katex" => "√",
        "table" | "description" => "▦",
        "table-row" => "═",
        "table-cell" | "column-cell" => "□",
        "chart" => "📊",
        "column-group" => "⫼",
        "media" => "▣",
        "attach" => "📎",
        "link-card" => "⊕",
        "footnote-definition" => "³",
        "hr" => "⎯",
        "break" => "↵",
        "leaf" => "◦",
        "props" => "⚑",
        _ => "○",
    }
}
