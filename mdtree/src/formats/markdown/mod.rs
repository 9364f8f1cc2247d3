//! Markdown format implementation
//!
//! Bidirectional conversion between GFM Markdown and the Document Tree.
//!
//! # Library Choice
//!
//! Parsing goes through `comrak` (GFM tables, task lists, footnotes, dollar math, front matter).
//! Serialization writes text directly; see `serializer.rs` for why comrak's writer is not used.
//! Raw HTML fragments are read with `html5ever`.
//!
//! # Element Mapping Table
//!
//! | Tree node             | Markdown                         | Import notes                          |
//! |-----------------------|----------------------------------|---------------------------------------|
//! | paragraph             | paragraph                        | media hoisted out into siblings       |
//! | heading               | `#`..`######`                    | direct                                |
//! | blockquote            | `> `                             | direct                                |
//! | list / list-item      | `- ` / `N. `, `[x]`/`[ ]`        | leading link becomes a mention        |
//! | code                  | fenced block                     | front matter, raw HTML, config comment|
//! | schema                | ```` ```schema ````              | tolerant JSON                         |
//! | katex-block           | ```` ```math ```` / `$$`         | direct                                |
//! | inline-katex          | `$..$`                           | direct                                |
//! | table / chart / ...   | pipe table (+ config comment)    | table engine                          |
//! | media                 | `![alt](url)` or `<img>`/`<video>` | by extension or tag                 |
//! | attach                | `<a href download>`              | download anchors only                 |
//! | link-card             | `[name](url "card")`             | sole link with title `card`           |
//! | footnote-definition   | `[^id]: ..`                      | moved to the end of their container   |
//! | hr                    | `---`                            | direct                                |
//! | leaf marks            | `*` `**` `~~` `` ` `` or HTML    | HTML mark tags honoured               |
//!
//! # Lossy Conversions
//!
//! - Hard line breaks and soft breaks both become `"\n"` leaves.
//! - Footnote definitions keep only their text (or first link), not inline marks.
//! - Custom (non-standard) HTML tags are kept as literal text.

pub mod inline;
pub mod parser;
pub mod preprocess;
pub mod serializer;

use crate::error::FormatError;
use crate::format::Format;
use crate::options::ConvertOptions;
use crate::plugin::PluginSet;
use crate::tree::Document;

/// Format implementation for Markdown
#[derive(Debug, Default)]
pub struct MarkdownFormat {
    pub options: ConvertOptions,
}

impl MarkdownFormat {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }
}

impl Format for MarkdownFormat {
    fn name(&self) -> &str {
        "markdown"
    }

    fn description(&self) -> &str {
        "GFM Markdown"
    }

    fn file_extensions(&self) -> &[&str] {
        &["md", "markdown"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Document, FormatError> {
        Ok(parser::parse_markdown(
            source,
            &PluginSet::default(),
            &self.options,
        ))
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        Ok(serializer::to_markdown(
            &doc.nodes,
            "",
            &[],
            &PluginSet::default(),
            &self.options,
        ))
    }
}
