//! Conversion options
//!
//! The thresholds below are tuned for visual stability while text streams into an editor.
//! Their values are load-bearing, which is why they are configurable rather than hard coded.

use serde::{Deserialize, Serialize};

/// Configuration for both conversion directions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Minimum source line distance between two top-level blocks before
    /// synthetic empty paragraphs are inserted
    pub blank_line_gap: usize,

    /// Tag name whose blocks are fenced as code during preprocessing
    pub think_tag: String,

    /// Tag name left in place by preprocessing and demoted to text by the parser
    pub answer_tag: String,

    /// Insert spaces between CJK and Latin runs
    pub normalize_spacing: bool,

    /// Rewrite `<think_tag>` blocks into fenced code
    pub extract_tagged_blocks: bool,

    /// Remove non-standard tag pairs, keeping their content
    pub strip_custom_tags: bool,

    /// Fold newlines inside table rows into `<br>` and space tables from following text
    pub normalize_table_newlines: bool,

    /// Single-row tables with at least this many columns render as a description
    pub description_min_columns: usize,

    /// Numbers with at most this many digits in the last considered row are treated as still
    /// being typed when inferring column alignment
    pub partial_number_digits: usize,

    /// Code languages decoded as JSON into schema nodes
    pub schema_languages: Vec<String>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            blank_line_gap: 4,
            think_tag: "think".to_string(),
            answer_tag: "answer".to_string(),
            normalize_spacing: true,
            extract_tagged_blocks: true,
            strip_custom_tags: false,
            normalize_table_newlines: true,
            description_min_columns: 5,
            partial_number_digits: 1,
            schema_languages: vec!["schema".to_string(), "apaasify".to_string()],
        }
    }
}

impl ConvertOptions {
    pub fn is_schema_language(&self, language: &str) -> bool {
        self.schema_languages
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(language))
    }
}
