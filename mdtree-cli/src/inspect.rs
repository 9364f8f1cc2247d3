//! Inspect transforms
//!
//! Each transform shows one stage of the Markdown pipeline:
//!
//! - `preprocessed`: the text after the normalization passes, as handed to the parser
//! - `tree-json`: the Document Tree as JSON
//! - `treeviz`: the Document Tree as an outline with Unicode icons
//! - `links`: one line per link record, `<path>\t<target>`
//!
//! Transforms accept extra parameters via `--extra-<name> [value]`:
//!
//! - `compact`: single line JSON for `tree-json`
//! - `props`: list configuration keys in `treeviz`

use mdtree::formats::json::JsonFormat;
use mdtree::formats::treeviz::to_treeviz_str_with_params;
use mdtree::{parse_markdown, preprocess, ConvertOptions, Format, PluginSet};
use std::collections::HashMap;

/// All available inspect transforms
pub const AVAILABLE_TRANSFORMS: &[&str] = &["tree-json", "treeviz", "preprocessed", "links"];

pub const DEFAULT_TRANSFORM: &str = "treeviz";

/// Execute a named transform on Markdown source.
pub fn execute_transform(
    source: &str,
    transform_name: &str,
    options: &ConvertOptions,
    extra_params: &HashMap<String, String>,
) -> Result<String, String> {
    log::debug!("inspect transform '{transform_name}'");
    if transform_name == "preprocessed" {
        return Ok(preprocess(source, options));
    }

    let doc = parse_markdown(source, &PluginSet::default(), options);
    match transform_name {
        "tree-json" => {
            let mut params = HashMap::new();
            if let Some(compact) = extra_params.get("compact") {
                params.insert("compact".to_string(), compact.clone());
            }
            JsonFormat
                .serialize_with_options(&doc, &params)
                .map(|mut json| {
                    json.push('\n');
                    json
                })
                .map_err(|e| e.to_string())
        }
        "treeviz" => {
            let mut params = HashMap::new();
            if let Some(props) = extra_params.get("props") {
                params.insert("props".to_string(), props.clone());
            }
            Ok(to_treeviz_str_with_params(&doc, &params))
        }
        "links" => Ok(doc
            .links
            .iter()
            .map(|link| {
                let path: Vec<String> = link.path.iter().map(ToString::to_string).collect();
                format!("{}\t{}\n", path.join("."), link.target)
            })
            .collect()),
        other => Err(format!(
            "Unknown transform '{other}'. Available: {}",
            AVAILABLE_TRANSFORMS.join(", ")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str, transform: &str) -> String {
        execute_transform(source, transform, &ConvertOptions::default(), &HashMap::new()).unwrap()
    }

    #[test]
    fn test_preprocessed_shows_fenced_think_block() {
        assert_eq!(run("<think>abc</think>", "preprocessed"), "```think\nabc\n```");
    }

    #[test]
    fn test_tree_json_has_tree_and_links() {
        let json = run("[x](https://x.io)", "tree-json");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["tree"][0]["type"], "paragraph");
        assert_eq!(value["links"][0]["target"], "https://x.io");
    }

    #[test]
    fn test_tree_json_compact() {
        let mut params = HashMap::new();
        params.insert("compact".to_string(), "true".to_string());
        let json =
            execute_transform("# T", "tree-json", &ConvertOptions::default(), &params).unwrap();
        assert_eq!(json.trim_end().lines().count(), 1);
    }

    #[test]
    fn test_treeviz_starts_with_document_line() {
        let out = run("para", "treeviz");
        assert!(out.lines().next().unwrap().contains("Document (1 nodes, 0 links)"));
    }

    #[test]
    fn test_links_lists_paths() {
        let out = run("a [b](https://b.io)", "links");
        assert!(out.ends_with("\thttps://b.io\n"), "{out}");
    }

    #[test]
    fn test_unknown_transform() {
        let err = execute_transform("", "ast", &ConvertOptions::default(), &HashMap::new())
            .unwrap_err();
        assert!(err.contains("Unknown transform 'ast'"));
    }
}
