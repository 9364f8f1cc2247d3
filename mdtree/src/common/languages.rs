//! Code language handlers
//!
//! Fenced code is a plain `code` node unless a handler is registered for its language. A
//! handler turns the fence body into a richer node (structured schema, block math) and turns
//! that node back into a `(language, body)` pair for fencing.
//!
//! ```ignore
//! let registry = LanguageRegistry::with_options(&ConvertOptions::default());
//! let node = registry.to_node("math", "e = mc^2");
//! ```

use super::json::parse_config;
use crate::options::ConvertOptions;
use crate::tree::{Element, ElementKind};
use std::collections::HashMap;

/// Converts between a fence body in one language and a Document Tree element.
pub trait LanguageHandler: Send + Sync {
    /// Build the element for a fence body, or `None` to keep it as plain code.
    fn to_node(&self, language: &str, value: &str) -> Option<Element>;

    /// Returns `Some((language, body))` if this handler can represent the element.
    fn from_node(&self, element: &Element) -> Option<(String, String)>;
}

/// Decodes JSON fence bodies (tolerating incomplete input) into `schema` nodes.
pub struct SchemaHandler;

impl LanguageHandler for SchemaHandler {
    fn to_node(&self, language: &str, value: &str) -> Option<Element> {
        let value = parse_config(value)?;
        Some(Element::void(ElementKind::Schema {
            language: language.to_string(),
            value,
        }))
    }

    fn from_node(&self, element: &Element) -> Option<(String, String)> {
        match &element.kind {
            ElementKind::Schema { language, value } => Some((
                language.clone(),
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
            )),
            _ => None,
        }
    }
}

/// Block math fences.
pub struct MathHandler;

impl LanguageHandler for MathHandler {
    fn to_node(&self, _language: &str, value: &str) -> Option<Element> {
        Some(Element::void(ElementKind::KatexBlock {
            value: value.to_string(),
        }))
    }

    fn from_node(&self, element: &Element) -> Option<(String, String)> {
        match &element.kind {
            ElementKind::KatexBlock { value } => Some(("math".to_string(), value.clone())),
            _ => None,
        }
    }
}

/// Maps lowercase language names to handlers.
pub struct LanguageRegistry {
    handlers: HashMap<String, Box<dyn LanguageHandler>>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry with the schema languages from `options` plus `math`/`katex`.
    pub fn with_options(options: &ConvertOptions) -> Self {
        let mut registry = Self::new();
        for language in &options.schema_languages {
            registry.register(language, Box::new(SchemaHandler));
        }
        registry.register("math", Box::new(MathHandler));
        registry.register("katex", Box::new(MathHandler));
        registry
    }

    pub fn register(&mut self, language: &str, handler: Box<dyn LanguageHandler>) {
        self.handlers.insert(language.to_ascii_lowercase(), handler);
    }

    pub fn get(&self, language: &str) -> Option<&dyn LanguageHandler> {
        self.handlers
            .get(&language.to_ascii_lowercase())
            .map(|handler| handler.as_ref())
    }

    /// Convert a fence body, if a handler for `language` accepts it.
    pub fn to_node(&self, language: &str, value: &str) -> Option<Element> {
        self.get(language)?.to_node(language, value)
    }

    /// Find the fence representation of an element produced by one of the handlers.
    pub fn from_node(&self, element: &Element) -> Option<(String, String)> {
        self.handlers
            .values()
            .find_map(|handler| handler.from_node(element))
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::with_options(&ConvertOptions::default())
    }
}
