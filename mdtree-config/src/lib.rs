//! Shared configuration loader for the mdtree toolchain.
//!
//! `defaults/mdtree.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`MdtreeConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use mdtree::ConvertOptions;
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/mdtree.default.toml");

/// Top-level configuration consumed by mdtree applications.
#[derive(Debug, Clone, Deserialize)]
pub struct MdtreeConfig {
    pub convert: ConvertConfig,
    pub inspect: InspectConfig,
    pub formats: FormatsConfig,
}

/// Mirrors the knobs exposed by [`ConvertOptions`].
#[derive(Debug, Clone, Deserialize)]
pub struct ConvertConfig {
    pub blank_line_gap: usize,
    pub think_tag: String,
    pub answer_tag: String,
    pub normalize_spacing: bool,
    pub extract_tagged_blocks: bool,
    pub strip_custom_tags: bool,
    pub normalize_table_newlines: bool,
    pub description_min_columns: usize,
    pub partial_number_digits: usize,
    pub schema_languages: Vec<String>,
}

impl From<ConvertConfig> for ConvertOptions {
    fn from(config: ConvertConfig) -> Self {
        ConvertOptions {
            blank_line_gap: config.blank_line_gap,
            think_tag: config.think_tag,
            answer_tag: config.answer_tag,
            normalize_spacing: config.normalize_spacing,
            extract_tagged_blocks: config.extract_tagged_blocks,
            strip_custom_tags: config.strip_custom_tags,
            normalize_table_newlines: config.normalize_table_newlines,
            description_min_columns: config.description_min_columns,
            partial_number_digits: config.partial_number_digits,
            schema_languages: config.schema_languages,
        }
    }
}

impl From<&ConvertConfig> for ConvertOptions {
    fn from(config: &ConvertConfig) -> Self {
        config.clone().into()
    }
}

/// Controls inspect output.
#[derive(Debug, Clone, Deserialize)]
pub struct InspectConfig {
    pub treeviz: TreevizConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreevizConfig {
    pub show_props: bool,
}

/// Format-specific serialization knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct FormatsConfig {
    pub json: JsonConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonConfig {
    pub compact: bool,
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<MdtreeConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<MdtreeConfig, ConfigError> {
    Loader::new().build()
}
