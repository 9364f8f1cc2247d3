//! Format implementations
//!
//! Each format converts between the Document Tree and one text representation.

pub mod icons;
pub mod json;
pub mod markdown;
pub mod treeviz;

pub use json::JsonFormat;
pub use markdown::MarkdownFormat;
pub use treeviz::TreevizFormat;
