//! Format agnostic helpers shared by the converters.

pub mod html;
pub mod json;
pub mod languages;
pub mod table;
pub mod width;
