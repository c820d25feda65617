//! Markup repair and parsing for expression-tagged LLM output.

pub mod parser;
pub mod sanitizer;
mod token;

pub use parser::{parse, strip_tags, Segment};
pub use sanitizer::sanitize;
