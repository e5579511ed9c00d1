//! Lexical entity recognition.

pub mod language;
pub mod patterns;

pub use language::SourceLanguage;
pub use patterns::{extract_entities, EntityMatches, EntityPatterns};
