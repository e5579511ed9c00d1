//! Language detection by file extension.
//!
//! Extraction itself is language-agnostic; this classification only feeds
//! scan statistics.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Source languages dev-graph knows by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceLanguage {
    Python,
    JavaScript,
    TypeScript,
    Java,
    C,
    Cpp,
    CSharp,
}

impl SourceLanguage {
    /// Detect language from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::from_extension(ext)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "py" | "pyw" => Some(SourceLanguage::Python),
            "js" | "jsx" | "mjs" | "cjs" => Some(SourceLanguage::JavaScript),
            "ts" | "tsx" | "mts" | "cts" => Some(SourceLanguage::TypeScript),
            "java" => Some(SourceLanguage::Java),
            "c" | "h" => Some(SourceLanguage::C),
            "cpp" | "cc" | "cxx" | "hpp" => Some(SourceLanguage::Cpp),
            "cs" => Some(SourceLanguage::CSharp),
            _ => None,
        }
    }

    /// Get the display name.
    pub fn name(&self) -> &'static str {
        match self {
            SourceLanguage::Python => "Python",
            SourceLanguage::JavaScript => "JavaScript",
            SourceLanguage::TypeScript => "TypeScript",
            SourceLanguage::Java => "Java",
            SourceLanguage::C => "C",
            SourceLanguage::Cpp => "C++",
            SourceLanguage::CSharp => "C#",
        }
    }
}
