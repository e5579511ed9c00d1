//! Lexical entity recognizers shared by every supported language.
//!
//! This is deliberately not a parser. Each category carries a few
//! alternative regular expressions; every form runs over the whole file and
//! the captures are concatenated. A construct matched by two forms shows up
//! twice here and collapses later through node/link dedup.
//!
//! The brace heuristic for functions (`name(args) {`) also fires on
//! `if (x) {`, `while (...) {`, `catch (e) {` and friends. Those false
//! positives are part of the contract.

use regex::Regex;
use std::sync::OnceLock;

const IDENT: &str = r"[a-zA-Z_][A-Za-z0-9_]*";

/// Raw captures for one file, grouped by category, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityMatches {
    pub classes: Vec<String>,
    pub functions: Vec<String>,
    pub imports: Vec<String>,
    pub extends: Vec<String>,
}

impl EntityMatches {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
            && self.functions.is_empty()
            && self.imports.is_empty()
            && self.extends.is_empty()
    }
}

/// The compiled pattern bank.
pub struct EntityPatterns {
    class: Vec<Regex>,
    function: Vec<Regex>,
    import: Vec<Regex>,
    extends: Vec<Regex>,
}

impl EntityPatterns {
    pub fn new() -> Self {
        Self {
            class: vec![compile(r"\bclass\s+([A-Z][A-Za-z0-9_]*)")],
            function: vec![
                compile(&format!(r"\bdef\s+({IDENT})")),
                compile(&format!(r"\bfunction\s+({IDENT})")),
                compile(&format!(r"({IDENT})\s*\([^)]*\)\s*\{{")),
            ],
            import: vec![
                // optional quote: `import './side-effect'`
                compile(r#"\bimport\s+['"]?([a-zA-Z0-9_.\-/@]+)"#),
                compile(r"\bfrom\s+([a-zA-Z0-9_.\-/@]+)\s+import"),
                compile(r#"\brequire\(['"](.+?)['"]\)"#),
                compile(r#"#include\s+[<"](.+?)[>"]"#),
            ],
            extends: vec![
                compile(r"\bclass\s+\w+\s+extends\s+(\w+)"),
                compile(r"\bclass\s+\w+\s*\((\w+)\)"),
            ],
        }
    }

    /// Process-wide instance, compiled on first use.
    pub fn shared() -> &'static EntityPatterns {
        static PATTERNS: OnceLock<EntityPatterns> = OnceLock::new();
        PATTERNS.get_or_init(EntityPatterns::new)
    }

    /// Run every form of every category over `content`.
    pub fn extract(&self, content: &str) -> EntityMatches {
        EntityMatches {
            classes: captures(&self.class, content),
            functions: captures(&self.function, content),
            imports: captures(&self.import, content),
            extends: captures(&self.extends, content),
        }
    }
}

impl Default for EntityPatterns {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract entities using the shared pattern bank.
pub fn extract_entities(content: &str) -> EntityMatches {
    EntityPatterns::shared().extract(content)
}

fn captures(forms: &[Regex], content: &str) -> Vec<String> {
    forms
        .iter()
        .flat_map(|re| re.captures_iter(content))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => panic!("invalid entity pattern {pattern:?}: {e}"),
    }
}
