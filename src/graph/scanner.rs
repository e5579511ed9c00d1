//! File scanner: turns one source file into a partial node/link set.
//!
//! Links are file-centric: containment, imports, and inheritance all hang
//! off the file node, never off the derived class.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::resolver::{relative_id, ImportResolver};
use super::types::{FileScan, NodeKind};
use crate::config::ScanConfig;
use crate::error::{GraphError, Result};
use crate::parser::EntityPatterns;

pub struct FileScanner<'a> {
    root: PathBuf,
    resolver: ImportResolver<'a>,
    patterns: &'static EntityPatterns,
}

impl<'a> FileScanner<'a> {
    pub fn new(root: &'a Path, config: &'a ScanConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            resolver: ImportResolver::new(root, config),
            patterns: EntityPatterns::shared(),
        }
    }

    /// Scan one file. Read failures are logged and yield an empty result so
    /// the surrounding build keeps going.
    pub fn scan(&self, path: &Path) -> FileScan {
        match self.try_scan(path) {
            Ok(scan) => scan,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping unreadable file");
                FileScan::default()
            }
        }
    }

    fn try_scan(&self, path: &Path) -> Result<FileScan> {
        let rel = relative_id(&self.root, path)
            .ok_or_else(|| GraphError::OutsideRoot(path.to_path_buf()))?;
        let bytes = fs::read(path).map_err(|e| GraphError::io(path, e))?;
        let content = String::from_utf8_lossy(&bytes);
        Ok(self.scan_content(&rel, &content))
    }

    /// Build the partial graph for already-loaded content.
    pub fn scan_content(&self, rel: &str, content: &str) -> FileScan {
        let matches = self.patterns.extract(content);
        let mut scan = FileScan::default();
        scan.add_node(rel, NodeKind::File);

        for name in matches.classes.into_iter().filter(|n| !n.is_empty()) {
            let id = format!("{rel}::{name}");
            scan.link_to(rel, id, NodeKind::Class(name));
        }

        for name in matches.functions.into_iter().filter(|n| !n.is_empty()) {
            let id = format!("{rel}::{name}");
            scan.link_to(rel, id, NodeKind::Function(name));
        }

        for token in matches.imports.into_iter().filter(|t| !t.is_empty()) {
            let resolved = self.resolver.resolve(&token);
            let kind = if resolved.internal {
                NodeKind::File
            } else {
                NodeKind::External(token)
            };
            scan.link_to(rel, resolved.id, kind);
        }

        for base in matches.extends.into_iter().filter(|b| !b.is_empty()) {
            scan.link_to(rel, base.clone(), NodeKind::Class(base));
        }

        debug!(
            file = rel,
            nodes = scan.nodes.len(),
            links = scan.links.len(),
            "scanned file"
        );
        scan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::Link;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &[u8]) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn kind_of<'s>(scan: &'s FileScan, id: &str) -> Option<&'s NodeKind> {
        scan.nodes.iter().find(|n| n.id == id).map(|n| &n.kind)
    }

    #[test]
    fn test_scan_python_file() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "pkg/service.py",
            b"import os\n\nclass UserService(Base):\n    def get(self):\n        pass\n",
        );
        let config = ScanConfig::default();
        let scanner = FileScanner::new(dir.path(), &config);
        let scan = scanner.scan(&path);

        assert_eq!(kind_of(&scan, "pkg/service.py"), Some(&NodeKind::File));
        assert_eq!(
            kind_of(&scan, "pkg/service.py::UserService"),
            Some(&NodeKind::Class("UserService".to_string()))
        );
        assert_eq!(
            kind_of(&scan, "pkg/service.py::get"),
            Some(&NodeKind::Function("get".to_string()))
        );
        assert_eq!(
            kind_of(&scan, "os"),
            Some(&NodeKind::External("os".to_string()))
        );
        assert_eq!(
            kind_of(&scan, "Base"),
            Some(&NodeKind::Class("Base".to_string()))
        );
        // inheritance hangs off the file, not the derived class
        assert!(scan.links.contains(&Link::new("pkg/service.py", "Base")));
    }

    #[test]
    fn test_resolved_import_is_typed_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "utils/helpers.ts", b"export const x = 1;\n");
        let app = write(dir.path(), "app.ts", b"import './utils/helpers';\n");
        let config = ScanConfig::default();
        let scan = FileScanner::new(dir.path(), &config).scan(&app);

        assert_eq!(kind_of(&scan, "utils/helpers.ts"), Some(&NodeKind::File));
        assert!(scan.links.contains(&Link::new("app.ts", "utils/helpers.ts")));
    }

    #[test]
    fn test_every_link_target_is_a_node() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "a.js",
            b"const x = require('y');\nclass A extends B {\n  run() {\n  }\n}\n",
        );
        let config = ScanConfig::default();
        let scan = FileScanner::new(dir.path(), &config).scan(&path);
        for link in &scan.links {
            assert!(kind_of(&scan, &link.target).is_some(), "{link:?}");
            assert_eq!(link.source, "a.js");
        }
    }

    #[test]
    fn test_invalid_utf8_is_tolerated() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "bad.py", b"\xff\xfe def broken():\n    pass\n");
        let config = ScanConfig::default();
        let scan = FileScanner::new(dir.path(), &config).scan(&path);
        assert!(kind_of(&scan, "bad.py::broken").is_some());
    }

    #[test]
    fn test_missing_file_yields_empty_scan() {
        let dir = TempDir::new().unwrap();
        let config = ScanConfig::default();
        let scan = FileScanner::new(dir.path(), &config).scan(&dir.path().join("gone.py"));
        assert!(scan.is_empty());
    }

    #[test]
    fn test_file_outside_root_yields_empty_scan() {
        let root = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let path = write(other.path(), "x.py", b"def f():\n    pass\n");
        let config = ScanConfig::default();
        let scan = FileScanner::new(root.path(), &config).scan(&path);
        assert!(scan.is_empty());
    }
}
