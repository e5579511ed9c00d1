//! Import resolution: raw import token → repository file or external module.
//!
//! Only tokens that look relative, absolute, or aliased (`.`, `/`, `@`) are
//! checked against the filesystem. Candidates are probed relative to the
//! repository root in a fixed order, so the result is deterministic for a
//! given extension list and filesystem snapshot. Nothing is cached.
//!
//! A candidate must also pass the walker's rules: a file inside an ignored
//! directory never becomes a node, even when an import names it directly.

use std::path::{Path, PathBuf};

use super::walker::is_candidate;
use crate::config::ScanConfig;

/// Outcome of resolving one import token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImport {
    /// Repo-relative file path when internal, otherwise the raw token.
    pub id: String,
    /// True if `id` names a file inside the repository.
    pub internal: bool,
}

impl ResolvedImport {
    fn external(token: &str) -> Self {
        Self {
            id: token.to_string(),
            internal: false,
        }
    }
}

pub struct ImportResolver<'a> {
    root: &'a Path,
    config: &'a ScanConfig,
}

impl<'a> ImportResolver<'a> {
    pub fn new(root: &'a Path, config: &'a ScanConfig) -> Self {
        Self { root, config }
    }

    /// Resolve a token. Never fails: anything unresolvable is external.
    pub fn resolve(&self, token: &str) -> ResolvedImport {
        if !token.starts_with(['.', '/', '@']) {
            return ResolvedImport::external(token);
        }

        for candidate in self.candidates(token) {
            if !is_candidate(Path::new(&candidate), self.config) {
                continue;
            }
            if self.root.join(&candidate).is_file() {
                return ResolvedImport {
                    id: candidate,
                    internal: true,
                };
            }
        }

        ResolvedImport::external(token)
    }

    /// Repo-relative candidate paths, in probe order. A token that names
    /// no path below the root (`.`, `./`, `..`) has none.
    pub fn candidates(&self, token: &str) -> Vec<String> {
        let extensions = &self.config.extensions;
        if let Some(ext) = self.supported_suffix(token) {
            let stem = &token[..token.len() - ext.len() - 1];
            let base = base_path(stem);
            if base.is_empty() {
                return Vec::new();
            }
            return vec![format!("{base}.{ext}")];
        }

        let base = base_path(token);
        if base.is_empty() {
            return Vec::new();
        }
        let mut candidates = Vec::with_capacity(extensions.len() * 2);
        candidates.extend(extensions.iter().map(|ext| format!("{base}.{ext}")));
        candidates.extend(extensions.iter().map(|ext| format!("{base}/index.{ext}")));
        candidates
    }

    fn supported_suffix(&self, token: &str) -> Option<&'a str> {
        let config: &'a ScanConfig = self.config;
        config
            .extensions
            .iter()
            .find(|ext| {
                token.len() > ext.len() + 1
                    && token.ends_with(ext.as_str())
                    && token[..token.len() - ext.len()].ends_with('.')
            })
            .map(String::as_str)
    }
}

/// Turn a token into a `/`-separated path relative to the root.
///
/// Path-style tokens (`./lib/util`, `/src/app`, `@/components/x`) are split on
/// `/` with `.` segments dropped and `..` popping a segment. Module-style
/// tokens (`.models.user`) lose their leading dots and use dots as
/// separators.
fn base_path(token: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    if token.contains('/') {
        for segment in token.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other),
            }
        }
    } else {
        segments.extend(token.trim_start_matches('.').split('.').filter(|s| !s.is_empty()));
    }
    segments.join("/")
}

/// Convert a path relative to the root into a `/`-separated id.
pub(crate) fn path_to_id(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Repo-relative id for `path`, or `None` if it is not under `root`.
pub(crate) fn relative_id(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root).ok().map(path_to_id)
}

/// Join a relative path onto `root`, refusing anything that escapes it.
pub(crate) fn join_under_root(root: &Path, rel: &str) -> Option<PathBuf> {
    let rel = Path::new(rel);
    let escapes = rel.components().any(|c| {
        matches!(
            c,
            std::path::Component::ParentDir
                | std::path::Component::RootDir
                | std::path::Component::Prefix(_)
        )
    });
    if escapes {
        None
    } else {
        Some(root.join(rel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn with_extensions(extensions: &[&str]) -> ScanConfig {
        ScanConfig {
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            ..ScanConfig::default()
        }
    }

    #[test]
    fn test_relative_import_resolves_to_file() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "utils/helpers.ts");
        let config = ScanConfig::default();
        let resolver = ImportResolver::new(dir.path(), &config);

        let resolved = resolver.resolve("./utils/helpers");
        assert_eq!(
            resolved,
            ResolvedImport {
                id: "utils/helpers.ts".to_string(),
                internal: true,
            }
        );
    }

    #[test]
    fn test_bare_module_is_external_without_probing() {
        // Root does not exist: any filesystem probe would come back empty,
        // but a bare token never gets that far.
        let config = ScanConfig::default();
        let resolver = ImportResolver::new(Path::new("/nonexistent/root"), &config);
        let resolved = resolver.resolve("lodash");
        assert_eq!(resolved.id, "lodash");
        assert!(!resolved.internal);
    }

    #[test]
    fn test_unresolvable_relative_falls_back_to_token() {
        let dir = TempDir::new().unwrap();
        let config = ScanConfig::default();
        let resolver = ImportResolver::new(dir.path(), &config);
        let resolved = resolver.resolve("./missing/thing");
        assert_eq!(resolved.id, "./missing/thing");
        assert!(!resolved.internal);
    }

    #[test]
    fn test_scoped_package_is_external() {
        let dir = TempDir::new().unwrap();
        let config = ScanConfig::default();
        let resolver = ImportResolver::new(dir.path(), &config);
        assert!(!resolver.resolve("@angular/core").internal);
    }

    #[test]
    fn test_index_file_fallback() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "components/index.tsx");
        let config = ScanConfig::default();
        let resolver = ImportResolver::new(dir.path(), &config);
        let resolved = resolver.resolve("./components");
        assert_eq!(resolved.id, "components/index.tsx");
        assert!(resolved.internal);
    }

    #[test]
    fn test_direct_file_beats_index_file() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "components/index.js");
        touch(dir.path(), "components.ts");
        let config = ScanConfig::default();
        let resolver = ImportResolver::new(dir.path(), &config);
        assert_eq!(resolver.resolve("./components").id, "components.ts");
    }

    #[test]
    fn test_extension_order_decides() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "lib/util.js");
        touch(dir.path(), "lib/util.ts");
        let config = ScanConfig::default();
        let resolver = ImportResolver::new(dir.path(), &config);
        // js precedes ts in the default list
        assert_eq!(resolver.resolve("./lib/util").id, "lib/util.js");
    }

    #[test]
    fn test_python_relative_module() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "models/user.py");
        let config = ScanConfig::default();
        let resolver = ImportResolver::new(dir.path(), &config);
        let resolved = resolver.resolve(".models.user");
        assert_eq!(resolved.id, "models/user.py");
        assert!(resolved.internal);
    }

    #[test]
    fn test_token_with_extension_is_sole_candidate() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "include/vec.h");
        let config = ScanConfig::default();
        let resolver = ImportResolver::new(dir.path(), &config);
        assert_eq!(resolver.candidates("./include/vec.h"), vec!["include/vec.h"]);
        let resolved = resolver.resolve("./include/vec.h");
        assert_eq!(resolved.id, "include/vec.h");
        assert!(resolved.internal);
    }

    #[test]
    fn test_candidate_order() {
        let config = with_extensions(&["py", "ts"]);
        let resolver = ImportResolver::new(Path::new("."), &config);
        assert_eq!(
            resolver.candidates("./a/b"),
            vec!["a/b.py", "a/b.ts", "a/b/index.py", "a/b/index.ts"]
        );
    }

    #[test]
    fn test_parent_segments_never_escape_root() {
        let config = with_extensions(&["ts"]);
        let resolver = ImportResolver::new(Path::new("."), &config);
        assert_eq!(
            resolver.candidates("../../shared/x"),
            vec!["shared/x.ts", "shared/x/index.ts"]
        );
    }

    #[test]
    fn test_file_in_ignored_dir_stays_external() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "node_modules/left-pad/index.js");
        touch(dir.path(), "vendor/build/gen.py");
        let config = ScanConfig::default();
        let resolver = ImportResolver::new(dir.path(), &config);

        let resolved = resolver.resolve("./node_modules/left-pad/index");
        assert_eq!(resolved.id, "./node_modules/left-pad/index");
        assert!(!resolved.internal);
        // nested ignored component, module-style token
        assert!(!resolver.resolve(".vendor.build.gen").internal);
        assert!(!resolver.resolve("./node_modules/left-pad").internal);
    }

    #[test]
    fn test_package_relative_token_has_no_candidates() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "index.js");
        let config = ScanConfig::default();
        let resolver = ImportResolver::new(dir.path(), &config);
        for token in [".", "./", "..", "../"] {
            assert!(resolver.candidates(token).is_empty(), "{token}");
            let resolved = resolver.resolve(token);
            assert_eq!(resolved.id, token);
            assert!(!resolved.internal);
        }
    }

    #[test]
    fn test_join_under_root_rejects_escape() {
        let root = Path::new("/repo");
        assert_eq!(
            join_under_root(root, "src/a.py"),
            Some(PathBuf::from("/repo/src/a.py"))
        );
        assert!(join_under_root(root, "../etc/passwd").is_none());
        assert!(join_under_root(root, "/etc/passwd").is_none());
    }

    #[test]
    fn test_relative_id_uses_forward_slashes() {
        let root = Path::new("/repo");
        assert_eq!(
            relative_id(root, Path::new("/repo/src/app.ts")),
            Some("src/app.ts".to_string())
        );
        assert_eq!(relative_id(root, Path::new("/elsewhere/app.ts")), None);
    }
}
