//! Tree walker: enumerates candidate source files under a root.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::config::ScanConfig;

/// All scannable files under `root`, pruning ignored directories at any
/// depth. Sorted by file name per directory so repeated builds agree on
/// first-wins order.
pub fn walk_source_files(root: &Path, config: &ScanConfig) -> Vec<PathBuf> {
    let ignore_dirs = config.ignore_dirs.clone();
    let gitignore = config.respect_gitignore;

    WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(false)
        .git_ignore(gitignore)
        .git_global(gitignore)
        .git_exclude(gitignore)
        .ignore(gitignore)
        .parents(gitignore)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            // depth 0 is the root itself, whatever it is called
            !(is_dir
                && entry.depth() > 0
                && ignore_dirs.contains(&*entry.file_name().to_string_lossy()))
        })
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .filter(|entry| has_supported_extension(entry.path(), config))
        .map(|entry| entry.into_path())
        .collect()
}

/// Apply the walker's filters to a single repo-relative path.
pub fn is_candidate(rel: &Path, config: &ScanConfig) -> bool {
    if !has_supported_extension(rel, config) {
        return false;
    }
    let Some(parent) = rel.parent() else {
        return true;
    };
    !parent
        .components()
        .any(|c| config.is_ignored_dir(&c.as_os_str().to_string_lossy()))
}

fn has_supported_extension(path: &Path, config: &ScanConfig) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| config.is_supported_extension(ext))
}
