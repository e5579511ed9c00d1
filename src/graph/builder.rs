//! Graph builder: scans a directory and builds the dependency graph.
//!
//! Files are scanned in parallel with rayon; the per-file results are then
//! folded into the accumulator by a single writer, in walk order.

use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::engine::{GraphState, MergeOutcome};
use super::layout::Layout;
use super::resolver::join_under_root;
use super::scanner::FileScanner;
use super::types::{FileScan, GraphSnapshot};
use super::walker::{is_candidate, walk_source_files};
use crate::config::{DevGraphConfig, ScanConfig};
use crate::parser::SourceLanguage;

/// Build a graph from every candidate file under `root`, starting from an
/// empty state.
pub fn build_graph(root: &Path, config: &DevGraphConfig) -> GraphState {
    let started = Instant::now();
    let files = walk_source_files(root, &config.scan);
    debug!(root = %root.display(), files = files.len(), "walk complete");

    let mut state = GraphState::new(Layout::new(config.layout.extent));
    let outcome = merge_files(&mut state, root, &files, &config.scan);

    info!(
        files = files.len(),
        nodes = outcome.nodes_added,
        links = outcome.links_added,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "graph built"
    );
    state
}

/// Full build, returned directly in its serialized shape.
pub fn build_snapshot(root: &Path, config: &DevGraphConfig) -> GraphSnapshot {
    build_graph(root, config).snapshot()
}

/// Re-scan only `changed` (repo-relative paths) and fold the results into
/// the existing `state`. Returns the full updated graph.
///
/// Existing nodes keep their identity and coordinates; only newly seen
/// nodes and links are added. Nothing is removed: a function deleted from
/// a file, or a deleted file, leaves its nodes and links in the graph.
///
/// Paths that escape the root or no longer exist are skipped with a
/// warning. Paths the walker would never yield (unsupported extension,
/// inside an ignored directory) are skipped too.
pub fn merge_incremental<S: AsRef<str>>(
    state: &mut GraphState,
    root: &Path,
    changed: &[S],
    config: &ScanConfig,
) -> GraphSnapshot {
    let started = Instant::now();
    let mut files: Vec<PathBuf> = Vec::with_capacity(changed.len());

    for rel in changed {
        let rel = rel.as_ref();
        let Some(path) = join_under_root(root, rel) else {
            warn!(file = rel, "ignoring changed path outside the repository");
            continue;
        };
        if !path.exists() {
            warn!(file = rel, "changed file no longer exists, skipping");
            continue;
        }
        if !is_candidate(Path::new(rel), config) {
            debug!(file = rel, "changed file is not a scan candidate, skipping");
            continue;
        }
        if !files.contains(&path) {
            files.push(path);
        }
    }

    let outcome = merge_files(state, root, &files, config);
    info!(
        requested = changed.len(),
        scanned = files.len(),
        nodes_added = outcome.nodes_added,
        links_added = outcome.links_added,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "incremental merge complete"
    );
    state.snapshot()
}

fn merge_files(
    state: &mut GraphState,
    root: &Path,
    files: &[PathBuf],
    config: &ScanConfig,
) -> MergeOutcome {
    let scanner = FileScanner::new(root, config);
    let scans: Vec<FileScan> = files.par_iter().map(|path| scanner.scan(path)).collect();

    let mut outcome = MergeOutcome::default();
    for scan in scans {
        outcome.absorb(state.merge_scan(scan));
    }
    outcome
}

/// Get statistics about what files would be scanned in a directory.
pub fn scan_stats(root: &Path, config: &ScanConfig) -> ScanStats {
    let mut stats = ScanStats::default();

    for path in walk_source_files(root, config) {
        stats.total_files += 1;
        match SourceLanguage::from_path(&path) {
            Some(lang) => *stats.by_language.entry(lang).or_default() += 1,
            None => stats.other_files += 1,
        }
    }

    stats
}

#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    pub total_files: usize,
    pub by_language: BTreeMap<SourceLanguage, usize>,
    /// Files with a configured extension that maps to no known language.
    pub other_files: usize,
}

impl std::fmt::Display for ScanStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts: Vec<String> = self
            .by_language
            .iter()
            .map(|(lang, count)| format!("{}: {}", lang.name(), count))
            .collect();
        if self.other_files > 0 {
            parts.push(format!("other: {}", self.other_files));
        }
        write!(
            f,
            "Found {} source files ({})",
            self.total_files,
            parts.join(", ")
        )
    }
}
