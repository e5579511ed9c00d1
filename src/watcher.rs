//! Local change notifications.
//!
//! Watches the repository with a debounced recursive watcher and turns each
//! batch of events into one incremental merge on the graph service. Deleted
//! paths are forwarded as-is; the merger skips them.

use std::collections::BTreeSet;
use std::path::Path;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tracing::{debug, info, warn};

use crate::config::DevGraphConfig;
use crate::error::{GraphError, Result};
use crate::graph::resolver::relative_id;
use crate::graph::walker::is_candidate;
use crate::service::GraphHandle;

/// Keeps the watcher alive. Dropping it stops change notifications.
pub struct WatcherHandle {
    _debouncer: Debouncer<RecommendedWatcher>,
}

/// Start watching `root`, queueing a merge on `graph` for every debounced
/// batch of relevant changes.
pub fn start_watching(
    root: &Path,
    config: &DevGraphConfig,
    graph: GraphHandle,
) -> Result<WatcherHandle> {
    let root = root
        .canonicalize()
        .map_err(|e| GraphError::io(root, e))?;
    let scan = config.scan.clone();
    let event_root = root.clone();

    let mut debouncer = new_debouncer(config.watch.debounce(), move |result: DebounceEventResult| {
        let events = match result {
            Ok(events) => events,
            Err(e) => {
                warn!(error = ?e, "file watcher error");
                return;
            }
        };

        let changed = changed_paths(&event_root, events.iter().map(|e| e.path.as_path()), |rel| {
            is_candidate(Path::new(rel), &scan)
        });
        if changed.is_empty() {
            return;
        }

        debug!(files = changed.len(), "queueing merge for changed files");
        if graph.request_merge_blocking(changed).is_err() {
            warn!("graph service is gone, dropping change notification");
        }
    })?;

    debouncer
        .watcher()
        .watch(&root, RecursiveMode::Recursive)?;
    info!(root = %root.display(), debounce_ms = config.watch.debounce_ms, "watching for changes");

    Ok(WatcherHandle {
        _debouncer: debouncer,
    })
}

/// Repo-relative ids of the event paths that pass `keep`, deduplicated and
/// sorted.
fn changed_paths<'p>(
    root: &Path,
    paths: impl Iterator<Item = &'p Path>,
    keep: impl Fn(&str) -> bool,
) -> Vec<String> {
    paths
        .filter_map(|path| relative_id(root, path))
        .filter(|rel| keep(rel))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
