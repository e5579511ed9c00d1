//! # dev-graph
//!
//! Structural dependency graphs for source trees.
//!
//! dev-graph walks a repository, recognizes files, classes, functions and
//! imports with lightweight per-line patterns, and accumulates them into a
//! deduplicated graph that a 3D viewer can render directly.
//!
//! ## Key Features
//!
//! - **Language-agnostic**: one pattern bank for Python, JS/TS, Java, C/C++ and C#
//! - **Import resolution**: relative imports land on real files inside the repo
//! - **Incremental**: changed files merge into the live graph without a rebuild
//! - **Live**: a single-writer service publishes every update to subscribers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use devgraph::{build_snapshot, DevGraphConfig};
//! use std::path::Path;
//!
//! let snapshot = build_snapshot(Path::new("."), &DevGraphConfig::default());
//! println!("{} nodes, {} links", snapshot.nodes.len(), snapshot.links.len());
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod parser;
pub mod service;
pub mod watcher;

// Re-exports for convenience
pub use config::{DevGraphConfig, LayoutConfig, ScanConfig, WatchConfig};
pub use error::{GraphError, Result};

// Graph re-exports
pub use graph::{
    build_graph, build_snapshot, merge_incremental, scan_stats, GraphSnapshot, GraphState,
    GraphStats, Link, Node, NodeKind, ScanStats,
};
pub use parser::{extract_entities, EntityMatches, SourceLanguage};

// Live graph
pub use service::{GraphHandle, GraphService, SubscriberId, Subscription};
pub use watcher::{start_watching, WatcherHandle};
