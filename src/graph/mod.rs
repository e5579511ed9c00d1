//! Dependency graph module, the structural backbone of dev-graph.
//!
//! Provides the graph data model, the accumulator, import resolution,
//! per-file scanning, and directory walking/building.

pub mod builder;
pub mod engine;
pub mod layout;
pub mod resolver;
pub mod scanner;
pub mod types;
pub mod walker;

pub use builder::{build_graph, build_snapshot, merge_incremental, scan_stats, ScanStats};
pub use engine::{GraphState, GraphStats, MergeOutcome};
pub use layout::Layout;
pub use resolver::{ImportResolver, ResolvedImport};
pub use scanner::FileScanner;
pub use types::{FileScan, GraphSnapshot, Link, Node, NodeKind, ScannedNode};
pub use walker::{is_candidate, walk_source_files};
