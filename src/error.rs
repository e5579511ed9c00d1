//! Error types for dev-graph.
//!
//! Scanning never fails as a whole: per-file problems degrade to empty
//! results and are only logged. These errors cover the host-facing
//! operations (config, snapshots on disk, the watcher, the graph service).

use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("path is outside the repository root: {0}")]
    OutsideRoot(PathBuf),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("graph service has shut down")]
    ServiceClosed,

    #[error("background task failed: {0}")]
    Join(String),
}

impl GraphError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GraphError::Io {
            path: path.into(),
            source,
        }
    }
}
