//! Configuration for dev-graph, loaded from `.devgraph/config.toml`.
//!
//! Every field has a default, so an absent or partial file is fine:
//!
//! ```toml
//! [scan]
//! extensions = ["py", "ts", "tsx"]
//! ignore_dirs = ["node_modules", ".git", "target"]
//! respect_gitignore = false
//!
//! [layout]
//! extent = 600.0
//!
//! [watch]
//! debounce_ms = 500
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::Result;

/// Extensions scanned by default, in resolver candidate order.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "tsx", "jsx", "java", "cpp", "c", "h", "cs",
];

/// Directory names pruned from the walk by default.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "__pycache__",
    "build",
    "dist",
    ".next",
    ".expo",
    ".gradle",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DevGraphConfig {
    pub scan: ScanConfig,
    pub layout: LayoutConfig,
    pub watch: WatchConfig,
}

/// Which files the walker yields and the resolver probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Extensions without the leading dot. Order matters for import resolution.
    pub extensions: Vec<String>,
    /// Directory names pruned at any depth.
    pub ignore_dirs: BTreeSet<String>,
    /// Also honor `.gitignore`/`.ignore` files while walking.
    pub respect_gitignore: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|d| d.to_string()).collect(),
            respect_gitignore: false,
        }
    }
}

impl ScanConfig {
    /// True if `ext` (no leading dot) is a scanned extension.
    pub fn is_supported_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e == ext)
    }

    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignore_dirs.contains(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Half-width of the cube initial node positions are drawn from.
    pub extent: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { extent: 600.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl DevGraphConfig {
    /// Load config from `path`, falling back to defaults when the file is
    /// missing or invalid.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read config, using defaults");
                return Self::default();
            }
        };

        match Self::from_toml_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                Self::default()
            }
        }
    }

    /// Parse config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
