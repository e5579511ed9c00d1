//! Core types for the dev-graph dependency graph.
//!
//! Defines node kinds, nodes, links, the serialized snapshot, and the
//! per-file partial result produced by the scanner.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{self, GraphError};

/// The kind of a node. Serialized as `file`, `class:<Name>`,
/// `function:<Name>` or `external:<token>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum NodeKind {
    /// A source file inside the repository (scanned or import-resolved).
    File,
    /// A class declaration, or the base named in an inheritance clause.
    Class(String),
    /// A function or method, as far as the heuristics can tell.
    Function(String),
    /// An import that did not resolve to a file in the repository.
    External(String),
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::File => write!(f, "file"),
            NodeKind::Class(name) => write!(f, "class:{name}"),
            NodeKind::Function(name) => write!(f, "function:{name}"),
            NodeKind::External(token) => write!(f, "external:{token}"),
        }
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "file" {
            return Ok(NodeKind::File);
        }
        match s.split_once(':') {
            Some(("class", name)) => Ok(NodeKind::Class(name.to_string())),
            Some(("function", name)) => Ok(NodeKind::Function(name.to_string())),
            Some(("external", token)) => Ok(NodeKind::External(token.to_string())),
            _ => Err(format!("unknown node type: {s:?}")),
        }
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.to_string()
    }
}

impl TryFrom<String> for NodeKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A node as stored in the graph and sent to viewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A directed edge: source contains / depends on / extends target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
}

impl Link {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// The externally visible graph: nodes in first-insertion order, links in
/// first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl GraphSnapshot {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn has_link(&self, source: &str, target: &str) -> bool {
        self.links
            .iter()
            .any(|l| l.source == source && l.target == target)
    }

    /// Write the snapshot as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> error::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| GraphError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| GraphError::io(path, e))
    }

    pub fn load(path: &Path) -> error::Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| GraphError::io(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// A node discovered by the scanner, before layout is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedNode {
    pub id: String,
    pub kind: NodeKind,
}

/// Everything discovered in one file. Duplicates are allowed here; the
/// accumulator collapses them.
#[derive(Debug, Clone, Default)]
pub struct FileScan {
    pub nodes: Vec<ScannedNode>,
    pub links: Vec<Link>,
}

impl FileScan {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    pub(crate) fn add_node(&mut self, id: impl Into<String>, kind: NodeKind) {
        self.nodes.push(ScannedNode {
            id: id.into(),
            kind,
        });
    }

    /// Record `target` and a link to it from `source` in one step, so that
    /// every link endpoint is materialized by the pass that introduces it.
    pub(crate) fn link_to(&mut self, source: &str, target: impl Into<String>, kind: NodeKind) {
        let target = target.into();
        self.links.push(Link::new(source, target.clone()));
        self.add_node(target, kind);
    }
}
