//! In-memory representation of a parsed coverage report: per-file summaries
//! arranged into a tree mirroring the source directory structure, with
//! directory stats aggregated lazily from their children.

use std::cell::Cell;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CovcheckError, Result};
use crate::parser::CoverageXmlParser;

/// Compute a coverage rate, returning 0.0 when the total is zero.
#[must_use]
pub fn rate(covered: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        covered as f64 / total as f64
    }
}

/// Line and branch counters for a single file or an aggregated subtree.
///
/// Counters are stored verbatim; nothing enforces `covered <= total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoverageSummary {
    pub n_lines: u64,
    pub n_lines_covered: u64,
    pub n_branches: u64,
    pub n_branches_covered: u64,
}

impl CoverageSummary {
    pub fn new(n_lines: u64, n_lines_covered: u64, n_branches: u64, n_branches_covered: u64) -> Self {
        Self {
            n_lines,
            n_lines_covered,
            n_branches,
            n_branches_covered,
        }
    }

    #[must_use]
    pub fn line_rate(&self) -> f64 {
        rate(self.n_lines_covered, self.n_lines)
    }

    #[must_use]
    pub fn branch_rate(&self) -> f64 {
        rate(self.n_branches_covered, self.n_branches)
    }

    /// Elementwise accumulation, used when aggregating children into a
    /// directory summary.
    pub fn add(&mut self, other: CoverageSummary) {
        self.n_lines += other.n_lines;
        self.n_lines_covered += other.n_lines_covered;
        self.n_branches += other.n_branches;
        self.n_branches_covered += other.n_branches_covered;
    }
}

/// Whether a tree node represents a directory or a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageNodeType {
    Dir,
    File,
}

impl CoverageNodeType {
    /// Stable text tag used in serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageNodeType::Dir => "dir",
            CoverageNodeType::File => "file",
        }
    }
}

impl std::fmt::Display for CoverageNodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node in the coverage tree.
///
/// Directory summaries are computed on demand by summing children and cached;
/// the cache is dropped whenever an insertion descends through the node.
/// File nodes carry an explicit summary from the parse and are always leaves.
#[derive(Debug)]
pub struct CoverageNode {
    name: String,
    node_type: CoverageNodeType,
    cached: Cell<Option<CoverageSummary>>,
    children: Vec<CoverageNode>,
}

impl CoverageNode {
    /// Create a node whose summary will be aggregated from its children.
    pub fn new(name: impl Into<String>, node_type: CoverageNodeType) -> Self {
        Self {
            name: name.into(),
            node_type,
            cached: Cell::new(None),
            children: Vec::new(),
        }
    }

    /// Create a leaf node with a summary known up front.
    pub fn with_summary(
        name: impl Into<String>,
        node_type: CoverageNodeType,
        summary: CoverageSummary,
    ) -> Self {
        Self {
            name: name.into(),
            node_type,
            cached: Cell::new(Some(summary)),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_type(&self) -> CoverageNodeType {
        self.node_type
    }

    /// Direct children in insertion order.
    pub fn children(&self) -> impl Iterator<Item = &CoverageNode> {
        self.children.iter()
    }

    /// Look up a direct child by name.
    pub fn child(&self, name: &str) -> Option<&CoverageNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Insert `node` into the tree. This is the sole mutation operation.
    ///
    /// With no `dirpath` the node becomes a direct child, keyed by its name;
    /// a sibling with the same name is an error. With a `dirpath` (a
    /// `/`-separated relative path), missing intermediate directory nodes are
    /// created on the way down and existing ones are descended into, with the
    /// node attached under the final segment. A path with no usable segments
    /// is an error.
    pub fn add_child(&mut self, node: CoverageNode, dirpath: Option<&str>) -> Result<()> {
        if self.node_type == CoverageNodeType::File {
            return Err(CovcheckError::ChildOfFile(self.name.clone()));
        }

        self.cached.set(None);

        let Some(path) = dirpath else {
            if self.children.iter().any(|c| c.name == node.name) {
                return Err(CovcheckError::DuplicateChild(node.name));
            }
            self.children.push(node);
            return Ok(());
        };

        let mut segments = path.split('/').filter(|s| !s.is_empty() && *s != ".");
        let Some(dir_name) = segments.next() else {
            return Err(CovcheckError::InvalidPath(path.to_string()));
        };
        let remaining = segments.collect::<Vec<_>>().join("/");
        let remaining = if remaining.is_empty() {
            None
        } else {
            Some(remaining)
        };

        let index = match self.children.iter().position(|c| c.name == dir_name) {
            Some(index) => index,
            None => {
                self.children
                    .push(CoverageNode::new(dir_name, CoverageNodeType::Dir));
                self.children.len() - 1
            }
        };

        self.children[index].add_child(node, remaining.as_deref())
    }

    /// Summary for this node, computing and caching the aggregate of all
    /// direct children when no cached value is present.
    pub fn summary(&self) -> CoverageSummary {
        if let Some(summary) = self.cached.get() {
            return summary;
        }

        let mut total = CoverageSummary::default();
        for child in &self.children {
            total.add(child.summary());
        }
        self.cached.set(Some(total));
        total
    }

    /// Serialize the subtree rooted at this node. Children keep their
    /// insertion order.
    pub fn serialize(&self) -> SerializedNode {
        let summary = self.summary();
        SerializedNode {
            name: self.name.clone(),
            node_type: self.node_type.as_str().to_string(),
            summary: SerializedSummary {
                n_lines: summary.n_lines,
                n_lines_covered: summary.n_lines_covered,
                line_rate: summary.line_rate(),
                n_branches: summary.n_branches,
                n_branches_covered: summary.n_branches_covered,
                branch_rate: summary.branch_rate(),
            },
            children: self.children.iter().map(CoverageNode::serialize).collect(),
        }
    }
}

/// JSON shape of a serialized summary. Field order here is the output order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedSummary {
    pub n_lines: u64,
    pub n_lines_covered: u64,
    pub line_rate: f64,
    pub n_branches: u64,
    pub n_branches_covered: u64,
    pub branch_rate: f64,
}

/// JSON shape of a serialized coverage tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNode {
    pub name: String,
    pub node_type: String,
    pub summary: SerializedSummary,
    pub children: Vec<SerializedNode>,
}

/// A fully parsed coverage report: the root of the tree plus convenience
/// access to the project-wide summary.
#[derive(Debug)]
pub struct CoverageResult {
    root: CoverageNode,
}

impl CoverageResult {
    pub fn new(root: CoverageNode) -> Self {
        Self { root }
    }

    /// Parse an XML coverage file into a result.
    pub fn from_xml_file(path: impl AsRef<Path>) -> Result<Self> {
        let root = CoverageXmlParser::parse_file(path.as_ref())?;
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &CoverageNode {
        &self.root
    }

    /// Project-wide summary, aggregated over the whole tree.
    pub fn summary(&self) -> CoverageSummary {
        self.root.summary()
    }
}
