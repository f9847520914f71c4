//! Core vocabulary shared across the graph, serializer, and tool layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of code entity a node describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Module,
    Class,
    Function,
    Method,
    Constant,
    Variable,
    Import,
}

impl NodeKind {
    /// Single-character shortcode used by the compact output format.
    pub fn shortcode(&self) -> &'static str {
        match self {
            NodeKind::Module => "M",
            NodeKind::Class => "c",
            NodeKind::Function => "f",
            NodeKind::Method => "m",
            NodeKind::Constant => "C",
            NodeKind::Variable => "v",
            NodeKind::Import => "i",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Module => "module",
            NodeKind::Class => "class",
            NodeKind::Function => "function",
            NodeKind::Method => "method",
            NodeKind::Constant => "constant",
            NodeKind::Variable => "variable",
            NodeKind::Import => "import",
        }
    }
}

impl FromStr for NodeKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "module" => Ok(NodeKind::Module),
            "class" => Ok(NodeKind::Class),
            "function" => Ok(NodeKind::Function),
            "method" => Ok(NodeKind::Method),
            "constant" => Ok(NodeKind::Constant),
            "variable" => Ok(NodeKind::Variable),
            "import" => Ok(NodeKind::Import),
            _ => Err(()),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progressive detail level for serialized nodes.
///
/// Rough per-node budgets: skeleton ~15 tokens, summary ~75, full ~400.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FetchLevel {
    Skeleton,
    Summary,
    Full,
}

impl FetchLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchLevel::Skeleton => "skeleton",
            FetchLevel::Summary => "summary",
            FetchLevel::Full => "full",
        }
    }
}

impl FromStr for FetchLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skeleton" => Ok(FetchLevel::Skeleton),
            "summary" => Ok(FetchLevel::Summary),
            "full" => Ok(FetchLevel::Full),
            _ => Err(()),
        }
    }
}

/// Wire format for serialized nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Long keys (`id`, `name`, `type`, ...).
    Standard,
    /// Short keys (`i`, `n`, `t`, ...) and kind shortcodes.
    Compact,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Standard => "standard",
            OutputFormat::Compact => "compact",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(OutputFormat::Standard),
            "compact" => Ok(OutputFormat::Compact),
            _ => Err(()),
        }
    }
}

/// Traversal order over the dependency index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalStrategy {
    /// Breadth-first: immediate impacts first, level by level.
    Bfs,
    /// Depth-first: follow chains deep before widening.
    Dfs,
}

impl TraversalStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraversalStrategy::Bfs => "bfs",
            TraversalStrategy::Dfs => "dfs",
        }
    }
}

impl FromStr for TraversalStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bfs" => Ok(TraversalStrategy::Bfs),
            "dfs" => Ok(TraversalStrategy::Dfs),
            _ => Err(()),
        }
    }
}

/// Edge direction for dependency traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalDirection {
    /// What does this node call? Computed on demand, not stored.
    Forward,
    /// Who calls this node? The stored reverse index.
    Reverse,
    Both,
}

impl TraversalDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraversalDirection::Forward => "forward",
            TraversalDirection::Reverse => "reverse",
            TraversalDirection::Both => "both",
        }
    }
}

impl FromStr for TraversalDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" => Ok(TraversalDirection::Forward),
            "reverse" => Ok(TraversalDirection::Reverse),
            "both" => Ok(TraversalDirection::Both),
            _ => Err(()),
        }
    }
}

/// Rough token estimate: character count / 4.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}
