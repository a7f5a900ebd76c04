//! Archive tree container and statistics.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::config::BuildConfig;
use crate::error::BuildWarning;
use crate::node::{ArchiveNode, NodeKind};

/// Summary statistics for a built tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    /// Total size in bytes.
    pub total_size: u64,
    /// Number of regular files.
    pub total_files: u64,
    /// Number of directories, root included.
    pub total_dirs: u64,
    /// Number of synthetic nodes.
    pub total_synthetic: u64,
    /// Number of files broken down into synthetic children.
    pub expanded_files: u64,
    /// Maximum depth reached (root = 0).
    pub max_depth: u32,
}

impl TreeStats {
    /// Compute statistics for a subtree.
    pub fn from_root(root: &ArchiveNode) -> Self {
        let mut stats = Self {
            total_size: root.size,
            ..Self::default()
        };
        stats.record(root, 0);
        stats
    }

    fn record(&mut self, node: &ArchiveNode, depth: u32) {
        self.max_depth = self.max_depth.max(depth);
        match node.kind {
            NodeKind::Directory => self.total_dirs += 1,
            NodeKind::File => {
                self.total_files += 1;
                if !node.is_leaf() {
                    self.expanded_files += 1;
                }
            }
            NodeKind::Synthetic => self.total_synthetic += 1,
        }
        for child in &node.children {
            self.record(child, depth + 1);
        }
    }
}

/// A fully built archive hierarchy with build metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveTree {
    /// Root node of the tree.
    pub root: ArchiveNode,

    /// Archive the tree was built from.
    pub source: PathBuf,

    /// When the build finished.
    pub built_at: SystemTime,

    /// Duration of the build.
    pub build_duration: Duration,

    /// Build configuration used.
    pub config: BuildConfig,

    /// Summary statistics.
    pub stats: TreeStats,

    /// Problems recovered from during the build.
    pub warnings: Vec<BuildWarning>,
}

impl ArchiveTree {
    /// Create a new archive tree.
    pub fn new(
        root: ArchiveNode,
        source: PathBuf,
        config: BuildConfig,
        build_duration: Duration,
        warnings: Vec<BuildWarning>,
    ) -> Self {
        let stats = TreeStats::from_root(&root);
        Self {
            root,
            source,
            built_at: SystemTime::now(),
            build_duration,
            config,
            stats,
            warnings,
        }
    }

    /// Get the total size of the tree.
    pub fn total_size(&self) -> u64 {
        self.root.size
    }

    /// Check if there were any warnings during the build.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Indented outline of the whole tree, one node per line.
    pub fn describe(&self) -> String {
        let mut description = String::new();
        describe_node(&self.root, 0, &mut description);
        description
    }
}

fn describe_node(node: &ArchiveNode, level: usize, description: &mut String) {
    description.push_str(&"   ".repeat(level));
    description.push_str(&node.to_string());
    description.push('\n');
    for child in &node.children {
        describe_node(child, level + 1, description);
    }
}
