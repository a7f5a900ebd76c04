//! Per-tree analysis snapshot.

use bundlescope_core::{ArchiveNode, ArchiveTree, NodeId};

use crate::apps::{ArchiveApp, find_apps};
use crate::breakdown::CategoryBreakdown;
use crate::duplicates::DuplicateIndex;
use crate::parents::ParentIndex;

/// Everything derived from one tree, computed once.
///
/// Rebuilt from scratch whenever a new tree is built.
#[derive(Debug, Clone)]
pub struct ArchiveAnalysis {
    pub duplicates: DuplicateIndex,
    pub parents: ParentIndex,
    pub apps: Vec<ArchiveApp>,
    pub breakdown: CategoryBreakdown,
}

impl ArchiveAnalysis {
    /// Analyze a built tree.
    pub fn new(tree: &ArchiveTree) -> Self {
        Self::from_root(&tree.root)
    }

    /// Analyze a subtree.
    pub fn from_root(root: &ArchiveNode) -> Self {
        let analysis = Self {
            duplicates: DuplicateIndex::build(root),
            parents: ParentIndex::build(root),
            apps: find_apps(root),
            breakdown: CategoryBreakdown::from_root(root),
        };
        tracing::debug!(
            duplicate_groups = analysis.duplicates.len(),
            apps = analysis.apps.len(),
            "archive analyzed"
        );
        analysis
    }

    /// The application or extension containing a node, innermost first.
    pub fn owning_app(&self, id: &NodeId) -> Option<&ArchiveApp> {
        std::iter::once(id)
            .chain(self.parents.ancestors(id))
            .find_map(|candidate| self.apps.iter().find(|app| &app.id == candidate))
    }
}
