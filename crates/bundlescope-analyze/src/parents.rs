//! Upward navigation for a tree without parent pointers.

use std::collections::HashMap;

use bundlescope_core::{ArchiveNode, NodeId};

/// Map from each node to its direct parent.
///
/// Built once per tree; the root has no entry.
#[derive(Debug, Clone, Default)]
pub struct ParentIndex {
    parents: HashMap<NodeId, NodeId>,
}

impl ParentIndex {
    /// Index every parent link below `root` in a single traversal.
    pub fn build(root: &ArchiveNode) -> Self {
        let mut parents = HashMap::new();
        for node in root.descendants() {
            for child in &node.children {
                parents.insert(child.id.clone(), node.id.clone());
            }
        }
        Self { parents }
    }

    /// Direct parent of a node.
    pub fn parent(&self, id: &NodeId) -> Option<&NodeId> {
        self.parents.get(id)
    }

    /// Ancestors from the direct parent up to the root.
    pub fn ancestors<'a>(&'a self, id: &NodeId) -> impl Iterator<Item = &'a NodeId> + 'a {
        std::iter::successors(self.parents.get(id), move |current| self.parents.get(*current))
    }

    /// Identities from the root down to and including `id`.
    pub fn path_to(&self, id: &NodeId) -> Vec<NodeId> {
        let mut path: Vec<NodeId> = self.ancestors(id).cloned().collect();
        path.reverse();
        path.push(id.clone());
        path
    }

    /// Depth of a node (root = 0).
    pub fn depth(&self, id: &NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// Number of indexed links.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}
