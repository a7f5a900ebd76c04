//! Exact duplicate detection over a built archive tree.
//!
//! Two nodes are duplicates iff both carry a checksum and the checksums are
//! equal. The index is built in one pre-order pass; the top-level view is a
//! second pass guided by the index that stops descending at the first
//! duplicated node on every path.

use std::collections::{HashMap, HashSet};

use derive_builder::Builder;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use bundlescope_core::{ArchiveNode, Checksum, NodeId};

/// A group of nodes sharing one checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Checksum shared by every node of the group.
    pub checksum: Checksum,

    /// Members in pre-order discovery order.
    pub nodes: Vec<NodeId>,

    /// Size of each member in bytes.
    pub size: u64,
}

impl DuplicateGroup {
    /// Get the number of duplicate nodes.
    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    /// Bytes that could be saved by keeping a single copy.
    pub fn wasted_bytes(&self) -> u64 {
        self.size * self.nodes.len().saturating_sub(1) as u64
    }
}

/// Checksum index of a tree, restricted to groups of two or more nodes.
#[derive(Debug, Clone, Default)]
pub struct DuplicateIndex {
    groups: HashMap<Checksum, DuplicateGroup>,
    membership: HashMap<NodeId, Checksum>,
    top_level: IndexSet<Checksum>,
}

impl DuplicateIndex {
    /// Index every checksummed node below and including `root`.
    pub fn build(root: &ArchiveNode) -> Self {
        let mut candidates: HashMap<&Checksum, Vec<&ArchiveNode>> = HashMap::new();
        for node in root.descendants() {
            if let Some(checksum) = &node.checksum {
                candidates.entry(checksum).or_default().push(node);
            }
        }

        let mut groups = HashMap::new();
        let mut membership = HashMap::new();
        for (checksum, nodes) in candidates {
            if nodes.len() < 2 {
                continue;
            }
            for node in &nodes {
                membership.insert(node.id.clone(), checksum.clone());
            }
            groups.insert(
                checksum.clone(),
                DuplicateGroup {
                    checksum: checksum.clone(),
                    size: nodes[0].size,
                    nodes: nodes.iter().map(|n| n.id.clone()).collect(),
                },
            );
        }

        let mut index = Self {
            groups,
            membership,
            top_level: IndexSet::new(),
        };
        index.top_level = index.collect_top_level(root);

        tracing::debug!(
            groups = index.groups.len(),
            top_level = index.top_level.len(),
            "duplicate index built"
        );
        index
    }

    fn collect_top_level(&self, root: &ArchiveNode) -> IndexSet<Checksum> {
        let mut top_level = IndexSet::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            match self.membership.get(&node.id) {
                // A duplicated node hides everything nested inside it.
                Some(checksum) => {
                    top_level.insert(checksum.clone());
                }
                None => stack.extend(node.children.iter().rev()),
            }
        }
        top_level
    }

    /// Number of duplicate groups anywhere in the tree.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Check if the tree has no duplicates at all.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group for a checksum.
    pub fn group(&self, checksum: &Checksum) -> Option<&DuplicateGroup> {
        self.groups.get(checksum)
    }

    /// Group a node belongs to, if it is duplicated.
    pub fn group_of(&self, id: &NodeId) -> Option<&DuplicateGroup> {
        self.membership.get(id).and_then(|c| self.groups.get(c))
    }

    /// Check if a node is part of any group.
    pub fn is_duplicate(&self, id: &NodeId) -> bool {
        self.membership.contains_key(id)
    }

    /// Identities of every node in any group.
    pub fn duplicate_ids(&self) -> HashSet<&NodeId> {
        self.membership.keys().collect()
    }

    /// All groups, most wasted space first.
    pub fn groups(&self) -> Vec<&DuplicateGroup> {
        let mut groups: Vec<&DuplicateGroup> = self.groups.values().collect();
        sort_by_waste(&mut groups);
        groups
    }

    /// Groups reported at their shallowest occurrence, in discovery order.
    pub fn top_level(&self) -> Vec<&DuplicateGroup> {
        self.top_level
            .iter()
            .filter_map(|c| self.groups.get(c))
            .collect()
    }
}

fn sort_by_waste(groups: &mut [&DuplicateGroup]) {
    groups.sort_by(|a, b| {
        b.wasted_bytes()
            .cmp(&a.wasted_bytes())
            .then_with(|| a.checksum.cmp(&b.checksum))
    });
}

/// Options for presenting duplicates.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct DuplicateConfig {
    /// Only report groups discovered at their shallowest occurrence.
    #[builder(default = "true")]
    pub top_level_only: bool,

    /// Skip groups whose members are smaller than this.
    #[builder(default = "0")]
    pub min_size: u64,

    /// Maximum number of groups to return (0 = unlimited).
    #[builder(default = "0")]
    pub max_groups: usize,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            top_level_only: true,
            min_size: 0,
            max_groups: 0,
        }
    }
}

impl DuplicateConfig {
    /// Create a new config builder.
    pub fn builder() -> DuplicateConfigBuilder {
        DuplicateConfigBuilder::default()
    }
}

/// Filtered duplicate groups with totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// Groups, sorted by wasted space descending.
    pub groups: Vec<DuplicateGroup>,

    /// Total size of all nodes in the reported groups.
    pub total_duplicate_size: u64,

    /// Total wasted space over the reported groups.
    pub total_wasted_space: u64,

    /// Number of reported groups.
    pub group_count: usize,
}

impl DuplicateReport {
    /// Build a report from an index.
    pub fn new(index: &DuplicateIndex, config: &DuplicateConfig) -> Self {
        let mut groups = if config.top_level_only {
            index.top_level()
        } else {
            index.groups()
        };
        groups.retain(|g| g.size >= config.min_size);
        sort_by_waste(&mut groups);
        if config.max_groups > 0 {
            groups.truncate(config.max_groups);
        }

        let groups: Vec<DuplicateGroup> = groups.into_iter().cloned().collect();
        Self {
            total_duplicate_size: groups.iter().map(|g| g.size * g.count() as u64).sum(),
            total_wasted_space: groups.iter().map(DuplicateGroup::wasted_bytes).sum(),
            group_count: groups.len(),
            groups,
        }
    }

    /// Check if any duplicates were found.
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }
}
