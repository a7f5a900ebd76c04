//! Size totals per category.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use bundlescope_core::{ArchiveNode, Category};

/// Totals for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    /// Number of leaves.
    pub count: u64,
    /// Bytes attributed to the category.
    pub size: u64,
}

/// Leaf sizes summed per category.
///
/// Only leaves are counted, so every byte is attributed exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    totals: BTreeMap<Category, CategoryStats>,
}

impl CategoryBreakdown {
    /// Sum every leaf below `root`.
    pub fn from_root(root: &ArchiveNode) -> Self {
        let mut totals: BTreeMap<Category, CategoryStats> = BTreeMap::new();
        for leaf in root.descendants().filter(|n| n.is_leaf()) {
            let stats = totals.entry(leaf.category).or_default();
            stats.count += 1;
            stats.size += leaf.size;
        }
        Self { totals }
    }

    /// Totals for a category, zero when absent.
    pub fn get(&self, category: Category) -> CategoryStats {
        self.totals.get(&category).copied().unwrap_or_default()
    }

    /// Non-empty categories in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, CategoryStats)> + '_ {
        Category::iter().filter_map(|c| self.totals.get(&c).map(|s| (c, *s)))
    }

    /// Sum over all categories.
    pub fn total_size(&self) -> u64 {
        self.totals.values().map(|s| s.size).sum()
    }
}
