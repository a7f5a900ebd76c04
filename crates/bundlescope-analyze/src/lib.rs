//! Analysis algorithms for bundlescope.
//!
//! This crate derives read-only views from a built archive tree:
//!
//! - **Duplicate detection** - group nodes by checksum, with a top-level view
//!   that hides duplicates nested inside duplicated folders
//! - **Parent index** - upward navigation without parent pointers
//! - **Application discovery** - apps and extensions with their manifests
//! - **Category breakdown** - bytes per category
//!
//! # Duplicate Detection
//!
//! ```rust,ignore
//! use bundlescope_analyze::{DuplicateConfig, DuplicateIndex, DuplicateReport};
//! use bundlescope_scan::{BuildConfig, TreeBuilder};
//!
//! let tree = TreeBuilder::new(BuildConfig::new("/path/to/App.ipa")).open().await?.tree;
//!
//! let index = DuplicateIndex::build(&tree.root);
//! let report = DuplicateReport::new(&index, &DuplicateConfig::default());
//!
//! println!("Found {} duplicate groups", report.group_count);
//! println!("Wasted space: {} bytes", report.total_wasted_space);
//! ```

mod analysis;
mod apps;
mod breakdown;
mod duplicates;
mod parents;

pub use analysis::ArchiveAnalysis;
pub use apps::{ArchiveApp, find_apps};
pub use breakdown::{CategoryBreakdown, CategoryStats};
pub use duplicates::{
    DuplicateConfig, DuplicateConfigBuilder, DuplicateGroup, DuplicateIndex, DuplicateReport,
};
pub use parents::ParentIndex;

// Re-export core types
pub use bundlescope_core::{ArchiveNode, ArchiveTree, Checksum, NodeId};
