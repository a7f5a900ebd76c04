//! Core types and traits for bundlescope.
//!
//! This crate provides the fundamental data structures used throughout
//! the bundlescope ecosystem: archive nodes, content categories, bundle
//! manifests, build configuration and the error taxonomy.

mod category;
mod config;
mod error;
mod metadata;
mod node;
mod tree;

pub use category::{BinaryFormat, Category, ContentKind, GenericKind, PackageKind};
pub use config::{BuildConfig, BuildConfigBuilder};
pub use error::{BuildError, BuildWarning, ToolError, WarningKind};
pub use metadata::{BundleIcon, BundleIcons, InfoPlist, NodeMetadata, Platform};
pub use node::{ArchiveNode, Checksum, Descendants, NodeId, NodeKind};
pub use tree::{ArchiveTree, TreeStats};
