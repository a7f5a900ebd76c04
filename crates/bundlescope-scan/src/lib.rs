//! Archive tree building engine for bundlescope.
//!
//! # Overview
//!
//! `bundlescope-scan` walks an extracted application archive and builds an
//! immutable, weighted tree of its contents. Key features:
//!
//! - **Content detection** from magic numbers and package extensions
//! - **Concurrent traversal** of sibling entries
//! - **Synthetic children** for executables and asset catalogs, produced by
//!   external tools with bounded concurrency, timeouts and cancellation
//! - **Bundle manifests** parsed into node metadata
//! - **Progress updates** via broadcast channels
//!
//! # Example
//!
//! ```rust,no_run
//! use bundlescope_scan::{BuildConfig, TreeBuilder};
//!
//! # async fn run() -> Result<(), bundlescope_scan::BuildError> {
//! let builder = TreeBuilder::new(BuildConfig::new("/path/to/App.ipa"));
//! let opened = builder.open().await?;
//!
//! println!("Total size: {} bytes", opened.tree.total_size());
//! println!("Total files: {}", opened.tree.stats.total_files);
//! # Ok(())
//! # }
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! use bundlescope_scan::{BuildConfig, TreeBuilder};
//!
//! let builder = TreeBuilder::new(BuildConfig::new("/path/to/Payload"));
//! let mut progress_rx = builder.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(progress) = progress_rx.recv().await {
//!         println!("Built {} files", progress.files_built);
//!     }
//! });
//! ```

mod archive;
mod builder;
mod classify;
mod expand;
mod manifest;
mod progress;
mod runner;

pub use archive::{OpenedArchive, extract};
pub use builder::TreeBuilder;
pub use classify::{Classification, classify, classify_path, generic_kind, sniff_binary};
pub use expand::{ContentError, Expander, parse_assets, parse_segments};
pub use manifest::{ManifestError, read_info_plist, read_metadata};
pub use progress::BuildProgress;
pub use runner::{BoxFuture, CommandRunner, ProcessRunner};

// Re-export core types for convenience
pub use bundlescope_core::{
    ArchiveNode, ArchiveTree, BuildConfig, BuildError, BuildWarning, Checksum, NodeId, NodeKind,
    ToolError, TreeStats, WarningKind,
};
