//! Recursive archive tree construction.
//!
//! Children of a directory are built concurrently and joined in enumeration
//! order. Nodes are assembled bottom-up, so every size and checksum is final
//! once the node exists. Every open file or directory handle is held under a
//! permit of one shared semaphore, so wide archives never exhaust descriptors.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use compact_str::CompactString;
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::sync::{Semaphore, SemaphorePermit, broadcast};
use tokio_util::sync::CancellationToken;

use bundlescope_core::{
    ArchiveNode, ArchiveTree, BuildConfig, BuildError, BuildWarning, Checksum, NodeId, NodeKind,
    ToolError,
};

use crate::classify::classify_path;
use crate::expand::{ContentError, Expander};
use crate::manifest::read_metadata;
use crate::progress::{BuildProgress, ProgressTracker};
use crate::runner::{BoxFuture, CommandRunner};

/// Builds archive trees from extracted directories.
pub struct TreeBuilder {
    config: Arc<BuildConfig>,
    expander: Expander,
    progress_tx: broadcast::Sender<BuildProgress>,
}

/// A finished node together with the problems recovered from below it.
struct Built {
    node: ArchiveNode,
    warnings: Vec<BuildWarning>,
}

/// State shared by every node of one build.
struct BuildContext<'a> {
    config: &'a BuildConfig,
    expander: &'a Expander,
    tracker: &'a ProgressTracker,
    io_permits: &'a Semaphore,
    cancel: &'a CancellationToken,
}

impl BuildContext<'_> {
    /// Wait until another file handle may be opened.
    async fn open_permit(&self) -> Result<SemaphorePermit<'_>, BuildError> {
        self.io_permits.acquire().await.map_err(|_| BuildError::Cancelled)
    }
}

impl TreeBuilder {
    /// Create a builder running external tools as real processes.
    pub fn new(config: BuildConfig) -> Self {
        let config = Arc::new(config);
        let expander = Expander::new(Arc::clone(&config));
        Self::from_parts(config, expander)
    }

    /// Create a builder with a custom command runner.
    pub fn with_runner(config: BuildConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let config = Arc::new(config);
        let expander = Expander::with_runner(Arc::clone(&config), runner);
        Self::from_parts(config, expander)
    }

    fn from_parts(config: Arc<BuildConfig>, expander: Expander) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            config,
            expander,
            progress_tx,
        }
    }

    /// Get the build configuration.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Subscribe to build progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<BuildProgress> {
        self.progress_tx.subscribe()
    }

    /// Build the tree rooted at `path`.
    ///
    /// External tools still running are killed if the returned future is
    /// dropped before completion.
    pub async fn build(&self, path: &Path) -> Result<ArchiveTree, BuildError> {
        self.build_with_cancel(path, &CancellationToken::new()).await
    }

    /// Build the tree rooted at `path`, giving up when `cancel` fires.
    pub async fn build_with_cancel(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<ArchiveTree, BuildError> {
        self.build_tree(path, root_name(path), path.to_path_buf(), cancel)
            .await
    }

    /// Build a tree whose root is labelled `name` and attributed to `source`.
    pub(crate) async fn build_tree(
        &self,
        path: &Path,
        name: CompactString,
        source: PathBuf,
        cancel: &CancellationToken,
    ) -> Result<ArchiveTree, BuildError> {
        let start = Instant::now();
        tracing::info!(path = %path.display(), "building archive tree");

        // Cancels in-flight tools on every exit path, including drop.
        let token = cancel.child_token();
        let _guard = token.clone().drop_guard();

        let tracker = ProgressTracker::new(self.progress_tx.clone());
        let io_permits = Semaphore::new(self.config.max_open_files.max(1));
        let ctx = BuildContext {
            config: &self.config,
            expander: &self.expander,
            tracker: &tracker,
            io_permits: &io_permits,
            cancel: &token,
        };

        let built = tokio::select! {
            biased;
            _ = token.cancelled() => Err(BuildError::Cancelled),
            result = build_node(&ctx, path.to_path_buf(), NodeId::root(), name) => result,
        }?;

        let duration = start.elapsed();
        let tree = ArchiveTree::new(
            built.node,
            source,
            (*self.config).clone(),
            duration,
            built.warnings,
        );
        tracing::info!(
            total_size = tree.stats.total_size,
            files = tree.stats.total_files,
            dirs = tree.stats.total_dirs,
            warnings = tree.warnings.len(),
            elapsed_ms = duration.as_millis() as u64,
            "archive tree built"
        );
        Ok(tree)
    }
}

fn build_node<'a>(
    ctx: &'a BuildContext<'a>,
    path: PathBuf,
    id: NodeId,
    name: CompactString,
) -> BoxFuture<'a, Result<Built, BuildError>> {
    Box::pin(async move {
        if ctx.cancel.is_cancelled() {
            return Err(BuildError::Cancelled);
        }

        let metadata = tokio::fs::symlink_metadata(&path)
            .await
            .map_err(|e| BuildError::io(&path, e))?;

        if metadata.is_dir() {
            build_directory(ctx, path, id, name).await
        } else if metadata.is_file() {
            build_file(ctx, path, id, name, metadata.len()).await
        } else {
            // Links and special files are listed but carry no content.
            tracing::trace!(path = %path.display(), "not following non-regular entry");
            Ok(Built {
                node: ArchiveNode::new_file(id, name, 0, None, None, Vec::new()),
                warnings: Vec::new(),
            })
        }
    })
}

async fn build_directory(
    ctx: &BuildContext<'_>,
    path: PathBuf,
    id: NodeId,
    name: CompactString,
) -> Result<Built, BuildError> {
    let listing = {
        let _permit = ctx.open_permit().await?;
        list_directory(ctx.config, &path).await?
    };

    // A failing child fails the whole directory.
    let built: Vec<Built> = stream::iter(listing)
        .map(|(child_path, file_name)| {
            let child_id = id.join(&file_name);
            let child_name = CompactString::from(file_name.to_string_lossy().as_ref());
            build_node(ctx, child_path, child_id, child_name)
        })
        .buffered(ctx.config.max_open_files.max(1))
        .try_collect()
        .await?;

    let mut warnings = Vec::new();
    let mut children = Vec::with_capacity(built.len());
    for child in built {
        warnings.extend(child.warnings);
        children.push(child.node);
    }

    let classification = classify_path(&path, NodeKind::Directory).await;
    let mut metadata = None;
    if let Some(package) = classification.package().filter(|p| p.has_manifest()) {
        let parsed = {
            let _permit = ctx.open_permit().await?;
            read_metadata(&path, package).await
        };
        match parsed {
            Ok(parsed) => metadata = parsed,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "bundle manifest unreadable");
                warnings.push(BuildWarning::manifest_unreadable(&path, &err));
            }
        }
    }

    ctx.tracker.dir_built(&path);
    Ok(Built {
        node: ArchiveNode::new_directory(id, name, classification.content, metadata, children),
        warnings,
    })
}

async fn build_file(
    ctx: &BuildContext<'_>,
    path: PathBuf,
    id: NodeId,
    name: CompactString,
    len: u64,
) -> Result<Built, BuildError> {
    let (classification, checksum) = {
        let _permit = ctx.open_permit().await?;
        (classify_path(&path, NodeKind::File).await, hash_file(&path).await?)
    };

    let mut warnings = Vec::new();
    let children = match ctx
        .expander
        .expand(&id, &path, classification.content.as_ref(), len, ctx.cancel)
        .await
    {
        Ok(children) => children,
        Err(ContentError::Tool(ToolError::Cancelled { .. })) if ctx.cancel.is_cancelled() => {
            return Err(BuildError::Cancelled);
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "expansion failed, keeping leaf");
            warnings.push(BuildWarning::expansion_failed(&path, &err));
            Vec::new()
        }
    };

    ctx.tracker.file_built(&path, len, !children.is_empty());
    Ok(Built {
        node: ArchiveNode::new_file(
            id,
            name,
            len,
            Some(checksum),
            classification.content,
            children,
        ),
        warnings,
    })
}

/// Enumerate a directory, closing its handle before any child is built.
async fn list_directory(
    config: &BuildConfig,
    path: &Path,
) -> Result<Vec<(PathBuf, OsString)>, BuildError> {
    let mut entries = tokio::fs::read_dir(path)
        .await
        .map_err(|e| BuildError::io(path, e))?;

    let mut listing = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| BuildError::io(path, e))?
    {
        let file_name = entry.file_name();
        if config.should_skip_hidden(&file_name.to_string_lossy()) {
            continue;
        }
        listing.push((entry.path(), file_name));
    }
    Ok(listing)
}

/// Hash file contents off the async runtime.
async fn hash_file(path: &Path) -> Result<Checksum, BuildError> {
    let owned = path.to_path_buf();
    let hash = tokio::task::spawn_blocking(move || {
        let mut hasher = blake3::Hasher::new();
        hasher.update_mmap_rayon(&owned)?;
        Ok::<_, std::io::Error>(hasher.finalize())
    })
    .await
    .map_err(|e| BuildError::Join {
        message: e.to_string(),
    })?
    .map_err(|e| BuildError::io(path, e))?;

    Ok(Checksum::from(hash))
}

/// Display name of a build root.
pub(crate) fn root_name(path: &Path) -> CompactString {
    path.file_name()
        .map(|n| CompactString::from(n.to_string_lossy().as_ref()))
        .unwrap_or_else(|| CompactString::from(path.to_string_lossy().as_ref()))
}
