//! Opening archives that may still be compressed.

use std::fs::File;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use bundlescope_core::{ArchiveTree, BuildError};

use crate::builder::{TreeBuilder, root_name};

/// A built archive together with the directory it was built from.
///
/// Compressed archives are extracted into a private temporary directory that
/// lives as long as this value.
#[derive(Debug)]
pub struct OpenedArchive {
    /// The built tree.
    pub tree: ArchiveTree,
    root_dir: PathBuf,
    workdir: Option<TempDir>,
}

impl OpenedArchive {
    /// Directory the tree was built from.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Whether the archive had to be extracted first.
    pub fn was_extracted(&self) -> bool {
        self.workdir.is_some()
    }

    /// Take the tree, removing any extracted files.
    pub fn into_tree(self) -> ArchiveTree {
        self.tree
    }
}

impl TreeBuilder {
    /// Open the archive named by the configured root and build its tree.
    pub async fn open(&self) -> Result<OpenedArchive, BuildError> {
        self.open_with_cancel(&CancellationToken::new()).await
    }

    /// Like [`TreeBuilder::open`], giving up when `cancel` fires.
    pub async fn open_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<OpenedArchive, BuildError> {
        let source = self.config().root.clone();
        let metadata = tokio::fs::metadata(&source)
            .await
            .map_err(|e| BuildError::io(&source, e))?;
        let compressed = self.config().compressed.unwrap_or_else(|| metadata.is_file());

        if !compressed {
            let tree = self.build_with_cancel(&source, cancel).await?;
            return Ok(OpenedArchive {
                tree,
                root_dir: source,
                workdir: None,
            });
        }

        let workdir = tempfile::Builder::new()
            .prefix("bundlescope-")
            .tempdir()
            .map_err(|e| BuildError::io(std::env::temp_dir(), e))?;
        let root_dir = workdir.path().to_path_buf();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BuildError::Cancelled),
            result = extract(source.clone(), root_dir.clone()) => result?,
        }

        let tree = self
            .build_tree(&root_dir, root_name(&source), source, cancel)
            .await?;
        Ok(OpenedArchive {
            tree,
            root_dir,
            workdir: Some(workdir),
        })
    }
}

/// Extract a zip container into `destination`.
pub async fn extract(archive: PathBuf, destination: PathBuf) -> Result<(), BuildError> {
    tracing::info!(
        archive = %archive.display(),
        destination = %destination.display(),
        "extracting archive"
    );

    tokio::task::spawn_blocking(move || {
        let file = File::open(&archive).map_err(|e| BuildError::io(&archive, e))?;
        let mut zip = zip::ZipArchive::new(file).map_err(|e| BuildError::Archive {
            path: archive.clone(),
            message: e.to_string(),
        })?;
        zip.extract(&destination).map_err(|e| BuildError::Archive {
            path: archive.clone(),
            message: e.to_string(),
        })
    })
    .await
    .map_err(|e| BuildError::Join {
        message: e.to_string(),
    })?
}
