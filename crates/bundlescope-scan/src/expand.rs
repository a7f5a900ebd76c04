//! Synthetic children from external inspection tools.
//!
//! Executables are broken down into segments with a size reporting tool and
//! compiled asset catalogs into their renditions with an asset introspector.

use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use bundlescope_core::{
    ArchiveNode, BuildConfig, Checksum, ContentKind, NodeId, PackageKind, ToolError,
};

use crate::runner::{CommandRunner, ProcessRunner};

/// Column holding the decimal total in size tool output.
const TOTAL_COLUMN: &str = "dec";

/// Column duplicating the total in hexadecimal.
const HEX_COLUMN: &str = "hex";

/// Errors turning tool output into synthetic children.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The tool ran but its output did not have the expected shape.
    #[error("Unexpected tool output: {0}")]
    UnexpectedOutput(String),

    /// The tool could not be run to completion.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Asset listing was not a JSON array of records.
    #[error("Malformed asset listing: {0}")]
    Json(#[from] serde_json::Error),
}

/// One record of the asset introspector output.
#[derive(Debug, Deserialize)]
struct AssetRecord {
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "RenditionName", default)]
    rendition_name: Option<String>,
    #[serde(rename = "SizeOnDisk", default)]
    size_on_disk: Option<u64>,
    #[serde(rename = "SHA1Digest", default)]
    sha1_digest: Option<String>,
}

/// Expands files into synthetic children, bounding concurrent tool runs.
pub struct Expander {
    runner: Arc<dyn CommandRunner>,
    permits: Arc<Semaphore>,
    config: Arc<BuildConfig>,
}

impl Expander {
    /// Create an expander running real processes.
    pub fn new(config: Arc<BuildConfig>) -> Self {
        let runner = Arc::new(ProcessRunner::new(config.tool_timeout));
        Self::with_runner(config, runner)
    }

    /// Create an expander with a custom command runner.
    pub fn with_runner(config: Arc<BuildConfig>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            permits: Arc::new(Semaphore::new(config.max_concurrent_tools.max(1))),
            config,
        }
    }

    /// Whether a file with this content is broken down at all.
    pub fn applies_to(&self, content: Option<&ContentKind>) -> bool {
        match content {
            Some(ContentKind::Binary(_)) => self.config.expand_binaries,
            Some(ContentKind::Package(PackageKind::AssetCatalog)) => {
                self.config.expand_asset_catalogs
            }
            _ => false,
        }
    }

    /// Produce synthetic children for a file.
    ///
    /// Returns no children for content that is not expanded.
    pub async fn expand(
        &self,
        id: &NodeId,
        path: &Path,
        content: Option<&ContentKind>,
        len: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<ArchiveNode>, ContentError> {
        if !self.applies_to(content) {
            return Ok(Vec::new());
        }

        let _permit = self.permits.acquire().await.map_err(|_| ToolError::Cancelled {
            program: self.program_for(content).display().to_string(),
        })?;

        let children = match content {
            Some(ContentKind::Binary(_)) => self.expand_binary(id, path, len, cancel).await?,
            _ => self.expand_asset_catalog(id, path, cancel).await?,
        };

        tracing::debug!(path = %path.display(), children = children.len(), "expanded file");
        Ok(children)
    }

    fn program_for(&self, content: Option<&ContentKind>) -> &Path {
        match content {
            Some(ContentKind::Binary(_)) => &self.config.size_tool,
            _ => &self.config.asset_tool,
        }
    }

    async fn expand_binary(
        &self,
        id: &NodeId,
        path: &Path,
        len: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<ArchiveNode>, ContentError> {
        let args = [path.as_os_str().to_os_string()];
        let output = self
            .runner
            .run_to_completion(&self.config.size_tool, &args, cancel)
            .await?;
        parse_segments(&output, id, len)
    }

    async fn expand_asset_catalog(
        &self,
        id: &NodeId,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<ArchiveNode>, ContentError> {
        let mut args: Vec<OsString> = self
            .config
            .asset_tool_args
            .iter()
            .map(OsString::from)
            .collect();
        args.push(path.as_os_str().to_os_string());

        let mut stream = self
            .runner
            .run_streaming(&self.config.asset_tool, &args, cancel.clone());
        let mut output = Vec::new();
        while let Some(chunk) = stream.next().await {
            output.extend_from_slice(&chunk?);
        }

        parse_assets(&output, id)
    }
}

/// Turn size tool output into one synthetic child per segment.
///
/// Segment sizes are scaled so they share out `len`, the on-disk length of
/// the executable, in proportion to the reported total.
pub fn parse_segments(
    output: &str,
    id: &NodeId,
    len: u64,
) -> Result<Vec<ArchiveNode>, ContentError> {
    let lines: Vec<Vec<&str>> = output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split('\t').map(str::trim).collect())
        .collect();

    let [header, values, ..] = lines.as_slice() else {
        return Err(ContentError::UnexpectedOutput(format!(
            "expected a header and a value line, got {} line(s)",
            lines.len()
        )));
    };

    let mut total = None;
    let mut segments = Vec::new();
    for (column, value) in header.iter().zip(values.iter()) {
        if *column == HEX_COLUMN {
            continue;
        }
        let Ok(value) = value.parse::<u64>() else {
            continue;
        };
        if *column == TOTAL_COLUMN {
            total = Some(value);
        } else {
            segments.push((*column, value));
        }
    }

    let total = match total {
        Some(total) if total > 0 => total,
        Some(_) => return Err(ContentError::UnexpectedOutput("total size is zero".to_string())),
        None => {
            return Err(ContentError::UnexpectedOutput(format!(
                "missing `{TOTAL_COLUMN}` column"
            )));
        }
    };

    if segments.is_empty() {
        return Err(ContentError::UnexpectedOutput("no segment columns".to_string()));
    }

    let children = segments
        .into_iter()
        .enumerate()
        .map(|(index, (name, value))| {
            let child_id = id.synthetic(index);
            let size = (value as f64 / total as f64 * len as f64).round() as u64;
            let checksum = Checksum::of(child_id.to_string());
            ArchiveNode::new_synthetic(child_id, name, size, Some(checksum), ContentKind::BinarySection)
        })
        .collect();

    Ok(children)
}

/// Turn an asset listing into one synthetic child per named asset or rendition.
pub fn parse_assets(output: &[u8], id: &NodeId) -> Result<Vec<ArchiveNode>, ContentError> {
    let records: Vec<AssetRecord> = serde_json::from_slice(output)?;

    let children = records
        .into_iter()
        .filter_map(|record| {
            let size = record.size_on_disk?;
            let label = [record.name, record.rendition_name]
                .into_iter()
                .flatten()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" · ");
            if label.is_empty() {
                return None;
            }
            let checksum = record
                .sha1_digest
                .filter(|d| !d.is_empty())
                .map(|d| Checksum::new(d.to_ascii_lowercase()));
            Some((label, size, checksum))
        })
        .enumerate()
        .map(|(index, (label, size, checksum))| {
            ArchiveNode::new_synthetic(id.synthetic(index), label, size, checksum, ContentKind::Asset)
        })
        .collect();

    Ok(children)
}
