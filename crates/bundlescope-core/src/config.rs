//! Build configuration types.

use std::path::PathBuf;
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Configuration for building an archive tree.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct BuildConfig {
    /// Archive to analyze: a compressed container or an extracted directory.
    pub root: PathBuf,

    /// Whether `root` is compressed (None = regular files are, directories are not).
    #[builder(default)]
    #[serde(default)]
    pub compressed: Option<bool>,

    /// Break executables down into their segments.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub expand_binaries: bool,

    /// Break compiled asset catalogs down into their assets.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub expand_asset_catalogs: bool,

    /// Maximum number of external tool processes running at once.
    #[builder(default = "4")]
    #[serde(default = "default_max_concurrent_tools")]
    pub max_concurrent_tools: usize,

    /// Maximum number of files and directories held open at once while building.
    #[builder(default = "64")]
    #[serde(default = "default_max_open_files")]
    pub max_open_files: usize,

    /// Time an external tool may run before it is killed.
    #[builder(default = "Duration::from_secs(30)")]
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout: Duration,

    /// Program reporting executable segment sizes.
    #[builder(default = "PathBuf::from(\"size\")")]
    #[serde(default = "default_size_tool")]
    pub size_tool: PathBuf,

    /// Program introspecting compiled asset catalogs.
    #[builder(default = "PathBuf::from(\"xcrun\")")]
    #[serde(default = "default_asset_tool")]
    pub asset_tool: PathBuf,

    /// Arguments passed to the asset tool before the catalog path.
    #[builder(default = "default_asset_tool_args()")]
    #[serde(default = "default_asset_tool_args")]
    pub asset_tool_args: Vec<String>,

    /// Include hidden files (starting with .).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent_tools() -> usize {
    4
}

fn default_max_open_files() -> usize {
    64
}

fn default_tool_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_size_tool() -> PathBuf {
    PathBuf::from("size")
}

fn default_asset_tool() -> PathBuf {
    PathBuf::from("xcrun")
}

fn default_asset_tool_args() -> Vec<String> {
    vec!["assetutil".to_string(), "--info".to_string()]
}

impl BuildConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Root path cannot be empty".to_string());
            }
            None => return Err("Root path is required".to_string()),
            _ => {}
        }
        if self.max_concurrent_tools == Some(0) {
            return Err("At least one concurrent tool is required".to_string());
        }
        if self.max_open_files == Some(0) {
            return Err("At least one open file is required".to_string());
        }
        Ok(())
    }
}

impl BuildConfig {
    /// Create a new build config builder.
    pub fn builder() -> BuildConfigBuilder {
        BuildConfigBuilder::default()
    }

    /// Create a default config for an archive path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            compressed: None,
            expand_binaries: true,
            expand_asset_catalogs: true,
            max_concurrent_tools: default_max_concurrent_tools(),
            max_open_files: default_max_open_files(),
            tool_timeout: default_tool_timeout(),
            size_tool: default_size_tool(),
            asset_tool: default_asset_tool(),
            asset_tool_args: default_asset_tool_args(),
            include_hidden: true,
        }
    }

    /// Check if hidden files should be skipped.
    pub fn should_skip_hidden(&self, name: &str) -> bool {
        !self.include_hidden && name.starts_with('.')
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
