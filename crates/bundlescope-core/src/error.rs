//! Error types for tree building and external tools.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort a tree build.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Path does not exist.
    #[error("Unable to access file at {path}")]
    PathNotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The compressed archive could not be extracted.
    #[error("Failed to extract archive {path}: {message}")]
    Archive { path: PathBuf, message: String },

    /// The build was cancelled.
    #[error("Build cancelled")]
    Cancelled,

    /// A build worker panicked or was aborted.
    #[error("Build worker failed: {message}")]
    Join { message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl BuildError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::PathNotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Errors raised while running an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The process could not be started.
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exited unsuccessfully.
    #[error("{program} exited with {status}: {output}")]
    NonZeroExit {
        program: String,
        status: String,
        output: String,
    },

    /// The process did not finish in time and was killed.
    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    /// The process was killed because the caller gave up.
    #[error("{program} was cancelled")]
    Cancelled { program: String },

    /// Reading the process output failed.
    #[error("Failed to read output of {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The output was not valid UTF-8.
    #[error("{program} produced non UTF-8 output")]
    InvalidUtf8 { program: String },
}

/// Kind of build warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// A file could not be expanded into synthetic children.
    ExpansionFailed,
    /// A bundle manifest was missing or malformed.
    ManifestUnreadable,
}

/// Non-fatal problem recorded during a build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl BuildWarning {
    /// Create a new build warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create an expansion failure warning.
    pub fn expansion_failed(path: impl Into<PathBuf>, error: &impl std::fmt::Display) -> Self {
        Self::new(path, format!("Expansion failed: {error}"), WarningKind::ExpansionFailed)
    }

    /// Create an unreadable manifest warning.
    pub fn manifest_unreadable(path: impl Into<PathBuf>, error: &impl std::fmt::Display) -> Self {
        Self::new(path, format!("Manifest unreadable: {error}"), WarningKind::ManifestUnreadable)
    }
}
