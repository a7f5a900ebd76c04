//! Build progress reporting.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

/// Entries between two progress broadcasts.
const REPORT_INTERVAL: u64 = 64;

/// Progress information during a build.
#[derive(Debug, Clone, Default)]
pub struct BuildProgress {
    /// Number of files built so far.
    pub files_built: u64,
    /// Number of directories built so far.
    pub dirs_built: u64,
    /// Total bytes hashed so far.
    pub bytes_hashed: u64,
    /// Number of files broken down into synthetic children.
    pub files_expanded: u64,
    /// Most recently finished path.
    pub current_path: PathBuf,
    /// Time elapsed since the build started.
    pub elapsed: Duration,
}

impl BuildProgress {
    /// Get total entries built (files + dirs).
    pub fn total_items(&self) -> u64 {
        self.files_built + self.dirs_built
    }

    /// Hashing throughput in bytes per second.
    pub fn bytes_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.bytes_hashed as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Shared counters feeding the progress channel.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    files_built: AtomicU64,
    dirs_built: AtomicU64,
    bytes_hashed: AtomicU64,
    files_expanded: AtomicU64,
    tx: broadcast::Sender<BuildProgress>,
}

impl ProgressTracker {
    pub fn new(tx: broadcast::Sender<BuildProgress>) -> Self {
        Self {
            start_time: Instant::now(),
            files_built: AtomicU64::new(0),
            dirs_built: AtomicU64::new(0),
            bytes_hashed: AtomicU64::new(0),
            files_expanded: AtomicU64::new(0),
            tx,
        }
    }

    pub fn file_built(&self, path: &Path, bytes: u64, expanded: bool) {
        self.bytes_hashed.fetch_add(bytes, Ordering::Relaxed);
        if expanded {
            self.files_expanded.fetch_add(1, Ordering::Relaxed);
        }
        let count = self.files_built.fetch_add(1, Ordering::Relaxed) + 1;
        if count % REPORT_INTERVAL == 0 {
            self.report(path);
        }
    }

    pub fn dir_built(&self, path: &Path) {
        self.dirs_built.fetch_add(1, Ordering::Relaxed);
        self.report(path);
    }

    pub fn snapshot(&self, path: &Path) -> BuildProgress {
        BuildProgress {
            files_built: self.files_built.load(Ordering::Relaxed),
            dirs_built: self.dirs_built.load(Ordering::Relaxed),
            bytes_hashed: self.bytes_hashed.load(Ordering::Relaxed),
            files_expanded: self.files_expanded.load(Ordering::Relaxed),
            current_path: path.to_path_buf(),
            elapsed: self.start_time.elapsed(),
        }
    }

    fn report(&self, path: &Path) {
        // No receivers is fine.
        let _ = self.tx.send(self.snapshot(path));
    }
}
