//! Per-request staging directories.
//!
//! Every request gets its own [`StagingScope`] below a shared root, so requests
//! from different users never see or delete each other's files. A scope is
//! emptied and removed by [`StagingScope::close`]; if it is dropped without
//! being closed, the directory is removed synchronously as a fallback.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Prefix of scope directory names, used by the orphan sweep.
const SCOPE_PREFIX: &str = "req-";

/// Errors that can occur while preparing staging directories
#[derive(Error, Debug)]
pub enum StagingError {
    /// Staging root or scope could not be created
    #[error("Failed to create staging directory {path}: {source}")]
    Create {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },
    /// Standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Outcome of a best-effort sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    /// Entries removed
    pub removed: usize,
    /// Entries that could not be removed
    pub failed: usize,
}

impl CleanupReport {
    fn merge(&mut self, other: Self) {
        self.removed += other.removed;
        self.failed += other.failed;
    }
}

/// Shared root under which request scopes are created.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    /// Creates the staging root if needed.
    ///
    /// # Errors
    ///
    /// Returns `StagingError::Create` if the directory cannot be created.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StagingError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|source| StagingError::Create {
                path: root.clone(),
                source,
            })?;
        Ok(Self { root })
    }

    /// Root directory of the area.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Opens a fresh, empty scope for one request.
    ///
    /// # Errors
    ///
    /// Returns `StagingError::Create` if the scope directory cannot be created.
    pub async fn open_scope(&self) -> Result<StagingScope, StagingError> {
        let path = self.root.join(format!("{SCOPE_PREFIX}{}", Uuid::new_v4()));
        fs::create_dir(&path)
            .await
            .map_err(|source| StagingError::Create {
                path: path.clone(),
                source,
            })?;
        debug!(scope = %path.display(), "Opened staging scope");
        Ok(StagingScope {
            path,
            closed: false,
        })
    }

    /// Removes scopes left behind by an interrupted process.
    ///
    /// Only call this before the pipeline starts accepting requests.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the root cannot be listed.
    pub async fn sweep_orphans(&self) -> Result<CleanupReport, StagingError> {
        let mut report = CleanupReport::default();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let is_scope = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(SCOPE_PREFIX));
            if !is_scope {
                continue;
            }
            let path = entry.path();
            match fs::remove_dir_all(&path).await {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "Cleanup failed for orphaned staging scope");
                    report.failed += 1;
                }
            }
        }
        if report.removed > 0 {
            info!(removed = report.removed, "Removed orphaned staging scopes");
        }
        Ok(report)
    }
}

/// Staging directory owned by a single request.
#[derive(Debug)]
pub struct StagingScope {
    path: PathBuf,
    closed: bool,
}

impl StagingScope {
    /// Directory the fetcher writes into.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes every entry inside the scope, keeping the scope itself.
    ///
    /// Failures are logged and counted, never returned.
    pub async fn clear(&self) -> CleanupReport {
        let mut report = CleanupReport::default();
        let mut entries = match fs::read_dir(&self.path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return report,
            Err(e) => {
                warn!(error = %e, scope = %self.path.display(), "Cleanup failed: cannot list staging scope");
                report.failed += 1;
                return report;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, scope = %self.path.display(), "Cleanup failed: cannot read staging entry");
                    report.failed += 1;
                    break;
                }
            };
            report.merge(remove_entry(&entry.path()).await);
        }
        report
    }

    /// Empties and removes the scope.
    pub async fn close(mut self) -> CleanupReport {
        let report = self.clear().await;
        if let Err(e) = fs::remove_dir(&self.path).await {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(error = %e, scope = %self.path.display(), "Cleanup failed: cannot remove staging scope");
            }
        }
        self.closed = true;
        if report.failed > 0 {
            warn!(
                removed = report.removed,
                failed = report.failed,
                scope = %self.path.display(),
                "Staging scope closed with leftovers"
            );
        } else {
            debug!(removed = report.removed, scope = %self.path.display(), "Closed staging scope");
        }
        report
    }
}

impl Drop for StagingScope {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(error = %e, scope = %self.path.display(), "Cleanup failed for dropped staging scope");
            }
        }
    }
}

async fn remove_entry(path: &Path) -> CleanupReport {
    let result = match fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).await,
        Ok(_) => fs::remove_file(path).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => CleanupReport {
            removed: 1,
            failed: 0,
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => CleanupReport::default(),
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Cleanup failed for staged file");
            CleanupReport {
                removed: 0,
                failed: 1,
            }
        }
    }
}
