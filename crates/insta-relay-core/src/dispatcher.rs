//! Media dispatch from a staging scope.
//!
//! Walks the scope recursively, forwards recognized files through the chat
//! channel in path order, and deletes every visited file whether it was sent,
//! failed to send, or was skipped.

use crate::channel::{ChatChannel, MediaKind};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// File materialized by a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAsset {
    /// Location inside the staging scope
    pub path: PathBuf,
    /// Classification by extension
    pub kind: MediaKind,
    /// Size in bytes
    pub size: u64,
}

/// Counts produced by one dispatch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Media successfully sent
    pub sent: usize,
    /// Recognized media whose upload failed
    pub failed: usize,
    /// Files with an unrecognized extension
    pub skipped: usize,
}

impl DispatchReport {
    /// Returns `true` if at least one item reached the chat.
    #[must_use]
    pub const fn delivered_any(&self) -> bool {
        self.sent > 0
    }
}

/// Lists every file under `dir`, sorted by path.
///
/// Unreadable entries are logged and skipped.
pub async fn collect_assets(dir: &Path) -> Vec<StagedAsset> {
    let root = dir.to_path_buf();
    let walk = tokio::task::spawn_blocking(move || {
        let mut assets = Vec::new();
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable staging entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let path = entry.into_path();
            assets.push(StagedAsset {
                kind: MediaKind::from_path(&path),
                path,
                size,
            });
        }
        assets.sort_by(|a, b| a.path.cmp(&b.path));
        assets
    })
    .await;

    match walk {
        Ok(assets) => assets,
        Err(e) => {
            warn!(error = %e, "Staging walk task failed");
            Vec::new()
        }
    }
}

/// Sends every recognized file in `dir` and deletes all visited files.
pub async fn dispatch(channel: &dyn ChatChannel, dir: &Path) -> DispatchReport {
    let mut report = DispatchReport::default();

    for asset in collect_assets(dir).await {
        match asset.kind {
            MediaKind::Unrecognized => {
                debug!(path = %asset.path.display(), "Skipping unrecognized staged file");
                report.skipped += 1;
            }
            kind => match channel.send_media(kind, &asset.path).await {
                Ok(()) => {
                    debug!(%kind, size = asset.size, "Sent staged media");
                    report.sent += 1;
                }
                Err(e) => {
                    warn!(error = %e, %kind, path = %asset.path.display(), "Failed to send staged media");
                    report.failed += 1;
                }
            },
        }

        if let Err(e) = fs::remove_file(&asset.path).await {
            warn!(error = %e, path = %asset.path.display(), "Cleanup failed for dispatched file");
        }
    }

    info!(
        sent = report.sent,
        failed = report.failed,
        skipped = report.skipped,
        "Dispatch finished"
    );
    report
}
