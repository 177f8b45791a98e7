//! yt-dlp backend.
//!
//! Resolves the canonical post URL with `yt-dlp`; carousel items are numbered so
//! they sort in post order inside the staging scope.

use super::process::run_tool;
use super::{ContentFetcher, FetchError};
use crate::shortcode::ContentReference;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_BINARY: &str = "yt-dlp";

/// Fetcher backed by the `yt-dlp` CLI.
#[derive(Debug, Clone)]
pub struct YtdlpFetcher {
    binary: String,
    timeout: Duration,
}

impl YtdlpFetcher {
    /// Create a new fetcher; `binary` overrides the executable looked up on `PATH`.
    #[must_use]
    pub fn new(binary: Option<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.unwrap_or_else(|| DEFAULT_BINARY.to_string()),
            timeout,
        }
    }

    fn args(reference: &ContentReference, dest: &Path) -> Vec<String> {
        let template = dest.join("%(id)s_%(autonumber)03d.%(ext)s");
        vec![
            "--no-warnings".to_string(),
            "--no-progress".to_string(),
            "-f".to_string(),
            "best[ext=mp4]/best".to_string(),
            "-o".to_string(),
            template.display().to_string(),
            reference.post_url(),
        ]
    }
}

#[async_trait]
impl ContentFetcher for YtdlpFetcher {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn fetch(&self, reference: &ContentReference, dest: &Path) -> Result<(), FetchError> {
        info!(shortcode = %reference, "Fetching post via yt-dlp");
        let output = run_tool(&self.binary, &Self::args(reference, dest), self.timeout).await?;
        debug!(stdout_len = output.stdout.len(), "yt-dlp finished");
        Ok(())
    }
}
