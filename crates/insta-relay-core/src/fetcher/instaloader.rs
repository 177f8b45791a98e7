//! Instaloader backend.
//!
//! Downloads a single post with the `instaloader` command line client. Metadata
//! JSON and captions are disabled so only media lands in the staging scope.

use super::process::run_tool;
use super::{ContentFetcher, FetchError};
use crate::shortcode::ContentReference;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_BINARY: &str = "instaloader";

/// Fetcher backed by the `instaloader` CLI.
#[derive(Debug, Clone)]
pub struct InstaloaderFetcher {
    binary: String,
    timeout: Duration,
}

impl InstaloaderFetcher {
    /// Create a new fetcher; `binary` overrides the executable looked up on `PATH`.
    #[must_use]
    pub fn new(binary: Option<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.unwrap_or_else(|| DEFAULT_BINARY.to_string()),
            timeout,
        }
    }

    fn args(reference: &ContentReference, dest: &Path) -> Vec<String> {
        vec![
            "--quiet".to_string(),
            "--no-metadata-json".to_string(),
            "--no-captions".to_string(),
            "--no-compress-json".to_string(),
            "--dirname-pattern".to_string(),
            dest.display().to_string(),
            "--filename-pattern".to_string(),
            "{shortcode}".to_string(),
            "--".to_string(),
            // instaloader addresses a single post as `-<shortcode>`
            format!("-{}", reference.as_str()),
        ]
    }
}

#[async_trait]
impl ContentFetcher for InstaloaderFetcher {
    fn name(&self) -> &'static str {
        "instaloader"
    }

    async fn fetch(&self, reference: &ContentReference, dest: &Path) -> Result<(), FetchError> {
        info!(shortcode = %reference, "Fetching post via instaloader");
        let output = run_tool(&self.binary, &Self::args(reference, dest), self.timeout).await?;
        if !output.stderr.trim().is_empty() {
            debug!(stderr = %output.stderr.trim(), "instaloader reported warnings");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shortcode::{extract, Extraction};

    #[test]
    fn test_args_target_single_post() {
        let Extraction::Found(reference) = extract("https://instagram.com/p/-Ab_1/") else {
            panic!("expected reference");
        };
        let args = InstaloaderFetcher::args(&reference, Path::new("/tmp/scope"));

        assert_eq!(args.last().map(String::as_str), Some("--Ab_1"));
        let sep = args.iter().position(|a| a == "--");
        assert_eq!(sep, Some(args.len() - 2));
        assert!(args.windows(2).any(|w| w[0] == "--dirname-pattern" && w[1] == "/tmp/scope"));
    }
}
