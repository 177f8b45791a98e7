//! Content fetch backends.
//!
//! A [`ContentFetcher`] resolves a [`ContentReference`] against the content
//! platform and writes the post's media into a staging directory. Failures are
//! collapsed into a closed set of [`FetchErrorKind`]s: callers show one generic
//! message to the user and log the kind.

mod instaloader;
mod process;
mod ytdlp;

pub use instaloader::InstaloaderFetcher;
pub use ytdlp::YtdlpFetcher;

use crate::config::{FetchBackend, RelaySettings};
use crate::shortcode::ContentReference;
use async_trait::async_trait;
use lazy_regex::regex_captures;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Closed classification of fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// Post removed or never existed
    NotFound,
    /// Private post or login required
    AccessDenied,
    /// Connectivity problem or timeout
    NetworkError,
    /// Platform throttled the client
    RateLimited,
    /// Anything else
    Unknown,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "not_found",
            Self::AccessDenied => "access_denied",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while fetching a post
#[derive(Debug, Error)]
pub enum FetchError {
    /// Post removed or never existed
    #[error("Content not found: {0}")]
    NotFound(String),
    /// Private post or login required
    #[error("Access denied: {0}")]
    AccessDenied(String),
    /// Connectivity problem or timeout
    #[error("Network error: {0}")]
    NetworkError(String),
    /// Platform throttled the client
    #[error("Rate limited: {0}")]
    RateLimited(String),
    /// Any other unexpected error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl FetchError {
    /// Classification of this error.
    #[must_use]
    pub const fn kind(&self) -> FetchErrorKind {
        match self {
            Self::NotFound(_) => FetchErrorKind::NotFound,
            Self::AccessDenied(_) => FetchErrorKind::AccessDenied,
            Self::NetworkError(_) => FetchErrorKind::NetworkError,
            Self::RateLimited(_) => FetchErrorKind::RateLimited,
            Self::Unknown(_) => FetchErrorKind::Unknown,
        }
    }

    /// Builds an error of the given kind.
    #[must_use]
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            FetchErrorKind::NotFound => Self::NotFound(message),
            FetchErrorKind::AccessDenied => Self::AccessDenied(message),
            FetchErrorKind::NetworkError => Self::NetworkError(message),
            FetchErrorKind::RateLimited => Self::RateLimited(message),
            FetchErrorKind::Unknown => Self::Unknown(message),
        }
    }
}

/// Patterns indicating the platform throttled us
const RATE_LIMIT_PATTERNS: &[&str] = &[
    "Too Many Requests",
    "Please wait a few minutes",
    "rate limit",
    "rate-limit",
];

/// Patterns indicating a private post or a login wall
const ACCESS_DENIED_PATTERNS: &[&str] = &[
    "Login required",
    "login required",
    "login_required",
    "checkpoint_required",
    "Private",
    "private",
    "Unauthorized",
    "Forbidden",
    "Sign in",
];

/// Patterns indicating the post does not exist
const NOT_FOUND_PATTERNS: &[&str] = &[
    "Not Found",
    "not found",
    "does not exist",
    "Fetching Post metadata failed",
    "no longer available",
    "has been removed",
    "Unsupported URL",
];

/// Patterns indicating transient connectivity problems
const NETWORK_PATTERNS: &[&str] = &[
    "Connection reset",
    "Connection refused",
    "ConnectionError",
    "timed out",
    "Temporary failure in name resolution",
    "network is unreachable",
    "Unable to download webpage",
];

/// HTTP status reported next to an explicit marker (`HTTP Error 429`,
/// `HTTP error code 403`, `status code: 404`).
///
/// Bare numbers are ignored: backend output echoes the shortcode, which may
/// contain any digit run.
fn status_code_kind(output: &str) -> Option<FetchErrorKind> {
    let (_, code) = regex_captures!(
        r"(?i)\b(?:http(?:\s+error)?(?:\s+code)?|status(?:\s+code)?)\s*[:=]?\s*(\d{3})\b",
        output
    )?;
    match code {
        "429" => Some(FetchErrorKind::RateLimited),
        "401" | "403" => Some(FetchErrorKind::AccessDenied),
        "404" | "410" => Some(FetchErrorKind::NotFound),
        _ => None,
    }
}

fn matches_any(output: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| output.contains(p))
}

/// Classifies a backend's error output.
///
/// Rate limiting is checked first because throttled responses often also look
/// like access or lookup failures. An explicit HTTP status comes next, then the
/// remaining phrase tables.
///
/// # Examples
///
/// ```
/// use insta_relay_core::fetcher::{classify_failure, FetchErrorKind};
///
/// assert_eq!(classify_failure("HTTP Error 429: Too Many Requests"), FetchErrorKind::RateLimited);
/// assert_eq!(classify_failure("something odd"), FetchErrorKind::Unknown);
/// ```
#[must_use]
pub fn classify_failure(output: &str) -> FetchErrorKind {
    if matches_any(output, RATE_LIMIT_PATTERNS) {
        return FetchErrorKind::RateLimited;
    }
    if let Some(kind) = status_code_kind(output) {
        return kind;
    }
    let table: [(&[&str], FetchErrorKind); 3] = [
        (ACCESS_DENIED_PATTERNS, FetchErrorKind::AccessDenied),
        (NOT_FOUND_PATTERNS, FetchErrorKind::NotFound),
        (NETWORK_PATTERNS, FetchErrorKind::NetworkError),
    ];
    table
        .iter()
        .find(|(patterns, _)| matches_any(output, patterns))
        .map_or(FetchErrorKind::Unknown, |(_, kind)| *kind)
}

/// Resolves a content reference and materializes its media.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &'static str;

    /// Downloads every media file of the post into `dest`.
    async fn fetch(&self, reference: &ContentReference, dest: &Path) -> Result<(), FetchError>;
}

/// Builds the fetcher selected in settings.
#[must_use]
pub fn from_settings(settings: &RelaySettings) -> Arc<dyn ContentFetcher> {
    let timeout = settings.fetch_timeout();
    let binary = settings.fetcher_binary.clone();
    match settings.fetch_backend {
        FetchBackend::Instaloader => Arc::new(InstaloaderFetcher::new(binary, timeout)),
        FetchBackend::Ytdlp => Arc::new(YtdlpFetcher::new(binary, timeout)),
    }
}
