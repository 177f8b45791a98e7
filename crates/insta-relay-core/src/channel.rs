//! Outbound chat channel used by the pipeline.
//!
//! The transport layer implements [`ChatChannel`] for one conversation; the
//! pipeline only ever talks to that trait, which keeps it testable without a
//! live bot.

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Kind of media a staged file is forwarded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Sent as a video message.
    Video,
    /// Sent as a photo message.
    Photo,
    /// Neither sent nor reported.
    Unrecognized,
}

impl MediaKind {
    /// Classifies a file by its extension (case-insensitive).
    ///
    /// # Examples
    ///
    /// ```
    /// use insta_relay_core::channel::MediaKind;
    /// use std::path::Path;
    ///
    /// assert_eq!(MediaKind::from_path(Path::new("a/b.MP4")), MediaKind::Video);
    /// assert_eq!(MediaKind::from_path(Path::new("cover.jpeg")), MediaKind::Photo);
    /// assert_eq!(MediaKind::from_path(Path::new("meta.json.xz")), MediaKind::Unrecognized);
    /// ```
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("mp4") => Self::Video,
            Some("jpg" | "jpeg" | "png") => Self::Photo,
            _ => Self::Unrecognized,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => f.write_str("video"),
            Self::Photo => f.write_str("photo"),
            Self::Unrecognized => f.write_str("unrecognized"),
        }
    }
}

/// Handle of a sent text notice, used to delete it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoticeId(pub i32);

/// Errors raised by a chat channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The chat platform rejected or failed the request
    #[error("Send error: {0}")]
    Send(String),
    /// Local file could not be read for upload
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One conversation on the chat platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatChannel: Send + Sync {
    /// Sends a plain text notice and returns its handle.
    async fn send_notice(&self, text: &str) -> Result<NoticeId, ChannelError>;

    /// Deletes a previously sent notice.
    async fn delete_notice(&self, notice: NoticeId) -> Result<(), ChannelError>;

    /// Uploads a staged file as the given media kind.
    async fn send_media(&self, kind: MediaKind, path: &Path) -> Result<(), ChannelError>;
}
