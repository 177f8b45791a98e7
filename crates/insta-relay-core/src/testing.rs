//! Testing helpers and fake collaborators.
//!
//! Provides a chat channel that records every outbound event and fetchers that
//! stage canned files.

use crate::channel::{ChannelError, ChatChannel, MediaKind, NoticeId};
use crate::fetcher::{FetchError, MockContentFetcher};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Mutex;

/// Outbound event observed by [`RecordingChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Text notice with its id
    Notice(NoticeId, String),
    /// Deleted notice
    Deleted(NoticeId),
    /// Media upload with the file name that was sent
    Media(MediaKind, String),
}

/// Chat channel that records events; sends and deletes can be made to fail.
#[derive(Default)]
pub struct RecordingChannel {
    events: Mutex<Vec<Outbound>>,
    next_id: AtomicI32,
    fail_media: bool,
    fail_first_notice: AtomicBool,
    fail_deletes: bool,
}

impl RecordingChannel {
    /// Channel whose media uploads all fail.
    #[must_use]
    pub fn failing_media() -> Self {
        Self {
            fail_media: true,
            ..Self::default()
        }
    }

    /// Channel whose first notice (the status notice) is rejected.
    #[must_use]
    pub fn failing_status_notice() -> Self {
        Self {
            fail_first_notice: AtomicBool::new(true),
            ..Self::default()
        }
    }

    /// Channel that rejects every notice deletion.
    #[must_use]
    pub fn failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::default()
        }
    }

    /// Snapshot of recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<Outbound> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Texts of notices that were sent.
    #[must_use]
    pub fn notices(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Outbound::Notice(_, text) => Some(text),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Outbound) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[async_trait]
impl ChatChannel for RecordingChannel {
    async fn send_notice(&self, text: &str) -> Result<NoticeId, ChannelError> {
        if self.fail_first_notice.swap(false, Ordering::SeqCst) {
            return Err(ChannelError::Send("chat unavailable".to_string()));
        }
        let id = NoticeId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.push(Outbound::Notice(id, text.to_string()));
        Ok(id)
    }

    async fn delete_notice(&self, notice: NoticeId) -> Result<(), ChannelError> {
        if self.fail_deletes {
            return Err(ChannelError::Send("message can't be deleted".to_string()));
        }
        self.push(Outbound::Deleted(notice));
        Ok(())
    }

    async fn send_media(&self, kind: MediaKind, path: &Path) -> Result<(), ChannelError> {
        if self.fail_media {
            return Err(ChannelError::Send("upload rejected".to_string()));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.push(Outbound::Media(kind, name));
        Ok(())
    }
}

/// Create a mock fetcher that writes `files` into the destination directory.
#[must_use]
pub fn mock_fetcher_staging(files: &'static [&'static str]) -> MockContentFetcher {
    let mut mock = MockContentFetcher::new();
    mock.expect_name().return_const("mock");
    mock.expect_fetch().returning(move |_, dest| {
        for name in files {
            std::fs::write(dest.join(name), b"media")
                .map_err(|e| FetchError::Unknown(e.to_string()))?;
        }
        Ok(())
    });
    mock
}

/// Create a mock fetcher that always fails with `error`.
#[must_use]
pub fn mock_fetcher_failing(error: fn() -> FetchError) -> MockContentFetcher {
    let mut mock = MockContentFetcher::new();
    mock.expect_name().return_const("mock");
    mock.expect_fetch().returning(move |_, _| Err(error()));
    mock
}

/// Create a mock fetcher that leaves a partial download behind, then fails.
#[must_use]
pub fn mock_fetcher_partial(error: fn() -> FetchError) -> MockContentFetcher {
    let mut mock = MockContentFetcher::new();
    mock.expect_name().return_const("mock");
    mock.expect_fetch().returning(move |_, dest| {
        let nested = dest.join("ABC123");
        std::fs::create_dir_all(&nested).map_err(|e| FetchError::Unknown(e.to_string()))?;
        std::fs::write(nested.join("ABC123.mp4.part"), b"partial")
            .map_err(|e| FetchError::Unknown(e.to_string()))?;
        Err(error())
    });
    mock
}
