//! Request orchestration.
//!
//! One inbound text message runs through:
//! gate check → "Downloading…" notice → extract → fetch → dispatch → cleanup.
//!
//! Every branch ends in the same cleanup step: the status notice is deleted and
//! the request's staging scope is swept and removed. At most one terminal notice
//! (invalid link, fetch failed, media not found) is sent per request.

use crate::channel::ChatChannel;
use crate::dispatcher::{self, DispatchReport};
use crate::fetcher::{ContentFetcher, FetchErrorKind};
use crate::session::{GatePolicy, SessionGate};
use crate::shortcode::{self, ContentReference, Extraction};
use crate::staging::StagingArea;
use crate::UserId;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Transient status notice shown while a request is processed.
pub const NOTICE_DOWNLOADING: &str = "Downloading... ⏳";
/// Terminal notice for a link without an extractable shortcode.
pub const NOTICE_INVALID_LINK: &str = "❌ Send a valid Instagram post or reel link";
/// Terminal notice for any fetch or delivery failure.
pub const NOTICE_FETCH_FAILED: &str = "❌ Failed to download";
/// Terminal notice when the post yielded no media.
pub const NOTICE_MEDIA_NOT_FOUND: &str = "⚠️ Media not found";

/// Which branch a request took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Message did not mention the content platform
    NotARequest,
    /// Sender has no active session
    GatedOut,
    /// Link present but no shortcode extracted
    InvalidLink,
    /// Staging or fetch failed
    FetchFailed(FetchErrorKind),
    /// Media was found but none could be delivered
    DeliveryFailed,
    /// Fetch succeeded without any recognizable media
    MediaNotFound,
    /// Media delivered
    Delivered {
        /// Number of media items sent
        sent: usize,
    },
}

/// Media relay pipeline shared by all chats.
pub struct RelayPipeline {
    fetcher: Arc<dyn ContentFetcher>,
    staging: StagingArea,
    gate: Arc<SessionGate>,
    policy: GatePolicy,
}

impl RelayPipeline {
    /// Create a new pipeline.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        staging: StagingArea,
        gate: Arc<SessionGate>,
        policy: GatePolicy,
    ) -> Self {
        Self {
            fetcher,
            staging,
            gate,
            policy,
        }
    }

    /// Session gate used by the start/exit commands.
    #[must_use]
    pub fn gate(&self) -> &Arc<SessionGate> {
        &self.gate
    }

    /// Configured gate policy.
    #[must_use]
    pub const fn policy(&self) -> GatePolicy {
        self.policy
    }

    /// Handles one inbound text message from `user`.
    ///
    /// Never fails: every error is converted into a user notice and logged.
    #[instrument(skip(self, channel, text), fields(backend = self.fetcher.name()))]
    pub async fn handle_text(
        &self,
        channel: &dyn ChatChannel,
        user: UserId,
        text: &str,
    ) -> RequestOutcome {
        if !shortcode::has_marker(text) {
            debug!("Ignoring message without a post link");
            return RequestOutcome::NotARequest;
        }

        if self.policy == GatePolicy::Gated && !self.gate.is_active(user).await {
            debug!("Ignoring link from inactive user");
            return RequestOutcome::GatedOut;
        }

        let status = match channel.send_notice(NOTICE_DOWNLOADING).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "Failed to send status notice");
                None
            }
        };

        let outcome = match shortcode::extract(text) {
            Extraction::Found(reference) => self.relay(channel, &reference).await,
            Extraction::NotALink | Extraction::Invalid => RequestOutcome::InvalidLink,
        };

        if let Some(notice) = terminal_notice(outcome) {
            if let Err(e) = channel.send_notice(notice).await {
                warn!(error = %e, ?outcome, "Failed to send terminal notice");
            }
        }

        if let Some(id) = status {
            if let Err(e) = channel.delete_notice(id).await {
                debug!(error = %e, "Cleanup failed for status notice");
            }
        }

        info!(?outcome, "Request finished");
        outcome
    }

    /// Fetch and dispatch inside a fresh staging scope, then remove the scope.
    async fn relay(&self, channel: &dyn ChatChannel, reference: &ContentReference) -> RequestOutcome {
        let scope = match self.staging.open_scope().await {
            Ok(scope) => scope,
            Err(e) => {
                warn!(error = %e, "Failed to open staging scope");
                return RequestOutcome::FetchFailed(FetchErrorKind::Unknown);
            }
        };

        // fetch must start from an empty directory
        scope.clear().await;

        let outcome = match self.fetcher.fetch(reference, scope.path()).await {
            Ok(()) => outcome_from_report(dispatcher::dispatch(channel, scope.path()).await),
            Err(e) => {
                warn!(shortcode = %reference, kind = %e.kind(), error = %e, "Fetch failed");
                RequestOutcome::FetchFailed(e.kind())
            }
        };

        scope.close().await;
        outcome
    }
}

const fn outcome_from_report(report: DispatchReport) -> RequestOutcome {
    if report.delivered_any() {
        RequestOutcome::Delivered { sent: report.sent }
    } else if report.failed > 0 {
        RequestOutcome::DeliveryFailed
    } else {
        RequestOutcome::MediaNotFound
    }
}

const fn terminal_notice(outcome: RequestOutcome) -> Option<&'static str> {
    match outcome {
        RequestOutcome::InvalidLink => Some(NOTICE_INVALID_LINK),
        RequestOutcome::FetchFailed(_) | RequestOutcome::DeliveryFailed => {
            Some(NOTICE_FETCH_FAILED)
        }
        RequestOutcome::MediaNotFound => Some(NOTICE_MEDIA_NOT_FOUND),
        RequestOutcome::NotARequest
        | RequestOutcome::GatedOut
        | RequestOutcome::Delivered { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{MediaKind, NoticeId};
    use crate::fetcher::{FetchError, MockContentFetcher};
    use crate::testing::{
        mock_fetcher_failing, mock_fetcher_partial, mock_fetcher_staging, Outbound,
        RecordingChannel,
    };

    const LINK: &str = "https://www.instagram.com/p/ABC123/?igsh=1";

    async fn pipeline(
        fetcher: MockContentFetcher,
        policy: GatePolicy,
    ) -> anyhow::Result<(RelayPipeline, tempfile::TempDir)> {
        let root = tempfile::tempdir()?;
        let staging = StagingArea::new(root.path()).await?;
        let pipeline = RelayPipeline::new(
            Arc::new(fetcher),
            staging,
            Arc::new(SessionGate::new()),
            policy,
        );
        Ok((pipeline, root))
    }

    fn staging_is_empty(root: &tempfile::TempDir) -> bool {
        std::fs::read_dir(root.path())
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn test_non_link_produces_no_outbound() -> anyhow::Result<()> {
        let mut fetcher = MockContentFetcher::new();
        fetcher.expect_name().return_const("mock");
        fetcher.expect_fetch().never();
        let (pipeline, _root) = pipeline(fetcher, GatePolicy::Open).await?;
        let channel = RecordingChannel::default();

        let outcome = pipeline.handle_text(&channel, 1, "just chatting").await;

        assert_eq!(outcome, RequestOutcome::NotARequest);
        assert!(channel.events().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_video_with_cover_is_delivered_and_cleaned() -> anyhow::Result<()> {
        let (pipeline, root) =
            pipeline(mock_fetcher_staging(&["ABC123.mp4", "ABC123.jpg"]), GatePolicy::Open).await?;
        let channel = RecordingChannel::default();

        let outcome = pipeline.handle_text(&channel, 1, LINK).await;

        assert_eq!(outcome, RequestOutcome::Delivered { sent: 2 });
        assert_eq!(
            channel.events(),
            vec![
                Outbound::Notice(NoticeId(1), NOTICE_DOWNLOADING.to_string()),
                Outbound::Media(MediaKind::Photo, "ABC123.jpg".to_string()),
                Outbound::Media(MediaKind::Video, "ABC123.mp4".to_string()),
                Outbound::Deleted(NoticeId(1)),
            ]
        );
        assert!(staging_is_empty(&root));
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_failure_sends_single_notice() -> anyhow::Result<()> {
        let (pipeline, root) = pipeline(
            mock_fetcher_failing(|| FetchError::AccessDenied("private".to_string())),
            GatePolicy::Open,
        )
        .await?;
        let channel = RecordingChannel::default();

        let outcome = pipeline.handle_text(&channel, 1, LINK).await;

        assert_eq!(outcome, RequestOutcome::FetchFailed(FetchErrorKind::AccessDenied));
        assert_eq!(
            channel.notices(),
            vec![NOTICE_DOWNLOADING.to_string(), NOTICE_FETCH_FAILED.to_string()]
        );
        assert!(channel.events().contains(&Outbound::Deleted(NoticeId(1))));
        assert!(staging_is_empty(&root));
        Ok(())
    }

    #[tokio::test]
    async fn test_partial_download_is_removed_after_failure() -> anyhow::Result<()> {
        let (pipeline, root) = pipeline(
            mock_fetcher_partial(|| FetchError::NetworkError("Connection reset".to_string())),
            GatePolicy::Open,
        )
        .await?;
        let channel = RecordingChannel::default();

        let outcome = pipeline.handle_text(&channel, 1, LINK).await;

        assert_eq!(outcome, RequestOutcome::FetchFailed(FetchErrorKind::NetworkError));
        assert_eq!(
            channel.notices(),
            vec![NOTICE_DOWNLOADING.to_string(), NOTICE_FETCH_FAILED.to_string()]
        );
        assert!(staging_is_empty(&root));
        Ok(())
    }

    #[tokio::test]
    async fn test_request_continues_without_status_notice() -> anyhow::Result<()> {
        let (pipeline, root) =
            pipeline(mock_fetcher_staging(&["ABC123.mp4"]), GatePolicy::Open).await?;
        let channel = RecordingChannel::failing_status_notice();

        let outcome = pipeline.handle_text(&channel, 1, LINK).await;

        assert_eq!(outcome, RequestOutcome::Delivered { sent: 1 });
        // nothing to delete when the status notice never went out
        assert_eq!(
            channel.events(),
            vec![Outbound::Media(MediaKind::Video, "ABC123.mp4".to_string())]
        );
        assert!(staging_is_empty(&root));
        Ok(())
    }

    #[tokio::test]
    async fn test_status_delete_failure_is_swallowed() -> anyhow::Result<()> {
        let (pipeline, root) =
            pipeline(mock_fetcher_staging(&["ABC123.json"]), GatePolicy::Open).await?;
        let channel = RecordingChannel::failing_deletes();

        let outcome = pipeline.handle_text(&channel, 1, LINK).await;

        assert_eq!(outcome, RequestOutcome::MediaNotFound);
        assert_eq!(
            channel.events(),
            vec![
                Outbound::Notice(NoticeId(1), NOTICE_DOWNLOADING.to_string()),
                Outbound::Notice(NoticeId(2), NOTICE_MEDIA_NOT_FOUND.to_string()),
            ]
        );
        assert!(staging_is_empty(&root));
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_fetch_reports_not_found() -> anyhow::Result<()> {
        let (pipeline, root) =
            pipeline(mock_fetcher_staging(&["ABC123.json"]), GatePolicy::Open).await?;
        let channel = RecordingChannel::default();

        let outcome = pipeline.handle_text(&channel, 1, LINK).await;

        assert_eq!(outcome, RequestOutcome::MediaNotFound);
        assert_eq!(
            channel.notices(),
            vec![NOTICE_DOWNLOADING.to_string(), NOTICE_MEDIA_NOT_FOUND.to_string()]
        );
        assert!(staging_is_empty(&root));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_uploads_report_failure_and_clean_up() -> anyhow::Result<()> {
        let (pipeline, root) =
            pipeline(mock_fetcher_staging(&["ABC123.mp4"]), GatePolicy::Open).await?;
        let channel = RecordingChannel::failing_media();

        let outcome = pipeline.handle_text(&channel, 1, LINK).await;

        assert_eq!(outcome, RequestOutcome::DeliveryFailed);
        assert_eq!(
            channel.notices(),
            vec![NOTICE_DOWNLOADING.to_string(), NOTICE_FETCH_FAILED.to_string()]
        );
        assert!(staging_is_empty(&root));
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_link_is_reported() -> anyhow::Result<()> {
        let mut fetcher = MockContentFetcher::new();
        fetcher.expect_name().return_const("mock");
        fetcher.expect_fetch().never();
        let (pipeline, _root) = pipeline(fetcher, GatePolicy::Open).await?;
        let channel = RecordingChannel::default();

        let outcome = pipeline.handle_text(&channel, 1, "https://instagram.com/p/").await;

        assert_eq!(outcome, RequestOutcome::InvalidLink);
        assert_eq!(
            channel.events(),
            vec![
                Outbound::Notice(NoticeId(1), NOTICE_DOWNLOADING.to_string()),
                Outbound::Notice(NoticeId(2), NOTICE_INVALID_LINK.to_string()),
                Outbound::Deleted(NoticeId(1)),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_gate_blocks_until_start() -> anyhow::Result<()> {
        let (pipeline, _root) =
            pipeline(mock_fetcher_staging(&["ABC123.mp4"]), GatePolicy::Gated).await?;
        let channel = RecordingChannel::default();

        assert_eq!(
            pipeline.handle_text(&channel, 7, LINK).await,
            RequestOutcome::GatedOut
        );
        assert!(channel.events().is_empty());

        pipeline.gate().activate(7).await;
        assert_eq!(
            pipeline.handle_text(&channel, 7, LINK).await,
            RequestOutcome::Delivered { sent: 1 }
        );

        pipeline.gate().deactivate(7).await;
        let before = channel.events().len();
        assert_eq!(
            pipeline.handle_text(&channel, 7, LINK).await,
            RequestOutcome::GatedOut
        );
        assert_eq!(channel.events().len(), before);
        Ok(())
    }

    #[tokio::test]
    async fn test_repeated_request_is_idempotent() -> anyhow::Result<()> {
        let (pipeline, root) =
            pipeline(mock_fetcher_staging(&["ABC123_1.jpg", "ABC123_2.jpg"]), GatePolicy::Open)
                .await?;

        let first = RecordingChannel::default();
        let second = RecordingChannel::default();
        let a = pipeline.handle_text(&first, 1, LINK).await;
        let b = pipeline.handle_text(&second, 1, LINK).await;

        assert_eq!(a, b);
        assert_eq!(first.events(), second.events());
        assert!(staging_is_empty(&root));
        Ok(())
    }
}
