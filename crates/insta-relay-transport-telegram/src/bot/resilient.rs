//! Resilient messaging utilities with automatic retry for Telegram API operations.
//!
//! Wraps sends and uploads so transient network failures are retried with
//! exponential backoff and jitter before the pipeline sees an error.
//!
//! # Usage
//!
//! ```ignore
//! use insta_relay_transport_telegram::bot::resilient::send_message_resilient;
//!
//! let msg = send_message_resilient(&bot, chat_id, "Downloading...", None).await?;
//! ```

use crate::utils::retry_telegram_operation;
use anyhow::{anyhow, Result};
use insta_relay_core::channel::MediaKind;
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, Message, ParseMode};

/// Send a message with automatic retry on network failures.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn send_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    text: impl Into<String>,
    parse_mode: Option<ParseMode>,
) -> Result<Message> {
    let text = text.into();
    retry_telegram_operation(|| async {
        let mut req = bot.send_message(chat_id, text.clone());
        if let Some(pm) = parse_mode {
            req = req.parse_mode(pm);
        }
        req.await.map_err(|e| anyhow!("Telegram send error: {e}"))
    })
    .await
}

/// Upload a local file as a video or photo, retrying on network failures.
///
/// The file is re-opened on every attempt.
///
/// # Errors
///
/// Returns an error for [`MediaKind::Unrecognized`] or after all retries are
/// exhausted.
pub async fn send_media_resilient(
    bot: &Bot,
    chat_id: ChatId,
    kind: MediaKind,
    path: &Path,
) -> Result<Message> {
    if kind == MediaKind::Unrecognized {
        return Err(anyhow!(
            "refusing to upload unrecognized file {}",
            path.display()
        ));
    }

    retry_telegram_operation(|| async {
        let file = InputFile::file(path.to_path_buf());
        let sent = if kind == MediaKind::Video {
            bot.send_video(chat_id, file).supports_streaming(true).await
        } else {
            bot.send_photo(chat_id, file).await
        };
        sent.map_err(|e| anyhow!("Telegram {kind} upload error: {e}"))
    })
    .await
}
