//! `ChatChannel` implementation for one Telegram chat.

use crate::bot::resilient::{send_media_resilient, send_message_resilient};
use async_trait::async_trait;
use insta_relay_core::channel::{ChannelError, ChatChannel, MediaKind, NoticeId};
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId};

/// Sends pipeline output into a single chat.
#[derive(Clone)]
pub struct TelegramChannel {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramChannel {
    /// Channel for `chat_id`.
    #[must_use]
    pub const fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }
}

#[async_trait]
impl ChatChannel for TelegramChannel {
    async fn send_notice(&self, text: &str) -> Result<NoticeId, ChannelError> {
        let msg = send_message_resilient(&self.bot, self.chat_id, text, None)
            .await
            .map_err(|e| ChannelError::Send(e.to_string()))?;
        Ok(NoticeId(msg.id.0))
    }

    async fn delete_notice(&self, notice: NoticeId) -> Result<(), ChannelError> {
        // single attempt: deletion is best-effort
        self.bot
            .delete_message(self.chat_id, MessageId(notice.0))
            .await
            .map(|_| ())
            .map_err(|e| ChannelError::Send(e.to_string()))
    }

    async fn send_media(&self, kind: MediaKind, path: &Path) -> Result<(), ChannelError> {
        send_media_resilient(&self.bot, self.chat_id, kind, path)
            .await
            .map(|_| ())
            .map_err(|e| ChannelError::Send(e.to_string()))
    }
}
