use crate::bot::channel::TelegramChannel;
use crate::bot::resilient::send_message_resilient;
use crate::bot::views::{already_open_note, farewell_text, usage_text, welcome_text};
use crate::utils::{get_user_id_safe, get_user_name};
use anyhow::Result;
use insta_relay_core::pipeline::{RelayPipeline, RequestOutcome};
use insta_relay_core::session::GatePolicy;
use std::sync::Arc;
use teloxide::{prelude::*, types::ParseMode, utils::command::BotCommands};
use tracing::info;

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Start a session and show the welcome message
    #[command(description = "Start the bot.")]
    Start,
    /// Show usage guidance
    #[command(description = "Show usage.")]
    Help,
    /// End the session
    #[command(description = "Stop the bot.")]
    Exit,
}

/// Start handler: opens a session for the sender and greets them.
///
/// # Errors
///
/// Returns an error if the welcome message cannot be sent.
pub async fn start(bot: Bot, msg: Message, pipeline: Arc<RelayPipeline>) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    let user_name = get_user_name(&msg);

    info!("User {user_id} ({user_name}) initiated /start command.");

    let mut text = welcome_text(&user_name);
    match pipeline.policy() {
        GatePolicy::Gated => {
            let gate = pipeline.gate();
            if !gate.activate(user_id).await {
                info!("User {user_id} already had an active session.");
            }
            info!("Active sessions: {}", gate.active_count().await);
        }
        GatePolicy::Open => {
            text.push_str("\n\n");
            text.push_str(already_open_note());
        }
    }

    send_message_resilient(&bot, msg.chat.id, text, Some(ParseMode::Html)).await?;
    Ok(())
}

/// Help handler: usage text followed by the command list.
///
/// # Errors
///
/// Returns an error if the help message cannot be sent.
pub async fn help(bot: Bot, msg: Message) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    info!("Help command received from user {user_id}.");

    let text = format!("{}\n\n{}", usage_text(), Command::descriptions());
    send_message_resilient(&bot, msg.chat.id, text, None).await?;
    Ok(())
}

/// Exit handler: closes the sender's session.
///
/// # Errors
///
/// Returns an error if the farewell message cannot be sent.
pub async fn exit(bot: Bot, msg: Message, pipeline: Arc<RelayPipeline>) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    let user_name = get_user_name(&msg);

    let gate = pipeline.gate();
    if gate.deactivate(user_id).await {
        info!(
            "User {user_id} ({user_name}) ended their session ({} still active).",
            gate.active_count().await
        );
    } else {
        info!("User {user_id} ({user_name}) sent /exit without an active session.");
    }

    send_message_resilient(&bot, msg.chat.id, farewell_text(), None).await?;
    Ok(())
}

/// Text handler: runs the message through the relay pipeline.
pub async fn handle_text(bot: Bot, msg: Message, pipeline: Arc<RelayPipeline>) -> RequestOutcome {
    let Some(text) = msg.text() else {
        return RequestOutcome::NotARequest;
    };
    let user_id = get_user_id_safe(&msg);
    let channel = TelegramChannel::new(bot, msg.chat.id);

    pipeline.handle_text(&channel, user_id, text).await
}

#[cfg(test)]
mod tests {
    use super::Command;
    use teloxide::utils::command::BotCommands;

    #[test]
    fn test_commands_parse_lowercase() {
        assert_eq!(Command::parse("/start", "relay_bot").ok(), Some(Command::Start));
        assert_eq!(Command::parse("/help", "relay_bot").ok(), Some(Command::Help));
        assert_eq!(Command::parse("/exit", "relay_bot").ok(), Some(Command::Exit));
        assert!(Command::parse("/stop", "relay_bot").is_err());
    }

    #[test]
    fn test_command_list_is_registered() {
        let commands = Command::bot_commands();
        let names: Vec<_> = commands
            .iter()
            .map(|c| c.command.trim_start_matches('/'))
            .collect();
        assert_eq!(names, ["start", "help", "exit"]);
    }
}
