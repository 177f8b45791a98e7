//! Static guidance texts for the start, help and exit commands.

use html_escape::encode_text;

/// Welcome text for `/start`; `name` is HTML-escaped.
///
/// # Examples
///
/// ```
/// use insta_relay_transport_telegram::bot::views::welcome_text;
///
/// let text = welcome_text("<Ann>");
/// assert!(text.contains("&lt;Ann&gt;"));
/// ```
#[must_use]
pub fn welcome_text(name: &str) -> String {
    format!(
        "👋 Welcome, <b>{}</b>!\n\n{}",
        encode_text(name),
        usage_text()
    )
}

/// Usage guidance shared by `/start` and `/help`.
#[must_use]
pub fn usage_text() -> String {
    "Send an Instagram post or reel link and I will reply with its media.\n\n\
     Supported:\n\
     • 🎬 Reels and video posts\n\
     • 🖼 Photo posts and carousels\n\n\
     Commands:\n\
     /start → Start the bot\n\
     /help → Show this message\n\
     /exit → Stop the bot"
        .to_string()
}

/// Reply to `/exit`.
#[must_use]
pub const fn farewell_text() -> &'static str {
    "👋 Bot stopped.\nSend /start to use it again."
}

/// Reply to `/start` when links are accepted without a session.
#[must_use]
pub const fn already_open_note() -> &'static str {
    "Links are accepted from everyone, no session needed."
}
