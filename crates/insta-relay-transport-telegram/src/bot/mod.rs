/// `ChatChannel` implementation over the Bot API
pub mod channel;
/// Command and text message handlers
pub mod handlers;
/// Resilient messaging with automatic retry for Telegram API operations
pub mod resilient;
/// Static guidance texts
pub mod views;

pub use channel::TelegramChannel;
