#![deny(missing_docs)]
//! Telegram transport adapter for Insta Relay.

/// Telegram-specific bot implementation.
pub mod bot;
/// Telegram transport configuration.
pub mod config;
/// Static liveness responder for hosts that expect an open port.
pub mod liveness;
/// Telegram runtime entrypoint.
pub mod runner;
/// Retry and message helpers.
pub mod utils;
