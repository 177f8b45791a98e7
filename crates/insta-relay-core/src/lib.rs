#![deny(missing_docs)]
//! Insta Relay core library.
//!
//! Shared logic for the media relay pipeline: link parsing, per-request staging,
//! content fetching, media dispatch, session gating and the process watchdog.

/// Chat channel abstraction the pipeline sends through.
pub mod channel;
/// Configuration management.
pub mod config;
/// Media classification and dispatch from a staging scope.
pub mod dispatcher;
/// Content fetch backends.
pub mod fetcher;
/// Request orchestration.
pub mod pipeline;
/// Per-user session membership.
pub mod session;
/// Shortcode extraction from post links.
pub mod shortcode;
/// Per-request staging directories.
pub mod staging;
/// Periodic process restart.
pub mod watchdog;

#[cfg(test)]
pub mod testing;

/// Telegram-style numeric user identifier.
pub type UserId = i64;
