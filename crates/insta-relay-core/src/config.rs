//! Configuration and settings management
//!
//! Loads relay settings from config files and environment variables and
//! defines pipeline constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default staging root, relative to the working directory.
pub const DEFAULT_STAGING_DIR: &str = "downloads";
/// Default subprocess timeout for one fetch.
pub const FETCH_TIMEOUT_SECS: u64 = 300; // 5 minutes
/// Default interval between watchdog restarts.
pub const WATCHDOG_INTERVAL_SECS: u64 = 600; // 10 minutes

// Telegram API retry configuration
/// Maximum retries for a Telegram API call
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
/// Initial backoff before the first retry (milliseconds)
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Upper bound for a single backoff step (milliseconds)
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;

/// External tool used to materialize post media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchBackend {
    /// `instaloader` command line client
    #[default]
    Instaloader,
    /// `yt-dlp` command line client
    #[serde(alias = "yt-dlp")]
    Ytdlp,
}

/// How the watchdog relaunches the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RestartStrategy {
    /// Replace the running image with a fresh copy of the same executable
    #[default]
    Exec,
    /// Exit and leave the relaunch to an external supervisor
    Exit,
}

/// Relay pipeline settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RelaySettings {
    /// Root directory for per-request staging scopes
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
    /// Fetch backend
    #[serde(default)]
    pub fetch_backend: FetchBackend,
    /// Override for the backend executable path
    pub fetcher_binary: Option<String>,
    /// Subprocess timeout for one fetch
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Only accept links from users who sent /start.
    ///
    /// Sessions live in memory, so every watchdog restart closes them.
    #[serde(default)]
    pub session_gate: bool,
    /// Enable the periodic restart watchdog
    #[serde(default = "default_true")]
    pub watchdog_enabled: bool,
    /// Seconds between watchdog restarts
    #[serde(default = "default_watchdog_interval_secs")]
    pub watchdog_interval_secs: u64,
    /// Restart strategy used when the watchdog fires
    #[serde(default)]
    pub watchdog_strategy: RestartStrategy,
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STAGING_DIR)
}

const fn default_fetch_timeout_secs() -> u64 {
    FETCH_TIMEOUT_SECS
}

const fn default_watchdog_interval_secs() -> u64 {
    WATCHDOG_INTERVAL_SECS
}

const fn default_true() -> bool {
    true
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            staging_dir: default_staging_dir(),
            fetch_backend: FetchBackend::default(),
            fetcher_binary: None,
            fetch_timeout_secs: FETCH_TIMEOUT_SECS,
            session_gate: false,
            watchdog_enabled: true,
            watchdog_interval_secs: WATCHDOG_INTERVAL_SECS,
            watchdog_strategy: RestartStrategy::default(),
        }
    }
}

impl RelaySettings {
    /// Create new settings by loading from environment and files.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading or validation fails.
    pub fn new() -> Result<Self, ConfigError> {
        let settings: Self = build_config()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "FETCH_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        if self.watchdog_enabled && self.watchdog_interval_secs == 0 {
            return Err(ConfigError::Message(
                "WATCHDOG_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Fetch timeout as a `Duration`.
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Watchdog interval as a `Duration`.
    #[must_use]
    pub const fn watchdog_interval(&self) -> Duration {
        Duration::from_secs(self.watchdog_interval_secs)
    }
}

/// Build the layered configuration shared by every settings struct.
///
/// # Errors
///
/// Returns a `ConfigError` if a source cannot be read.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Local overrides, not checked into git
        .add_source(File::with_name("config/local").required(false))
        // Eg.. `APP__STAGING_DIR=/tmp/relay ./target/app`
        .add_source(Environment::with_prefix("APP").separator("__"))
        // Plain environment variables; empty values count as unset
        .add_source(Environment::default().ignore_empty(true))
        .build()
}
