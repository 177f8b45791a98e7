use dotenvy::dotenv;
use insta_relay_core::config::RelaySettings;
use insta_relay_core::watchdog::{ProcessRestart, Watchdog};
use insta_relay_transport_telegram::config::{BotSettings, TelegramSettings};
use insta_relay_transport_telegram::runner::run_bot;
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "insta_relay_core=info,insta_relay_transport_telegram=info,\
insta_relay_telegram_bot=info,hyper=warn,h2=error,reqwest=warn,tokio=warn,tower=warn";

/// Bot token patterns masked in every log line
struct RedactionPatterns {
    rules: Vec<(Regex, &'static str)>,
}

impl RedactionPatterns {
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            rules: vec![
                // API URLs: https://api.telegram.org/bot<token>/method
                (
                    Regex::new(r"(https?://[^/]+/(?:file/)?bot)([0-9]+:[A-Za-z0-9_-]+)")?,
                    "$1[TELEGRAM_TOKEN]",
                ),
                (
                    Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
                    "$1[TELEGRAM_TOKEN]",
                ),
                (
                    Regex::new(r"\b[0-9]{8,10}:[A-Za-z0-9_-]{35}\b")?,
                    "[TELEGRAM_TOKEN]",
                ),
                (
                    Regex::new(r"(BOT_TOKEN|TELEGRAM_TOKEN)=[^\s&]+")?,
                    "$1=[MASKED]",
                ),
            ],
        })
    }

    fn redact(&self, input: &str) -> String {
        self.rules
            .iter()
            .fold(input.to_string(), |acc, (pattern, replacement)| {
                pattern.replace_all(&acc, *replacement).into_owned()
            })
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let redacted = self.patterns.redact(&String::from_utf8_lossy(buf));
        self.inner.write_all(redacted.as_bytes())?;
        // callers expect the original length back
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: (self.make_inner)(),
            patterns: self.patterns.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);
    init_logging(patterns);

    info!("Starting Insta Relay TG Bot...");

    let settings = init_settings();
    let shutdown = CancellationToken::new();
    let watchdog = start_watchdog(&settings.relay, shutdown.clone());

    let result = run_bot(settings, shutdown).await;

    if let Some(handle) = watchdog {
        let _ = handle.await;
    }

    result.map_err(|e| {
        error!("Bot terminated with error: {e:#}");
        e.into()
    })
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter {
        make_inner: io::stderr,
        patterns,
    };

    let debug_mode = std::env::var("DEBUG_MODE")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug_mode {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(DEFAULT_LOG_FILTER)
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<BotSettings> {
    let relay_settings = match RelaySettings::new() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load relay configuration: {}", e);
            std::process::exit(1);
        }
    };
    let telegram_settings = match TelegramSettings::new() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load telegram configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration loaded successfully.");
    Arc::new(BotSettings::new(relay_settings, telegram_settings))
}

fn start_watchdog(
    relay: &RelaySettings,
    shutdown: CancellationToken,
) -> Option<tokio::task::JoinHandle<()>> {
    if !relay.watchdog_enabled {
        info!("Watchdog disabled.");
        return None;
    }
    let action = Arc::new(ProcessRestart::new(relay.watchdog_strategy));
    Some(Watchdog::new(relay.watchdog_interval()).spawn(action, shutdown))
}
