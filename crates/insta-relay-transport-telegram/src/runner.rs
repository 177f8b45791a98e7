use crate::bot;
use crate::bot::handlers::Command;
use crate::config::{BotSettings, DeliveryMode};
use crate::liveness;
use anyhow::{anyhow, Result};
use insta_relay_core::fetcher;
use insta_relay_core::pipeline::RelayPipeline;
use insta_relay_core::session::{GatePolicy, SessionGate};
use insta_relay_core::staging::StagingArea;
use std::net::SocketAddr;
use std::sync::Arc;
use teloxide::dispatching::{DefaultKey, UpdateHandler};
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use teloxide::utils::command::BotCommands;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Run the Telegram transport runtime until Ctrl-C or `shutdown` is cancelled.
///
/// `shutdown` is cancelled on return so companion tasks stop with the bot.
///
/// # Errors
///
/// Returns an error if the staging area, the token or the webhook cannot be
/// set up.
pub async fn run_bot(settings: Arc<BotSettings>, shutdown: CancellationToken) -> Result<()> {
    let result = run_until_stopped(settings, shutdown.clone()).await;
    shutdown.cancel();
    result
}

async fn run_until_stopped(settings: Arc<BotSettings>, shutdown: CancellationToken) -> Result<()> {
    let pipeline = init_pipeline(&settings).await?;

    let token = settings
        .telegram
        .token()
        .ok_or_else(|| anyhow!("Bot token is missing"))?;
    let bot = Bot::new(token);

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {e}");
    }

    let mut dispatcher = Dispatcher::builder(bot.clone(), setup_handler())
        .dependencies(dptree::deps![pipeline])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.kind);
        })
        .enable_ctrlc_handler()
        .build();

    stop_on_cancel(&dispatcher, shutdown.clone());

    match settings.telegram.delivery_mode() {
        DeliveryMode::Polling { liveness_port } => {
            if let Some(port) = liveness_port {
                let token = shutdown.child_token();
                tokio::spawn(async move {
                    if let Err(e) = liveness::serve(port, token).await {
                        error!("Liveness responder stopped: {e}");
                    }
                });
            }
            info!("Bot is running (long polling)...");
            dispatcher.dispatch().await;
        }
        DeliveryMode::Webhook { url, port } => {
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            let listener = webhooks::axum(bot, webhooks::Options::new(addr, url.parse()?))
                .await
                .map_err(|e| anyhow!("Failed to set up webhook: {e}"))?;
            info!("Bot is running (webhook on port {port})...");
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
    }

    info!("Bot stopped.");
    Ok(())
}

async fn init_pipeline(settings: &BotSettings) -> Result<Arc<RelayPipeline>> {
    let relay = settings.relay.as_ref();

    let staging = StagingArea::new(&relay.staging_dir).await?;
    match staging.sweep_orphans().await {
        Ok(report) if report.removed > 0 || report.failed > 0 => info!(
            "Swept staging leftovers from a previous run (removed: {}, failed: {})",
            report.removed, report.failed
        ),
        Ok(_) => {}
        Err(e) => warn!("Staging sweep failed: {e}"),
    }

    let fetcher = fetcher::from_settings(relay);
    let policy = GatePolicy::from_flag(relay.session_gate);
    info!(
        "Relay pipeline initialized (backend: {}, staging: {}, gate: {:?})",
        fetcher.name(),
        staging.root().display(),
        policy
    );

    Ok(Arc::new(RelayPipeline::new(
        fetcher,
        staging,
        Arc::new(SessionGate::new()),
        policy,
    )))
}

fn stop_on_cancel(
    dispatcher: &Dispatcher<Bot, teloxide::RequestError, DefaultKey>,
    shutdown: CancellationToken,
) {
    let token = dispatcher.shutdown_token();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        match token.shutdown() {
            Ok(done) => {
                info!("Shutdown requested, stopping dispatcher...");
                done.await;
            }
            Err(e) => debug!("Dispatcher was not running: {e}"),
        }
    });
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text))
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    pipeline: Arc<RelayPipeline>,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => bot::handlers::start(bot, msg, pipeline).await,
        Command::Help => bot::handlers::help(bot, msg).await,
        Command::Exit => bot::handlers::exit(bot, msg, pipeline).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    pipeline: Arc<RelayPipeline>,
) -> Result<(), teloxide::RequestError> {
    let outcome = bot::handlers::handle_text(bot, msg, pipeline).await;
    debug!(?outcome, "Text message handled");
    respond(())
}
