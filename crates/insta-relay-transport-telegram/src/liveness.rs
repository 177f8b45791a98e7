//! Minimal HTTP responder so hosting platforms see an open port in polling mode.

use anyhow::Result;
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Body returned by every liveness route.
pub const LIVENESS_BODY: &str = "Bot is running";

/// Router answering `GET /` and `GET /health`.
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/", get(alive))
        .route("/health", get(alive))
}

async fn alive() -> &'static str {
    LIVENESS_BODY
}

/// Bind `0.0.0.0:{port}` and serve until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server fails.
pub async fn serve(port: u16, shutdown: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Liveness responder listening on port {port}");
    serve_on(listener, shutdown).await
}

/// Serve on an already bound listener until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the server fails.
pub async fn serve_on(listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
    axum::serve(listener, router())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
