mod config;
mod error;
mod room;
mod routes;
mod search;
mod state;
mod utils {
    pub mod clean;
    pub mod duration;
}

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::room::RoomRegistry;
use crate::search::{SharedSearch, YouTubeSearch};
use crate::utils::clean::Reaper;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config::from_env()?;

    if cfg.youtube.token.is_empty() {
        tracing::warn!("TOKEN not set, /videos search will fail");
    }
    let search: SharedSearch = Arc::new(YouTubeSearch::new(
        reqwest::Client::new(),
        cfg.youtube.api_base.clone(),
        cfg.youtube.token.clone(),
        cfg.youtube.limit,
    ));

    let rooms  = RoomRegistry::with_config(cfg.registry.clone());
    let reaper = Reaper::spawn(rooms.clone());   // 啟動清道夫

    let app = routes::app(rooms.clone(), search, cfg.request_timeout);

    let listener = tokio::net::TcpListener::bind(&cfg.address)
        .await
        .with_context(|| format!("binding {}", cfg.address))?;
    tracing::info!(addr = %cfg.address, "Listening");

    // 收到訊號先關房間，websocket 才會自己結束
    let closing = rooms.clone();
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutting down gracefully...");
            closing.shutdown().await;
        })
        .await?;

    reaper.stop().await;
    rooms.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => { sig.recv().await; }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
