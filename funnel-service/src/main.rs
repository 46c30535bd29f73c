mod api;
mod config;
mod render;
mod ws;

use anyhow::Context;
use funnel_flow::{FunnelRunner, InMemorySessionStorage};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api::{AppState, build_router},
    config::{LogFormat, ServiceConfig},
    render::BroadcastRenderer,
};

/// Views buffered per WebSocket subscriber before it starts lagging.
const VIEW_CHANNEL_CAPACITY: usize = 256;

/// Initialize structured JSON tracing based on the configured format
fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "funnel_service=debug,funnel_flow=debug,tower_http=debug".into());

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env()?;
    init_tracing(config.log_format);
    info!(pacing = ?config.pacing, "Loaded configuration");

    let views = BroadcastRenderer::new(VIEW_CHANNEL_CAPACITY);
    let (runner, timers) = FunnelRunner::new(
        Arc::new(InMemorySessionStorage::new()),
        Arc::new(views.clone()),
        config.pacing.clone(),
    );
    runner.spawn_timer_loop(timers);

    let app = build_router(AppState { runner, views });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    info!("Server running on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
