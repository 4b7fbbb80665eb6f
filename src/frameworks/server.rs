// Framework bootstrap for the vessel sync runtime.

use crate::frameworks::config;
use crate::interface_adapters::net::{
    create_vessel_handler, delete_vessel_handler, get_instruments_handler, get_vessel_handler,
    list_vessels_handler, update_heading_handler, update_position_handler, ws_handler,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::broadcast::broadcast_task;
use crate::use_cases::{Fleet, UpdateChannel, VesselRegistry};

use axum::{
    Router,
    routing::{get, put},
};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::Notify;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route(
            "/vessels",
            get(list_vessels_handler).post(create_vessel_handler),
        )
        .route(
            "/vessels/{name}",
            get(get_vessel_handler).delete(delete_vessel_handler),
        )
        .route("/vessels/{name}/heading", put(update_heading_handler))
        .route("/vessels/{name}/position", put(update_position_handler))
        .route("/vessels/{name}/instruments", get(get_instruments_handler))
        .with_state(state)
}

/// Seeds the registry from the roster and wires it to a fresh update channel.
pub fn build_fleet(roster: &[String]) -> Result<Fleet> {
    let registry = VesselRegistry::seeded(roster)
        .map_err(|e| std::io::Error::other(format!("failed to seed vessel registry: {e}")))?;
    let channel = UpdateChannel::new(config::CLIENT_QUEUE_CAPACITY);
    Ok(Fleet::new(Arc::new(registry), Arc::new(channel)))
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let fleet = build_fleet(&config::vessel_roster())?;

    // The broadcaster owns the world tick; it stops once the server does.
    let shutdown = Arc::new(Notify::new());
    tokio::spawn(broadcast_task(
        fleet.clone(),
        config::broadcast_tick(),
        shutdown.clone(),
    ));

    let app = router(Arc::new(AppState { fleet }));
    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    let served = axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    });
    shutdown.notify_one();
    served
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}
