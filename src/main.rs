use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use route_orchestrator::api;
use route_orchestrator::config::Config;
use route_orchestrator::engine::notify::{run_notification_dispatcher, LogNotifier, Notifier};
use route_orchestrator::error::AppError;
use route_orchestrator::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let http_port = config.http_port;
    let (app_state, notification_rx) = AppState::new(config);
    let shared_state = Arc::new(app_state);

    let app = api::rest::router(shared_state.clone());

    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
    tokio::spawn(run_notification_dispatcher(
        shared_state.clone(),
        notifier,
        notification_rx,
    ));

    let bind_addr = format!("0.0.0.0:{http_port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
