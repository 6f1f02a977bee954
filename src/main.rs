use std::sync::Arc;

use geoguess_core::{api, config, engine, error, state};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let app_state = state::AppState::new(&config)?;
    let shared_state = Arc::new(app_state);

    let app = api::rest::router(shared_state.clone());

    match config.abandoned_upload_ttl() {
        Some(ttl) => {
            tokio::spawn(engine::sweep::run_abandoned_upload_sweeper(
                shared_state.photos.clone(),
                ttl,
            ));
        }
        None => tracing::info!("abandoned upload sweep disabled"),
    }

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(
        http_port = config.http_port,
        coordinate_policy = %config.coordinate_policy,
        photo_service = config.photo_service_url.as_deref().unwrap_or("in-process"),
        "http server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
