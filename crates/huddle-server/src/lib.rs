pub mod broadcast;
pub mod config;
pub mod error;
pub mod health;
pub mod registry;
pub mod state;
pub mod ws;

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;

use config::ServerConfig;
use error::ServeError;
use state::AppState;

/// Build the Axum router and application state from a config.
///
/// The WebSocket endpoint answers on `/` (what plain `ws://host:port`
/// clients hit) and on `/ws`.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let state = AppState::new(config);

    let app = Router::new()
        .route("/", axum::routing::get(ws::ws_handler))
        .route("/ws", axum::routing::get(ws::ws_handler))
        .route("/health", axum::routing::get(health::health_check))
        .with_state(state.clone());

    (app, state)
}

/// Validate the config, bind `listen_addr` and serve until `shutdown` resolves.
pub async fn serve<F>(config: ServerConfig, shutdown: F) -> Result<(), ServeError>
where
    F: Future<Output = ()> + Send + 'static,
{
    config.validate()?;
    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|source| ServeError::Bind {
            addr: config.listen_addr.clone(),
            source,
        })?;
    serve_with_listener(listener, config, shutdown).await
}

/// Serve on an already-bound listener. Each accepted connection runs in its
/// own task, so a stuck client never holds up accepts or other players.
pub async fn serve_with_listener<F>(
    listener: TcpListener,
    config: ServerConfig,
    shutdown: F,
) -> Result<(), ServeError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().map_err(ServeError::Io)?;
    let (app, state) = build_app(config);

    tracing::info!("Huddle server listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(ServeError::Io)?;

    let remaining = state.registry.read().await.count();
    tracing::info!(players = remaining, "Huddle server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
