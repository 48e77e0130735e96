use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use huddle_server::config::ServerConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Huddle server starting");

    let config = ServerConfig::load();
    match huddle_server::serve(config, huddle_server::shutdown_signal()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        },
    }
}
