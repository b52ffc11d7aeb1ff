use std::time::Duration;

use clap::Parser;
use server::config::{Cli, ServerConfig};
use server::error::ListenError;
use server::listener::{build_router, spawn_idle_watchdog};
use server::rooms_controller::RoomsController;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true),
        )
        .init();

    let cli = Cli::parse();
    let config = match ServerConfig::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(config).await {
        tracing::error!(%err, "server exited with error");
        std::process::exit(1);
    }
}

async fn run(config: ServerConfig) -> Result<(), ListenError> {
    let controller = RoomsController::new(Duration::from_secs(config.idle_room_timeout_secs));
    spawn_idle_watchdog(controller.clone());

    let web_dir = config.web_dir.display().to_string();
    let app = build_router(controller, &web_dir);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ListenError::Bind { addr: addr.clone(), source })?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app).await.map_err(|source| ListenError::Serve { source })
}
