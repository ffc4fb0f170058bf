//! Payroll Engine HTTP server.
//!
//! Loads the rate tables and the seed master data, then serves the API.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use payroll_engine::api::{AppState, create_router};
use payroll_engine::config::ConfigLoader;
use payroll_engine::store::InMemoryStore;

#[derive(Parser)]
#[command(name = "payroll-engine", about = "Japanese payroll calculation server")]
struct Cli {
    /// Server port
    #[arg(short, long, env = "PAYROLL_PORT", default_value = "3000")]
    port: u16,

    /// Directory holding the rate tables
    #[arg(long, env = "PAYROLL_CONFIG_DIR", default_value = "./config/jp2024")]
    config_dir: PathBuf,

    /// Employee master data and resident tax notices
    #[arg(long, env = "PAYROLL_DATA_FILE", default_value = "./data/seed.yaml")]
    data_file: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    };
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter()).init();
    }

    let cli = Cli::parse();

    let config = ConfigLoader::load(&cli.config_dir)
        .with_context(|| format!("loading rate tables from {}", cli.config_dir.display()))?;
    tracing::info!(
        schedule = %config.schedule().code,
        version = %config.schedule().version,
        "Rate tables loaded"
    );

    let store = InMemoryStore::load(&cli.data_file, config.tables())
        .with_context(|| format!("loading master data from {}", cli.data_file.display()))?;

    let app = create_router(AppState::new(config, store));

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    tracing::info!("Payroll Engine listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
