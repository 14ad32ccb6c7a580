use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use waypoint_core::{ConfigError, ReqwestHttpClient, ResolverConfig};
use waypoint_web::{router, AppState};

/// Geocoding and distance service with a quota-aware provider fallback chain.
///
/// Provider settings come from `WAYPOINT_*` environment variables; log
/// filtering from `RUST_LOG`.
#[derive(Debug, Parser)]
#[command(name = "waypoint", version, about)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "WAYPOINT_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,
}

#[derive(Debug, Error)]
enum ServeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,waypoint=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(error) = run(Cli::parse()).await {
        tracing::error!(%error, "waypoint exited");
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), ServeError> {
    let config = ResolverConfig::from_env()?;
    let http_client = Arc::new(ReqwestHttpClient::new(&config.openstreetmap.user_agent));
    let orchestrator = config.build_orchestrator(http_client);
    tracing::info!(chain = ?orchestrator.chain(), "provider chain ready");

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .map_err(|source| ServeError::Bind {
            addr: cli.bind,
            source,
        })?;
    tracing::info!("listening on http://{}", cli.bind);

    axum::serve(listener, router(AppState::new(orchestrator)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServeError::Serve)
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
