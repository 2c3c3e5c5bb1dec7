use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use gamenight_backend_lib::{
    config::Settings, create_router, spawn_sweeper, storage::FlatFileStorage, AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// How often expired bearer tokens are purged
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Gamenight lobby and voting server
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Configuration file (toml, yaml or json); defaults to ./config.* lookup
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the bind address
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Settings::load().context("loading config")?,
    };
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }

    init_tracing(&settings.log_level, args.json_logs);

    let storage = FlatFileStorage::new(&settings.data_dir)
        .with_context(|| format!("opening data dir {}", settings.data_dir.display()))?;
    let addr = settings.bind_addr;
    let state = Arc::new(AppState::with_rawg_catalog(storage, settings)?);

    // Background maintenance
    state.sessions.spawn_cleanup(SESSION_CLEANUP_INTERVAL);
    spawn_sweeper(state.clone());

    let app = create_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
