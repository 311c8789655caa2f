use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use download_jail::{logging, router, AppState, Config, Fetcher};

/// SSRF-safe download proxy.
#[derive(Debug, Parser)]
#[command(name = "download-jail", version, about)]
struct Args {
    /// TOML config file. Built-in defaults are used when omitted.
    #[arg(short, long, env = "DOWNLOAD_JAIL_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on; overrides the config file.
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(listen) = args.listen {
        config.listen = listen;
    }

    let policy = config.policy();
    if policy.is_empty() {
        tracing::warn!("allow-list is empty; every download will be rejected");
    }

    let fetcher = Fetcher::new(&config.fetch_config()).context("building HTTP client")?;
    let app = router(Arc::new(AppState::new(policy, fetcher)));

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;

    tracing::info!(
        listen = %config.listen,
        schemes = ?config.allow.schemes,
        hosts = ?config.allow.hosts,
        "download-jail listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
