use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use portal_core::feed::spawn_feed_task;
use portal_core::{http, portal_from_config, ServerConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Portal state server", long_about = None)]
struct Cli {
    /// JSON configuration file. Falls back to $PORTAL_CONFIG_PATH, then built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Address for the HTTP status endpoints.
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Line-oriented update feed to tail.
    #[arg(long)]
    feed: Option<PathBuf>,
    /// Do not tail any update feed.
    #[arg(long, conflicts_with = "feed")]
    no_feed: bool,
    /// Milliseconds between feed lines.
    #[arg(long)]
    feed_interval_ms: Option<u64>,
    /// Title for the portal before any update arrives.
    #[arg(long)]
    title: Option<String>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut ServerConfig) {
        if let Some(bind) = self.bind {
            config.http_bind = bind;
        }
        if let Some(feed) = &self.feed {
            config.feed_path = Some(feed.clone());
        }
        if self.no_feed {
            config.feed_path = None;
        }
        if let Some(interval) = self.feed_interval_ms {
            config.feed_interval_ms = interval;
        }
        if let Some(title) = &self.title {
            config.default_title = title.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (mut config, source) =
        ServerConfig::load(cli.config.as_deref()).context("loading server config")?;
    cli.apply_overrides(&mut config);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(target: "portal::config", %source, "server_config.loaded");

    let portal = Arc::new(portal_from_config(&config));
    let feed_task = config
        .feed_path
        .clone()
        .map(|path| spawn_feed_task(Arc::clone(&portal), path, config.feed_interval()));

    let listener = TcpListener::bind(config.http_bind)
        .await
        .with_context(|| format!("binding HTTP listener on {}", config.http_bind))?;

    info!(
        target: "portal::server",
        http_bind = %config.http_bind,
        feed = ?config.feed_path,
        portal = config.portal_id,
        "portal server ready"
    );

    http::serve(listener, portal, shutdown_signal())
        .await
        .context("HTTP server failed")?;

    if let Some(task) = feed_task {
        task.abort();
    }
    info!(target: "portal::server", "portal server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(target: "portal::server", error = %err, "shutdown.signal_failed");
        std::future::pending::<()>().await;
    }
}
