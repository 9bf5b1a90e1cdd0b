use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use tenant_security_api::cache::MemoryCache;
use tenant_security_api::config::AppConfig;
use tenant_security_api::server::{app, AppState};

/// How often expired cache entries are swept
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(name = "tenant-security-api")]
#[command(about = "Multi-tenant security context service")]
#[command(version)]
struct Args {
    /// Bind address (overrides SERVER_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides SERVER_PORT / PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up SECURITY_* settings
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = AppConfig::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Starting Tenant Security API in {:?} mode", config.environment);
    if config.security.root_key.is_none() {
        tracing::warn!("No SECURITY_ROOT_KEY configured; /api/root routes are open");
    }
    if config.security.master_secret.is_none() {
        tracing::warn!("No SECURITY_MASTER_SECRET configured; tenant keys use a per-process secret");
    }

    let cache = MemoryCache::new();
    spawn_purge_task(cache.clone());

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::with_cache(config, Arc::new(cache));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Tenant Security API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}

fn spawn_purge_task(cache: MemoryCache) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            cache.purge_expired().await;
        }
    });
}
