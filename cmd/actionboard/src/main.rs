//! # actionboard
//!
//! Wires the in-memory store and cache into the action service, puts the
//! request interceptor in front of it and serves HTTP until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use api_adapters::{build_router, AppState, Interceptor};
use configs::{LogFormat, LogSettings, Settings};
use domains::{CacheInvalidator, Store};
use services::ActionService;
use storage_adapters::{MemoryCache, MemoryStore};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    init_tracing(&settings.log);
    if let Some(path) = &settings.dotenv {
        debug!(path = %path.display(), "loaded .env");
    }

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let cache: Arc<dyn CacheInvalidator> = Arc::new(MemoryCache::new());
    let actions = ActionService::new(store, cache);
    let interceptor =
        Interceptor::from_settings(&settings.interceptor, settings.server.secure_cookies);

    let app = build_router(AppState::new(actions, interceptor));

    let addr = settings.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "actionboard listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("actionboard stopped");
    Ok(())
}

/// `RUST_LOG` wins over the configured filter.
fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
