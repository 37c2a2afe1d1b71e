//! Startup orchestration.
//!
//! # Responsibilities
//! - Check the frontend tree and configuration
//! - Initialize subsystems in dependency order
//! - Start background tasks (metrics, hot reload, cache janitor)
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The page listener starts last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::build::{Stylesheet, TailwindCompiler, TailwindError};
use crate::cache::{CacheJanitor, PageCache};
use crate::config::validation::{check_app, ValidationError};
use crate::hot_reload::HotReload;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("{} startup check(s) failed", .0.len())]
    Checks(Vec<ValidationError>),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(String),

    #[error("utility CSS compilation failed: {0}")]
    Tailwind(#[from] TailwindError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Start every subsystem and serve until `shutdown` fires.
pub async fn launch(server: HttpServer, shutdown: Arc<Shutdown>) -> Result<(), StartupError> {
    let config = server.config().clone();

    // 1. Checks
    check_app(&config, &server.all_routes()).map_err(StartupError::Checks)?;
    tracing::info!(env = %config.env, "Startup checks passed");

    // 2. Metrics
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|e: std::net::AddrParseError| StartupError::Metrics(e.to_string()))?;
        metrics::init_metrics(addr).map_err(|e| StartupError::Metrics(e.to_string()))?;
    }

    // 3. Utility CSS
    let compiler = config
        .tailwind
        .enabled
        .then(|| TailwindCompiler::new(&config.tailwind, &config.frontend));
    let stylesheet = Arc::new(Stylesheet::new(compiler));
    stylesheet.refresh().await?;

    let cache = Arc::new(PageCache::new());

    // 4. Hot reload (development only)
    if !config.is_production() {
        let reload = Arc::new(HotReload::new(&config, Arc::clone(&cache), Arc::clone(&stylesheet)));
        if let Err(e) = reload.spawn_watcher(shutdown.subscribe()) {
            tracing::error!(error = %e, "Failed to start source watcher");
        }

        let address = reload_address(&config.listener.bind_address, config.hot_reload.port);
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| StartupError::Bind { address, source })?;
        let rx = shutdown.subscribe();
        tokio::spawn(async move {
            if let Err(e) = reload.serve(listener, rx).await {
                tracing::error!(error = %e, "Hot reload server quit unexpectedly");
            }
        });
    }

    // 5. Cache janitor
    let janitor = CacheJanitor::new(
        Arc::clone(&cache),
        Duration::from_secs(config.cache.evict_interval_secs),
    );
    tokio::spawn(janitor.run(shutdown.subscribe()));

    // 6. Listener
    let address = config.listener.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    server
        .cache(cache)
        .stylesheet(stylesheet)
        .run(listener, shutdown.subscribe())
        .await?;
    Ok(())
}

/// Same host as the page listener, on the hot reload port.
fn reload_address(bind_address: &str, port: u16) -> String {
    match bind_address.parse::<SocketAddr>() {
        Ok(mut addr) => {
            addr.set_port(port);
            addr.to_string()
        }
        Err(_) => format!("0.0.0.0:{port}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::EngineConfig;

    #[test]
    fn test_reload_address() {
        assert_eq!(reload_address("127.0.0.1:8080", 3001), "127.0.0.1:3001");
        assert_eq!(reload_address("garbage", 3001), "0.0.0.0:3001");
    }

    #[tokio::test]
    async fn test_launch_fails_on_missing_frontend() {
        let mut config = EngineConfig::default();
        config.frontend.assets_path = "/nonexistent/assets".into();
        config.frontend.server_entry_point = "/nonexistent/entry-server.tsx".into();
        config.frontend.client_entry_point = "/nonexistent/entry-client.tsx".into();

        let err = launch(HttpServer::new(config), Arc::new(Shutdown::new()))
            .await
            .unwrap_err();
        match err {
            StartupError::Checks(errors) => assert_eq!(errors.len(), 3),
            other => panic!("unexpected error: {other}"),
        }
    }
}
