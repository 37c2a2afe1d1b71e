//! Live reload for development.
//!
//! # Data Flow
//! ```text
//! Browser ── ws /ws ──→ socket.rs ──register──→ registry.rs
//!
//! Source change
//!     → watcher.rs (notify, one watch per directory)
//!     → watch loop: coalesce queued events
//!     → cache.clear() + stylesheet.refresh()
//!     → registry.broadcast_all() ── "reload" ──→ browsers
//! ```
//!
//! # Design Decisions
//! - Separate listener on its own port, only outside production
//! - Newly created directories are watched as they appear
//! - Watcher failures are logged; the loop keeps running

pub mod registry;
pub mod socket;
pub mod watcher;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::build::Stylesheet;
use crate::cache::PageCache;
use crate::config::schema::EngineConfig;

pub use registry::{BroadcastReport, ClientRegistry, ReloadSink, SinkError, CONNECTED_MESSAGE, RELOAD_MESSAGE};
pub use watcher::{SourceWatcher, WatchError, WatchEvent, WatchKind, WatchReceiver};

/// Watcher loop plus broadcast server.
pub struct HotReload {
    registry: Arc<ClientRegistry>,
    cache: Arc<PageCache>,
    stylesheet: Arc<Stylesheet>,
    source_dir: PathBuf,
    ignore_dirs: Vec<String>,
}

impl HotReload {
    pub fn new(config: &EngineConfig, cache: Arc<PageCache>, stylesheet: Arc<Stylesheet>) -> Self {
        Self {
            registry: Arc::new(ClientRegistry::new()),
            cache,
            stylesheet,
            source_dir: PathBuf::from(&config.frontend.source_dir),
            ignore_dirs: config.hot_reload.ignore_dirs.clone(),
        }
    }

    pub fn registry(&self) -> Arc<ClientRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn router(&self) -> Router {
        socket::router(self.registry())
    }

    /// Serve `/ws` on `listener` until shutdown.
    pub async fn serve(&self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> io::Result<()> {
        tracing::info!(address = %listener.local_addr()?, "Hot reload websocket listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await
    }

    /// Register the source tree and spawn the watch loop.
    pub fn spawn_watcher(self: &Arc<Self>, shutdown: broadcast::Receiver<()>) -> Result<JoinHandle<()>, WatchError> {
        let (watcher, events) = SourceWatcher::start(&self.source_dir, self.ignore_dirs.clone())?;
        let this = Arc::clone(self);
        Ok(tokio::spawn(this.watch_loop(watcher, events, shutdown)))
    }

    async fn watch_loop(
        self: Arc<Self>,
        mut watcher: SourceWatcher,
        mut events: WatchReceiver,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                batch = events.recv() => {
                    let Some(first) = batch else {
                        tracing::warn!("Source watcher channel closed, exiting loop");
                        break;
                    };
                    let mut batches = vec![first];
                    while let Ok(next) = events.try_recv() {
                        batches.push(next);
                    }
                    if self.absorb(&mut watcher, batches) {
                        self.rebuild().await;
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Hot reload watcher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Register new directories; report whether any file was written.
    fn absorb(&self, watcher: &mut SourceWatcher, batches: Vec<Result<Vec<WatchEvent>, WatchError>>) -> bool {
        let mut written = false;
        for batch in batches {
            let events = match batch {
                Ok(events) => events,
                Err(e) => {
                    tracing::error!(error = %e, "Error watching files");
                    continue;
                }
            };
            for event in events {
                match event.kind {
                    WatchKind::Write => written = true,
                    WatchKind::Create if event.path.is_dir() => {
                        if let Err(e) = watcher.register_tree(&event.path) {
                            tracing::warn!(path = %event.path.display(), error = %e, "Failed to watch new directory");
                        }
                    }
                    _ => {}
                }
            }
        }
        written
    }

    /// Drop cached pages, recompile utility CSS and tell every browser.
    pub async fn rebuild(&self) -> BroadcastReport {
        tracing::info!("Detected change, reloading clients");
        let dropped = self.cache.clear();
        if let Err(e) = self.stylesheet.refresh().await {
            tracing::error!(error = %e, "Utility CSS refresh failed, keeping previous stylesheet");
        }
        let report = self.registry.broadcast_all().await;
        tracing::info!(
            dropped_pages = dropped,
            delivered = report.delivered,
            pruned = report.pruned,
            "Reload broadcast"
        );
        report
    }
}
