//! Periodic purge of expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::cache::store::PageCache;
use crate::observability::metrics;

pub struct CacheJanitor {
    cache: Arc<PageCache>,
    interval: Duration,
}

impl CacheJanitor {
    pub fn new(cache: Arc<PageCache>, interval: Duration) -> Self {
        Self { cache, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if self.interval.is_zero() {
            tracing::info!("Cache janitor disabled");
            return;
        }

        tracing::info!(interval_secs = self.interval.as_secs(), "Cache janitor starting");
        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.cache.evict_expired();
                    if evicted > 0 {
                        tracing::debug!(evicted, remaining = self.cache.len(), "Evicted expired pages");
                    }
                    metrics::record_cache_size(self.cache.len());
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cache janitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
