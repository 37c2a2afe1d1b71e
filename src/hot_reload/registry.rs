//! Live-reload connection registry.
//!
//! Connections are grouped by route ID and kept in registration order. A
//! single async mutex guards the map and is held for a whole fan-out, so a
//! broadcast never interleaves with registration or removal.

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket};
use futures_util::future::BoxFuture;
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::observability::metrics;

/// Frame pushed to browsers when sources change.
pub const RELOAD_MESSAGE: &str = "reload";

/// Frame acknowledging a subscription.
pub const CONNECTED_MESSAGE: &str = "Connected";

#[derive(Debug, thiserror::Error)]
#[error("reload connection closed: {0}")]
pub struct SinkError(pub String);

/// Write half of a live-reload connection.
pub trait ReloadSink: Send {
    fn send_text(&mut self, text: String) -> BoxFuture<'_, Result<(), SinkError>>;
}

impl ReloadSink for SplitSink<WebSocket, Message> {
    fn send_text(&mut self, text: String) -> BoxFuture<'_, Result<(), SinkError>> {
        Box::pin(async move {
            self.send(Message::Text(text.into()))
                .await
                .map_err(|e| SinkError(e.to_string()))
        })
    }
}

struct Client {
    id: Uuid,
    sink: Box<dyn ReloadSink>,
}

/// Outcome of one broadcast.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub pruned: usize,
}

#[derive(Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<String, Vec<Client>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `sink` under `route_id`. Returns the handle for [`remove`](Self::remove).
    pub async fn register(&self, route_id: String, sink: Box<dyn ReloadSink>) -> Uuid {
        let id = Uuid::new_v4();
        let mut clients = self.clients.lock().await;
        clients.entry(route_id).or_default().push(Client { id, sink });
        metrics::record_reload_clients(count(&clients));
        id
    }

    /// Drop one connection. Returns false if it was already gone.
    pub async fn remove(&self, route_id: &str, id: Uuid) -> bool {
        let mut clients = self.clients.lock().await;
        let Some(list) = clients.get_mut(route_id) else {
            return false;
        };
        let before = list.len();
        list.retain(|client| client.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            clients.remove(route_id);
        }
        metrics::record_reload_clients(count(&clients));
        removed
    }

    /// Push `reload` to every connection under `route_id`.
    pub async fn broadcast(&self, route_id: &str) -> BroadcastReport {
        let mut clients = self.clients.lock().await;
        let mut report = BroadcastReport::default();
        if let Some(list) = clients.get_mut(route_id) {
            fan_out(route_id, list, &mut report).await;
            if list.is_empty() {
                clients.remove(route_id);
            }
        }
        finish(&clients, report)
    }

    /// Push `reload` to every connection.
    pub async fn broadcast_all(&self) -> BroadcastReport {
        let mut clients = self.clients.lock().await;
        let mut report = BroadcastReport::default();
        for (route_id, list) in clients.iter_mut() {
            fan_out(route_id, list, &mut report).await;
        }
        clients.retain(|_, list| !list.is_empty());
        finish(&clients, report)
    }

    pub async fn connection_count(&self) -> usize {
        count(&*self.clients.lock().await)
    }

    pub async fn route_count(&self) -> usize {
        self.clients.lock().await.len()
    }
}

async fn fan_out(route_id: &str, list: &mut Vec<Client>, report: &mut BroadcastReport) {
    let mut i = 0;
    while i < list.len() {
        match list[i].sink.send_text(RELOAD_MESSAGE.to_string()).await {
            Ok(()) => {
                report.delivered += 1;
                i += 1;
            }
            Err(e) => {
                let client = list.remove(i);
                tracing::debug!(route_id = %route_id, client = %client.id, error = %e, "Pruned reload connection");
                report.pruned += 1;
            }
        }
    }
}

fn finish(clients: &HashMap<String, Vec<Client>>, report: BroadcastReport) -> BroadcastReport {
    metrics::record_reload(report.delivered, report.pruned);
    metrics::record_reload_clients(count(clients));
    report
}

fn count(clients: &HashMap<String, Vec<Client>>) -> usize {
    clients.values().map(Vec::len).sum()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};

    /// Sink double recording frames; can be switched to fail.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingSink {
        pub frames: Arc<StdMutex<Vec<String>>>,
        pub broken: Arc<AtomicBool>,
    }

    impl RecordingSink {
        pub(crate) fn frames(&self) -> Vec<String> {
            self.frames.lock().unwrap().clone()
        }
    }

    impl ReloadSink for RecordingSink {
        fn send_text(&mut self, text: String) -> BoxFuture<'_, Result<(), SinkError>> {
            Box::pin(async move {
                if self.broken.load(Ordering::SeqCst) {
                    return Err(SinkError("broken pipe".to_string()));
                }
                self.frames.lock().unwrap().push(text);
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn test_broadcast_targets_route() {
        let registry = ClientRegistry::new();
        let a = RecordingSink::default();
        let b = RecordingSink::default();
        registry.register("/a".into(), Box::new(a.clone())).await;
        registry.register("/b".into(), Box::new(b.clone())).await;

        let report = registry.broadcast("/a").await;
        assert_eq!(report, BroadcastReport { delivered: 1, pruned: 0 });
        assert_eq!(a.frames(), vec![RELOAD_MESSAGE.to_string()]);
        assert!(b.frames().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_unknown_route() {
        let registry = ClientRegistry::new();
        assert_eq!(registry.broadcast("/nobody").await, BroadcastReport::default());
    }

    #[tokio::test]
    async fn test_failed_write_prunes_connection() {
        let registry = ClientRegistry::new();
        let healthy = RecordingSink::default();
        let broken = RecordingSink::default();
        broken.broken.store(true, Ordering::SeqCst);

        registry.register("/a".into(), Box::new(broken.clone())).await;
        registry.register("/a".into(), Box::new(healthy.clone())).await;

        let report = registry.broadcast("/a").await;
        assert_eq!(report, BroadcastReport { delivered: 1, pruned: 1 });
        assert_eq!(registry.connection_count().await, 1);

        // Healing the sink does not bring the pruned connection back.
        broken.broken.store(false, Ordering::SeqCst);
        registry.broadcast_all().await;
        assert!(broken.frames().is_empty());
        assert_eq!(healthy.frames().len(), 2);
    }

    #[tokio::test]
    async fn test_broadcast_all_and_empty_routes_dropped() {
        let registry = ClientRegistry::new();
        let a = RecordingSink::default();
        let dead = RecordingSink::default();
        dead.broken.store(true, Ordering::SeqCst);
        registry.register("/a".into(), Box::new(a.clone())).await;
        registry.register("/dead".into(), Box::new(dead)).await;

        let report = registry.broadcast_all().await;
        assert_eq!(report, BroadcastReport { delivered: 1, pruned: 1 });
        assert_eq!(registry.route_count().await, 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let registry = ClientRegistry::new();
        let id = registry.register("/a".into(), Box::new(RecordingSink::default())).await;
        let other = registry.register("/a".into(), Box::new(RecordingSink::default())).await;

        assert!(registry.remove("/a", id).await);
        assert!(!registry.remove("/a", id).await);
        assert!(!registry.remove("/missing", other).await);
        assert_eq!(registry.connection_count().await, 1);

        assert!(registry.remove("/a", other).await);
        assert_eq!(registry.route_count().await, 0);
    }
}
