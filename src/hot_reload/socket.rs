//! `/ws` endpoint of the live-reload listener.
//!
//! Protocol: the browser sends its route ID as the first frame, the server
//! answers `Connected`, then pushes `reload` whenever sources change. Later
//! client frames are read and discarded until the socket closes.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};

use crate::hot_reload::registry::{ClientRegistry, CONNECTED_MESSAGE};

pub fn router(registry: Arc<ClientRegistry>) -> Router {
    Router::new().route("/ws", get(upgrade)).with_state(registry)
}

async fn upgrade(ws: WebSocketUpgrade, State(registry): State<Arc<ClientRegistry>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, registry))
}

async fn handle_socket(socket: WebSocket, registry: Arc<ClientRegistry>) {
    let (mut sink, mut stream) = socket.split();

    let Some(route_id) = read_route_id(&mut stream).await else {
        tracing::debug!("Reload connection sent no route ID, closing");
        let _ = sink.close().await;
        return;
    };

    if let Err(e) = sink.send(Message::Text(CONNECTED_MESSAGE.into())).await {
        tracing::debug!(route_id = %route_id, error = %e, "Reload connection dropped before ack");
        return;
    }

    let id = registry.register(route_id.clone(), Box::new(sink)).await;
    tracing::info!(route_id = %route_id, client = %id, "Reload client connected");

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    registry.remove(&route_id, id).await;
    tracing::info!(route_id = %route_id, client = %id, "Reload client disconnected");
}

/// First data frame as a route ID. Control frames are skipped; empty IDs,
/// non-UTF-8 payloads and early closes yield `None`.
async fn read_route_id(stream: &mut SplitStream<WebSocket>) -> Option<String> {
    while let Some(frame) = stream.next().await {
        let route_id = match frame.ok()? {
            Message::Text(text) => text.as_str().to_string(),
            Message::Binary(bytes) => String::from_utf8(bytes.to_vec()).ok()?,
            Message::Ping(_) | Message::Pong(_) => continue,
            Message::Close(_) => return None,
        };
        return (!route_id.is_empty()).then_some(route_id);
    }
    None
}
