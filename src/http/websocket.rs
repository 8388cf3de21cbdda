//! Live UI sockets.
//!
//! # Responsibilities
//! - Complete the upgrade handshake for the designated path
//! - Register each new socket with the process-wide registry
//! - Push the current block snapshot on connect, then broadcast frames
//!
//! # Design Decisions
//! - The registry is append-only from the handlers' point of view; a dead
//!   peer is dropped by its own pump task, never unregistered explicitly
//! - A failed handshake aborts silently; registering a socket is
//!   best-effort and no peer is told about it

use axum::body::Body;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::FromRequestParts;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use tokio::sync::broadcast;

use crate::http::response;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Fan-out point for frames pushed to every connected UI socket.
#[derive(Debug, Clone)]
pub struct ConnectionRegistry {
    events: broadcast::Sender<String>,
}

impl ConnectionRegistry {
    /// `capacity` bounds how many frames a slow socket may fall behind
    /// before it starts skipping.
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self { events }
    }

    /// Queue a frame for every connected socket.
    pub fn publish(&self, frame: impl Into<String>) {
        // No receivers just means nobody is watching right now.
        let _ = self.events.send(frame.into());
    }

    /// Register interest; the returned receiver is this socket's place in
    /// the registry.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.events.subscribe()
    }

    /// Number of currently connected sockets.
    pub fn peer_count(&self) -> usize {
        self.events.receiver_count()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Switch protocols and hand the socket to its pump task.
pub async fn upgrade(state: AppState, request: Request<Body>) -> Response {
    let (mut parts, _body) = request.into_parts();
    match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
        Ok(upgrade) => upgrade.on_upgrade(move |socket| serve_socket(socket, state)),
        // Handshake problems are not reported back.
        Err(_) => response::empty(StatusCode::BAD_REQUEST),
    }
}

async fn serve_socket(mut socket: WebSocket, state: AppState) {
    // Greet with the current block so the UI renders immediately.
    let snapshot = state.miner.current().to_json();
    if socket.send(Message::Text(snapshot.into())).await.is_err() {
        return;
    }

    let mut frames = state.connections.subscribe();
    metrics::record_ws_peers(state.connections.peer_count());
    tracing::debug!(peers = state.connections.peer_count(), "Socket connected");

    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Ok(text) => {
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Socket fell behind, frames skipped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            inbound = socket.recv() => match inbound {
                // The UI never sends payloads we act on; reading keeps
                // ping/pong flowing and detects the close.
                Some(Ok(_)) => {}
                _ => break,
            },
        }
    }

    drop(frames);
    metrics::record_ws_peers(state.connections.peer_count());
    tracing::debug!("Socket disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let registry = ConnectionRegistry::new(8);
        let mut first = registry.subscribe();
        let mut second = registry.subscribe();

        registry.publish("{\"height\":7}");

        assert_eq!(first.recv().await.unwrap(), "{\"height\":7}");
        assert_eq!(second.recv().await.unwrap(), "{\"height\":7}");
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let registry = ConnectionRegistry::new(8);
        registry.publish("dropped");
        assert_eq!(registry.peer_count(), 0);
    }

    #[test]
    fn test_peer_count_tracks_subscriptions() {
        let registry = ConnectionRegistry::new(8);
        let first = registry.subscribe();
        assert_eq!(registry.peer_count(), 1);
        drop(first);
        assert_eq!(registry.peer_count(), 0);
    }
}
