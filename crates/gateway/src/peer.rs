//! Peer WebSocket endpoint.
//!
//! Every upgraded socket runs in its own task: it registers a
//! [`PeerConnection`], pumps frames between the socket and the connection's
//! transport endpoint, and deregisters when either side closes.
//!
//! Protocol:
//! - Server → peer: command JSON text frames
//! - Peer → server: observation JSON text frames. Binary frames must hold
//!   UTF-8; anything else is forwarded empty and fails to decode.

use std::sync::Arc;

use armbridge_channels::{ConnectionRegistry, PeerConnection, PeerEndpoint};
use armbridge_core::exchange::ConnectionId;
use axum::{
    Router,
    extract::State,
    extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

/// Build the peer router. Upgrades are accepted on any path.
pub fn peer_router(registry: Arc<ConnectionRegistry>) -> Router {
    Router::new()
        .route("/", get(peer_ws_handler))
        .route("/{*path}", get(peer_ws_handler))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(registry)
}

/// `GET /` (any path) — upgrade to a peer connection.
async fn peer_ws_handler(
    ws: WebSocketUpgrade,
    State(registry): State<Arc<ConnectionRegistry>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_peer_socket(socket, registry))
}

/// Own one peer socket for its whole lifetime.
pub async fn handle_peer_socket(socket: WebSocket, registry: Arc<ConnectionRegistry>) {
    let (conn, endpoint) = PeerConnection::open();
    let id = conn.id();
    info!(connection = %id, "Peer connection received");
    registry.on_connect(conn);

    pump(socket, endpoint).await;

    registry.on_disconnect(id);
    info!(connection = %id, "Peer socket closed");
}

async fn pump(socket: WebSocket, endpoint: PeerEndpoint) {
    let PeerEndpoint {
        id,
        mut commands,
        replies,
    } = endpoint;
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            outgoing = commands.recv() => {
                let Some(frame) = outgoing else {
                    // connection handle dropped by the registry
                    break;
                };
                if let Err(e) = sink.send(WsMessage::Text(frame.into())).await {
                    warn!(connection = %id, error = %e, "Failed to send command frame");
                    break;
                }
            }
            incoming = stream.next() => {
                let text = match incoming {
                    Some(Ok(WsMessage::Text(text))) => text.as_str().to_owned(),
                    Some(Ok(WsMessage::Binary(bytes))) => binary_frame_text(id, bytes.to_vec()),
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => continue, // ping/pong
                    Some(Err(e)) => {
                        warn!(connection = %id, error = %e, "Peer socket error");
                        break;
                    }
                };
                debug!(connection = %id, bytes = text.len(), "Frame from peer");
                if replies.send(text).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = sink.close().await;
}

/// Text carried by a binary frame. Invalid UTF-8 still answers the pending
/// exchange, but with an empty frame the codec rejects as malformed.
fn binary_frame_text(id: ConnectionId, bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| {
        warn!(connection = %id, error = %e, "Binary frame is not valid UTF-8");
        String::new()
    })
}
