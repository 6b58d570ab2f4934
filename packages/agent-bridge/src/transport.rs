//! Framed-socket transport: a WebSocket upgrade carrying one null-terminated
//! JSON record per message.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};

use crate::arbiter::ResponseSource;
use crate::registry::TransportKind;
use crate::router::AppState;

pub(crate) async fn ws_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let peer = state.registry().register(TransportKind::FramedSocket);
    let peer_id = peer.id();
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Write worker: drains the peer's outbound queue until it closes or the
    // socket breaks.
    let writer_peer = peer.clone();
    let writer_registry = state.registry().clone();
    let write_task = tokio::spawn(async move {
        while let Some(frame) = writer_peer.next_frame().await {
            if let Err(err) = ws_sender.send(Message::Binary(frame.to_vec())).await {
                tracing::warn!(peer_id, error = %err, "framed socket write failed");
                writer_peer.record_error(err.to_string());
                writer_registry.unregister(peer_id);
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    while let Some(message) = ws_receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                state
                    .input_router()
                    .route_frame(text.as_bytes(), ResponseSource::FramedSocket);
            }
            Ok(Message::Binary(data)) => {
                state
                    .input_router()
                    .route_frame(&data, ResponseSource::FramedSocket);
            }
            Ok(Message::Close(_)) => break,
            // Ping/pong are answered by the protocol layer.
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(peer_id, error = %err, "framed socket read failed");
                peer.record_error(err.to_string());
                break;
            }
        }
    }

    state.registry().unregister(peer_id);
    write_task.abort();
}
