//! Fan-out of canonical events to every registered peer.

use std::sync::Arc;

use agent_bridge_schema::{self as schema, BridgeEvent, EventPayload};

use crate::registry::{PeerRegistry, TransportKind};

/// Stamps events with the session identifier and fans them out. Events are
/// serialized once per transport kind, outside any peer lock, and enqueued on
/// each peer's bounded queue; delivery order per caller is the enqueue order.
pub struct Broadcaster {
    session_id: String,
    registry: Arc<PeerRegistry>,
}

impl Broadcaster {
    pub fn new(session_id: impl Into<String>, registry: Arc<PeerRegistry>) -> Self {
        Self {
            session_id: session_id.into(),
            registry,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn registry(&self) -> &Arc<PeerRegistry> {
        &self.registry
    }

    pub fn broadcast(&self, payload: EventPayload) {
        let event = BridgeEvent::new(self.session_id.clone(), payload);
        let socket_frame = match schema::encode_socket_frame(&event) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(error = %err, "failed to encode socket frame; event dropped");
                return;
            }
        };
        let sse_frame = match schema::encode_sse_frame(&event) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(error = %err, "failed to encode sse frame; event dropped");
                return;
            }
        };
        for peer in self.registry.snapshot() {
            let frame = match peer.kind() {
                TransportKind::FramedSocket => socket_frame.clone(),
                TransportKind::Sse => sse_frame.clone(),
            };
            peer.enqueue(frame);
        }
    }
}
