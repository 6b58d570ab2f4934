//! Frame codec: event records to wire frames, and inbound peer messages back.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::BridgeEvent;

/// Record terminator on the framed-socket transport.
pub const SOCKET_FRAME_TERMINATOR: u8 = 0x00;

/// Method name carried by every recognized inbound peer message.
pub const METHOD_MESSAGE_STREAM: &str = "message/stream";

/// JSON-RPC envelope wrapping events on the SSE transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcEnvelope {
    pub jsonrpc: String,
    pub id: String,
    pub result: BridgeEvent,
}

impl JsonRpcEnvelope {
    pub fn wrap(event: BridgeEvent) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: event.task_id.clone(),
            result: event,
        }
    }
}

/// Serializes an event for a framed-socket peer: the JSON record followed by
/// a single null byte.
pub fn encode_socket_frame(event: &BridgeEvent) -> Result<Bytes, serde_json::Error> {
    let mut frame = serde_json::to_vec(event)?;
    frame.push(SOCKET_FRAME_TERMINATOR);
    Ok(Bytes::from(frame))
}

/// Serializes an event for an SSE peer: the JSON-RPC envelope, without the
/// `data:` framing (the HTTP layer adds it).
pub fn encode_sse_frame(event: &BridgeEvent) -> Result<Bytes, serde_json::Error> {
    let envelope = JsonRpcEnvelope::wrap(event.clone());
    Ok(Bytes::from(serde_json::to_vec(&envelope)?))
}

/// An inbound peer message in JSON-RPC shape. Anything JSON-parseable is
/// accepted at this layer; classification happens downstream, so a frame with
/// a missing `method` simply never matches.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundFrame {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Parses raw inbound bytes, tolerating an optional trailing record
/// terminator.
pub fn parse_inbound(raw: &[u8]) -> Result<InboundFrame, serde_json::Error> {
    let raw = match raw.split_last() {
        Some((&SOCKET_FRAME_TERMINATOR, rest)) => rest,
        _ => raw,
    };
    serde_json::from_slice(raw)
}

/// Converts an already-parsed JSON body into an inbound frame.
pub fn inbound_from_value(value: Value) -> InboundFrame {
    serde_json::from_value(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{BridgeEvent, EventPayload};
    use serde_json::json;

    fn sample_event() -> BridgeEvent {
        BridgeEvent::new(
            "task-3",
            EventPayload::TextContent {
                text: "chunk".to_string(),
                is_stderr: None,
            },
        )
    }

    #[test]
    fn socket_frames_end_with_a_single_null_byte() {
        let frame = encode_socket_frame(&sample_event()).unwrap();
        assert_eq!(frame.last(), Some(&SOCKET_FRAME_TERMINATOR));
        assert!(!frame[..frame.len() - 1].contains(&SOCKET_FRAME_TERMINATOR));
    }

    #[test]
    fn stripping_the_terminator_yields_a_round_trippable_record() {
        let event = sample_event();
        let frame = encode_socket_frame(&event).unwrap();
        let decoded: BridgeEvent = serde_json::from_slice(&frame[..frame.len() - 1]).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn sse_frames_carry_the_jsonrpc_envelope() {
        let frame = encode_sse_frame(&sample_event()).unwrap();
        let value: Value = serde_json::from_slice(&frame).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], "task-3");
        assert_eq!(value["result"]["kind"], "TEXT_CONTENT");
        assert_eq!(value["result"]["taskId"], "task-3");
    }

    #[test]
    fn inbound_parse_accepts_terminated_and_bare_records() {
        let body = json!({
            "jsonrpc": "2.0",
            "method": "message/stream",
            "params": { "message": { "content": { "text": "hi" } } },
        })
        .to_string();

        let bare = parse_inbound(body.as_bytes()).unwrap();
        assert_eq!(bare.method, METHOD_MESSAGE_STREAM);

        let mut terminated = body.into_bytes();
        terminated.push(SOCKET_FRAME_TERMINATOR);
        let framed = parse_inbound(&terminated).unwrap();
        assert_eq!(framed.method, METHOD_MESSAGE_STREAM);
    }

    #[test]
    fn inbound_parse_rejects_malformed_json() {
        assert!(parse_inbound(b"{not json").is_err());
    }

    #[test]
    fn inbound_from_value_defaults_missing_fields() {
        let frame = inbound_from_value(json!({ "params": 3 }));
        assert!(frame.method.is_empty());
    }
}
