//! Classification and routing of inbound peer messages.
//!
//! Both transports feed through here, so a prompt injected over the framed
//! socket and one posted over HTTP are indistinguishable by the time they
//! reach the host's input queue.

use std::sync::Arc;

use agent_bridge_schema::{
    parse_inbound, InboundFrame, DATA_KIND_TOOL_CALL_CONFIRMATION, METHOD_MESSAGE_STREAM,
};
use serde_json::Value;

use crate::arbiter::{ConfirmationArbiter, ResponseSource};
use crate::host::HostHandle;

/// What an inbound frame turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Prompt(String),
    Confirmation {
        tool_call_id: String,
        selected_option_id: String,
    },
    Unrecognized,
}

/// Decides what an inbound frame carries. A message is recognized only when
/// its method is `message/stream` and `params.message.content` is present.
pub fn classify(frame: &InboundFrame) -> InboundMessage {
    if frame.method != METHOD_MESSAGE_STREAM {
        return InboundMessage::Unrecognized;
    }
    let Some(content) = frame.params.pointer("/message/content") else {
        return InboundMessage::Unrecognized;
    };
    if let Some(text) = content.get("text").and_then(Value::as_str) {
        return InboundMessage::Prompt(text.to_string());
    }
    if content.pointer("/data/kind").and_then(Value::as_str)
        == Some(DATA_KIND_TOOL_CALL_CONFIRMATION)
    {
        let tool_call_id = content.pointer("/data/tool_call_id").and_then(Value::as_str);
        let selected = content
            .pointer("/data/selected_option_id")
            .and_then(Value::as_str);
        if let (Some(tool_call_id), Some(selected)) = (tool_call_id, selected) {
            return InboundMessage::Confirmation {
                tool_call_id: tool_call_id.to_string(),
                selected_option_id: selected.to_string(),
            };
        }
    }
    InboundMessage::Unrecognized
}

#[derive(Clone)]
pub struct InputRouter {
    host: HostHandle,
    arbiter: Arc<ConfirmationArbiter>,
}

impl InputRouter {
    pub fn new(host: HostHandle, arbiter: Arc<ConfirmationArbiter>) -> Self {
        Self { host, arbiter }
    }

    /// Parses and routes one raw frame. Malformed frames are dropped; they
    /// never terminate the peer.
    pub fn route_frame(&self, raw: &[u8], source: ResponseSource) {
        match parse_inbound(raw) {
            Ok(frame) => self.route(frame, source),
            Err(err) => {
                tracing::debug!(
                    error = %err,
                    source = source.as_str(),
                    "dropping malformed inbound frame"
                );
            }
        }
    }

    pub fn route(&self, frame: InboundFrame, source: ResponseSource) {
        match classify(&frame) {
            InboundMessage::Prompt(text) => {
                tracing::debug!(
                    source = source.as_str(),
                    chars = text.chars().count(),
                    "injecting peer prompt"
                );
                if let Err(err) = self.host.inject_input(text) {
                    tracing::error!(error = %err, "failed to inject peer prompt");
                }
            }
            InboundMessage::Confirmation {
                tool_call_id,
                selected_option_id,
            } => {
                self.arbiter
                    .resolve(&tool_call_id, &selected_option_id, source);
            }
            InboundMessage::Unrecognized => {
                tracing::debug!(
                    source = source.as_str(),
                    method = %frame.method,
                    "dropping unrecognized inbound message"
                );
            }
        }
    }
}
