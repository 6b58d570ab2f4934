//! Subscribes to the host's streams and normalizes everything into the
//! canonical event schema before fan-out.
//!
//! Two tasks run for the bridge's lifetime: one drains the host event stream,
//! one drains the message bus. Each task is the only broadcaster for its
//! source, which is what preserves per-source FIFO delivery.

use std::sync::Arc;

use agent_bridge_schema::{
    ConfirmationDetails, ConfirmationRequest, EventPayload, ExecuteDetails, FileEditDetails,
    GenericDetails, McpDetails, ToolCallResult, ToolCallStatus, ToolCallUpdate,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::arbiter::ConfirmationArbiter;
use crate::fanout::Broadcaster;
use crate::host::{
    BusMessage, HostEvent, HostHandle, ToolCallSnapshot, ToolConfirmation, ToolConfirmationDetail,
    ToolPhase,
};

pub struct EventBusAdapter {
    host: HostHandle,
    broadcaster: Arc<Broadcaster>,
    arbiter: Arc<ConfirmationArbiter>,
}

impl EventBusAdapter {
    pub fn new(
        host: HostHandle,
        broadcaster: Arc<Broadcaster>,
        arbiter: Arc<ConfirmationArbiter>,
    ) -> Self {
        Self {
            host,
            broadcaster,
            arbiter,
        }
    }

    /// Spawns the subscription tasks. Aborting the handles is how the bridge
    /// unsubscribes on shutdown.
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        let events = self.host.subscribe_events();
        let bus = self.host.subscribe_bus();
        vec![
            tokio::spawn(run_event_stream(events, self.broadcaster.clone())),
            tokio::spawn(run_message_bus(bus, self.broadcaster, self.arbiter)),
        ]
    }
}

async fn run_event_stream(
    mut events: tokio::sync::broadcast::Receiver<HostEvent>,
    broadcaster: Arc<Broadcaster>,
) {
    loop {
        match events.recv().await {
            Ok(event) => broadcaster.broadcast(canonical_event(event)),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "host event stream lagged; skipped events are lost");
            }
            Err(RecvError::Closed) => {
                tracing::error!("host event stream closed; peers will receive no further events");
                break;
            }
        }
    }
}

async fn run_message_bus(
    mut bus: tokio::sync::broadcast::Receiver<BusMessage>,
    broadcaster: Arc<Broadcaster>,
    arbiter: Arc<ConfirmationArbiter>,
) {
    loop {
        match bus.recv().await {
            Ok(BusMessage::ToolConfirmationRequest(confirmation)) => {
                arbiter.track(&confirmation);
                broadcaster.broadcast(confirmation_event(&confirmation));
            }
            Ok(BusMessage::ToolCallsUpdate(calls)) => {
                for call in &calls {
                    if call.phase != ToolPhase::AwaitingApproval
                        && arbiter.discard(&call.tool_call_id)
                    {
                        tracing::debug!(
                            tool_call_id = %call.tool_call_id,
                            "pending confirmation resolved on the host side"
                        );
                    }
                    broadcaster.broadcast(tool_call_event(call));
                }
            }
            // Our own publications echo back through the bus.
            Ok(BusMessage::ToolConfirmationResponse { .. }) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "host message bus lagged; skipped messages are lost");
            }
            Err(RecvError::Closed) => {
                tracing::error!("host message bus closed; confirmations can no longer be tracked");
                break;
            }
        }
    }
}

/// Maps one host activity onto the canonical schema.
pub(crate) fn canonical_event(event: HostEvent) -> EventPayload {
    match event {
        HostEvent::Thought {
            subject,
            description,
        } => EventPayload::Thought {
            subject,
            description,
        },
        HostEvent::Content { text } => EventPayload::TextContent {
            text,
            is_stderr: None,
        },
        HostEvent::ToolCallRequest {
            tool_call_id,
            tool_name,
            input,
        } => {
            let mut update = ToolCallUpdate::new(tool_call_id, tool_name, ToolCallStatus::Pending);
            update.input_parameters = Some(input);
            EventPayload::ToolCall(update)
        }
        HostEvent::Output { chunk, is_stderr } => EventPayload::TextContent {
            text: String::from_utf8_lossy(&chunk).into_owned(),
            is_stderr: Some(is_stderr),
        },
        HostEvent::ConsoleLog { level, content } => EventPayload::ConsoleLog { level, content },
        HostEvent::HookStart { hook_name } => EventPayload::Hook {
            hook_name,
            phase: agent_bridge_schema::HookPhase::Start,
            success: None,
        },
        HostEvent::HookEnd { hook_name, success } => EventPayload::Hook {
            hook_name,
            phase: agent_bridge_schema::HookPhase::End,
            success: Some(success),
        },
    }
}

fn status_for_phase(phase: ToolPhase) -> ToolCallStatus {
    match phase {
        ToolPhase::AwaitingApproval => ToolCallStatus::Pending,
        ToolPhase::Executing => ToolCallStatus::Executing,
        ToolPhase::Success => ToolCallStatus::Succeeded,
        ToolPhase::Error => ToolCallStatus::Failed,
        ToolPhase::Cancelled => ToolCallStatus::Cancelled,
        // Phases without a wire counterpart surface as PENDING.
        ToolPhase::Validating | ToolPhase::Scheduled => ToolCallStatus::Pending,
    }
}

/// Maps one entry of a tool-calls update batch.
pub(crate) fn tool_call_event(call: &ToolCallSnapshot) -> EventPayload {
    let status = status_for_phase(call.phase);
    let mut update = ToolCallUpdate::new(call.tool_call_id.clone(), call.tool_name.clone(), status);
    update.live_content = call.live_output.clone();
    update.result = match status {
        ToolCallStatus::Succeeded => Some(ToolCallResult::output(
            call.display_result.clone().unwrap_or_else(|| "Success".to_string()),
        )),
        ToolCallStatus::Failed => Some(ToolCallResult::error(
            call.error_message
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string()),
        )),
        _ => None,
    };
    EventPayload::ToolCall(update)
}

/// Maps a host confirmation request onto a PENDING update carrying the
/// populated confirmation payload.
pub(crate) fn confirmation_event(confirmation: &ToolConfirmation) -> EventPayload {
    let mut update = ToolCallUpdate::new(
        confirmation.correlation_id.clone(),
        confirmation.tool_name.clone(),
        ToolCallStatus::Pending,
    );
    update.input_parameters = confirmation.input.clone();
    update.confirmation_request = Some(confirmation_request(confirmation));
    EventPayload::ToolCall(update)
}

pub(crate) fn confirmation_request(confirmation: &ToolConfirmation) -> ConfirmationRequest {
    let details = match &confirmation.detail {
        ToolConfirmationDetail::Exec { command } => ConfirmationDetails::Execute(ExecuteDetails {
            command: command.clone(),
        }),
        ToolConfirmationDetail::Edit {
            file_name,
            file_path,
            old_content,
            new_content,
            formatted_diff,
        } => ConfirmationDetails::FileEdit(FileEditDetails {
            file_name: file_name.clone(),
            file_path: file_path.clone(),
            old_content: old_content.clone(),
            new_content: new_content.clone(),
            formatted_diff: formatted_diff.clone(),
        }),
        ToolConfirmationDetail::Mcp {
            server_name,
            tool_name,
        } => ConfirmationDetails::Mcp(McpDetails {
            server_name: server_name.clone(),
            tool_name: tool_name.clone(),
        }),
        ToolConfirmationDetail::Other => ConfirmationDetails::Generic(GenericDetails {
            description: confirmation
                .title
                .clone()
                .unwrap_or_else(|| "Tool confirmation required".to_string()),
        }),
    };
    ConfirmationRequest::new(details)
}
