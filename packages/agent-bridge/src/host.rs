//! Host contract: the narrow surface the bridge consumes from its embedding
//! host, modeled as a passed-in handle so the core runs against a fake host
//! in tests.
//!
//! The handle bundles the host's event stream, its message bus, the
//! input-injection hook, the immutable session identifier, and the configured
//! port. The core depends on nothing else from the host.

use std::sync::Arc;

use agent_bridge_error::BridgeError;
use agent_bridge_schema::ConsoleLevel;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};

/// Capacity of the host event stream; matches the per-session broadcast
/// channel size the fan-out expects to drain promptly.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Capacity of the message bus. Bus traffic is sparse (confirmations and
/// batched tool updates).
const BUS_CHANNEL_CAPACITY: usize = 64;

/// One activity on the host's event stream.
#[derive(Debug, Clone)]
pub enum HostEvent {
    Thought {
        subject: String,
        description: String,
    },
    Content {
        text: String,
    },
    ToolCallRequest {
        tool_call_id: String,
        tool_name: String,
        input: Value,
    },
    /// Raw process output. Chunks may be arbitrary bytes.
    Output {
        chunk: Vec<u8>,
        is_stderr: bool,
    },
    ConsoleLog {
        level: ConsoleLevel,
        content: String,
    },
    HookStart {
        hook_name: String,
    },
    HookEnd {
        hook_name: String,
        success: bool,
    },
}

/// Execution phase of a tool call as the host's executor reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolPhase {
    Validating,
    Scheduled,
    AwaitingApproval,
    Executing,
    Success,
    Error,
    Cancelled,
}

/// One entry of a `ToolCallsUpdate` batch.
#[derive(Debug, Clone)]
pub struct ToolCallSnapshot {
    pub tool_call_id: String,
    pub tool_name: String,
    pub phase: ToolPhase,
    /// Live shell output, when the tool streams any.
    pub live_output: Option<String>,
    /// Display form of a successful result.
    pub display_result: Option<String>,
    pub error_message: Option<String>,
}

impl ToolCallSnapshot {
    pub fn new(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        phase: ToolPhase,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            phase,
            live_output: None,
            display_result: None,
            error_message: None,
        }
    }
}

/// A tool-confirmation request as the host's executor raises it. The
/// correlation id equals the tool call id on the wire.
#[derive(Debug, Clone)]
pub struct ToolConfirmation {
    pub correlation_id: String,
    pub tool_name: String,
    pub title: Option<String>,
    pub input: Option<Value>,
    pub detail: ToolConfirmationDetail,
}

#[derive(Debug, Clone)]
pub enum ToolConfirmationDetail {
    Exec {
        command: String,
    },
    Edit {
        file_name: String,
        file_path: String,
        old_content: String,
        new_content: String,
        formatted_diff: String,
    },
    Mcp {
        server_name: String,
        tool_name: String,
    },
    /// Anything the mapping does not recognize.
    Other,
}

/// Message bus topics the bridge participates in.
#[derive(Debug, Clone)]
pub enum BusMessage {
    ToolConfirmationRequest(ToolConfirmation),
    ToolCallsUpdate(Vec<ToolCallSnapshot>),
    ToolConfirmationResponse {
        correlation_id: String,
        confirmed: bool,
    },
}

/// Cloneable handle to the host. Created once by the host (or a test
/// harness) at startup; the session identifier is immutable for the process
/// lifetime.
#[derive(Clone)]
pub struct HostHandle {
    session_id: Arc<str>,
    port: Option<u16>,
    events: broadcast::Sender<HostEvent>,
    bus: broadcast::Sender<BusMessage>,
    input: mpsc::UnboundedSender<String>,
}

impl HostHandle {
    /// Builds the handle plus the receiving end of the input-injection hook,
    /// which the host drains as if the text were typed at the terminal.
    pub fn new(
        session_id: impl Into<String>,
        port: Option<u16>,
    ) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (bus, _) = broadcast::channel(BUS_CHANNEL_CAPACITY);
        let (input, input_rx) = mpsc::unbounded_channel();
        let session_id: String = session_id.into();
        (
            Self {
                session_id: session_id.into(),
                port,
                events,
                bus,
                input,
            },
            input_rx,
        )
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Emits one event on the host stream. Lack of subscribers is normal
    /// (e.g. before the bridge starts) and not an error.
    pub fn emit(&self, event: HostEvent) {
        let _ = self.events.send(event);
    }

    /// Publishes on the message bus.
    pub fn publish(&self, message: BusMessage) -> Result<(), BridgeError> {
        self.bus
            .send(message)
            .map(|_| ())
            .map_err(|_| BridgeError::internal("host message bus has no subscribers"))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_bus(&self) -> broadcast::Receiver<BusMessage> {
        self.bus.subscribe()
    }

    /// Hands peer-originated text to the host's input queue.
    pub fn inject_input(&self, text: String) -> Result<(), BridgeError> {
        self.input.send(text).map_err(|_| BridgeError::InputClosed)
    }

    /// Number of live subscriptions on the host event stream.
    pub fn event_subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}
