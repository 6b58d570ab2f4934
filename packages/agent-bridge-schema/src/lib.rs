//! Wire schema for the bridge protocol.
//!
//! Every type here maps one-to-one onto the JSON a peer sees. Field names are
//! part of the contract and are pinned with serde renames; do not "fix" the
//! mixed casing (`taskId` next to `tool_call_id`), it mirrors the protocol.

mod card;
mod codec;
mod confirmation;
mod event;

pub use card::{AgentCapabilities, AgentCard, AgentExtension, AgentSkill, PROTOCOL_VERSION};
pub use codec::{
    encode_socket_frame, encode_sse_frame, inbound_from_value, parse_inbound, InboundFrame,
    JsonRpcEnvelope, METHOD_MESSAGE_STREAM, SOCKET_FRAME_TERMINATOR,
};
pub use confirmation::{
    standard_options, ConfirmationDetails, ConfirmationOption, ConfirmationRequest,
    ExecuteDetails, FileEditDetails, GenericDetails, McpDetails, DATA_KIND_TOOL_CALL_CONFIRMATION,
    OPTION_CANCEL, OPTION_PROCEED_ONCE,
};
pub use event::{
    BridgeEvent, ConsoleLevel, EventPayload, HookPhase, ResultError, ResultOutput, ToolCallResult,
    ToolCallStatus, ToolCallUpdate,
};
