//! Canonical session events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::confirmation::ConfirmationRequest;

/// One event as delivered to peers. `task_id` carries the session identifier
/// of the live session; the payload is tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeEvent {
    #[serde(rename = "taskId")]
    pub task_id: String,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl BridgeEvent {
    pub fn new(task_id: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            task_id: task_id.into(),
            payload,
        }
    }
}

/// Tagged event payload. Internal dispatch is exhaustive on this enum; the
/// textual tag values are the wire contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EventPayload {
    #[serde(rename = "THOUGHT")]
    Thought { subject: String, description: String },

    #[serde(rename = "TEXT_CONTENT")]
    TextContent {
        text: String,
        #[serde(rename = "isStderr", skip_serializing_if = "Option::is_none")]
        is_stderr: Option<bool>,
    },

    #[serde(rename = "TOOL_CALL_UPDATE")]
    ToolCall(ToolCallUpdate),

    #[serde(rename = "CONSOLE_LOG")]
    ConsoleLog {
        #[serde(rename = "type")]
        level: ConsoleLevel,
        content: String,
    },

    #[serde(rename = "HOOK")]
    Hook {
        #[serde(rename = "hookName")]
        hook_name: String,
        phase: HookPhase,
        #[serde(skip_serializing_if = "Option::is_none")]
        success: Option<bool>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallUpdate {
    pub tool_call_id: String,
    pub tool_name: String,
    pub status: ToolCallStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_parameters: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ToolCallResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_request: Option<ConfirmationRequest>,
}

impl ToolCallUpdate {
    pub fn new(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        status: ToolCallStatus,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            status,
            input_parameters: None,
            live_content: None,
            result: None,
            confirmation_request: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolCallStatus {
    Pending,
    Executing,
    Succeeded,
    Failed,
    Cancelled,
}

/// Terminal outcome of a tool call; exactly one of `output` / `error` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<ResultOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResultError>,
}

impl ToolCallResult {
    pub fn output(text: impl Into<String>) -> Self {
        Self {
            output: Some(ResultOutput { text: text.into() }),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            output: None,
            error: Some(ResultError {
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultOutput {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultError {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Info,
    Warn,
    Error,
    Debug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookPhase {
    Start,
    End,
}
