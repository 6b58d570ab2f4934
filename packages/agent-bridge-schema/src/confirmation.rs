//! Tool-confirmation payloads.

use serde::{Deserialize, Serialize};

/// The sole affirmative option id. Every other id, known or not, counts as a
/// refusal.
pub const OPTION_PROCEED_ONCE: &str = "proceed_once";
pub const OPTION_CANCEL: &str = "cancel";

/// Value of `content.data.kind` marking an inbound confirmation response.
pub const DATA_KIND_TOOL_CALL_CONFIRMATION: &str = "TOOL_CALL_CONFIRMATION";

/// Confirmation request attached to a PENDING tool-call update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub details: ConfirmationDetails,
    pub options: Vec<ConfirmationOption>,
}

impl ConfirmationRequest {
    pub fn new(details: ConfirmationDetails) -> Self {
        Self {
            details,
            options: standard_options(),
        }
    }
}

/// What the peer is being asked to approve. Serializes as a single-key object
/// (`execute_details`, `file_edit_details`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConfirmationDetails {
    #[serde(rename = "execute_details")]
    Execute(ExecuteDetails),
    #[serde(rename = "file_edit_details")]
    FileEdit(FileEditDetails),
    #[serde(rename = "mcp_details")]
    Mcp(McpDetails),
    #[serde(rename = "generic_details")]
    Generic(GenericDetails),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteDetails {
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEditDetails {
    pub file_name: String,
    pub file_path: String,
    pub old_content: String,
    pub new_content: String,
    pub formatted_diff: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpDetails {
    pub server_name: String,
    pub tool_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericDetails {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationOption {
    pub id: String,
    pub name: String,
}

/// The fixed two-element option set offered with every confirmation.
pub fn standard_options() -> Vec<ConfirmationOption> {
    vec![
        ConfirmationOption {
            id: OPTION_PROCEED_ONCE.to_string(),
            name: "Allow Once".to_string(),
        },
        ConfirmationOption {
            id: OPTION_CANCEL.to_string(),
            name: "Cancel".to_string(),
        },
    ]
}
