//! Agent-card descriptor served at `/.well-known/agent-card.json`.

use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "0.3.0";

const SESSION_EXTENSION_URI: &str = "urn:agent-bridge:shared-session:v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: AgentCapabilities,
    #[serde(rename = "defaultInputModes")]
    pub default_input_modes: Vec<String>,
    #[serde(rename = "defaultOutputModes")]
    pub default_output_modes: Vec<String>,
    pub skills: Vec<AgentSkill>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCapabilities {
    pub streaming: bool,
    pub extensions: Vec<AgentExtension>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentExtension {
    pub uri: String,
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(rename = "inputModes")]
    pub input_modes: Vec<String>,
    #[serde(rename = "outputModes")]
    pub output_modes: Vec<String>,
}

impl AgentCard {
    /// The descriptor for a bridge listening at `url`.
    pub fn bridged_session(url: impl Into<String>) -> Self {
        let text = vec!["text".to_string()];
        Self {
            name: "Agent Bridge".to_string(),
            description: "Live terminal agent session shared over local transports".to_string(),
            url: url.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: AgentCapabilities {
                streaming: true,
                extensions: vec![AgentExtension {
                    uri: SESSION_EXTENSION_URI.to_string(),
                    description: "All peers share the host's single live session".to_string(),
                    required: true,
                }],
            },
            default_input_modes: text.clone(),
            default_output_modes: text.clone(),
            skills: vec![AgentSkill {
                id: "shared-session".to_string(),
                name: "Shared session".to_string(),
                description: "Observe the live session and inject prompts or tool approvals"
                    .to_string(),
                tags: vec!["session".to_string(), "streaming".to_string()],
                input_modes: text.clone(),
                output_modes: text,
            }],
        }
    }
}
