//! Scripted mock host for driving the bridge without a real agent.
//!
//! Prompts echo back through the event stream the way terminal input would;
//! the prompt `run` exercises the full tool-confirmation cycle so any A2A
//! client can be tested end to end against the binary.

use agent_bridge_schema::ConsoleLevel;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use crate::host::{
    BusMessage, HostEvent, HostHandle, ToolCallSnapshot, ToolConfirmation, ToolConfirmationDetail,
    ToolPhase,
};

const EVENT_DELAY: Duration = Duration::from_millis(50);
const MOCK_COMMAND: &str = "echo hello from the mock tool";

/// Spawns the mock host loop and returns its handle for the bridge.
pub fn spawn_mock_host(session_id: &str, port: u16) -> (HostHandle, JoinHandle<()>) {
    let (host, mut input_rx) = HostHandle::new(session_id, Some(port));
    let handle = host.clone();
    let task = tokio::spawn(async move {
        let mut bus = host.subscribe_bus();
        let mut next_call = 0u64;
        host.emit(HostEvent::ConsoleLog {
            level: ConsoleLevel::Info,
            content: "mock host ready".to_string(),
        });
        loop {
            tokio::select! {
                prompt = input_rx.recv() => {
                    let Some(prompt) = prompt else { break };
                    handle_prompt(&host, &mut next_call, prompt).await;
                }
                message = bus.recv() => {
                    match message {
                        Ok(BusMessage::ToolConfirmationResponse { correlation_id, confirmed }) => {
                            advance_tool_call(&host, &correlation_id, confirmed).await;
                        }
                        // Our own request/update publications echo back here.
                        Ok(_) => {}
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        }
    });
    (handle, task)
}

async fn handle_prompt(host: &HostHandle, next_call: &mut u64, prompt: String) {
    // Terminal-style echo so every peer observes the injected input.
    host.emit(HostEvent::Content {
        text: prompt.clone(),
    });
    sleep(EVENT_DELAY).await;

    if prompt.trim() == "run" {
        *next_call += 1;
        let call_id = format!("mock-call-{next_call}");
        host.emit(HostEvent::Thought {
            subject: "Tool use".to_string(),
            description: "The mock tool needs approval before it runs".to_string(),
        });
        let confirmation = ToolConfirmation {
            correlation_id: call_id,
            tool_name: "run_shell".to_string(),
            title: Some("Run shell command".to_string()),
            input: Some(json!({ "command": MOCK_COMMAND })),
            detail: ToolConfirmationDetail::Exec {
                command: MOCK_COMMAND.to_string(),
            },
        };
        if let Err(err) = host.publish(BusMessage::ToolConfirmationRequest(confirmation)) {
            tracing::debug!(error = %err, "mock host could not publish confirmation request");
        }
    } else {
        host.emit(HostEvent::Thought {
            subject: "Echo".to_string(),
            description: "Replying with the prompt".to_string(),
        });
        sleep(EVENT_DELAY).await;
        host.emit(HostEvent::Content {
            text: format!("mock: {prompt}"),
        });
    }
}

async fn advance_tool_call(host: &HostHandle, call_id: &str, confirmed: bool) {
    if !confirmed {
        let cancelled = ToolCallSnapshot::new(call_id, "run_shell", ToolPhase::Cancelled);
        if let Err(err) = host.publish(BusMessage::ToolCallsUpdate(vec![cancelled])) {
            tracing::debug!(error = %err, "mock host could not publish cancellation");
        }
        return;
    }

    let mut executing = ToolCallSnapshot::new(call_id, "run_shell", ToolPhase::Executing);
    executing.live_output = Some("hello from the mock tool\n".to_string());
    if let Err(err) = host.publish(BusMessage::ToolCallsUpdate(vec![executing])) {
        tracing::debug!(error = %err, "mock host could not publish execution update");
    }
    sleep(EVENT_DELAY).await;

    let mut done = ToolCallSnapshot::new(call_id, "run_shell", ToolPhase::Success);
    done.display_result = Some("hello from the mock tool".to_string());
    if let Err(err) = host.publish(BusMessage::ToolCallsUpdate(vec![done])) {
        tracing::debug!(error = %err, "mock host could not publish completion");
    }
}
