// Shared live-server harness for bridge integration tests. Pulled into each
// test file with include!.

use std::time::Duration;

use agent_bridge::host::HostHandle;
use agent_bridge::server::{self, BridgeConfig, BridgeHandle};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

const WAIT: Duration = Duration::from_secs(5);

struct TestBridge {
    host: HostHandle,
    input_rx: mpsc::UnboundedReceiver<String>,
    handle: BridgeHandle,
}

async fn start_bridge(session_id: &str) -> TestBridge {
    let (host, input_rx) = HostHandle::new(session_id, Some(0));
    let config = BridgeConfig {
        port: Some(0),
        queue_capacity: 1024,
    };
    let handle = server::start(host.clone(), config)
        .await
        .expect("start bridge")
        .expect("port configured");
    TestBridge {
        host,
        input_rx,
        handle,
    }
}

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect_ws(handle: &BridgeHandle) -> WsClient {
    let url = format!("ws://{}/ws", handle.addr());
    let (client, _response) = connect_async(url).await.expect("websocket connect");
    client
}

async fn wait_for_peers(handle: &BridgeHandle, expected: usize) {
    timeout(WAIT, async {
        while handle.peer_count() < expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("peers did not register in time");
}

/// Reads the next event frame from a framed-socket client, asserting the
/// record terminator, and returns the decoded JSON.
async fn next_socket_event(client: &mut WsClient) -> Value {
    loop {
        let message = timeout(WAIT, client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("socket closed")
            .expect("socket errored");
        match message {
            WsMessage::Binary(frame) => {
                assert_eq!(frame.last(), Some(&0u8), "frame missing null terminator");
                return serde_json::from_slice(&frame[..frame.len() - 1]).expect("frame is JSON");
            }
            WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
            other => panic!("unexpected websocket message: {other:?}"),
        }
    }
}

fn prompt_frame(text: &str) -> String {
    json!({
        "jsonrpc": "2.0",
        "method": "message/stream",
        "params": { "message": { "content": { "text": text } } },
    })
    .to_string()
}

fn confirmation_frame(tool_call_id: &str, option_id: &str) -> String {
    json!({
        "jsonrpc": "2.0",
        "method": "message/stream",
        "params": { "message": { "content": { "data": {
            "kind": "TOOL_CALL_CONFIRMATION",
            "tool_call_id": tool_call_id,
            "selected_option_id": option_id,
        } } } },
    })
    .to_string()
}

async fn expect_injected_input(input_rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    timeout(WAIT, input_rx.recv())
        .await
        .expect("timed out waiting for injected input")
        .expect("input channel closed")
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
