// Fan-out invariants at the component level: slow-peer isolation and
// per-source ordering.

use std::sync::Arc;

use agent_bridge::fanout::Broadcaster;
use agent_bridge::registry::{PeerRegistry, TransportKind};
use agent_bridge_schema::EventPayload;
use serde_json::Value;

fn text(index: usize, source: &str) -> EventPayload {
    EventPayload::TextContent {
        text: format!("{source}:{index}"),
        is_stderr: None,
    }
}

fn decode(frame: &[u8]) -> Value {
    serde_json::from_slice(&frame[..frame.len() - 1]).expect("frame json")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_peer_never_stalls_fast_peers() {
    const TOTAL: usize = 5000;
    const SLOW_CAPACITY: usize = 64;

    let registry = Arc::new(PeerRegistry::new(1024));
    let fast = registry.register_with_capacity(TransportKind::FramedSocket, TOTAL);
    let slow = registry.register_with_capacity(TransportKind::FramedSocket, SLOW_CAPACITY);
    let broadcaster = Broadcaster::new("sess", registry.clone());

    // The slow peer never reads; broadcasting stays non-blocking throughout.
    for index in 0..TOTAL {
        broadcaster.broadcast(text(index, "s"));
    }

    // The fast peer drains everything, in order.
    registry.unregister(fast.id());
    let mut received = 0usize;
    while let Some(frame) = fast.next_frame().await {
        assert_eq!(decode(&frame)["text"], format!("s:{received}"));
        received += 1;
    }
    assert_eq!(received, TOTAL);

    // The slow peer kept only the newest frames and is flagged lossy.
    assert!(slow.is_lossy());
    assert_eq!(slow.queued(), SLOW_CAPACITY);
    assert_eq!(slow.dropped_frames() as usize, TOTAL - SLOW_CAPACITY);
    registry.unregister(slow.id());
    let first_kept = slow.next_frame().await.expect("slow peer kept frames");
    assert_eq!(
        decode(&first_kept)["text"],
        format!("s:{}", TOTAL - SLOW_CAPACITY)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn per_source_fifo_holds_under_concurrent_sources() {
    const PER_SOURCE: usize = 500;

    let registry = Arc::new(PeerRegistry::new(4 * PER_SOURCE));
    let peer = registry.register(TransportKind::FramedSocket);
    let broadcaster = Arc::new(Broadcaster::new("sess", registry.clone()));

    let mut producers = Vec::new();
    for source in ["alpha", "beta"] {
        let broadcaster = broadcaster.clone();
        producers.push(tokio::spawn(async move {
            for index in 0..PER_SOURCE {
                broadcaster.broadcast(text(index, source));
                if index % 64 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        }));
    }
    for producer in producers {
        producer.await.expect("producer task");
    }

    // No total order across sources is promised, but each source's events
    // must arrive in emission order.
    registry.unregister(peer.id());
    let mut next_alpha = 0usize;
    let mut next_beta = 0usize;
    while let Some(frame) = peer.next_frame().await {
        let value = decode(&frame);
        let tagged = value["text"].as_str().expect("text");
        let (source, index) = tagged.split_once(':').expect("tagged text");
        let index: usize = index.parse().expect("index");
        match source {
            "alpha" => {
                assert_eq!(index, next_alpha);
                next_alpha += 1;
            }
            "beta" => {
                assert_eq!(index, next_beta);
                next_beta += 1;
            }
            other => panic!("unknown source {other}"),
        }
    }
    assert_eq!(next_alpha, PER_SOURCE);
    assert_eq!(next_beta, PER_SOURCE);
}
