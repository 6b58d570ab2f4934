//! Live peer set with bounded per-peer outbound queues.
//!
//! Each peer owns a fixed-capacity FIFO of serialized frames. The producer
//! side never blocks: a full queue evicts its oldest frame and marks the peer
//! lossy, which is what keeps a stalled reader from ever slowing the session.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    FramedSocket,
    Sse,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::FramedSocket => "framed-socket",
            TransportKind::Sse => "sse",
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    frames: VecDeque<Bytes>,
    closed: bool,
    lossy: bool,
    dropped: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PushOutcome {
    Enqueued,
    /// The oldest frame was evicted to make room.
    Evicted {
        first_loss: bool,
    },
    Closed,
}

/// Bounded single-consumer frame FIFO. Producers run synchronously and never
/// hold the lock across a suspension point.
#[derive(Debug)]
pub struct FrameQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    capacity: usize,
}

impl FrameQueue {
    fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            capacity: capacity.max(1),
        }
    }

    fn push(&self, frame: Bytes) -> PushOutcome {
        let outcome = {
            let mut state = self.state.lock();
            if state.closed {
                return PushOutcome::Closed;
            }
            let outcome = if state.frames.len() >= self.capacity {
                state.frames.pop_front();
                state.dropped += 1;
                let first_loss = !state.lossy;
                state.lossy = true;
                PushOutcome::Evicted { first_loss }
            } else {
                PushOutcome::Enqueued
            };
            state.frames.push_back(frame);
            outcome
        };
        self.notify.notify_one();
        outcome
    }

    /// Awaits the next frame; `None` once the queue is closed and drained.
    pub async fn pop(&self) -> Option<Bytes> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock();
                if let Some(frame) = state.frames.pop_front() {
                    return Some(frame);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    fn close(&self) {
        self.state.lock().closed = true;
        self.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        self.state.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_lossy(&self) -> bool {
        self.state.lock().lossy
    }

    pub fn dropped(&self) -> u64 {
        self.state.lock().dropped
    }
}

/// One connected client on either transport.
#[derive(Debug)]
pub struct Peer {
    id: u64,
    kind: TransportKind,
    queue: FrameQueue,
    last_error: Mutex<Option<String>>,
}

impl Peer {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Enqueues one outbound frame, evicting the oldest on overflow.
    pub fn enqueue(&self, frame: Bytes) {
        match self.queue.push(frame) {
            PushOutcome::Enqueued | PushOutcome::Closed => {}
            PushOutcome::Evicted { first_loss } => {
                if first_loss {
                    tracing::debug!(
                        peer_id = self.id,
                        transport = self.kind.as_str(),
                        "peer queue full; dropping oldest frames"
                    );
                }
            }
        }
    }

    /// Next frame for this peer's write worker; `None` once closed.
    pub async fn next_frame(&self) -> Option<Bytes> {
        self.queue.pop().await
    }

    pub fn close(&self) {
        self.queue.close();
    }

    pub fn is_lossy(&self) -> bool {
        self.queue.is_lossy()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn dropped_frames(&self) -> u64 {
        self.queue.dropped()
    }

    /// Records the transport error that ended this peer.
    pub fn record_error(&self, error: impl Into<String>) {
        *self.last_error.lock() = Some(error.into());
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}

/// Registry of live peers. Broadcast iterates over a snapshot, so a peer
/// unregistering mid-broadcast only stops receiving at its closed queue.
#[derive(Debug)]
pub struct PeerRegistry {
    peers: RwLock<HashMap<u64, Arc<Peer>>>,
    next_peer_id: AtomicU64,
    queue_capacity: usize,
}

impl PeerRegistry {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
            next_peer_id: AtomicU64::new(0),
            queue_capacity,
        }
    }

    /// Admits a peer whose transport is confirmed open.
    pub fn register(&self, kind: TransportKind) -> Arc<Peer> {
        self.register_with_capacity(kind, self.queue_capacity)
    }

    pub fn register_with_capacity(&self, kind: TransportKind, capacity: usize) -> Arc<Peer> {
        let id = self.next_peer_id.fetch_add(1, Ordering::Relaxed) + 1;
        let peer = Arc::new(Peer {
            id,
            kind,
            queue: FrameQueue::new(capacity),
            last_error: Mutex::new(None),
        });
        self.peers.write().insert(id, peer.clone());
        tracing::debug!(peer_id = id, transport = kind.as_str(), "peer registered");
        peer
    }

    /// Removes and closes a peer. Idempotent; a removed peer receives no
    /// further events.
    pub fn unregister(&self, peer_id: u64) {
        let removed = self.peers.write().remove(&peer_id);
        if let Some(peer) = removed {
            peer.close();
            tracing::debug!(
                peer_id,
                transport = peer.kind().as_str(),
                dropped_frames = peer.dropped_frames(),
                last_error = ?peer.last_error(),
                "peer unregistered"
            );
        }
    }

    /// Copies the live set for lock-free iteration.
    pub fn snapshot(&self) -> Vec<Arc<Peer>> {
        self.peers.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closes and removes every peer; used on shutdown.
    pub fn close_all(&self) {
        let drained: Vec<Arc<Peer>> = self.peers.write().drain().map(|(_, peer)| peer).collect();
        for peer in &drained {
            peer.close();
        }
        if !drained.is_empty() {
            tracing::debug!(peers = drained.len(), "closed all peers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(text: &str) -> Bytes {
        Bytes::copy_from_slice(text.as_bytes())
    }

    #[tokio::test]
    async fn queue_delivers_in_fifo_order() {
        let registry = PeerRegistry::new(8);
        let peer = registry.register(TransportKind::FramedSocket);
        peer.enqueue(frame("a"));
        peer.enqueue(frame("b"));
        assert_eq!(peer.next_frame().await.unwrap(), frame("a"));
        assert_eq!(peer.next_frame().await.unwrap(), frame("b"));
    }

    #[tokio::test]
    async fn full_queue_drops_oldest_and_marks_lossy() {
        let registry = PeerRegistry::new(2);
        let peer = registry.register(TransportKind::Sse);
        peer.enqueue(frame("a"));
        peer.enqueue(frame("b"));
        assert!(!peer.is_lossy());
        peer.enqueue(frame("c"));
        assert!(peer.is_lossy());
        assert_eq!(peer.dropped_frames(), 1);
        assert_eq!(peer.next_frame().await.unwrap(), frame("b"));
        assert_eq!(peer.next_frame().await.unwrap(), frame("c"));
    }

    #[tokio::test]
    async fn closed_queue_drains_then_ends() {
        let registry = PeerRegistry::new(8);
        let peer = registry.register(TransportKind::FramedSocket);
        peer.enqueue(frame("last"));
        registry.unregister(peer.id());
        assert_eq!(peer.next_frame().await.unwrap(), frame("last"));
        assert!(peer.next_frame().await.is_none());
        // enqueue after close is discarded
        peer.enqueue(frame("late"));
        assert!(peer.next_frame().await.is_none());
    }

    #[tokio::test]
    async fn pop_wakes_on_push_from_another_task() {
        let registry = Arc::new(PeerRegistry::new(8));
        let peer = registry.register(TransportKind::FramedSocket);
        let reader = {
            let peer = peer.clone();
            tokio::spawn(async move { peer.next_frame().await })
        };
        tokio::task::yield_now().await;
        peer.enqueue(frame("wake"));
        assert_eq!(reader.await.unwrap().unwrap(), frame("wake"));
    }

    #[tokio::test]
    async fn unregister_during_snapshot_iteration_is_safe() {
        let registry = PeerRegistry::new(8);
        let first = registry.register(TransportKind::Sse);
        let second = registry.register(TransportKind::Sse);
        let snapshot = registry.snapshot();
        registry.unregister(first.id());
        for peer in snapshot {
            peer.enqueue(frame("x"));
        }
        // the unregistered peer's queue was closed before the enqueue landed
        assert!(first.next_frame().await.is_none());
        assert_eq!(second.next_frame().await.unwrap(), frame("x"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn last_error_is_recorded_for_diagnostics() {
        let registry = PeerRegistry::new(8);
        let peer = registry.register(TransportKind::FramedSocket);
        assert!(peer.last_error().is_none());
        peer.record_error("connection reset");
        assert_eq!(peer.last_error().as_deref(), Some("connection reset"));
        registry.unregister(peer.id());
    }

    #[tokio::test]
    async fn peer_ids_are_unique() {
        let registry = PeerRegistry::new(8);
        let a = registry.register(TransportKind::Sse);
        let b = registry.register(TransportKind::FramedSocket);
        assert_ne!(a.id(), b.id());
    }
}
