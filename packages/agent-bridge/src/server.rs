//! Lifecycle controller: binds the listener, wires the host subscriptions,
//! and tears everything down in order.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agent_bridge_error::BridgeError;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use crate::adapter::EventBusAdapter;
use crate::host::HostHandle;
use crate::registry::DEFAULT_QUEUE_CAPACITY;
use crate::router::{build_router, AppState};

/// How long `stop()` waits for open connections to drain before aborting.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Listen port on the loopback interface. `None` disables the server.
    pub port: Option<u16>,
    /// Capacity of each peer's outbound frame queue.
    pub queue_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl BridgeConfig {
    pub fn with_port(port: u16) -> Self {
        Self {
            port: Some(port),
            ..Self::default()
        }
    }
}

/// Starts the bridge, or returns `None` when no port is configured. Bind
/// failures propagate so the host can decide whether to exit.
pub async fn start(
    host: HostHandle,
    config: BridgeConfig,
) -> Result<Option<BridgeHandle>, BridgeError> {
    let Some(port) = config.port else {
        tracing::info!("bridge server disabled: no port configured");
        return Ok(None);
    };

    let requested = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(requested)
        .await
        .map_err(|source| BridgeError::Bind {
            addr: requested.to_string(),
            source,
        })?;
    let addr = listener.local_addr().map_err(|source| BridgeError::Bind {
        addr: requested.to_string(),
        source,
    })?;

    let state = Arc::new(AppState::new(host.clone(), &config, addr));
    let router = build_router(state.clone());

    let adapter = EventBusAdapter::new(
        host.clone(),
        state.broadcaster().clone(),
        state.arbiter().clone(),
    );
    let adapter_tasks = adapter.spawn();

    let shutdown = Arc::new(Notify::new());
    let signal = shutdown.clone();
    let server_task = tokio::spawn(async move {
        let serve = axum::serve(listener, router)
            .with_graceful_shutdown(async move { signal.notified().await });
        if let Err(err) = serve.await {
            tracing::error!(error = %err, "bridge server terminated unexpectedly");
        }
    });

    tracing::info!(%addr, session_id = host.session_id(), "bridge server listening");
    Ok(Some(BridgeHandle {
        addr,
        state,
        shutdown,
        adapter_tasks: Mutex::new(adapter_tasks),
        server_task: Mutex::new(Some(server_task)),
        stopped: AtomicBool::new(false),
    }))
}

/// Running bridge instance. `stop()` is idempotent.
pub struct BridgeHandle {
    addr: SocketAddr,
    state: Arc<AppState>,
    shutdown: Arc<Notify>,
    adapter_tasks: Mutex<Vec<JoinHandle<()>>>,
    server_task: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl BridgeHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn session_id(&self) -> &str {
        self.state.host().session_id()
    }

    /// Number of currently registered peers.
    pub fn peer_count(&self) -> usize {
        self.state.registry().len()
    }

    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("stopping bridge server");

        // Stop accepting new connections.
        self.shutdown.notify_one();

        // Unsubscribe from the host streams; awaiting the aborted tasks
        // guarantees the subscriptions are gone when stop() returns.
        for task in self.adapter_tasks.lock().await.drain(..) {
            task.abort();
            let _ = task.await;
        }

        let dropped = self.state.arbiter().clear();
        if dropped > 0 {
            tracing::debug!(dropped, "cancelled pending confirmations");
        }

        // Close every peer queue; write workers flush what is queued and end.
        self.state.registry().close_all();

        if let Some(server) = self.server_task.lock().await.take() {
            let abort = server.abort_handle();
            if tokio::time::timeout(SHUTDOWN_GRACE, server).await.is_err() {
                tracing::warn!("connections did not drain in time; aborting server task");
                abort.abort();
            }
        }
    }
}
