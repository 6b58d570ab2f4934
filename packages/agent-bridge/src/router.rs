//! HTTP surface of the bridge.
//!
//! One session per process: `POST /tasks` returns the live session id, the
//! stream endpoints attach an SSE peer, and `/ws` upgrades to the
//! framed-socket transport. Everything else is a JSON 404.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use agent_bridge_error::{BridgeError, ErrorBody};
use agent_bridge_schema::{inbound_from_value, AgentCard};
use axum::body::Bytes;
use axum::extract::{Path, Request, State};
use axum::http::{Method, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use serde::Serialize;
use serde_json::Value;
use tower_http::trace::TraceLayer;

use crate::arbiter::{ConfirmationArbiter, ResponseSource};
use crate::fanout::Broadcaster;
use crate::host::HostHandle;
use crate::input::InputRouter;
use crate::registry::{Peer, PeerRegistry, TransportKind};
use crate::server::BridgeConfig;
use crate::transport;

/// Upper bound for request bodies read by the fallback dispatcher.
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError::Bridge(err) = self;
        if let BridgeError::TaskNotFound { task_id } = &err {
            tracing::debug!(task_id = %task_id, "rejecting request for unknown task");
        }
        let status =
            StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorBody::from(&err))).into_response()
    }
}

/// Shared state behind every handler.
pub struct AppState {
    host: HostHandle,
    registry: Arc<PeerRegistry>,
    broadcaster: Arc<Broadcaster>,
    arbiter: Arc<ConfirmationArbiter>,
    input_router: InputRouter,
    card_url: String,
}

impl AppState {
    /// Wires the core around a host handle. `advertised_addr` is the bound
    /// listen address, used verbatim in the agent card.
    pub fn new(host: HostHandle, config: &BridgeConfig, advertised_addr: SocketAddr) -> Self {
        let registry = Arc::new(PeerRegistry::new(config.queue_capacity));
        let broadcaster = Arc::new(Broadcaster::new(host.session_id(), registry.clone()));
        let arbiter = Arc::new(ConfirmationArbiter::new(host.clone()));
        let input_router = InputRouter::new(host.clone(), arbiter.clone());
        Self {
            host,
            registry,
            broadcaster,
            arbiter,
            input_router,
            card_url: format!("http://{advertised_addr}/"),
        }
    }

    pub fn host(&self) -> &HostHandle {
        &self.host
    }

    pub fn registry(&self) -> &Arc<PeerRegistry> {
        &self.registry
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    pub fn arbiter(&self) -> &Arc<ConfirmationArbiter> {
        &self.arbiter
    }

    pub fn input_router(&self) -> &InputRouter {
        &self.input_router
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/.well-known/agent-card.json", get(get_agent_card))
        .route("/tasks", post(create_task))
        .route("/tasks/:task_id/messages/stream", post(post_task_stream))
        .route("/tasks/:task_id/messages", post(post_task_stream_alias))
        .route("/v1/tasks/:task_id/messages", post(post_task_stream_alias))
        .route("/", post(post_root_stream))
        .route("/ws", get(transport::ws_handler))
        .fallback(fallback)
        .with_state(state);

    let http_logging = match std::env::var("AGENT_BRIDGE_LOG_HTTP") {
        Ok(value) if value == "0" || value.eq_ignore_ascii_case("false") => false,
        _ => true,
    };
    if http_logging {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|req: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http.request",
                    method = %req.method(),
                    uri = %req.uri()
                )
            })
            .on_response(
                |res: &Response, latency: Duration, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        status = %res.status(),
                        latency_ms = latency.as_millis()
                    );
                },
            );
        router = router.layer(trace_layer);
    }

    router
}

#[derive(Debug, Serialize)]
struct TaskCreated {
    id: String,
}

/// Returns the agent-card descriptor.
async fn get_agent_card(State(state): State<Arc<AppState>>) -> Json<AgentCard> {
    Json(AgentCard::bridged_session(state.card_url.clone()))
}

/// "Creates" a task: there is exactly one session per process, so this hands
/// back its identifier.
async fn create_task(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::CREATED,
        Json(TaskCreated {
            id: state.host.session_id().to_string(),
        }),
    )
}

/// Streams the session to the caller after routing its message; the task id
/// must match the live session.
async fn post_task_stream(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
    body: Bytes,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if task_id != state.host.session_id() {
        return Err(BridgeError::TaskNotFound { task_id }.into());
    }
    open_message_stream(&state, &body)
}

/// Alias form: accepts any task id and uses the current session.
async fn post_task_stream_alias(
    State(state): State<Arc<AppState>>,
    Path(_task_id): Path<String>,
    body: Bytes,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    open_message_stream(&state, &body)
}

async fn post_root_stream(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    open_message_stream(&state, &body)
}

/// Parses the body, routes it as an inbound peer message, and attaches a new
/// SSE peer that stays registered until the client disconnects.
fn open_message_stream(
    state: &Arc<AppState>,
    body: &[u8],
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let payload: Value = serde_json::from_slice(body).map_err(|_| BridgeError::InvalidJson)?;
    state
        .input_router
        .route(inbound_from_value(payload), ResponseSource::Sse);
    let peer = state.registry.register(TransportKind::Sse);
    Ok(Sse::new(sse_event_stream(state.registry.clone(), peer)))
}

/// Unregisters the peer when the response stream is dropped.
struct PeerGuard {
    registry: Arc<PeerRegistry>,
    peer_id: u64,
}

impl Drop for PeerGuard {
    fn drop(&mut self) {
        self.registry.unregister(self.peer_id);
    }
}

fn sse_event_stream(
    registry: Arc<PeerRegistry>,
    peer: Arc<Peer>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let guard = PeerGuard {
        registry,
        peer_id: peer.id(),
    };
    futures::stream::unfold((peer, guard), |(peer, guard)| async move {
        let frame = peer.next_frame().await?;
        let data = String::from_utf8_lossy(&frame).into_owned();
        Some((Ok(Event::default().data(data)), (peer, guard)))
    })
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not Found" })),
    )
        .into_response()
}

/// Route table tail: dispatches the colon-style stream alias (the axum route
/// grammar cannot express a literal `:` segment) and serves the JSON 404.
async fn fallback(State(state): State<Arc<AppState>>, req: Request) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    if method == Method::POST && path == "/v1/message:stream" {
        let body = match axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!(error = %err, "failed to read stream body");
                return ApiError::from(BridgeError::InvalidJson).into_response();
            }
        };
        return match open_message_stream(&state, &body) {
            Ok(sse) => sse.into_response(),
            Err(err) => err.into_response(),
        };
    }
    not_found()
}
