//! HTTP server implementation using axum.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use futures_util::stream::StreamExt;
use futures_util::SinkExt;
use quizmon_telemetry::Metrics;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

use crate::config::DashboardConfig;
use crate::modes::ModeUpdate;
use crate::state::{ActionError, ActionOutcome, DashboardState};
use crate::types::{
    BanRequest, BanSearch, CommandResponse, DashboardMessage, ModesView, StartQuizRequest,
    UnbanQuery,
};

/// Connection limiter to prevent too many concurrent WebSocket connections.
pub struct ConnectionLimiter {
    current: AtomicUsize,
    max: usize,
}

impl ConnectionLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max,
        }
    }

    /// Take a slot. The guard owns a handle to the limiter so it can move
    /// into the upgraded connection task.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ConnectionGuard> {
        loop {
            let current = self.current.load(Ordering::Acquire);
            if current >= self.max {
                return None;
            }
            if self
                .current
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(ConnectionGuard {
                    limiter: Arc::clone(self),
                });
            }
        }
    }

    pub fn current_count(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }
}

pub struct ConnectionGuard {
    limiter: Arc<ConnectionLimiter>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.limiter.current.fetch_sub(1, Ordering::Release);
    }
}

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    dashboard_state: DashboardState,
    broadcast_tx: broadcast::Sender<String>,
    connection_limiter: Arc<ConnectionLimiter>,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        dashboard_state: DashboardState,
        broadcast_tx: broadcast::Sender<String>,
        config: &DashboardConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            dashboard_state,
            broadcast_tx,
            connection_limiter: Arc::new(ConnectionLimiter::new(config.max_connections)),
            shutdown,
        }
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/events/clear", post(clear_events))
        .route("/api/refresh", post(refresh))
        .route("/api/quiz/start", post(start_quiz))
        .route("/api/quiz/next", post(next_question))
        .route("/api/bans", get(list_bans).post(ban_user))
        .route("/api/bans/{id}", delete(unban_user))
        .route("/api/modes", get(get_modes).post(update_modes))
        .route("/metrics", get(prometheus_metrics))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the index HTML page.
async fn serve_index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// Get current state snapshot as JSON.
async fn get_snapshot(State(state): State<AppState>) -> Json<crate::types::DashboardSnapshot> {
    Json(state.dashboard_state.collect_snapshot())
}

async fn clear_events(State(state): State<AppState>) -> Json<CommandResponse> {
    state.dashboard_state.clear_events();
    Json(CommandResponse {
        ok: true,
        notification: None,
    })
}

async fn refresh(State(state): State<AppState>) -> StatusCode {
    state.dashboard_state.refresh();
    StatusCode::ACCEPTED
}

async fn start_quiz(
    State(state): State<AppState>,
    Json(body): Json<StartQuizRequest>,
) -> Response {
    command_response(state.dashboard_state.start_quiz(&body.stream_ids).await)
}

async fn next_question(State(state): State<AppState>) -> Response {
    command_response(state.dashboard_state.next_question().await)
}

async fn list_bans(State(state): State<AppState>, Query(query): Query<BanSearch>) -> Response {
    let outcome = state.dashboard_state.list_bans(&query.search).await;
    match outcome.result {
        Ok(bans) => Json(bans).into_response(),
        Err(e) => (
            action_status(e),
            Json(CommandResponse {
                ok: false,
                notification: outcome.notification,
            }),
        )
            .into_response(),
    }
}

async fn ban_user(State(state): State<AppState>, Json(body): Json<BanRequest>) -> Response {
    command_response(state.dashboard_state.ban_user(&body.author).await)
}

async fn unban_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<UnbanQuery>,
) -> Response {
    let author = query.author.unwrap_or_else(|| id.clone());
    command_response(state.dashboard_state.unban_user(&id, &author).await)
}

async fn get_modes(State(state): State<AppState>) -> Json<ModesView> {
    Json(state.dashboard_state.modes().into())
}

#[derive(Serialize)]
struct ModesResponse {
    modes: ModesView,
    notification: Option<crate::types::NotificationView>,
}

async fn update_modes(
    State(state): State<AppState>,
    Json(update): Json<ModeUpdate>,
) -> Json<ModesResponse> {
    let (settings, notification) = state.dashboard_state.update_modes(&update);
    Json(ModesResponse {
        modes: settings.into(),
        notification,
    })
}

/// Prometheus text exposition.
async fn prometheus_metrics() -> Response {
    match Metrics::render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn action_status(e: ActionError) -> StatusCode {
    match e {
        ActionError::InvalidInput => StatusCode::BAD_REQUEST,
        ActionError::Backend => StatusCode::BAD_GATEWAY,
    }
}

fn command_response(outcome: ActionOutcome<()>) -> Response {
    let status = match outcome.result {
        Ok(()) => StatusCode::OK,
        Err(e) => action_status(e),
    };
    (
        status,
        Json(CommandResponse {
            ok: outcome.result.is_ok(),
            notification: outcome.notification,
        }),
    )
        .into_response()
}

/// WebSocket upgrade handler.
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let Some(guard) = state.connection_limiter.try_acquire() else {
        warn!(
            current = state.connection_limiter.current_count(),
            "WebSocket connection limit reached"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
    };

    info!(
        connections = state.connection_limiter.current_count(),
        "New WebSocket connection"
    );

    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, guard))
}

/// Handle a WebSocket connection.
async fn handle_ws_connection(socket: WebSocket, state: AppState, _guard: ConnectionGuard) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the snapshot so no update is lost in between.
    let mut broadcast_rx = state.broadcast_tx.subscribe();

    let initial_msg = DashboardMessage::Snapshot(state.dashboard_state.collect_snapshot());
    if let Ok(json) = serde_json::to_string(&initial_msg) {
        if sender.send(Message::Text(json.into())).await.is_err() {
            debug!("Failed to send initial snapshot, client disconnected");
            return;
        }
    }

    // Drain incoming frames; pongs are answered by axum.
    let mut incoming_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "WebSocket receive error");
                    break;
                }
                _ => {}
            }
        }
    });

    loop {
        tokio::select! {
            result = broadcast_rx.recv() => {
                match result {
                    Ok(msg) => {
                        if sender.send(Message::Text(msg.into())).await.is_err() {
                            debug!("Failed to send message, client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "WebSocket client lagged, catching up");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                }
            }
            _ = &mut incoming_task => {
                debug!("Incoming task completed, closing connection");
                break;
            }
            () = state.shutdown.cancelled() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    }

    incoming_task.abort();
    info!(
        connections = state.connection_limiter.current_count().saturating_sub(1),
        "WebSocket connection closed"
    );
}

/// Serve the dashboard on an already bound listener until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    dashboard_state: DashboardState,
    config: DashboardConfig,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Buffer for slow clients: 32 updates.
    let (broadcast_tx, _) = broadcast::channel::<String>(32);

    let state = AppState::new(
        dashboard_state.clone(),
        broadcast_tx.clone(),
        &config,
        shutdown.clone(),
    );
    let app = create_router(state);

    tokio::spawn(crate::broadcast::run_broadcaster(
        dashboard_state,
        broadcast_tx,
        config.update_interval_ms,
        shutdown.clone(),
    ));

    info!(addr = %listener.local_addr()?, "Dashboard server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Dashboard server stopped");
    Ok(())
}

/// Bind the configured dashboard port on all interfaces.
pub async fn bind(config: &DashboardConfig) -> std::io::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(port = config.port, "Starting dashboard server");
    TcpListener::bind(addr).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use quizmon_api::{AdminClient, BackendClient, HealthState, MetricsState, RefreshHandle};
    use quizmon_core::SharedEventLog;
    use quizmon_stream::ConnectionTracker;
    use std::time::Duration;
    use tower::ServiceExt;

    const EVENTS_URL: &str = "http://127.0.0.1:9/events";

    fn router() -> Router {
        let backend = BackendClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let dashboard_state = DashboardState::new(
            SharedEventLog::new(),
            ConnectionTracker::with_endpoint(EVENTS_URL),
            HealthState::new(),
            MetricsState::new(),
            AdminClient::new(backend),
            RefreshHandle::new(),
        );
        let (tx, _) = broadcast::channel(4);
        create_router(AppState::new(
            dashboard_state,
            tx,
            &DashboardConfig::default(),
            CancellationToken::new(),
        ))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_connection_limiter() {
        let limiter = Arc::new(ConnectionLimiter::new(1));
        let guard = limiter.try_acquire();
        assert!(guard.is_some());
        assert!(limiter.try_acquire().is_none());
        drop(guard);
        assert_eq!(limiter.current_count(), 0);
        assert!(limiter.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_index_served() {
        let response = router()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_snapshot_shape() {
        let response = router()
            .oneshot(Request::get("/api/snapshot").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["stream"]["state"], "connecting");
        assert_eq!(json["stream"]["capacity"], 50);
        assert_eq!(json["health"]["reachable"], false);
        assert!(json["metrics"]["sources"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_modes_update() {
        let response = router()
            .oneshot(json_request("POST", "/api/modes", r#"{"backend_mode":"REPLAY"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["modes"]["backend_mode"], "REPLAY");
        assert_eq!(
            json["notification"]["message"],
            "Backend mode set to REPLAY (restart server to apply)"
        );
    }

    #[tokio::test]
    async fn test_blank_ban_is_bad_request() {
        let response = router()
            .oneshot(json_request("POST", "/api/bans", r#"{"author":"  "}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["ok"], false);
        assert_eq!(json["notification"]["message"], "Username cannot be empty");
        assert_eq!(json["notification"]["kind"], "error");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_bad_gateway() {
        let response = router()
            .oneshot(json_request("POST", "/api/quiz/start", r#"{"streamIds":"a, b"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let json = body_json(response).await;
        assert_eq!(
            json["notification"]["message"],
            "Network error while starting quiz"
        );
    }

    #[tokio::test]
    async fn test_clear_and_metrics_routes() {
        let app = router();
        let response = app
            .clone()
            .oneshot(Request::post("/api/events/clear").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains(&format!(
            r#"quizmon_event_log_len{{endpoint="{EVENTS_URL}"}} 0"#
        )));
    }
}
