//! Mock quiz backend for integration tests.
//!
//! Serves the endpoints the monitor talks to:
//! - `GET /events` SSE feed driven by [`MockBackend::send_event`]
//! - `GET /health` and `GET /metrics`, switchable to 503
//! - `/admin/*` quiz control and ban list

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use futures_util::stream::{self, Stream};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot, Mutex};

#[derive(Default)]
struct Inner {
    healthy: AtomicBool,
    metrics_available: AtomicBool,
    health_hits: AtomicU32,
    metrics_hits: AtomicU32,
    next_calls: AtomicU32,
    metrics: Mutex<HashMap<String, Value>>,
    start_requests: Mutex<Vec<Value>>,
    bans: Mutex<Vec<Value>>,
    ban_seq: AtomicU32,
}

#[derive(Clone)]
struct MockState {
    inner: Arc<Inner>,
    events: broadcast::Sender<String>,
}

/// A mock backend bound to an ephemeral local port.
pub struct MockBackend {
    addr: SocketAddr,
    state: MockState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockBackend {
    /// Start a healthy backend with two metric sources and one ban.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (events, _) = broadcast::channel(64);

        let inner = Inner::default();
        inner.healthy.store(true, Ordering::SeqCst);
        inner.metrics_available.store(true, Ordering::SeqCst);
        {
            let mut metrics = inner.metrics.lock().await;
            metrics.insert(
                "s1".to_string(),
                json!({"received": 100, "deduped": 5, "persisted": 85, "rejected": 10}),
            );
            metrics.insert(
                "s2".to_string(),
                json!({"received": 50, "deduped": 5, "persisted": 40, "rejected": 5}),
            );
        }
        inner.bans.lock().await.push(json!({
            "_id": "ban-0",
            "author": "Spammer",
            "bannedAt": "2024-01-28T10:00:00Z"
        }));
        inner.ban_seq.store(1, Ordering::SeqCst);

        let state = MockState {
            inner: Arc::new(inner),
            events,
        };
        let app = Router::new()
            .route("/events", get(events_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/admin/start", post(start_handler))
            .route("/admin/next", post(next_handler))
            .route("/admin/bans", get(list_bans_handler).post(ban_handler))
            .route("/admin/bans/{id}", delete(unban_handler))
            .with_state(state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL of the backend.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Push one `data:` frame to every open `/events` subscriber.
    pub fn send_event(&self, data: impl Into<String>) {
        let _ = self.state.events.send(data.into());
    }

    /// Number of open `/events` subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.state.events.receiver_count()
    }

    /// Wait until at least `count` clients are subscribed to `/events`.
    pub async fn wait_for_subscribers(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.subscriber_count() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("timed out waiting for event subscribers");
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.state.inner.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn set_metrics_available(&self, available: bool) {
        self.state
            .inner
            .metrics_available
            .store(available, Ordering::SeqCst);
    }

    pub fn health_hits(&self) -> u32 {
        self.state.inner.health_hits.load(Ordering::SeqCst)
    }

    pub fn metrics_hits(&self) -> u32 {
        self.state.inner.metrics_hits.load(Ordering::SeqCst)
    }

    pub fn next_calls(&self) -> u32 {
        self.state.inner.next_calls.load(Ordering::SeqCst)
    }

    /// Bodies received on `POST /admin/start`.
    pub async fn start_requests(&self) -> Vec<Value> {
        self.state.inner.start_requests.lock().await.clone()
    }

    /// Insert a ban record with a chosen id.
    pub async fn add_ban(&self, id: &str, author: &str) {
        self.state.inner.bans.lock().await.push(json!({
            "_id": id,
            "author": author,
            "bannedAt": "2024-01-28T11:00:00Z"
        }));
    }

    /// Authors currently banned.
    pub async fn banned_authors(&self) -> Vec<String> {
        self.state
            .inner
            .bans
            .lock()
            .await
            .iter()
            .filter_map(|b| b["author"].as_str().map(str::to_string))
            .collect()
    }

    /// Shutdown the server.
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn events_handler(
    State(state): State<MockState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();
    let frames = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(data) => return Some((Ok(Event::default().data(data)), rx)),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });
    Sse::new(frames).keep_alive(KeepAlive::new().interval(Duration::from_millis(200)))
}

async fn health_handler(State(state): State<MockState>) -> Response {
    state.inner.health_hits.fetch_add(1, Ordering::SeqCst);
    if !state.inner.healthy.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    Json(json!({"status": "ok", "wsClients": 3, "mongo": true, "uptime": 3725}))
        .into_response()
}

async fn metrics_handler(State(state): State<MockState>) -> Response {
    state.inner.metrics_hits.fetch_add(1, Ordering::SeqCst);
    if !state.inner.metrics_available.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let metrics = state.inner.metrics.lock().await.clone();
    Json(metrics).into_response()
}

async fn start_handler(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    state.inner.start_requests.lock().await.push(body);
    Json(json!({"success": true})).into_response()
}

async fn next_handler(State(state): State<MockState>) -> Response {
    state.inner.next_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({"success": true})).into_response()
}

async fn list_bans_handler(State(state): State<MockState>) -> Response {
    let bans = state.inner.bans.lock().await.clone();
    Json(bans).into_response()
}

async fn ban_handler(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    let Some(author) = body["author"].as_str().map(str::to_string) else {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "author is required"})))
            .into_response();
    };

    let mut bans = state.inner.bans.lock().await;
    if bans.iter().any(|b| b["author"] == author.as_str()) {
        return (
            StatusCode::CONFLICT,
            Json(json!({"error": "User is already banned"})),
        )
            .into_response();
    }

    let seq = state.inner.ban_seq.fetch_add(1, Ordering::SeqCst);
    bans.push(json!({
        "_id": format!("ban-{seq}"),
        "author": author,
        "bannedAt": "2024-01-28T12:00:00Z"
    }));
    Json(json!({"success": true})).into_response()
}

async fn unban_handler(State(state): State<MockState>, Path(id): Path<String>) -> Response {
    let mut bans = state.inner.bans.lock().await;
    let before = bans.len();
    bans.retain(|b| b["_id"] != id.as_str());
    if bans.len() == before {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "Ban not found"}))).into_response();
    }
    Json(json!({"success": true})).into_response()
}
