//! quizmon-dashboard - Web dashboard for the quiz admin monitor.
//!
//! Serves the monitor's state to a browser:
//!
//! - REST API for the current snapshot and the operator actions
//! - WebSocket for periodic updates (1s interval by default)
//! - Static HTML dashboard UI
//! - Prometheus metrics at `/metrics`
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       quizmon process                        │
//! │                                                              │
//! │  ┌──────────────┐ ┌───────────────┐ ┌──────────────────────┐ │
//! │  │ EventMonitor │ │ HealthPoller  │ │    MetricsPoller     │ │
//! │  │ (event log,  │ │ (HealthState) │ │    (MetricsState)    │ │
//! │  │  tracker)    │ │               │ │                      │ │
//! │  └──────┬───────┘ └───────┬───────┘ └──────────┬───────────┘ │
//! │         └─────────────────┼────────────────────┘             │
//! │                           ▼                                  │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │     DashboardState (snapshots, admin actions)          │  │
//! │  └─────────────────────────┬──────────────────────────────┘  │
//! │                            │                                 │
//! │  ┌─────────────────────────┴──────────────────────────────┐  │
//! │  │        axum HTTP Server (port 8080)                    │  │
//! │  │  GET /             → Static HTML/JS                    │  │
//! │  │  GET /api/snapshot → JSON state                        │  │
//! │  │  POST /api/...     → operator actions                  │  │
//! │  │  GET /ws           → WebSocket upgrade                 │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use quizmon_dashboard::{bind, serve, DashboardConfig, DashboardState};
//!
//! let dashboard_state = DashboardState::new(
//!     monitor.log().clone(),
//!     monitor.tracker().clone(),
//!     health.clone(),
//!     metrics.clone(),
//!     admin.clone(),
//!     refresh.clone(),
//! );
//!
//! let config = DashboardConfig::default();
//! let listener = bind(&config).await?;
//! tokio::spawn(async move {
//!     if let Err(e) = serve(listener, dashboard_state, config, shutdown).await {
//!         tracing::error!(error = %e, "Dashboard server failed");
//!     }
//! });
//! ```

mod broadcast;
mod config;
mod modes;
mod server;
mod state;
mod types;

pub use config::DashboardConfig;
pub use modes::{BackendMode, ModeSettings, ModeUpdate, PushMessageType};
pub use server::{bind, serve};
pub use state::{ActionError, ActionOutcome, DashboardState};
pub use types::{
    BannedUserView, BansResponse, CommandResponse, DashboardMessage, DashboardSnapshot,
    EventView, HealthDetails, HealthView, ModesView, NotificationView, NotificationsView,
    StreamSnapshot,
};
