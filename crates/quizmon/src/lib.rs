//! Quiz admin monitor.
//!
//! Main application that wires the components together:
//! - Live event feed over SSE (bounded log, connection state)
//! - Health and metrics polling
//! - Admin commands (quiz control, user bans)
//! - Web dashboard

pub mod app;
pub mod commands;
pub mod config;
pub mod error;

pub use app::Application;
pub use commands::{run_command, AdminAction, CommandReport};
pub use config::{AppConfig, ConfigSource};
pub use error::{AppError, AppResult};
