//! Quiz admin monitor - Entry Point
//!
//! `quizmon monitor` (the default) follows the live event feed, polls backend
//! health and metrics, and serves the dashboard. The remaining subcommands
//! issue a single admin command and exit.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use quizmon::{AdminAction, AppConfig, Application, ConfigSource};
use tracing::{info, warn};

/// Quiz admin monitor
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via QUIZMON_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow the event stream and serve the dashboard (default)
    Monitor,
    /// Start the quiz
    Start {
        /// Comma-separated stream ids; server defaults when omitted
        stream_ids: Option<String>,
    },
    /// Advance to the next question
    Next,
    /// List banned users
    Bans {
        /// Case-insensitive author filter
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Ban a user
    Ban { author: String },
    /// Unban a user by ban id
    Unban {
        id: String,
        /// Author name shown in the result message
        #[arg(long)]
        author: Option<String>,
    },
}

impl Command {
    fn into_action(self) -> Option<AdminAction> {
        match self {
            Command::Monitor => None,
            Command::Start { stream_ids } => Some(AdminAction::Start {
                stream_ids: stream_ids.unwrap_or_default(),
            }),
            Command::Next => Some(AdminAction::Next),
            Command::Bans { search } => Some(AdminAction::Bans { search }),
            Command::Ban { author } => Some(AdminAction::Ban { author }),
            Command::Unban { id, author } => Some(AdminAction::Unban { id, author }),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Parse command line arguments
    let args = Args::parse();

    // Determine config path: CLI arg > QUIZMON_CONFIG env var > default
    let config_path = AppConfig::resolve_path(args.config);
    let (config, source) = AppConfig::load(&config_path)?;

    // Initialize logging
    quizmon_telemetry::init_logging(&config.telemetry.log_level)?;

    info!("Starting quizmon v{}", env!("CARGO_PKG_VERSION"));
    match source {
        ConfigSource::File => info!(config_path = %config_path, "Configuration loaded"),
        ConfigSource::Defaults => {
            warn!(path = %config_path, "Config file not found, using defaults")
        }
    }

    match args.command.and_then(Command::into_action) {
        None => {
            let mut app = Application::new(config)?;
            app.run().await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(action) => {
            let report = quizmon::run_command(&config, action).await?;
            for line in &report.lines {
                println!("{line}");
            }
            Ok(if report.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
