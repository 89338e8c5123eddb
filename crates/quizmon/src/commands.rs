//! One-shot admin commands for the command line.
//!
//! Each command issues a single request, words the outcome the same way the
//! dashboard panels do, and reports whether it succeeded.

use quizmon_api::{
    filter_bans, parse_stream_ids, AdminClient, AdminCommand, ApiResult, BackendClient,
    Notification,
};
use tracing::debug;

use crate::config::AppConfig;
use crate::error::AppResult;

/// Admin action requested on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    /// Comma-separated stream ids; empty means server defaults.
    Start { stream_ids: String },
    Next,
    Bans { search: Option<String> },
    Ban { author: String },
    /// `author` is only used for the message and defaults to the id.
    Unban { id: String, author: Option<String> },
}

/// Lines to print and the overall outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandReport {
    pub success: bool,
    pub lines: Vec<String>,
}

impl CommandReport {
    fn from_notification(notification: Option<Notification>, success: bool) -> Self {
        Self {
            success,
            lines: notification.map(|n| n.message).into_iter().collect(),
        }
    }
}

/// Run one admin action against the configured backend.
pub async fn run_command(config: &AppConfig, action: AdminAction) -> AppResult<CommandReport> {
    let backend = BackendClient::new(config.api_url.clone(), config.request_timeout())?;
    let admin = AdminClient::new(backend);
    debug!(?action, api_url = %config.api_url, "Running admin command");

    let report = match action {
        AdminAction::Start { stream_ids } => {
            let ids = parse_stream_ids(&stream_ids);
            let result = admin.start_quiz(&ids).await;
            report_outcome(AdminCommand::StartQuiz, result)
        }
        AdminAction::Next => {
            report_outcome(AdminCommand::NextQuestion, admin.next_question().await)
        }
        AdminAction::Bans { search } => {
            let result = admin.list_bans().await;
            let notification = AdminCommand::ListBans.outcome(&result);
            match result {
                Ok(users) => {
                    let matching = filter_bans(&users, search.as_deref().unwrap_or(""));
                    let mut lines = vec![format!(
                        "Banned users: {} (showing {})",
                        users.len(),
                        matching.len()
                    )];
                    lines.extend(matching.iter().map(|user| {
                        format!("{}\t{}\t{}", user.author, user.banned_at_display(), user.id)
                    }));
                    CommandReport {
                        success: true,
                        lines,
                    }
                }
                Err(_) => CommandReport::from_notification(notification, false),
            }
        }
        AdminAction::Ban { author } => {
            let result = admin.ban_user(&author).await;
            report_outcome(AdminCommand::Ban { author }, result)
        }
        AdminAction::Unban { id, author } => {
            let result = admin.unban_user(&id).await;
            let author = author.unwrap_or_else(|| id.clone());
            report_outcome(AdminCommand::Unban { author }, result)
        }
    };

    Ok(report)
}

fn report_outcome(command: AdminCommand, result: ApiResult<()>) -> CommandReport {
    let notification = command.outcome(&result);
    CommandReport::from_notification(notification, result.is_ok())
}
