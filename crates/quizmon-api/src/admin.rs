//! Admin commands: quiz control and user bans.
//!
//! Commands are fire-and-forget. There is no retry and no queued resend; the
//! outcome is turned into a single notification for the operator.

use quizmon_core::format::format_datetime;
use quizmon_telemetry::Metrics;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::client::{ensure_success, BackendClient};
use crate::error::{ApiError, ApiResult};
use crate::notify::Notification;

/// A banned author as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannedUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub author: String,
    #[serde(rename = "bannedAt", default, skip_serializing_if = "Option::is_none")]
    pub banned_at: Option<String>,
}

impl BannedUser {
    /// Local ban time, or "N/A".
    pub fn banned_at_display(&self) -> String {
        format_datetime(self.banned_at.as_deref())
    }
}

/// Split a comma-separated stream id list. Blank entries are dropped; an
/// empty result asks the server to use its defaults.
pub fn parse_stream_ids(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Case-insensitive substring match on author.
pub fn filter_bans<'a>(users: &'a [BannedUser], term: &str) -> Vec<&'a BannedUser> {
    let term = term.to_lowercase();
    users
        .iter()
        .filter(|u| u.author.to_lowercase().contains(&term))
        .collect()
}

/// Client for the backend's `/admin` routes.
#[derive(Debug, Clone)]
pub struct AdminClient {
    backend: BackendClient,
}

impl AdminClient {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }

    /// `POST /admin/start` with `{"streamIds": [...]}`.
    pub async fn start_quiz(&self, stream_ids: &[String]) -> ApiResult<()> {
        info!(?stream_ids, "Starting quiz");
        let response = self
            .backend
            .http()
            .post(self.backend.url("/admin/start"))
            .json(&json!({ "streamIds": stream_ids }))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    /// `POST /admin/next`.
    pub async fn next_question(&self) -> ApiResult<()> {
        info!("Advancing to next question");
        let response = self
            .backend
            .http()
            .post(self.backend.url("/admin/next"))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    /// `GET /admin/bans`.
    pub async fn list_bans(&self) -> ApiResult<Vec<BannedUser>> {
        let response = self
            .backend
            .http()
            .get(self.backend.url("/admin/bans"))
            .send()
            .await?;
        let users = ensure_success(response).await?.json().await?;
        Ok(users)
    }

    /// `POST /admin/bans` with the trimmed author. Blank names are rejected
    /// without a request.
    pub async fn ban_user(&self, author: &str) -> ApiResult<()> {
        let author = author.trim();
        if author.is_empty() {
            return Err(ApiError::InvalidInput("Username cannot be empty".to_string()));
        }

        info!(author, "Banning user");
        let response = self
            .backend
            .http()
            .post(self.backend.url("/admin/bans"))
            .json(&json!({ "author": author }))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    /// `DELETE /admin/bans/{id}`.
    pub async fn unban_user(&self, id: &str) -> ApiResult<()> {
        info!(id, "Unbanning user");
        let response = self
            .backend
            .http()
            .delete(self.backend.segment_url("/admin/bans", id)?)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

/// An operator action, used to word its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    StartQuiz,
    NextQuestion,
    ListBans,
    Ban { author: String },
    Unban { author: String },
}

impl AdminCommand {
    /// Metric label.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartQuiz => "start_quiz",
            Self::NextQuestion => "next_question",
            Self::ListBans => "list_bans",
            Self::Ban { .. } => "ban_user",
            Self::Unban { .. } => "unban_user",
        }
    }

    fn success_message(&self) -> Option<String> {
        match self {
            Self::StartQuiz => Some("Quiz started successfully!".to_string()),
            Self::NextQuestion => Some("Moving to next question!".to_string()),
            Self::ListBans => None,
            Self::Ban { author } => Some(format!("Banned user: {author}")),
            Self::Unban { author } => Some(format!("Unbanned user: {author}")),
        }
    }

    fn rejected_message(&self) -> &'static str {
        match self {
            Self::StartQuiz => "Failed to start quiz",
            Self::NextQuestion => "Failed to advance to next question",
            Self::ListBans => "Failed to fetch banned users",
            Self::Ban { .. } => "Failed to ban user",
            Self::Unban { .. } => "Failed to unban user",
        }
    }

    fn network_message(&self) -> &'static str {
        match self {
            Self::StartQuiz => "Network error while starting quiz",
            Self::NextQuestion => "Network error while advancing quiz",
            Self::ListBans => "Failed to fetch banned users",
            Self::Ban { .. } => "Network error while banning user",
            Self::Unban { .. } => "Network error while unbanning user",
        }
    }

    /// Word the outcome of this command and record it.
    ///
    /// A successful ban list fetch is silent and yields `None`.
    pub fn outcome<T>(&self, result: &ApiResult<T>) -> Option<Notification> {
        Metrics::admin_command(self.name(), result.is_ok());

        match result {
            Ok(_) => self.success_message().map(Notification::success),
            Err(ApiError::InvalidInput(message)) => Some(Notification::error(message.clone())),
            Err(ApiError::Status { status, message }) => {
                warn!(command = self.name(), status, "Admin command rejected");
                let text = match (self, message) {
                    (Self::Ban { .. }, Some(message)) => message.clone(),
                    _ => self.rejected_message().to_string(),
                };
                Some(Notification::error(text))
            }
            Err(e) => {
                error!(command = self.name(), error = %e, "Admin command failed");
                Some(Notification::error(self.network_message()))
            }
        }
    }
}
