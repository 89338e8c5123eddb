//! Operator-side mode preferences.
//!
//! These mirror the backend's environment settings for display only. Changing
//! them here has no effect on the backend until its `.env` is edited and the
//! server restarted, which every change notification says.

use serde::{Deserialize, Serialize};

/// Backend processing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackendMode {
    #[default]
    MessagesOnly,
    FullProcessing,
    Replay,
}

impl BackendMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessagesOnly => "MESSAGES_ONLY",
            Self::FullProcessing => "FULL_PROCESSING",
            Self::Replay => "REPLAY",
        }
    }
}

/// Message type pushed to stream clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PushMessageType {
    #[default]
    Answer,
    Raw,
}

impl PushMessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Answer => "ANSWER",
            Self::Raw => "RAW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ModeSettings {
    pub dummy_mode: bool,
    pub backend_mode: BackendMode,
    pub push_message_type: PushMessageType,
}

/// Partial update from the dashboard. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModeUpdate {
    #[serde(default)]
    pub dummy_mode: Option<bool>,
    #[serde(default)]
    pub backend_mode: Option<BackendMode>,
    #[serde(default)]
    pub push_message_type: Option<PushMessageType>,
}

impl ModeSettings {
    /// Apply an update and return one message per field it set.
    pub fn apply(&mut self, update: &ModeUpdate) -> Vec<String> {
        let mut messages = Vec::new();

        if let Some(enabled) = update.dummy_mode {
            self.dummy_mode = enabled;
            let state = if enabled { "enabled" } else { "disabled" };
            messages.push(format!("Dummy mode {state} (restart server to apply)"));
        }
        if let Some(mode) = update.backend_mode {
            self.backend_mode = mode;
            messages.push(format!(
                "Backend mode set to {} (restart server to apply)",
                mode.as_str()
            ));
        }
        if let Some(kind) = update.push_message_type {
            self.push_message_type = kind;
            messages.push(format!(
                "Message type set to {} (restart server to apply)",
                kind.as_str()
            ));
        }

        messages
    }

    /// `.env` lines matching the current settings.
    pub fn env_lines(&self) -> Vec<String> {
        vec![
            format!("DUMMY_MODE={}", self.dummy_mode),
            format!("BACKEND_MODE={}", self.backend_mode.as_str()),
            format!("PUSH_MESSAGE_TYPE={}", self.push_message_type.as_str()),
        ]
    }
}
