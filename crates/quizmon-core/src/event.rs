//! Live feed event type.
//!
//! A `StreamEvent` is decoded from one server-pushed payload. It is immutable
//! once created; the event log owns retained instances.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::format::{format_timestamp, short_id};

/// Category tag used by the backend for answer submissions.
pub const ANSWER_TYPE: &str = "ANSWER";

/// One decoded unit from the live event feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEvent {
    /// Opaque identifier. Unique within the retained window, not across reconnects.
    pub id: String,
    /// Category tag (e.g., "ANSWER"). Display-only.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Originator name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Single-token answer payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// ISO-8601 receive timestamp as sent by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<String>,
}

impl StreamEvent {
    /// Decode a stream payload.
    ///
    /// Unknown fields are ignored; missing `id` or `type` is an error.
    pub fn decode(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Whether this is an answer submission (styled differently in the feed).
    pub fn is_answer(&self) -> bool {
        self.event_type == ANSWER_TYPE
    }

    /// Truncated id for display.
    pub fn short_id(&self) -> String {
        short_id(&self.id)
    }

    /// Local receive time, or "N/A" when absent or unparseable.
    pub fn received_at_display(&self) -> String {
        format_timestamp(self.received_at.as_deref())
    }
}
