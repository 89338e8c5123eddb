//! Backend health snapshot.

use serde::{Deserialize, Serialize};

use crate::format::format_uptime;

/// Point-in-time backend health, replaced wholesale on every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    /// Free-form status string. Only the exact value "ok" is healthy.
    pub status: String,
    /// Connected WebSocket clients on the backend.
    #[serde(default)]
    pub ws_clients: u64,
    /// Database connectivity.
    #[serde(default)]
    pub mongo: bool,
    /// Process uptime in seconds.
    #[serde(default)]
    pub uptime: f64,
}

impl HealthSnapshot {
    /// Case-sensitive: "OK" is not ok.
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    pub fn status_label(&self) -> String {
        self.status.to_uppercase()
    }

    pub fn mongo_label(&self) -> &'static str {
        if self.mongo {
            "CONNECTED"
        } else {
            "DISCONNECTED"
        }
    }

    pub fn uptime_label(&self) -> String {
        format_uptime(self.uptime)
    }
}
