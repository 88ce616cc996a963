//! WebSocket message envelopes.
//!
//! Every frame is `{"type": ..., "payload": ...}`; payloads are feature-specific JSON.

use serde::{Deserialize, Serialize};

/// Server -> Client message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub payload: serde_json::Value,
}

impl ServerMessage {
    pub fn new(msg_type: impl Into<String>, payload: impl Serialize) -> Self {
        Self {
            msg_type: msg_type.into(),
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn empty(msg_type: impl Into<String>) -> Self {
        Self {
            msg_type: msg_type.into(),
            payload: serde_json::Value::Null,
        }
    }
}

/// Client -> Server message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Payloads owned by the socket layer itself.
pub mod system {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    /// Sent immediately after the upgrade completes.
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct Connected {
        pub connection_id: Uuid,
        pub server_version: String,
        pub unread_count: i64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct Error {
        pub code: String,
        pub message: String,
    }

    impl Error {
        pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
            Self {
                code: code.into(),
                message: message.into(),
            }
        }
    }

    /// Client request to mark one notification read.
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct MarkRead {
        pub notification_id: Uuid,
    }

    /// Broadcast to a user's connections after a notification is read.
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct NotificationRead {
        pub notification_id: Option<Uuid>,
        pub all: bool,
    }
}

pub mod msg_types {
    pub const CONNECTED: &str = "connected";
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
    pub const ERROR: &str = "error";
    pub const MARK_READ: &str = "mark_read";
    pub const NOTIFICATION: &str = "notification";
    pub const NOTIFICATION_READ: &str = "notification.read";
    pub const APPLICATION_UPDATED: &str = "application.updated";
}

/// Values of the stored `notifications.kind` column.
pub mod kinds {
    pub const JOB_ALERT: &str = "job_alert";
}
