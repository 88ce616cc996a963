//! Persists notifications and delivers them to live connections, locally and
//! on other instances through redis pub/sub.

use std::sync::Arc;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::hub::ConnectionHub;
use super::messages::{msg_types, ServerMessage};
use super::repository::{insert_notification, NewNotification};
use crate::db::RedisHandle;
use crate::errors::AppError;
use crate::models::notification::NotificationRow;

pub const FANOUT_CHANNEL: &str = "jobwatch:notifications";

/// What travels over the redis channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FanoutEnvelope {
    pub origin: Uuid,
    pub user_id: Uuid,
    pub message: ServerMessage,
}

/// Decodes a fan-out payload, returning `None` for malformed payloads and
/// for messages this instance published itself.
pub fn decode_fanout(payload: &str, instance_id: Uuid) -> Option<FanoutEnvelope> {
    match serde_json::from_str::<FanoutEnvelope>(payload) {
        Ok(envelope) if envelope.origin == instance_id => None,
        Ok(envelope) => Some(envelope),
        Err(e) => {
            warn!("Ignoring malformed fan-out payload: {e}");
            None
        }
    }
}

#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
    hub: Arc<ConnectionHub>,
    redis: RedisHandle,
    instance_id: Uuid,
}

impl NotificationService {
    pub fn new(db: PgPool, hub: Arc<ConnectionHub>, redis: RedisHandle) -> Self {
        Self {
            db,
            hub,
            redis,
            instance_id: Uuid::new_v4(),
        }
    }

    pub fn hub(&self) -> &Arc<ConnectionHub> {
        &self.hub
    }

    /// Stores a notification and pushes it to the user's connections.
    pub async fn notify(&self, new: NewNotification) -> Result<NotificationRow, AppError> {
        let row = insert_notification(&self.db, &new).await?;
        self.push(row.user_id, ServerMessage::new(msg_types::NOTIFICATION, &row))
            .await;
        Ok(row)
    }

    /// Delivers a transient message (not stored) to the user everywhere.
    pub async fn push(&self, user_id: Uuid, message: ServerMessage) {
        let delivered = self.hub.send_to_user(user_id, message.clone()).await;
        debug!(
            "Pushed {} to {delivered} local connection(s) of user {user_id}",
            message.msg_type
        );

        let envelope = FanoutEnvelope {
            origin: self.instance_id,
            user_id,
            message,
        };
        if let Err(e) = self.publish(&envelope).await {
            warn!("Fan-out publish failed for user {user_id}: {e}");
        }
    }

    async fn publish(&self, envelope: &FanoutEnvelope) -> Result<(), AppError> {
        let payload = serde_json::to_string(envelope).map_err(anyhow::Error::from)?;
        let mut conn = self.redis.connection().await?;
        redis::cmd("PUBLISH")
            .arg(FANOUT_CHANNEL)
            .arg(payload)
            .query_async::<_, i64>(&mut conn)
            .await?;
        Ok(())
    }

    /// Subscribes to the fan-out channel and relays messages published by other
    /// instances to local connections. Reconnects after failures.
    pub async fn run_fanout_listener(self) {
        loop {
            match self.listen_once().await {
                Ok(()) => warn!("Fan-out subscription ended; reconnecting"),
                Err(e) => warn!("Fan-out subscription failed: {e}; retrying in 5s"),
            }
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        }
    }

    async fn listen_once(&self) -> Result<(), AppError> {
        let mut pubsub = self.redis.client().get_async_pubsub().await?;
        pubsub.subscribe(FANOUT_CHANNEL).await?;
        info!("Subscribed to {FANOUT_CHANNEL}");

        let mut stream = pubsub.on_message();
        while let Some(msg) = stream.next().await {
            let payload: String = match msg.get_payload() {
                Ok(p) => p,
                Err(e) => {
                    warn!("Unreadable fan-out message: {e}");
                    continue;
                }
            };
            if let Some(envelope) = decode_fanout(&payload, self.instance_id) {
                self.hub
                    .send_to_user(envelope.user_id, envelope.message)
                    .await;
            }
        }
        Ok(())
    }
}
