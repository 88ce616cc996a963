//! In-process registry of live WebSocket connections, keyed by user.

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use super::messages::ServerMessage;

/// Outgoing buffer per connection. A connection that falls this far behind
/// loses messages instead of stalling the sender.
const CONNECTION_BUFFER: usize = 64;

/// Tracks every active connection as user_id -> connection_id -> sender.
pub struct ConnectionHub {
    connections: RwLock<HashMap<Uuid, HashMap<Uuid, mpsc::Sender<ServerMessage>>>>,
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a connection and returns its id plus the receiver the socket
    /// task forwards from.
    pub async fn register(&self, user_id: Uuid) -> (Uuid, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(CONNECTION_BUFFER);
        let connection_id = Uuid::new_v4();
        let mut conns = self.connections.write().await;
        conns.entry(user_id).or_default().insert(connection_id, tx);
        debug!("Registered connection {connection_id} for user {user_id}");
        (connection_id, rx)
    }

    /// Removes a connection and drops the user's map once empty.
    pub async fn unregister(&self, user_id: Uuid, connection_id: Uuid) {
        let mut conns = self.connections.write().await;
        if let Some(user_conns) = conns.get_mut(&user_id) {
            user_conns.remove(&connection_id);
            if user_conns.is_empty() {
                conns.remove(&user_id);
            }
        }
    }

    /// Sends to every connection of `user_id`. Returns how many accepted the
    /// message. Closed connections are pruned.
    pub async fn send_to_user(&self, user_id: Uuid, message: ServerMessage) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();
        {
            let conns = self.connections.read().await;
            let Some(user_conns) = conns.get(&user_id) else {
                return 0;
            };
            for (connection_id, sender) in user_conns {
                match sender.try_send(message.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(
                            "Connection {connection_id} for user {user_id} is lagging; dropping {}",
                            message.msg_type
                        );
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*connection_id),
                }
            }
        }

        for connection_id in closed {
            self.unregister(user_id, connection_id).await;
        }
        delivered
    }

    /// Sends to one specific connection.
    pub async fn send_to_connection(
        &self,
        user_id: Uuid,
        connection_id: Uuid,
        message: ServerMessage,
    ) -> bool {
        let conns = self.connections.read().await;
        conns
            .get(&user_id)
            .and_then(|user_conns| user_conns.get(&connection_id))
            .map(|sender| sender.try_send(message).is_ok())
            .unwrap_or(false)
    }

}

#[cfg(test)]
impl ConnectionHub {
    pub async fn connection_count(&self, user_id: Uuid) -> usize {
        let conns = self.connections.read().await;
        conns.get(&user_id).map(|c| c.len()).unwrap_or(0)
    }

    pub async fn total_connections(&self) -> usize {
        let conns = self.connections.read().await;
        conns.values().map(|c| c.len()).sum()
    }

    pub async fn is_connected(&self, user_id: Uuid) -> bool {
        let conns = self.connections.read().await;
        conns.contains_key(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::messages::msg_types;

    #[tokio::test]
    async fn test_register_and_send() {
        let hub = ConnectionHub::new();
        let user = Uuid::new_v4();
        let (_, mut rx1) = hub.register(user).await;
        let (_, mut rx2) = hub.register(user).await;

        let delivered = hub
            .send_to_user(user, ServerMessage::empty(msg_types::NOTIFICATION))
            .await;
        assert_eq!(delivered, 2);
        assert_eq!(rx1.recv().await.unwrap().msg_type, msg_types::NOTIFICATION);
        assert_eq!(rx2.recv().await.unwrap().msg_type, msg_types::NOTIFICATION);
    }

    #[tokio::test]
    async fn test_send_to_unknown_user_is_noop() {
        let hub = ConnectionHub::new();
        let delivered = hub
            .send_to_user(Uuid::new_v4(), ServerMessage::empty(msg_types::PONG))
            .await;
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_closed_connections_are_pruned() {
        let hub = ConnectionHub::new();
        let user = Uuid::new_v4();
        let (_, rx) = hub.register(user).await;
        let (_, _rx_alive) = hub.register(user).await;
        drop(rx);

        let delivered = hub
            .send_to_user(user, ServerMessage::empty(msg_types::NOTIFICATION))
            .await;
        assert_eq!(delivered, 1);
        assert_eq!(hub.connection_count(user).await, 1);
    }

    #[tokio::test]
    async fn test_unregister_removes_empty_user() {
        let hub = ConnectionHub::new();
        let user = Uuid::new_v4();
        let (connection_id, _rx) = hub.register(user).await;
        assert!(hub.is_connected(user).await);
        hub.unregister(user, connection_id).await;
        assert!(!hub.is_connected(user).await);
        assert_eq!(hub.total_connections().await, 0);
    }

    #[tokio::test]
    async fn test_full_buffer_drops_instead_of_blocking() {
        let hub = ConnectionHub::new();
        let user = Uuid::new_v4();
        let (_, mut rx) = hub.register(user).await;
        for _ in 0..CONNECTION_BUFFER {
            assert_eq!(
                hub.send_to_user(user, ServerMessage::empty(msg_types::NOTIFICATION))
                    .await,
                1
            );
        }
        let delivered = hub
            .send_to_user(user, ServerMessage::empty(msg_types::NOTIFICATION))
            .await;
        assert_eq!(delivered, 0);
        assert_eq!(hub.connection_count(user).await, 1);
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_send_to_connection_targets_one() {
        let hub = ConnectionHub::new();
        let user = Uuid::new_v4();
        let (first, mut rx1) = hub.register(user).await;
        let (_, mut rx2) = hub.register(user).await;
        assert!(
            hub.send_to_connection(user, first, ServerMessage::empty(msg_types::PONG))
                .await
        );
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }
}
