//! WebSocket Connection Hub
//!
//! Owns the open connection set and the per-connection session state.
//! Each connection gets a bounded outbound queue; delivery never waits on a
//! slow client, a full queue just drops the message for that client.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::messages::ServerMessage;
use crate::chart::ChartType;

/// Smallest outbound queue: room for the greeting sent on connect
const GREETING_CAPACITY: usize = 2;

/// Unique identifier for a WebSocket connection
pub type ConnectionId = String;

/// Manages all WebSocket connections and their sessions
pub struct ConnectionHub {
    /// Active connections: ConnectionId → ConnectionHandle
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
    /// Configuration
    config: HubConfig,
}

/// Configuration for the connection hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of concurrent connections
    pub max_connections: usize,
    /// Capacity of each connection's outbound queue
    pub client_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 1000,
            client_buffer: 64,
        }
    }
}

/// Server-side state of one connected client
#[derive(Debug, Clone)]
pub struct Session {
    /// When the connection was registered
    pub connected_at: DateTime<Utc>,
    /// Chart type the client last asked for, if any
    pub graph_type: Option<ChartType>,
}

/// Handle for sending messages to a specific connection
struct ConnectionHandle {
    sender: mpsc::Sender<ServerMessage>,
    session: Session,
}

impl ConnectionHub {
    /// Create a new connection hub
    pub fn new(config: HubConfig) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Create an outbound queue sized for one connection
    pub fn channel(&self) -> (mpsc::Sender<ServerMessage>, mpsc::Receiver<ServerMessage>) {
        mpsc::channel(self.config.client_buffer.max(GREETING_CAPACITY))
    }

    /// Register a new WebSocket connection
    ///
    /// Returns the connection ID on success, or an error if the connection
    /// limit has been reached.
    pub async fn register(
        &self,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<ConnectionId, HubError> {
        self.register_with(sender, Vec::new()).await
    }

    /// Register a connection, queueing `greeting` ahead of any broadcast
    ///
    /// The greeting is queued while the connection map is locked, so no
    /// broadcast can reach the client before it.
    pub async fn register_with(
        &self,
        sender: mpsc::Sender<ServerMessage>,
        greeting: Vec<ServerMessage>,
    ) -> Result<ConnectionId, HubError> {
        let mut connections = self.connections.write().await;
        if connections.len() >= self.config.max_connections {
            return Err(HubError::TooManyConnections(self.config.max_connections));
        }

        for message in greeting {
            sender.try_send(message).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => HubError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => HubError::SendFailed,
            })?;
        }

        let id = Uuid::new_v4().to_string();
        let handle = ConnectionHandle {
            sender,
            session: Session {
                connected_at: Utc::now(),
                graph_type: None,
            },
        };
        connections.insert(id.clone(), handle);

        tracing::info!(connection_id = %id, "WebSocket connected");
        Ok(id)
    }

    /// Unregister a connection, dropping its session
    pub async fn unregister(&self, id: &str) {
        if self.connections.write().await.remove(id).is_some() {
            tracing::info!(connection_id = %id, "WebSocket disconnected");
        }
    }

    /// Queue a message for every connected client
    ///
    /// Returns the number of clients the message was queued for.
    pub async fn broadcast(&self, message: &ServerMessage) -> usize {
        let connections = self.connections.read().await;

        let mut sent_count = 0;
        for (id, handle) in connections.iter() {
            match handle.sender.try_send(message.clone()) {
                Ok(()) => sent_count += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::debug!(
                        connection_id = %id,
                        event = message.event_name(),
                        "Client queue full, message dropped"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }

        tracing::trace!(
            event = message.event_name(),
            recipients = sent_count,
            "Broadcast event"
        );
        sent_count
    }

    /// Send a message directly to a specific connection
    pub async fn send_to(&self, id: &str, message: ServerMessage) -> Result<(), HubError> {
        let connections = self.connections.read().await;
        let handle = connections.get(id).ok_or(HubError::ConnectionNotFound)?;

        handle.sender.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => HubError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => HubError::SendFailed,
        })
    }

    /// Record the chart type a client switched to
    ///
    /// Returns the previously selected chart type.
    pub async fn set_graph_type(
        &self,
        id: &str,
        graph_type: ChartType,
    ) -> Result<Option<ChartType>, HubError> {
        let mut connections = self.connections.write().await;
        let handle = connections
            .get_mut(id)
            .ok_or(HubError::ConnectionNotFound)?;

        Ok(handle.session.graph_type.replace(graph_type))
    }

    /// Snapshot of a connection's session
    pub async fn session(&self, id: &str) -> Option<Session> {
        self.connections
            .read()
            .await
            .get(id)
            .map(|handle| handle.session.clone())
    }

    /// Get the current connection count
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

/// Errors that can occur in the connection hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many connections (limit: {0})")]
    TooManyConnections(usize),

    #[error("Connection not found")]
    ConnectionNotFound,

    #[error("Client queue is full")]
    QueueFull,

    #[error("Failed to send message")]
    SendFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(value: u32) -> ServerMessage {
        ServerMessage::UpdateData {
            new_data: value,
            suggested_graph_type: ChartType::Bar,
        }
    }

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.client_buffer, 64);
    }

    #[tokio::test]
    async fn test_register_unregister() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, _rx) = hub.channel();

        let id = hub.register(tx).await.unwrap();
        assert!(!id.is_empty());
        assert_eq!(hub.connection_count().await, 1);

        hub.unregister(&id).await;
        assert_eq!(hub.connection_count().await, 0);
        assert!(hub.session(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let config = HubConfig {
            max_connections: 2,
            client_buffer: 4,
        };
        let hub = ConnectionHub::new(config);

        let (tx1, _rx1) = hub.channel();
        let (tx2, _rx2) = hub.channel();
        let (tx3, _rx3) = hub.channel();

        let id1 = hub.register(tx1).await.unwrap();
        let id2 = hub.register(tx2).await.unwrap();
        let result = hub.register(tx3).await;

        assert!(matches!(result, Err(HubError::TooManyConnections(2))));

        hub.unregister(&id1).await;
        hub.unregister(&id2).await;
    }

    #[tokio::test]
    async fn test_greeting_precedes_broadcasts() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, mut rx) = hub.channel();

        let greeting = vec![ServerMessage::graph_types(), ServerMessage::InitialData(Vec::new())];
        hub.register_with(tx, greeting).await.unwrap();
        hub.broadcast(&sample(77)).await;

        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|msg| msg.event_name())
            .collect();
        assert_eq!(events, vec!["graphTypesChange", "initialData", "updateData"]);
    }

    #[tokio::test]
    async fn test_rejected_connection_gets_no_greeting() {
        let hub = ConnectionHub::new(HubConfig {
            max_connections: 0,
            client_buffer: 4,
        });
        let (tx, mut rx) = hub.channel();

        let result = hub.register_with(tx, vec![ServerMessage::graph_types()]).await;
        assert!(matches!(result, Err(HubError::TooManyConnections(0))));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_client() {
        let hub = ConnectionHub::new(HubConfig::default());

        let (tx1, mut rx1) = hub.channel();
        let (tx2, mut rx2) = hub.channel();
        hub.register(tx1).await.unwrap();
        hub.register(tx2).await.unwrap();

        assert_eq!(hub.broadcast(&sample(42)).await, 2);

        for rx in [&mut rx1, &mut rx2] {
            match rx.try_recv().unwrap() {
                ServerMessage::UpdateData { new_data, .. } => assert_eq!(new_data, 42),
                other => panic!("Expected UpdateData, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let hub = ConnectionHub::new(HubConfig {
            max_connections: 10,
            client_buffer: 2,
        });
        let (slow_tx, mut slow_rx) = hub.channel();
        let (fast_tx, mut fast_rx) = hub.channel();
        hub.register(slow_tx).await.unwrap();
        hub.register(fast_tx).await.unwrap();

        assert_eq!(hub.broadcast(&sample(1)).await, 2);
        assert_eq!(hub.broadcast(&sample(2)).await, 2);
        // fast client drains, slow client does not
        assert!(fast_rx.try_recv().is_ok());
        assert!(fast_rx.try_recv().is_ok());
        assert_eq!(hub.broadcast(&sample(3)).await, 1);

        let mut slow_values = Vec::new();
        while let Ok(ServerMessage::UpdateData { new_data, .. }) = slow_rx.try_recv() {
            slow_values.push(new_data);
        }
        assert_eq!(slow_values, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_closed_client_not_counted() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, rx) = hub.channel();
        let id = hub.register(tx).await.unwrap();
        drop(rx);

        assert_eq!(hub.broadcast(&sample(5)).await, 0);
        assert!(matches!(
            hub.send_to(&id, sample(5)).await,
            Err(HubError::SendFailed)
        ));
    }

    #[tokio::test]
    async fn test_session_graph_type() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, _rx) = hub.channel();
        let id = hub.register(tx).await.unwrap();

        assert_eq!(hub.session(&id).await.unwrap().graph_type, None);
        assert_eq!(hub.set_graph_type(&id, ChartType::Line).await.unwrap(), None);
        assert_eq!(
            hub.set_graph_type(&id, ChartType::Bar).await.unwrap(),
            Some(ChartType::Line)
        );
        assert_eq!(
            hub.session(&id).await.unwrap().graph_type,
            Some(ChartType::Bar)
        );

        assert!(matches!(
            hub.set_graph_type("missing", ChartType::Bar).await,
            Err(HubError::ConnectionNotFound)
        ));
    }
}
