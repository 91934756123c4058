//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and manages the connection lifecycle.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::hub::{ConnectionId, HubError};
use super::messages::{ClientMessage, ServerMessage};
use crate::api::AppState;
use crate::store;

/// WebSocket upgrade handler
///
/// This is the entry point for WebSocket connections.
/// It upgrades the HTTP connection to WebSocket and starts message handling.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Outbound queue for this connection
    let (tx, mut rx) = state.hub.channel();

    let connection_id = match join(&state, tx).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "Failed to register WebSocket connection");
            let error_msg = ServerMessage::Error {
                message: e.to_string(),
            };
            if let Ok(text) = serde_json::to_string(&error_msg) {
                let _ = sender.send(Message::Text(text)).await;
            }
            return;
        }
    };

    let conn_id_for_send = connection_id.clone();

    // Task to forward messages from channel to WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if sender.send(Message::Text(text)).await.is_err() {
                        tracing::debug!(
                            connection_id = %conn_id_for_send,
                            "WebSocket send failed, closing connection"
                        );
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize message");
                }
            }
        }
    });

    let state_for_recv = Arc::clone(&state);
    let conn_id_for_recv = connection_id.clone();

    // Task to receive messages from WebSocket and handle them
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !handle_ws_message(&state_for_recv, &conn_id_for_recv, msg).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %conn_id_for_recv,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    // Cleanup: unregister from hub
    state.hub.unregister(&connection_id).await;
}

/// Messages every client receives right after connecting
///
/// The chart type list goes first, then whatever history the store holds.
/// A store failure is logged and the client gets an empty history.
pub async fn greeting(state: &AppState) -> Vec<ServerMessage> {
    let history = store::fetch_or_empty(state.store.as_ref()).await;
    tracing::debug!(records = history.len(), "Prepared initial data");

    vec![ServerMessage::graph_types(), ServerMessage::InitialData(history)]
}

/// Register a connection with its greeting already queued
///
/// History is fetched before registration, so the feed cannot slip an
/// `updateData` ahead of `graphTypesChange` or `initialData`.
pub async fn join(
    state: &AppState,
    sender: mpsc::Sender<ServerMessage>,
) -> Result<ConnectionId, HubError> {
    let messages = greeting(state).await;
    state.hub.register_with(sender, messages).await
}

/// Handle a received WebSocket message
///
/// Returns false if the connection should be closed.
async fn handle_ws_message(state: &AppState, connection_id: &str, message: Message) -> bool {
    match message {
        Message::Text(text) => {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    handle_client_message(state, connection_id, client_msg).await;
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        error = %e,
                        text = %text,
                        "Invalid client message"
                    );
                    // Send error but keep connection open
                    let error_msg = ServerMessage::Error {
                        message: format!("Invalid message format: {}", e),
                    };
                    let _ = state.hub.send_to(connection_id, error_msg).await;
                }
            }
            true
        }
        Message::Binary(_) => {
            let error_msg = ServerMessage::Error {
                message: "Binary messages not supported".to_string(),
            };
            let _ = state.hub.send_to(connection_id, error_msg).await;
            true
        }
        // Axum answers pings itself
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            tracing::debug!(connection_id = %connection_id, "Client requested close");
            false
        }
    }
}

/// Handle a parsed client message
async fn handle_client_message(state: &AppState, connection_id: &str, message: ClientMessage) {
    match message {
        ClientMessage::ChangeGraphType(graph_type) => {
            match state.hub.set_graph_type(connection_id, graph_type).await {
                Ok(previous) => {
                    tracing::info!(
                        connection_id = %connection_id,
                        graph_type = %graph_type,
                        previous = ?previous,
                        "Suggested graph type changed"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        connection_id = %connection_id,
                        error = %e,
                        "Failed to record graph type"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartType;
    use crate::config::ServerConfig;
    use crate::selector::{rank, WeightTable};
    use crate::store::{HistoryRecord, NullStore, SampleStore, StoreError, StoreResult};
    use async_trait::async_trait;
    use crate::websocket::ConnectionHub;
    use std::sync::OnceLock;

    struct FixedStore(Vec<HistoryRecord>);

    #[async_trait]
    impl SampleStore for FixedStore {
        fn describe(&self) -> String {
            "fixed".to_string()
        }

        async fn check(&self) -> StoreResult<()> {
            Ok(())
        }

        async fn fetch_all(&self) -> StoreResult<Vec<HistoryRecord>> {
            Ok(self.0.clone())
        }
    }

    struct DownStore;

    #[async_trait]
    impl SampleStore for DownStore {
        fn describe(&self) -> String {
            "down".to_string()
        }

        async fn check(&self) -> StoreResult<()> {
            Err(StoreError::Connectivity("refused".to_string()))
        }

        async fn fetch_all(&self) -> StoreResult<Vec<HistoryRecord>> {
            Err(StoreError::Connectivity("refused".to_string()))
        }
    }

    async fn connect(
        store: Arc<dyn SampleStore>,
    ) -> (AppState, String, mpsc::Receiver<ServerMessage>) {
        let state = AppState::new(ServerConfig::default(), WeightTable::default(), store);
        let (tx, rx) = state.hub.channel();
        let id = join(&state, tx).await.unwrap();
        (state, id, rx)
    }

    fn skip_greeting(rx: &mut mpsc::Receiver<ServerMessage>) {
        assert!(matches!(rx.try_recv(), Ok(ServerMessage::GraphTypesChange(_))));
        assert!(matches!(rx.try_recv(), Ok(ServerMessage::InitialData(_))));
    }

    /// Ticks the feed while history is being read
    #[derive(Default)]
    struct TickingStore {
        hub: OnceLock<Arc<ConnectionHub>>,
    }

    #[async_trait]
    impl SampleStore for TickingStore {
        fn describe(&self) -> String {
            "ticking".to_string()
        }

        async fn check(&self) -> StoreResult<()> {
            Ok(())
        }

        async fn fetch_all(&self) -> StoreResult<Vec<HistoryRecord>> {
            if let Some(hub) = self.hub.get() {
                hub.broadcast(&ServerMessage::UpdateData {
                    new_data: 77,
                    suggested_graph_type: ChartType::Line,
                })
                .await;
            }
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_connect_announces_graph_types_then_suggestion() {
        let (state, _id, mut rx) = connect(Arc::new(NullStore)).await;

        let labels = match rx.try_recv().unwrap() {
            ServerMessage::GraphTypesChange(labels) => labels,
            other => panic!("Expected GraphTypesChange, got {:?}", other),
        };
        assert_eq!(labels, ChartType::all().to_vec());

        // what the page computes from the announced labels
        assert_eq!(rank(&labels, &state.weights).unwrap(), ChartType::Scatter);

        assert!(matches!(
            rx.try_recv().unwrap(),
            ServerMessage::InitialData(records) if records.is_empty()
        ));
        // exactly one announcement
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_connect_sends_history() {
        let record = HistoryRecord {
            value: 64,
            graph_type: Some(ChartType::Line),
            recorded_at: 1_700_000_000_000,
        };
        let (_state, _id, mut rx) = connect(Arc::new(FixedStore(vec![record.clone()]))).await;

        assert!(matches!(rx.try_recv().unwrap(), ServerMessage::GraphTypesChange(_)));
        match rx.try_recv().unwrap() {
            ServerMessage::InitialData(records) => assert_eq!(records, vec![record]),
            other => panic!("Expected InitialData, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_store_sends_empty_history() {
        let (_state, _id, mut rx) = connect(Arc::new(DownStore)).await;

        assert!(matches!(rx.try_recv().unwrap(), ServerMessage::GraphTypesChange(_)));
        assert!(matches!(
            rx.try_recv().unwrap(),
            ServerMessage::InitialData(records) if records.is_empty()
        ));
    }

    #[tokio::test]
    async fn test_change_graph_type_updates_session() {
        let (state, id, _rx) = connect(Arc::new(NullStore)).await;

        let frame = Message::Text(r#"{"event":"changeGraphType","data":"vertical"}"#.to_string());
        assert!(handle_ws_message(&state, &id, frame).await);

        let session = state.hub.session(&id).await.unwrap();
        assert_eq!(session.graph_type, Some(ChartType::Vertical));
    }

    #[tokio::test]
    async fn test_invalid_frame_keeps_connection_open() {
        let (state, id, mut rx) = connect(Arc::new(NullStore)).await;
        skip_greeting(&mut rx);

        let frame = Message::Text(r#"{"event":"changeGraphType","data":"pie"}"#.to_string());
        assert!(handle_ws_message(&state, &id, frame).await);
        assert!(matches!(rx.try_recv().unwrap(), ServerMessage::Error { .. }));
        assert_eq!(state.hub.session(&id).await.unwrap().graph_type, None);

        assert!(handle_ws_message(&state, &id, Message::Binary(vec![1, 2, 3])).await);
        assert!(matches!(rx.try_recv().unwrap(), ServerMessage::Error { .. }));
    }

    #[tokio::test]
    async fn test_close_frame_ends_connection() {
        let (state, id, _rx) = connect(Arc::new(NullStore)).await;
        assert!(!handle_ws_message(&state, &id, Message::Close(None)).await);
    }

    #[tokio::test]
    async fn test_broadcast_during_connect_follows_greeting() {
        let store = Arc::new(TickingStore::default());
        let state = AppState::new(
            ServerConfig::default(),
            WeightTable::default(),
            Arc::clone(&store) as Arc<dyn SampleStore>,
        );
        let _ = store.hub.set(Arc::clone(&state.hub));

        let (tx, mut rx) = state.hub.channel();
        join(&state, tx).await.unwrap();
        state
            .hub
            .broadcast(&ServerMessage::UpdateData {
                new_data: 12,
                suggested_graph_type: ChartType::Bar,
            })
            .await;

        assert!(matches!(rx.try_recv().unwrap(), ServerMessage::GraphTypesChange(_)));
        assert!(matches!(rx.try_recv().unwrap(), ServerMessage::InitialData(_)));
        // the tick during the history read predates the connection
        match rx.try_recv().unwrap() {
            ServerMessage::UpdateData { new_data, .. } => assert_eq!(new_data, 12),
            other => panic!("Expected UpdateData, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }
}
