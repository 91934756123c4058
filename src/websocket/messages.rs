//! WebSocket Message Types
//!
//! Every frame is a JSON text frame of the form `{"event": ..., "data": ...}`.

use serde::{Deserialize, Serialize};

use crate::chart::ChartType;
use crate::store::HistoryRecord;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    /// The user picked a chart type to display
    ChangeGraphType(ChartType),
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Chart types the client should build, in declaration order
    GraphTypesChange(Vec<ChartType>),
    /// One generated sample
    UpdateData {
        #[serde(rename = "newData")]
        new_data: u32,
        #[serde(rename = "suggestedGraphType")]
        suggested_graph_type: ChartType,
    },
    /// Previously recorded samples, sent once after connect
    InitialData(Vec<HistoryRecord>),
    /// Error message
    Error {
        /// Error description
        message: String,
    },
}

impl ServerMessage {
    /// Announce the full set of chart types
    pub fn graph_types() -> Self {
        ServerMessage::GraphTypesChange(ChartType::all().to_vec())
    }

    /// Event name as it appears on the wire
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::GraphTypesChange(_) => "graphTypesChange",
            ServerMessage::UpdateData { .. } => "updateData",
            ServerMessage::InitialData(_) => "initialData",
            ServerMessage::Error { .. } => "error",
        }
    }
}
