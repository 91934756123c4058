//! WebSocket Push Channel
//!
//! Streams generated samples to dashboard clients.
//!
//! ## Architecture
//!
//! - **ConnectionHub**: Open connections and per-connection session state
//! - **Handler**: WebSocket upgrade and message processing
//! - **Messages**: Client and server frame formats
//!
//! ## Events
//!
//! On connect the server sends `graphTypesChange` followed by
//! `initialData`, then one `updateData` per generated sample. Clients may
//! send `changeGraphType` at any time.
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://localhost:3000/ws');
//!
//! ws.onmessage = (event) => {
//!   const { event: name, data } = JSON.parse(event.data);
//!   console.log(name, data);
//! };
//!
//! ws.send(JSON.stringify({ event: 'changeGraphType', data: 'bar' }));
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::{greeting, join, websocket_handler};
pub use hub::{ConnectionHub, ConnectionId, HubConfig, HubError, Session};
pub use messages::{ClientMessage, ServerMessage};
