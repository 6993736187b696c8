//! WebSocket relay core
//!
//! Connections upgrade from HTTP on `/chat` and get echoed back everything
//! they send. Each connection is wrapped in a [`ConnectionHandle`] that
//! serializes all writes, registered in the shared [`ConnectionRegistry`],
//! and probed by its own heartbeat task until its read loop exits.

mod config;
mod connection;
mod handler;
mod registry;

// Re-exports
pub use config::WebSocketConfig;
pub use connection::{ConnectionHandle, ConnectionId};
pub use handler::ws_handler;
pub use registry::{BroadcastOutcome, ConnectionRegistry};

// Re-export axum WebSocket types for convenience
pub use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
