//! # relay-service
//!
//! Real-time WebSocket message relay. Browsers open a persistent connection
//! on `/chat` and get everything they send echoed back; a separate HTTP
//! control plane under `/api` pushes synthetic messages (text, long text,
//! binary, pings, forced closes) to every currently connected client.
//!
//! The core is the connection registry and write-serialization subsystem:
//! each connection's writes go through a per-handle lock, the registry tracks
//! live handles with a read-mostly lock, and control actions fan out over a
//! membership snapshot without blocking connection churn.
//!
//! ## Example
//!
//! ```rust,no_run
//! use relay_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Load configuration
//!     let config = Config::load()?;
//!
//!     // Initialize tracing
//!     init_tracing(&config)?;
//!
//!     // Build application state and router
//!     let state = AppState::new(config.clone());
//!     let app = build_router(state);
//!
//!     // Run server
//!     Server::new(config).serve(app).await
//! }
//! ```

pub mod config;
pub mod control;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod state;
pub mod websocket;

use axum::routing::any;
use axum::Router;

use crate::state::AppState;
use crate::websocket::ws_handler;

/// Assemble the service router: the `/chat` WebSocket endpoint plus the
/// `/api` control plane
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", any(ws_handler))
        .merge(control::routes())
        .with_state(state)
}

/// Commonly used types and functions
pub mod prelude {
    pub use crate::build_router;
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::observability::init_tracing;
    pub use crate::server::Server;
    pub use crate::state::AppState;
    pub use crate::websocket::{ConnectionHandle, ConnectionId, ConnectionRegistry};
}
