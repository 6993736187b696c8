//! Broadcast control plane
//!
//! HTTP endpoints that fan an action out to every registered connection:
//! text, long text (extended-length frame), binary, ping, close. Each action
//! is "compute payload, apply to every member"; delivery is best-effort and
//! callers get back the number of connections attempted, never per-peer
//! errors.

pub mod payload;

use axum::extract::{Query, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::state::AppState;
use crate::websocket::close_code;

/// Marker prefixed to server-originated text broadcasts
pub const SERVER_MARKER: &str = "srv: ";

/// Response body for every broadcast action
#[derive(Debug, Serialize, Deserialize)]
pub struct BroadcastResponse {
    /// Which action ran
    pub action: String,

    /// Number of connections the action was attempted against
    pub attempted: usize,
}

impl BroadcastResponse {
    fn new(action: &str, attempted: usize) -> Self {
        Self {
            action: action.to_string(),
            attempted,
        }
    }
}

/// Control-plane routes, nested under `/api`
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/send-text", post(send_text))
        .route("/api/send-long", post(send_long))
        .route("/api/send-binary", post(send_binary))
        .route("/api/ping", post(ping_all))
        .route("/api/close", post(close_all))
}

#[derive(Debug, Deserialize)]
pub struct SendTextParams {
    /// Message to broadcast; required
    pub msg: Option<String>,
}

/// `POST /api/send-text?msg=...` — broadcast a text frame to every connection
pub async fn send_text(
    State(state): State<AppState>,
    Query(params): Query<SendTextParams>,
) -> Result<Json<BroadcastResponse>> {
    let msg = params
        .msg
        .filter(|m| !m.is_empty())
        .ok_or_else(|| Error::BadRequest("msg required".to_string()))?;

    let text = format!("{SERVER_MARKER}{msg}");
    let outcome = state
        .registry()
        .for_each(|handle| {
            let text = text.clone();
            async move { handle.send_text(text).await }
        })
        .await;

    tracing::info!(
        attempted = outcome.attempted,
        delivered = outcome.delivered(),
        "Broadcast text"
    );
    Ok(Json(BroadcastResponse::new("send-text", outcome.attempted)))
}

/// `POST /api/send-long` — broadcast a text frame long enough to take the
/// extended-length encoding on the wire
pub async fn send_long(State(state): State<AppState>) -> Json<BroadcastResponse> {
    let text = payload::long_text();
    let outcome = state
        .registry()
        .for_each(|handle| {
            let text = text.clone();
            async move { handle.send_text(text).await }
        })
        .await;

    tracing::info!(
        attempted = outcome.attempted,
        delivered = outcome.delivered(),
        bytes = payload::LONG_TEXT_LEN,
        "Broadcast long text"
    );
    Json(BroadcastResponse::new("send-long", outcome.attempted))
}

#[derive(Debug, Deserialize)]
pub struct SendBinaryParams {
    /// Payload size in bytes; out-of-range values fall back to the default
    pub n: Option<usize>,
}

/// `POST /api/send-binary?n=...` — broadcast a deterministic binary payload
pub async fn send_binary(
    State(state): State<AppState>,
    Query(params): Query<SendBinaryParams>,
) -> Json<BroadcastResponse> {
    let len = payload::clamp_binary_len(params.n);
    let bytes = payload::binary(len);
    let outcome = state
        .registry()
        .for_each(|handle| {
            let bytes = bytes.clone();
            async move { handle.send_binary(bytes).await }
        })
        .await;

    tracing::info!(
        attempted = outcome.attempted,
        delivered = outcome.delivered(),
        bytes = len,
        "Broadcast binary"
    );
    Json(BroadcastResponse::new("send-binary", outcome.attempted))
}

/// `POST /api/ping` — send a liveness probe to every connection
pub async fn ping_all(State(state): State<AppState>) -> Json<BroadcastResponse> {
    let outcome = state
        .registry()
        .for_each(|handle| async move { handle.ping().await })
        .await;

    tracing::info!(
        attempted = outcome.attempted,
        delivered = outcome.delivered(),
        "Pinged all connections"
    );
    Json(BroadcastResponse::new("ping", outcome.attempted))
}

#[derive(Debug, Deserialize)]
pub struct CloseParams {
    /// Close status code; defaults to normal closure (1000)
    pub code: Option<u16>,

    /// Human-readable close reason; defaults to empty
    pub reason: Option<String>,
}

/// `POST /api/close?code=...&reason=...` — close every connection
pub async fn close_all(
    State(state): State<AppState>,
    Query(params): Query<CloseParams>,
) -> Json<BroadcastResponse> {
    let code = params.code.unwrap_or(close_code::NORMAL);
    let reason = params.reason.unwrap_or_default();
    let outcome = state
        .registry()
        .for_each(|handle| {
            let reason = reason.clone();
            async move { handle.close(code, &reason).await }
        })
        .await;

    tracing::info!(
        attempted = outcome.attempted,
        delivered = outcome.delivered(),
        code,
        reason,
        "Closed all connections"
    );
    Json(BroadcastResponse::new("close", outcome.attempted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::websocket::{ConnectionHandle, Message};
    use futures::channel::mpsc;
    use futures::SinkExt;
    use std::sync::Arc;

    fn channel_handle() -> (Arc<ConnectionHandle>, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded();
        let handle = ConnectionHandle::from_sink(tx.sink_map_err(axum::Error::new));
        (Arc::new(handle), rx)
    }

    #[tokio::test]
    async fn test_send_text_requires_msg() {
        let state = AppState::new(Config::default());
        let missing = send_text(State(state.clone()), Query(SendTextParams { msg: None })).await;
        assert!(matches!(missing, Err(Error::BadRequest(_))));

        let empty = send_text(
            State(state),
            Query(SendTextParams {
                msg: Some(String::new()),
            }),
        )
        .await;
        assert!(matches!(empty, Err(Error::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_send_text_applies_server_marker() {
        let state = AppState::new(Config::default());
        let (handle, mut rx) = channel_handle();
        state.registry().add(handle).await;

        let response = send_text(
            State(state),
            Query(SendTextParams {
                msg: Some("hello".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.0.attempted, 1);

        match rx.try_next().unwrap().unwrap() {
            Message::Text(text) => assert_eq!(text.as_str(), "srv: hello"),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_long_payload_length() {
        let state = AppState::new(Config::default());
        let (handle, mut rx) = channel_handle();
        state.registry().add(handle).await;

        send_long(State(state)).await;

        match rx.try_next().unwrap().unwrap() {
            Message::Text(text) => assert_eq!(text.len(), 130),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_binary_clamps_size() {
        let state = AppState::new(Config::default());
        let (handle, mut rx) = channel_handle();
        state.registry().add(handle).await;

        send_binary(State(state.clone()), Query(SendBinaryParams { n: Some(64) })).await;
        match rx.try_next().unwrap().unwrap() {
            Message::Binary(data) => assert_eq!(data.len(), 64),
            other => panic!("expected binary frame, got {other:?}"),
        }

        // Out-of-range size falls back to the default
        send_binary(State(state), Query(SendBinaryParams { n: Some(0) })).await;
        match rx.try_next().unwrap().unwrap() {
            Message::Binary(data) => assert_eq!(data.len(), payload::DEFAULT_BINARY_LEN),
            other => panic!("expected binary frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_close_all_defaults() {
        let state = AppState::new(Config::default());
        let (handle, mut rx) = channel_handle();
        state.registry().add(handle).await;

        let response = close_all(
            State(state),
            Query(CloseParams {
                code: None,
                reason: None,
            }),
        )
        .await;
        assert_eq!(response.0.attempted, 1);

        match rx.try_next().unwrap().unwrap() {
            Message::Close(Some(frame)) => {
                assert_eq!(frame.code, close_code::NORMAL);
                assert_eq!(frame.reason.as_str(), "");
            }
            other => panic!("expected close frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ping_all_counts_attempts_not_successes() {
        let state = AppState::new(Config::default());
        let (healthy, _rx) = channel_handle();
        let (dead, dead_rx) = channel_handle();
        drop(dead_rx);
        state.registry().add(healthy).await;
        state.registry().add(dead).await;

        let response = ping_all(State(state)).await;
        assert_eq!(response.0.attempted, 2);
    }
}
