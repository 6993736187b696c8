//! Connection lifecycle: upgrade, heartbeat, echo read loop, teardown
//!
//! One task per connection runs the read loop, a second runs the heartbeat.
//! Both share the connection's [`ConnectionHandle`] and a cancellation token
//! scoping the connection: cancelling it unblocks the read loop and stops the
//! heartbeat. Lifecycle is one-directional — upgrade, register, drain,
//! deregister — and a handle is never resurrected after teardown.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{close_code, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::stream::SplitStream;
use futures::StreamExt;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::connection::ConnectionHandle;
use crate::state::AppState;

/// WebSocket upgrade handler for `/chat`
///
/// Requests that are not WebSocket upgrades are answered with
/// `426 Upgrade Required` plus the headers telling the client how to upgrade.
pub async fn ws_handler(
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<AppState>,
) -> Response {
    match upgrade {
        Ok(ws) => {
            let max_message_size = state.config().websocket.max_message_size_bytes;
            ws.max_message_size(max_message_size)
                .on_upgrade(move |socket| handle_socket(socket, state))
        }
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "Rejected non-upgrade request");
            (
                StatusCode::UPGRADE_REQUIRED,
                [
                    ("connection", "Upgrade"),
                    ("upgrade", "websocket"),
                    ("sec-websocket-version", "13"),
                ],
                "Upgrade Required",
            )
                .into_response()
        }
    }
}

/// Run one connection from registration to teardown
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (writer, mut reader) = socket.split();
    let handle = Arc::new(ConnectionHandle::new(writer));
    let id = handle.id();

    state.registry().add(Arc::clone(&handle)).await;
    tracing::info!(connection_id = %id, "Client connected");

    let cancel = CancellationToken::new();
    let heartbeat = tokio::spawn(heartbeat_loop(
        Arc::clone(&handle),
        state.config().websocket.ping_interval(),
        cancel.clone(),
    ));

    read_loop(&mut reader, &handle, &cancel).await;

    // Deregister before closing the socket so no broadcast can observe a
    // member whose resource is already closed.
    state.registry().remove(&id).await;
    cancel.cancel();
    if let Err(e) = handle.close(close_code::NORMAL, "done").await {
        tracing::debug!(connection_id = %id, error = %e, "Close frame not delivered");
    }
    let _ = heartbeat.await;

    tracing::info!(connection_id = %id, "Client disconnected");
}

/// Read frames until the peer closes, the transport errors, or the
/// connection scope is cancelled
async fn read_loop(
    reader: &mut SplitStream<WebSocket>,
    handle: &ConnectionHandle,
    cancel: &CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!(connection_id = %handle.id(), "Connection scope cancelled");
                return;
            }
            frame = reader.next() => frame,
        };

        let message = match frame {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                tracing::debug!(connection_id = %handle.id(), error = %e, "Read failed");
                return;
            }
            None => return,
        };

        match echo_frame(handle, message).await {
            Ok(ControlFlow::Continue(())) => {}
            Ok(ControlFlow::Break(())) => return,
            Err(e) => {
                tracing::debug!(connection_id = %handle.id(), error = %e, "Echo write failed");
                return;
            }
        }
    }
}

/// Echo protocol: text comes back prefixed, binary comes back verbatim
///
/// Control frames get no application-level response; the transport answers
/// pings itself. A close frame breaks the loop.
async fn echo_frame(
    handle: &ConnectionHandle,
    message: Message,
) -> Result<ControlFlow<()>, axum::Error> {
    match message {
        Message::Text(text) => {
            tracing::debug!(connection_id = %handle.id(), "Text: {}", text.as_str());
            handle.send_text(format!("echo: {}", text.as_str())).await?;
            Ok(ControlFlow::Continue(()))
        }
        Message::Binary(data) => {
            tracing::debug!(connection_id = %handle.id(), "Binary: {} bytes", data.len());
            handle.send(Message::Binary(data)).await?;
            Ok(ControlFlow::Continue(()))
        }
        Message::Close(_) => Ok(ControlFlow::Break(())),
        Message::Ping(_) | Message::Pong(_) => Ok(ControlFlow::Continue(())),
    }
}

/// Periodic liveness probe for one connection
///
/// A failed ping means the write path is dead; cancel the connection scope so
/// the read loop tears the connection down instead of leaving it half-alive.
async fn heartbeat_loop(handle: Arc<ConnectionHandle>, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so probes start one
    // period after connect.
    ticker.tick().await;

    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            _ = ticker.tick() => {
                if let Err(e) = handle.ping().await {
                    tracing::debug!(connection_id = %handle.id(), error = %e, "Heartbeat failed");
                    cancel.cancel();
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc;
    use futures::SinkExt;

    fn channel_handle() -> (Arc<ConnectionHandle>, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded();
        let handle = ConnectionHandle::from_sink(tx.sink_map_err(axum::Error::new));
        (Arc::new(handle), rx)
    }

    #[tokio::test]
    async fn test_echo_text_is_prefixed() {
        let (handle, mut rx) = channel_handle();
        let flow = echo_frame(&handle, Message::Text("hello".into())).await.unwrap();
        assert!(matches!(flow, ControlFlow::Continue(())));

        match rx.try_next().unwrap().unwrap() {
            Message::Text(text) => assert_eq!(text.as_str(), "echo: hello"),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_echo_binary_is_identity() {
        let (handle, mut rx) = channel_handle();
        let payload: Vec<u8> = (0u8..=255).collect();
        echo_frame(&handle, Message::Binary(payload.clone().into()))
            .await
            .unwrap();

        match rx.try_next().unwrap().unwrap() {
            Message::Binary(data) => assert_eq!(data.as_ref(), payload.as_slice()),
            other => panic!("expected binary frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_control_frames_get_no_reply() {
        let (handle, mut rx) = channel_handle();
        echo_frame(&handle, Message::Ping(Vec::new().into())).await.unwrap();
        echo_frame(&handle, Message::Pong(Vec::new().into())).await.unwrap();
        assert!(rx.try_next().is_err(), "no frame should have been written");
    }

    #[tokio::test]
    async fn test_close_frame_breaks_the_loop() {
        let (handle, _rx) = channel_handle();
        let flow = echo_frame(&handle, Message::Close(None)).await.unwrap();
        assert!(matches!(flow, ControlFlow::Break(())));
    }

    #[tokio::test]
    async fn test_echo_write_failure_surfaces() {
        let (handle, rx) = channel_handle();
        drop(rx);
        let result = echo_frame(&handle, Message::Text("hello".into())).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_stops_on_cancel() {
        let (handle, mut rx) = channel_handle();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(heartbeat_loop(
            handle,
            Duration::from_secs(20),
            cancel.clone(),
        ));

        // Paused clock: the runtime auto-advances while this task sleeps,
        // firing the 20s and 40s probe ticks.
        tokio::time::sleep(Duration::from_secs(41)).await;
        cancel.cancel();
        task.await.unwrap();

        let mut pings = 0;
        while let Ok(Some(message)) = rx.try_next() {
            assert!(matches!(message, Message::Ping(_)));
            pings += 1;
        }
        assert_eq!(pings, 2, "two probe intervals elapsed before cancel");
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_failure_cancels_scope() {
        let (handle, rx) = channel_handle();
        drop(rx);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(heartbeat_loop(
            handle,
            Duration::from_secs(20),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(21)).await;
        task.await.unwrap();
        assert!(cancel.is_cancelled());
    }
}
