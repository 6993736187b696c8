//! Connection handle with serialized writes
//!
//! Every write or control frame for a connection funnels through one
//! [`ConnectionHandle`], which owns the write half of the socket behind a
//! mutex. Writes from the echo path and the control plane contend on that
//! lock, so frames to a single peer never interleave.

use std::fmt;
use std::hash::{Hash, Hasher};

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures::stream::SplitSink;
use futures::{Sink, SinkExt};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Boxed write half of a connection
///
/// The concrete sink is the write half of an upgraded [`WebSocket`]; tests
/// substitute a channel-backed sink to observe frames directly.
type FrameSink = Box<dyn Sink<Message, Error = axum::Error> + Send + Unpin>;

/// Unique identifier for a WebSocket connection
#[derive(Clone, Copy, Eq)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Create a new unique connection ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for ConnectionId {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Hash for ConnectionId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl From<Uuid> for ConnectionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Exclusive writer for one live WebSocket connection
///
/// The handle is shared between the connection's read loop, its heartbeat
/// task, and any in-flight broadcast. The mutex guarantees at most one
/// write/ping/close executes against the socket at any instant; the guard is
/// dropped on every exit path, so a failed send never wedges the lock.
pub struct ConnectionHandle {
    id: ConnectionId,
    writer: Mutex<FrameSink>,
}

impl ConnectionHandle {
    /// Wrap the write half of an upgraded socket
    #[must_use]
    pub fn new(writer: SplitSink<WebSocket, Message>) -> Self {
        Self::from_sink(writer)
    }

    /// Wrap any frame sink
    ///
    /// This is the seam tests use to observe written frames without a real
    /// socket.
    #[must_use]
    pub fn from_sink<S>(sink: S) -> Self
    where
        S: Sink<Message, Error = axum::Error> + Send + Unpin + 'static,
    {
        Self {
            id: ConnectionId::new(),
            writer: Mutex::new(Box::new(sink)),
        }
    }

    /// Get this connection's identifier
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Send a frame, serialized against all other writers to this connection
    pub async fn send(&self, message: Message) -> Result<(), axum::Error> {
        let mut writer = self.writer.lock().await;
        writer.send(message).await
    }

    /// Send a text frame
    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), axum::Error> {
        self.send(Message::Text(text.into().into())).await
    }

    /// Send a binary frame
    pub async fn send_binary(&self, data: Vec<u8>) -> Result<(), axum::Error> {
        self.send(Message::Binary(data.into())).await
    }

    /// Send a liveness probe
    pub async fn ping(&self) -> Result<(), axum::Error> {
        self.send(Message::Ping(Vec::new().into())).await
    }

    /// Send a close frame with the given status code and reason
    pub async fn close(&self, code: u16, reason: &str) -> Result<(), axum::Error> {
        self.send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_string().into(),
        })))
        .await
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
