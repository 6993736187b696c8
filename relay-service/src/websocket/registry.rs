//! Registry of live connections
//!
//! The registry is the only structure mutated by multiple independent tasks:
//! lifecycle tasks add and remove their handles, control-plane handlers fan
//! actions out over the membership. A read/write lock plus
//! snapshot-then-iterate keeps connection churn concurrent with broadcasts;
//! the per-handle writer lock is what serializes the actual frames.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::connection::{ConnectionHandle, ConnectionId};

/// Result of applying an action to every registered connection
///
/// Delivery is best-effort: per-connection failures are recorded here and
/// logged, never propagated. Control-plane callers report `attempted`;
/// `failures` exists so tests and callers can tell "0 of 5 delivered" from
/// "5 of 5 delivered".
#[derive(Debug, Default)]
pub struct BroadcastOutcome {
    /// Number of connections the action was attempted against
    pub attempted: usize,

    /// Connections whose action returned a transport error
    pub failures: Vec<ConnectionId>,
}

impl BroadcastOutcome {
    /// Number of connections the action succeeded against
    #[must_use]
    pub fn delivered(&self) -> usize {
        self.attempted - self.failures.len()
    }
}

/// Concurrent set of live connection handles
///
/// Cheap to clone; clones share the same membership. An instance is owned by
/// [`AppState`](crate::state::AppState) and handed to whatever needs it, so
/// tests can run independent registries side by side.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<HashMap<ConnectionId, Arc<ConnectionHandle>>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection handle
    ///
    /// Keyed by handle identity; re-adding a handle with the same id replaces
    /// the entry.
    pub async fn add(&self, handle: Arc<ConnectionHandle>) {
        let id = handle.id();
        self.connections.write().await.insert(id, handle);
        tracing::debug!(connection_id = %id, "Connection registered");
    }

    /// Remove a connection; no-op if absent
    pub async fn remove(&self, id: &ConnectionId) {
        self.connections.write().await.remove(id);
        tracing::debug!(connection_id = %id, "Connection deregistered");
    }

    /// Current number of registered connections
    pub async fn count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Check whether a connection is registered
    pub async fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.read().await.contains_key(id)
    }

    /// Get a list of all registered connection IDs
    pub async fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.read().await.keys().copied().collect()
    }

    /// Apply an async action to every registered connection
    ///
    /// Membership is snapshotted under the read lock and the lock released
    /// before any action runs, so connections keep registering and
    /// deregistering while a broadcast is in flight. Actions run sequentially
    /// on the calling task; iteration order is unspecified. A connection that
    /// deregisters mid-broadcast may still be written to once — its action
    /// fails soft and lands in [`BroadcastOutcome::failures`].
    pub async fn for_each<F, Fut>(&self, mut action: F) -> BroadcastOutcome
    where
        F: FnMut(Arc<ConnectionHandle>) -> Fut,
        Fut: Future<Output = Result<(), axum::Error>>,
    {
        let snapshot: Vec<Arc<ConnectionHandle>> = {
            self.connections.read().await.values().cloned().collect()
        };

        let mut outcome = BroadcastOutcome::default();
        for handle in snapshot {
            let id = handle.id();
            outcome.attempted += 1;
            if let Err(e) = action(handle).await {
                tracing::warn!(connection_id = %id, error = %e, "Broadcast action failed");
                outcome.failures.push(id);
            }
        }
        outcome
    }
}
